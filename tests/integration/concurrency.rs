use futures::future::join_all;
use std::sync::Arc;

use scaffold_cli::chain::{CancellationFlag, ChainResolver, ParseCache};
use scaffold_cli::core::ScaffoldError;
use scaffold_cli::inspector::Inspector;
use scaffold_cli::test_utils::TemplateSetFixture;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_parse_each_tier_once() {
    let inspector = Arc::new(Inspector::new(TemplateSetFixture::layered().to_source()));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let inspector = Arc::clone(&inspector);
            tokio::spawn(async move { inspector.introspect("component").await })
        })
        .collect();

    let reports: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap().unwrap()).collect();

    assert_eq!(inspector.parse_cache().parse_count(), 4);
    assert!(reports.iter().all(|r| r.required_variables == reports[0].required_variables));
}

#[tokio::test]
async fn test_shared_parse_cache_across_leaves() {
    let cache = Arc::new(ParseCache::new());
    let source = TemplateSetFixture::layered().to_source();

    let python = ChainResolver::new(&source).with_cache(Arc::clone(&cache)).resolve("python").await.unwrap();
    let component =
        ChainResolver::new(&source).with_cache(Arc::clone(&cache)).resolve("component").await.unwrap();

    assert_eq!(python.len(), 3);
    assert_eq!(component.len(), 4);
    assert_eq!(cache.parse_count(), 4);
    assert_eq!(cache.hit_count(), 3);
}

#[tokio::test]
async fn test_edit_invalidates_by_content_identity() {
    let source = TemplateSetFixture::layered().to_source();
    let inspector = Inspector::new(source);
    inspector.introspect("component").await.unwrap();

    inspector.source().insert("code", "{% extends \"root\" %}{% block header %}{{ lang }}{% endblock %}");
    let report = inspector.introspect("component").await.unwrap();

    assert!(report.required_variables.contains(&"lang".to_string()));
    assert!(!report.required_variables.contains(&"language".to_string()));
    assert_eq!(inspector.parse_cache().parse_count(), 5);
}

#[tokio::test]
async fn test_cancellation_aborts_before_fetching() {
    let cancel = CancellationFlag::new();
    let source = TemplateSetFixture::layered().to_source();
    let resolver = ChainResolver::new(&source).with_cancellation(cancel.clone());

    cancel.cancel();
    let err = resolver.resolve("component").await.unwrap_err();

    assert!(matches!(err, ScaffoldError::ResolutionCancelled { ref leaf } if leaf == "component"));
    assert_eq!(source.fetch_count(), 0);
}
