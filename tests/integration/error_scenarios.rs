use scaffold_cli::core::ScaffoldError;
use scaffold_cli::inspector::Inspector;
use scaffold_cli::source::InMemorySource;
use scaffold_cli::test_utils::TemplateSetFixture;

#[tokio::test]
async fn test_cycle_is_fatal() {
    let inspector = Inspector::new(TemplateSetFixture::cyclic().to_source());
    let err = inspector.introspect("a").await.unwrap_err();

    match err {
        ScaffoldError::CyclicInheritance {
            chain,
        } => assert_eq!(chain, vec!["a", "b", "a"]),
        other => panic!("expected a cycle, got {other:?}"),
    }
    assert_eq!(inspector.cached_reports(), 0);
}

#[tokio::test]
async fn test_missing_ancestor_names_requester() {
    let inspector = Inspector::new(TemplateSetFixture::orphan().to_source());
    let err = inspector.validate("orphan", None).await.unwrap_err();

    assert!(matches!(
        err,
        ScaffoldError::MissingAncestor { ref missing, ref requested_by }
            if missing == "ghost" && requested_by == "orphan"
    ));
}

#[tokio::test]
async fn test_missing_leaf() {
    let inspector = Inspector::new(InMemorySource::new());
    let err = inspector.introspect("nope").await.unwrap_err();
    assert!(matches!(err, ScaffoldError::TemplateNotFound { ref name } if name == "nope"));
}

#[tokio::test]
async fn test_depth_limit() {
    let source = TemplateSetFixture::linear(5).to_source();

    let ok = Inspector::new(&source).with_max_depth(5);
    assert_eq!(ok.introspect("t4").await.unwrap().chain.len(), 5);

    let limited = Inspector::new(&source).with_max_depth(4);
    assert!(matches!(
        limited.introspect("t4").await.unwrap_err(),
        ScaffoldError::ExcessiveDepth { max_depth: 4, .. }
    ));
}

#[tokio::test]
async fn test_super_without_ancestor_is_fatal() {
    let source = InMemorySource::new()
        .with_template("root", "{% block body %}{% endblock %}")
        .with_template("leaf", "{% extends \"root\" %}{% block extra %}{{ super() }}{% endblock %}");
    let err = Inspector::new(source).introspect("leaf").await.unwrap_err();

    assert!(matches!(
        err,
        ScaffoldError::SuperWithoutAncestor { ref template, ref block } if template == "leaf" && block == "extra"
    ));
}

#[tokio::test]
async fn test_malformed_metadata_is_fatal() {
    let source = InMemorySource::new()
        .with_template("root", "{# scaffold:metadata\nenforcement: LOUD\n#}")
        .with_template("leaf", "{% extends \"root\" %}");
    let err = Inspector::new(source).introspect("leaf").await.unwrap_err();

    assert!(matches!(err, ScaffoldError::MalformedMetadata { ref template, .. } if template == "root"));
}

#[tokio::test]
async fn test_dynamic_extends_is_ambiguous() {
    let source = InMemorySource::new().with_template("leaf", "{% extends parent_name %}");
    let err = Inspector::new(source).introspect("leaf").await.unwrap_err();
    assert!(matches!(err, ScaffoldError::AmbiguousExtends { .. }));
}

#[tokio::test]
async fn test_parse_error_reports_line() {
    let source = InMemorySource::new().with_template("broken", "line one\n{% if x %}\nno end");
    let err = Inspector::new(source).introspect("broken").await.unwrap_err();
    assert!(matches!(err, ScaffoldError::Parse { ref template, .. } if template == "broken"));
}
