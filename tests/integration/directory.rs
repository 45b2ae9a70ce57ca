use tempfile::TempDir;

use scaffold_cli::core::ScaffoldError;
use scaffold_cli::inspector::Inspector;
use scaffold_cli::source::{DirectorySource, TemplateSource};
use scaffold_cli::test_utils::{TemplateFixture, TemplateSetFixture};

#[tokio::test]
async fn test_layered_chain_from_disk() {
    let dir = TempDir::new().unwrap();
    TemplateSetFixture::layered().write_to(dir.path()).unwrap();

    let inspector = Inspector::new(DirectorySource::new(dir.path()));
    let report = inspector.introspect("component").await.unwrap();

    assert_eq!(report.chain.len(), 4);
    assert_eq!(report.metadata.template_id, "python-component");
}

#[tokio::test]
async fn test_nested_names_and_explicit_extension() {
    let dir = TempDir::new().unwrap();
    TemplateSetFixture::new()
        .with("base/root", "{{ project }}{% block body %}{% endblock %}")
        .with("python/service", "{% extends \"base/root.j2\" %}{% block body %}{{ port }}{% endblock %}")
        .write_to(dir.path())
        .unwrap();

    let source = DirectorySource::new(dir.path());
    assert_eq!(source.list_templates().await.unwrap(), vec!["base/root.j2", "python/service.j2"]);

    let report = Inspector::new(source).introspect("python/service").await.unwrap();
    assert_eq!(report.required_variables, vec!["project", "port"]);
}

#[tokio::test]
async fn test_custom_extensions() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("page.tmpl"), "{{ title }}").unwrap();
    TemplateFixture::new("other", "{{ ignored }}").write_to(dir.path()).unwrap();

    let source = DirectorySource::new(dir.path()).with_extensions(vec!["tmpl".to_string()]);
    assert!(source.get_source("page").await.unwrap().is_some());
    assert!(source.get_source("other").await.unwrap().is_none());
}

#[tokio::test]
async fn test_escaping_names_are_rejected() {
    let dir = TempDir::new().unwrap();
    let source = DirectorySource::new(dir.path());

    let err = source.get_source("../secret").await.unwrap_err();
    assert!(matches!(err, ScaffoldError::SourceUnavailable { .. }));
}
