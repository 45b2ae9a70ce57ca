use scaffold_cli::inspector::Inspector;
use scaffold_cli::test_utils::TemplateSetFixture;

#[tokio::test]
async fn test_identical_sources_give_identical_reports() {
    let fixture = TemplateSetFixture::layered();
    let content = "# SCAFFOLD: template=python-component version=1.2.0\n";

    let mut introspections = Vec::new();
    let mut validations = Vec::new();
    for _ in 0..3 {
        // Fresh inspector each time so nothing is served from a cache
        let inspector = Inspector::new(fixture.to_source());
        let report = inspector.introspect("component").await.unwrap();
        introspections.push(serde_json::to_string(report.as_ref()).unwrap());
        let report = inspector.validate("component", Some(content)).await.unwrap();
        validations.push(serde_json::to_string(&report).unwrap());
    }

    assert!(introspections.windows(2).all(|w| w[0] == w[1]));
    assert!(validations.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_json_shape() {
    let inspector = Inspector::new(TemplateSetFixture::layered().to_source());
    let report = inspector.introspect("component").await.unwrap();
    let json = serde_json::to_value(report.as_ref()).unwrap();

    assert_eq!(json["template"], "component");
    assert_eq!(json["required_variables"][0], "language");
    assert_eq!(json["optional_variables"][0]["name"], "template_id");
    assert_eq!(json["variables"]["variables"]["template_id"]["provenance"], "root");
    assert_eq!(json["blocks"]["blocks"]["body"]["defined_in"], "root");
    assert_eq!(json["metadata"]["version"], "1.2.0");
    assert_eq!(json["metadata"]["rules"]["R1"]["enforcement"], "STRICT");
    assert_eq!(json["metadata"]["rules"]["R2"]["pattern"], "@layer:");
    assert!(json["chain"][0]["content_id"].as_str().unwrap().starts_with("sha256:"));
}
