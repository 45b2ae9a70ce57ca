use scaffold_cli::inspector::{Inspector, OptionalVariable};
use scaffold_cli::metadata::EnforcementLevel;
use scaffold_cli::test_utils::{TemplateSetFixture, init_test_logging};
use scaffold_cli::validation::{RuleStatus, Severity};

#[tokio::test]
async fn test_layered_chain_introspection() {
    init_test_logging(None);
    let inspector = Inspector::new(TemplateSetFixture::layered().to_source());

    let report = inspector.introspect("component").await.unwrap();

    let names: Vec<_> = report.chain.iter().map(|e| e.template.as_str()).collect();
    assert_eq!(names, vec!["root", "code", "python", "component"]);
    assert_eq!(report.chain[0].extends, None);
    assert_eq!(report.chain[3].extends.as_deref(), Some("python"));

    assert_eq!(report.required_variables, vec!["language", "module_name", "class_name", "fields"]);
    assert_eq!(
        report.optional_variables,
        vec![
            OptionalVariable {
                name: "template_id".to_string(),
                default: Some("python-component".to_string()),
            },
            OptionalVariable {
                name: "version".to_string(),
                default: Some("0.0.0".to_string()),
            },
            OptionalVariable {
                name: "docstring".to_string(),
                default: None,
            },
        ]
    );

    // Bare read in root, defaulted in the leaf
    let template_id = report.variables.get("template_id").unwrap();
    assert!(!template_id.required);
    assert_eq!(template_id.provenance, "root");
    assert_eq!(template_id.tiers, vec!["root", "component"]);

    assert!(report.variables.get("shebang").is_none());
    assert!(report.variables.get("field").is_none());
}

#[tokio::test]
async fn test_layered_chain_blocks_and_metadata() {
    let inspector = Inspector::new(TemplateSetFixture::layered().to_source());
    let report = inspector.introspect("component").await.unwrap();

    let body = report.blocks.get("body").unwrap();
    assert_eq!(body.defined_in, "root");
    let overrides: Vec<_> = body.overrides.iter().map(|o| (o.template.as_str(), o.calls_super)).collect();
    assert_eq!(overrides, vec![("python", false), ("component", true)]);
    assert_eq!(body.effective_template(), "component");

    let header = report.blocks.get("header").unwrap();
    assert_eq!(header.effective_template(), "code");
    assert!(report.warnings.is_empty());

    let metadata = &report.metadata;
    assert_eq!(metadata.template_id, "python-component");
    assert_eq!(metadata.version, Some(semver::Version::new(1, 2, 0)));
    assert_eq!(metadata.enforcement, EnforcementLevel::Advisory);
    assert_eq!(metadata.rules.keys().collect::<Vec<_>>(), vec!["R1", "R2"]);
    assert_eq!(metadata.rules.get("R1").unwrap().enforcement, EnforcementLevel::Strict);
    assert_eq!(metadata.rules.get("R2").unwrap().declared_in, "component");

    // code and python declare nothing and inherit STRICT
    let levels: Vec<_> = metadata.tiers.iter().map(|t| (t.template.as_str(), t.enforcement)).collect();
    assert_eq!(
        levels,
        vec![
            ("root", EnforcementLevel::Strict),
            ("code", EnforcementLevel::Strict),
            ("python", EnforcementLevel::Strict),
            ("component", EnforcementLevel::Advisory),
        ]
    );
    assert!(metadata.variables.contains_key("template_id"));
    assert!(metadata.variables.contains_key("class_name"));
}

#[tokio::test]
async fn test_strict_and_advisory_rules() {
    let inspector = Inspector::new(TemplateSetFixture::layered().to_source());

    let report = inspector.validate("component", Some("class Foo:\n    pass\n")).await.unwrap();
    assert_eq!(report.failures().count(), 2);
    assert!(report.blocking);
    let r1 = report.get("R1").unwrap();
    assert_eq!((r1.status, r1.severity), (RuleStatus::Failed, Severity::Blocking));

    let content = "# SCAFFOLD: template=python-component version=1.2.0\nclass Foo:\n    pass\n";
    let report = inspector.validate("component", Some(content)).await.unwrap();
    assert!(!report.blocking);
    let failures: Vec<_> = report.failures().map(|r| r.rule_id.as_str()).collect();
    assert_eq!(failures, vec!["R2"]);
    assert_eq!(report.get("R2").unwrap().severity, Severity::Advisory);

    let content = format!("{content}# @layer: domain\n");
    let report = inspector.validate("component", Some(&content)).await.unwrap();
    assert_eq!(report.failures().count(), 0);
}

#[tokio::test]
async fn test_validation_without_content_skips_content_rules() {
    let inspector = Inspector::new(TemplateSetFixture::layered().to_source());
    let report = inspector.validate("component", None).await.unwrap();

    assert!(report.results.iter().all(|r| r.status == RuleStatus::Skipped));
    assert!(!report.blocking);
}

#[tokio::test]
async fn test_dead_footer_is_a_warning() {
    let inspector = Inspector::new(TemplateSetFixture::dead_footer().to_source());
    let report = inspector.introspect("leaf").await.unwrap();

    assert_eq!(report.warnings.len(), 1);
    let warning = &report.warnings[0];
    assert_eq!((warning.block.as_str(), warning.template.as_str()), ("footer", "leaf"));
    assert_eq!(report.blocks.get("footer").unwrap().defined_in, "leaf");
    assert_eq!(report.required_variables, vec!["title"]);
}
