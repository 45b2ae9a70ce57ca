use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use scaffold_cli::test_utils::TemplateSetFixture;

/// Temp project with the layered fixture under `templates/`.
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    TemplateSetFixture::layered().write_to(&dir.path().join("templates")).unwrap();
    dir
}

fn scaffold(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("scaffold").unwrap();
    cmd.current_dir(dir.path()).env_remove("SCAFFOLD_CONFIG").env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_introspect_text() {
    let dir = project();
    scaffold(&dir)
        .args(["introspect", "component"])
        .assert()
        .success()
        .stdout(predicate::str::contains("root -> code -> python -> component"))
        .stdout(predicate::str::contains("module_name"))
        .stdout(predicate::str::contains("default: python-component"));
}

#[test]
fn test_introspect_json() {
    let dir = project();
    let output = scaffold(&dir).args(["introspect", "component", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["template"], "component");
    assert_eq!(json["required_variables"], serde_json::json!(["language", "module_name", "class_name", "fields"]));
}

#[test]
fn test_validate_exit_codes() {
    let dir = project();
    std::fs::write(dir.path().join("bad.py"), "class Foo: pass\n").unwrap();
    std::fs::write(dir.path().join("soft.py"), "# SCAFFOLD: template=python-component version=1.2.0\n").unwrap();

    scaffold(&dir)
        .args(["validate", "component", "--content", "bad.py"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("R1"))
        .stdout(predicate::str::contains("blocking failure"));

    scaffold(&dir)
        .args(["validate", "component", "--content", "soft.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 non-blocking failure"));

    scaffold(&dir).args(["validate", "component"]).assert().success();
}

#[test]
fn test_validate_reads_stdin() {
    let dir = project();
    scaffold(&dir)
        .args(["validate", "component", "--content", "-", "--format", "json"])
        .write_stdin("nothing useful")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""blocking": true"#));
}

#[test]
fn test_chain_and_list() {
    let dir = project();
    scaffold(&dir)
        .args(["chain", "component"])
        .assert()
        .success()
        .stdout(predicate::str::contains("root"))
        .stdout(predicate::str::contains("sha256:"));

    scaffold(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("component.j2"))
        .stdout(predicate::str::contains("python.j2"));
}

#[test]
fn test_list_check() {
    let dir = TempDir::new().unwrap();
    TemplateSetFixture::layered()
        .with("broken", "{% extends \"ghost\" %}")
        .write_to(&dir.path().join("templates"))
        .unwrap();

    scaffold(&dir)
        .args(["list", "--check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("component.j2 ok (4 tiers)"))
        .stdout(predicate::str::contains("broken.j2 error"));
}

#[test]
fn test_missing_template_fails() {
    let dir = project();
    scaffold(&dir)
        .args(["introspect", "nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope"))
        .stderr(predicate::str::contains("scaffold list"));
}

#[test]
fn test_templates_dir_and_config() {
    let dir = TempDir::new().unwrap();
    TemplateSetFixture::dead_footer().write_to(&dir.path().join("tpl")).unwrap();

    scaffold(&dir)
        .args(["--templates-dir", "tpl", "introspect", "leaf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("footer"));

    std::fs::write(dir.path().join("scaffold.toml"), "[templates]\ndir = \"tpl\"\n").unwrap();
    scaffold(&dir).args(["introspect", "leaf"]).assert().success();

    std::fs::write(dir.path().join("custom.toml"), "[resolution]\nmax_depth = 0\n").unwrap();
    scaffold(&dir)
        .args(["--config", "custom.toml", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max_depth"));
}
