use super::*;

#[test]
fn test_cli_parsing() {
    assert!(Cli::try_parse_from(["scaffold", "--help"]).is_err());
    assert!(Cli::try_parse_from(["scaffold", "list"]).is_ok());
    assert!(Cli::try_parse_from(["scaffold", "introspect"]).is_err());
}

#[test]
fn test_global_flags() {
    let cli = Cli::try_parse_from([
        "scaffold",
        "introspect",
        "python/component",
        "--verbose",
        "--format",
        "json",
        "--templates-dir",
        "tpl",
        "--config",
        "custom.toml",
    ])
    .unwrap();

    assert!(cli.verbose);
    assert_eq!(cli.format, OutputFormat::Json);
    assert_eq!(cli.templates_dir, Some(PathBuf::from("tpl")));
    assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    assert_eq!(cli.log_level(), Some("debug"));
    assert!(matches!(cli.command, Commands::Introspect(cmd) if cmd.template == "python/component"));
}

#[test]
fn test_quiet_and_verbose_conflict() {
    assert!(Cli::try_parse_from(["scaffold", "-v", "-q", "list"]).is_err());

    let cli = Cli::try_parse_from(["scaffold", "-q", "list"]).unwrap();
    assert_eq!(cli.log_level(), Some("error"));

    let cli = Cli::try_parse_from(["scaffold", "list"]).unwrap();
    assert_eq!(cli.log_level(), None);
    assert_eq!(cli.format, OutputFormat::Text);
}

#[test]
fn test_validate_content_argument() {
    let cli = Cli::try_parse_from(["scaffold", "validate", "leaf", "--content", "out.py"]).unwrap();
    match cli.command {
        Commands::Validate(cmd) => {
            assert_eq!(cmd.template, "leaf");
            assert_eq!(cmd.content, Some(PathBuf::from("out.py")));
        }
        _ => panic!("expected validate"),
    }
}

#[test]
fn test_list_check_flag() {
    let cli = Cli::try_parse_from(["scaffold", "list", "--check"]).unwrap();
    assert!(matches!(cli.command, Commands::List(cmd) if cmd.check));
}

#[test]
fn test_exit_codes() {
    assert_eq!(CommandOutcome::Success.exit_code(), 0);
    assert_eq!(CommandOutcome::Blocked.exit_code(), 1);
    assert_ne!(ERROR_EXIT_CODE, 1);
}
