use mcp_manager::config::{Paths, Settings, validate_command, validate_server_name, validate_timeout};
use mcp_manager::error::{Error, Result};

#[test]
fn test_parse_settings() -> Result<()> {
    let settings_str = r#"{
        "shutdown_timeout": 30,
        "startup_wait_ms": 250,
        "log_tail_lines": 100,
        "log_backups": 2
    }"#;

    let settings = Settings::parse_from_str(settings_str)?;

    assert_eq!(settings.shutdown_timeout, 30);
    assert_eq!(settings.startup_wait().as_millis(), 250);
    assert_eq!(settings.log_tail_lines, 100);
    assert_eq!(settings.log_backups, 2);

    Ok(())
}

#[test]
fn test_settings_file_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::new(dir.path());

    assert_eq!(Settings::from_file(paths.settings_file())?, Settings::default());

    std::fs::write(paths.settings_file(), r#"{"log_backups": 9}"#).unwrap();
    let settings = Settings::from_file(paths.settings_file())?;
    assert_eq!(settings.log_backups, 9);
    assert_eq!(settings.shutdown_timeout, 10);

    Ok(())
}

#[test]
fn test_invalid_settings() {
    let result = Settings::parse_from_str(r#"{"shutdown_timeout": 301}"#);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let result = Settings::parse_from_str(r#"{"log_backups": 0}"#);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    let result = Settings::parse_from_str("shutdown_timeout = 3");
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_paths_layout() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::resolve(Some(dir.path().join("mcp")))?;

    paths.ensure_dirs()?;

    assert!(paths.logs_dir().is_dir());
    assert_eq!(paths.servers_file(), dir.path().join("mcp/servers.json"));
    assert_eq!(paths.log_file("fetch"), dir.path().join("mcp/logs/fetch.log"));

    Ok(())
}

#[test]
fn test_validate_names() -> Result<()> {
    assert_eq!(validate_server_name("  echo-test ")?, "echo-test");
    assert_eq!(validate_server_name("server_1.v2")?, "server_1.v2");

    for bad in ["", "   ", "a/b", "a\\b", "c:d", "x*", "q?", "\"q\"", "<a>", "a|b", "..", "a\nb"] {
        assert!(
            matches!(validate_server_name(bad), Err(Error::InvalidArgument(_))),
            "{:?} should be rejected",
            bad
        );
    }

    Ok(())
}

#[test]
fn test_validate_command_and_timeout() -> Result<()> {
    assert_eq!(validate_command(" echo hi ")?, "echo hi");
    assert!(validate_command("  ").is_err());

    assert_eq!(validate_timeout(1)?, 1);
    assert_eq!(validate_timeout(300)?, 300);
    assert!(validate_timeout(0).is_err());
    assert!(validate_timeout(301).is_err());

    Ok(())
}
