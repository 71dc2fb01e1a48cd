//! Configuration resolution tests
//!
//! Uses serial_test: tests that touch LIVITH_* / ADMIN_PASSWORD environment
//! variables run sequentially.

use livith_common::config::{
    default_data_dir, CliOverrides, DashConfig, TomlConfig, DATABASE_FILE, DRAFT_FILE,
};
use livith_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn clear_env() {
    for name in [
        "LIVITH_DATA_DIR",
        "LIVITH_DATABASE",
        "LIVITH_BIND",
        "ADMIN_PASSWORD",
        "LIVITH_LOG",
    ] {
        env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_defaults_without_any_source() {
    clear_env();

    let config = DashConfig::from_sources(&CliOverrides::default(), &TomlConfig::default()).unwrap();

    assert_eq!(config.data_dir, default_data_dir());
    assert_eq!(config.database_path, default_data_dir().join(DATABASE_FILE));
    assert_eq!(config.draft_path, default_data_dir().join(DRAFT_FILE));
    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:5730");
    assert_eq!(config.admin_password, None);
    assert_eq!(config.log_level, "info");
}

#[test]
#[serial]
fn test_cli_beats_env_beats_toml() {
    clear_env();

    let toml_config = TomlConfig {
        data_dir: Some(PathBuf::from("/toml/data")),
        bind: Some("0.0.0.0:9000".to_string()),
        admin_password: Some("from-toml".to_string()),
        ..Default::default()
    };

    env::set_var("LIVITH_DATA_DIR", "/env/data");
    env::set_var("LIVITH_BIND", "0.0.0.0:8000");
    env::set_var("ADMIN_PASSWORD", "from-env");

    let cli = CliOverrides {
        bind: Some("127.0.0.1:7000".to_string()),
        ..Default::default()
    };
    let config = DashConfig::from_sources(&cli, &toml_config).unwrap();

    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:7000");
    assert_eq!(config.data_dir, PathBuf::from("/env/data"));
    assert_eq!(config.database_path, PathBuf::from("/env/data").join(DATABASE_FILE));
    assert_eq!(config.admin_password.as_deref(), Some("from-env"));

    clear_env();
    let config = DashConfig::from_sources(&CliOverrides::default(), &toml_config).unwrap();
    assert_eq!(config.data_dir, PathBuf::from("/toml/data"));
    assert_eq!(config.bind_addr.to_string(), "0.0.0.0:9000");
    assert_eq!(config.admin_password.as_deref(), Some("from-toml"));
}

#[test]
#[serial]
fn test_explicit_database_path_is_independent_of_data_dir() {
    clear_env();

    let cli = CliOverrides {
        data_dir: Some(PathBuf::from("/srv/livith")),
        database: Some(PathBuf::from("/var/db/livith.db")),
        ..Default::default()
    };
    let config = DashConfig::from_sources(&cli, &TomlConfig::default()).unwrap();

    assert_eq!(config.database_path, PathBuf::from("/var/db/livith.db"));
    assert_eq!(config.draft_path, PathBuf::from("/srv/livith").join(DRAFT_FILE));
}

#[test]
#[serial]
fn test_empty_password_counts_as_unset() {
    clear_env();
    env::set_var("ADMIN_PASSWORD", "");

    let config = DashConfig::from_sources(&CliOverrides::default(), &TomlConfig::default()).unwrap();
    assert_eq!(config.admin_password, None);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_bind_address_rejected() {
    clear_env();

    let cli = CliOverrides {
        bind: Some("not-an-address".to_string()),
        ..Default::default()
    };
    let result = DashConfig::from_sources(&cli, &TomlConfig::default());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_explicit_config_file_loaded() {
    clear_env();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "data_dir = \"/from/file\"\nadmin_password = \"secret\"\nlog_level = \"debug\""
    )
    .unwrap();

    let cli = CliOverrides {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = DashConfig::resolve(&cli).unwrap();

    assert_eq!(config.data_dir, PathBuf::from("/from/file"));
    assert_eq!(config.admin_password.as_deref(), Some("secret"));
    assert_eq!(config.log_level, "debug");
}

#[test]
#[serial]
fn test_missing_explicit_config_file_is_error() {
    clear_env();

    let cli = CliOverrides {
        config: Some(PathBuf::from("/nonexistent/livith/config.toml")),
        ..Default::default()
    };
    assert!(matches!(DashConfig::resolve(&cli), Err(Error::Config(_))));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "bind = [unterminated").unwrap();

    assert!(matches!(TomlConfig::load(file.path()), Err(Error::Config(_))));
}

#[test]
fn test_unknown_keys_ignored() {
    let config: TomlConfig = toml::from_str("bind = \"127.0.0.1:1\"\nextra = 5").unwrap();
    assert_eq!(config.bind.as_deref(), Some("127.0.0.1:1"));
}
