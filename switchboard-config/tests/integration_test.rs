//! Integration tests for switchboard-config

use std::env;
use std::io::Write;
use switchboard_config::*;

#[test]
fn test_env_values_are_coerced() {
    let manager = ConfigManager::with_prefix("SWBTEST_COERCE");

    unsafe {
        env::set_var("SWBTEST_COERCE_AUTO_CREATE", "true");
        env::set_var("SWBTEST_COERCE_DELIMITER", ".");
    }

    manager.load_env().unwrap();
    let settings = manager.settings().unwrap();
    assert!(settings.auto_create);
    assert_eq!(settings.delimiter, '.');

    unsafe {
        env::remove_var("SWBTEST_COERCE_AUTO_CREATE");
        env::remove_var("SWBTEST_COERCE_DELIMITER");
    }
}

#[test]
fn test_env_numeric_flags() {
    let manager = ConfigManager::with_prefix("SWBTEST_NUMERIC");

    unsafe {
        env::set_var("SWBTEST_NUMERIC_AUTO_CREATE", "1");
        env::set_var("SWBTEST_NUMERIC_VERSIONING", "0");
        env::set_var("SWBTEST_NUMERIC_VERSION_LOG", "2024");
    }

    manager.load_env().unwrap();
    let settings = manager.settings().unwrap();
    assert!(settings.auto_create);
    assert!(!settings.versioning);
    assert_eq!(settings.version_log.as_deref(), Some("2024"));

    unsafe {
        env::remove_var("SWBTEST_NUMERIC_AUTO_CREATE");
        env::remove_var("SWBTEST_NUMERIC_VERSIONING");
        env::remove_var("SWBTEST_NUMERIC_VERSION_LOG");
    }
}

#[test]
fn test_env_loader_with_prefix() {
    let loader = EnvLoader::new(Some("SWBTEST_LOADER".to_string()));

    unsafe {
        env::set_var("SWBTEST_LOADER_VERSION_LOG", "versions.jsonl");
    }

    assert_eq!(
        loader.load_var("version_log").as_deref(),
        Some("versions.jsonl")
    );

    unsafe {
        env::remove_var("SWBTEST_LOADER_VERSION_LOG");
    }
}

#[test]
fn test_toml_file_then_env_override() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "auto_create = false").unwrap();
    writeln!(file, "version_log = \"versions.jsonl\"").unwrap();

    let manager = ConfigManager::with_prefix("SWBTEST_LAYER");
    manager.load_file_auto(file.path()).unwrap();

    unsafe {
        env::set_var("SWBTEST_LAYER_AUTO_CREATE", "yes");
    }
    manager.load_env().unwrap();

    let settings = manager.settings().unwrap();
    assert!(settings.auto_create);
    assert_eq!(settings.version_log.as_deref(), Some("versions.jsonl"));

    unsafe {
        env::remove_var("SWBTEST_LAYER_AUTO_CREATE");
    }
}

#[test]
fn test_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"register_builtins": false, "versioning": false}}"#).unwrap();

    let manager = ConfigManager::new();
    manager.load_file(file.path(), FileFormat::Json).unwrap();

    let settings = manager.settings().unwrap();
    assert!(!settings.register_builtins);
    assert!(!settings.versioning);
}

#[test]
fn test_missing_file() {
    let manager = ConfigManager::new();
    let result = manager.load_file("/nonexistent/switchboard.toml", FileFormat::Toml);

    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::ValidationError("delimiter".to_string());
    let display = format!("{}", err);
    assert!(display.contains("delimiter"));
}
