//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Note that Config::from_env() also loads
//! from .env file via dotenvy, so these tests focus on override behavior.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use serial_test::serial;
use std::env;

use storymap_server::config::{Config, LogFormat};

#[test]
#[serial]
fn test_config_from_env_defaults() {
    env::remove_var("HTTP_BIND");
    env::remove_var("DATABASE_PATH");
    env::remove_var("DATABASE_MAX_CONNECTIONS");
    env::remove_var("LOG_FORMAT");
    env::remove_var("SERVICE_TOKEN");

    let config = Config::from_env().unwrap();
    assert_eq!(config.http.bind_addr.to_string(), "127.0.0.1:8080");
    assert_eq!(config.database.path.to_str().unwrap(), "./data/storymap.db");
    assert_eq!(config.database.max_connections, 5);
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert!(config.agent.service_token.is_none());
}

#[test]
#[serial]
fn test_config_from_env_custom_bind() {
    env::set_var("HTTP_BIND", "0.0.0.0:9999");

    let config = Config::from_env().unwrap();
    assert_eq!(config.http.bind_addr.to_string(), "0.0.0.0:9999");

    env::remove_var("HTTP_BIND");
}

#[test]
#[serial]
fn test_config_from_env_invalid_bind_is_error() {
    env::set_var("HTTP_BIND", "not-an-address");

    let result = Config::from_env();
    assert!(result.is_err());

    env::remove_var("HTTP_BIND");
}

#[test]
#[serial]
fn test_config_from_env_custom_database() {
    env::set_var("DATABASE_PATH", "/custom/path.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "10");

    let config = Config::from_env().unwrap();
    assert_eq!(config.database.path.to_str().unwrap(), "/custom/path.db");
    assert_eq!(config.database.max_connections, 10);

    env::remove_var("DATABASE_PATH");
    env::remove_var("DATABASE_MAX_CONNECTIONS");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    env::set_var("LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    env::remove_var("LOG_FORMAT");
}

#[test]
#[serial]
fn test_config_from_env_blank_service_token_is_none() {
    env::set_var("SERVICE_TOKEN", "");

    let config = Config::from_env().unwrap();
    assert!(config.agent.service_token.is_none());

    env::set_var("SERVICE_TOKEN", "session-token");
    let config = Config::from_env().unwrap();
    assert_eq!(config.agent.service_token.as_deref(), Some("session-token"));

    env::remove_var("SERVICE_TOKEN");
}
