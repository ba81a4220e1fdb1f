use std::io::Write;

use plaint_core::config::AppConfig;
use plaint_core::error::PlaintError;

fn write_config(toml_content: &str) -> tempfile::NamedTempFile {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");
    tmp
}

#[test]
fn test_load_full_config_from_file() {
    let tmp = write_config(
        r#"
[model]
provider = "openai"
model_id = "gpt-4o-mini"
api_key = "sk-test-key"
base_url = "http://localhost:11434/v1"
max_tokens = 800
temperature = 0.2

[model.retry]
max_retries = 5
initial_backoff_ms = 200

[[fallback_models]]
model_id = "gpt-3.5-turbo"

[flow]
quality_threshold = 3
rejection_pacing_ms = 0
max_steps = 8
default_categories = ["transport", "housing"]

[gateway]
bind = "0.0.0.0:9999"
allowed_origins = ["http://localhost:3000", "https://complain.sg"]

[store]
path = "/tmp/plaint-test/complaints.db"
"#,
    );

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.model.model_id, "gpt-4o-mini");
    assert_eq!(config.model.api_key, Some("sk-test-key".to_string()));
    assert_eq!(config.model.max_tokens, 800);
    let retry = config.model.retry.expect("retry present");
    assert_eq!(retry.max_retries, 5);
    assert_eq!(retry.initial_backoff_ms, 200);
    assert_eq!(retry.max_backoff_ms, 30000);

    assert_eq!(config.fallback_models.len(), 1);
    assert_eq!(config.fallback_models[0].provider, "openai");

    assert_eq!(config.flow.quality_threshold, 3);
    assert_eq!(config.flow.rejection_pacing_ms, 0);
    assert_eq!(config.flow.max_steps, 8);
    assert_eq!(config.flow.default_categories, vec!["transport", "housing"]);

    assert_eq!(config.gateway.bind, "0.0.0.0:9999");
    assert_eq!(config.gateway.allowed_origins.len(), 2);
    assert_eq!(config.store.path, "/tmp/plaint-test/complaints.db");
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("PLAINT_TEST_API_KEY", "expanded-key-value");

    let tmp = write_config(
        r#"
[model]
model_id = "test-model"
api_key = "${PLAINT_TEST_API_KEY}"
"#,
    );

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.model.api_key, Some("expanded-key-value".to_string()));

    std::env::remove_var("PLAINT_TEST_API_KEY");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let tmp = write_config(
        r#"
[model]
model_id = "llama3.2"
"#,
    );

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.model.provider, "openai");
    assert!(config.model.retry.is_none());
    assert!(config.fallback_models.is_empty());
    assert_eq!(config.flow.quality_threshold, 2);
    assert_eq!(config.flow.rejection_pacing_ms, 100);
    assert_eq!(config.flow.max_steps, 64);
    assert_eq!(config.flow.default_categories.len(), 8);
    assert_eq!(config.gateway.bind, "127.0.0.1:8000");
    assert!(config.gateway.allowed_origins.is_empty());
    assert_eq!(config.store.path, "plaint.db");
}

#[test]
fn test_missing_file_is_config_not_found() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let err = AppConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, PlaintError::ConfigNotFound(_)));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let tmp = write_config("[model\nmodel_id = 1");
    let err = AppConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, PlaintError::Config(_)));
}

#[test]
fn test_load_or_env_without_file_uses_environment() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = AppConfig::load_or_env(&dir.path().join("plaint.toml")).expect("env config");
    assert_eq!(config.model.provider, "openai");
    assert_eq!(config.flow.quality_threshold, 2);
}
