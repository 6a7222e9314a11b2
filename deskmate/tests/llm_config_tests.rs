use serial_test::serial;
use std::env;

use deskmate::config::{parse_llm_provider_model, Config, KNOWN_LLM_PROVIDERS};
use deskmate::error::ErrorKind;

const MANAGED_VARS: &[&str] = &[
    "TELEGRAM_BOT_TOKEN",
    "LLM_API_KEY",
    "GEMINI_API_KEY",
    "EMBEDDING_API_KEY",
    "LLM_MODEL",
    "LLM_BASE_URL",
    "EMBEDDING_MODEL",
    "EMBEDDING_DIMENSIONS",
    "RAG_RESULTS",
    "LLM_MAX_RETRIES",
    "EMBEDDING_MAX_RETRIES",
];

fn clear_env() {
    for var in MANAGED_VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_llm_config_gemini() {
    let (provider, model) = parse_llm_provider_model("gemini/gemini-1.5-flash");
    assert_eq!(provider, "gemini");
    assert_eq!(model, "gemini-1.5-flash");
}

#[test]
fn test_llm_config_openrouter_keeps_nested_model() {
    let (provider, model) = parse_llm_provider_model("openrouter/anthropic/claude-3.5-sonnet");
    assert_eq!(provider, "openrouter");
    assert_eq!(model, "anthropic/claude-3.5-sonnet");
}

#[test]
fn test_llm_config_unknown_prefix_defaults_to_local() {
    let (provider, model) = parse_llm_provider_model("unknown/model-name");
    assert_eq!(provider, "local");
    assert_eq!(model, "unknown/model-name");
}

#[test]
fn test_known_llm_providers_constant() {
    assert!(KNOWN_LLM_PROVIDERS.contains(&"gemini"));
    assert!(KNOWN_LLM_PROVIDERS.contains(&"openai"));
    assert!(KNOWN_LLM_PROVIDERS.contains(&"ollama"));
    assert_eq!(KNOWN_LLM_PROVIDERS.len(), 5);
}

#[test]
#[serial]
fn test_default_model_is_gemini() {
    clear_env();

    let config = Config::from_env();
    assert_eq!(config.llm.model, "gemini/gemini-1.5-flash");
    assert_eq!(config.llm.base_url, None);
    assert_eq!(config.telegram.api_url, "https://api.telegram.org");
}

#[test]
#[serial]
fn test_transport_retries_are_off_by_default() {
    clear_env();

    let config = Config::from_env();
    assert_eq!(config.llm.max_retries, 0);
    assert_eq!(config.embeddings.max_retries, 0);
}

#[test]
#[serial]
fn test_bot_validation_reports_missing_token_as_configuration() {
    clear_env();
    env::set_var("GEMINI_API_KEY", "g-key");

    let err = Config::from_env().validate_for_bot().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));

    clear_env();
}

#[test]
#[serial]
fn test_ingest_does_not_need_bot_token() {
    clear_env();
    env::set_var("LLM_API_KEY", "key");

    let config = Config::from_env();
    assert!(config.validate_for_ingest().is_ok());
    assert!(config.validate_for_bot().is_err());

    clear_env();
}

#[test]
#[serial]
fn test_zero_results_rejected() {
    clear_env();
    env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");
    env::set_var("LLM_API_KEY", "key");
    env::set_var("RAG_RESULTS", "0");

    assert!(Config::from_env().validate_for_bot().is_err());

    clear_env();
}

#[test]
#[serial]
fn test_zero_embedding_dimensions_rejected() {
    clear_env();
    env::set_var("LLM_API_KEY", "key");
    env::set_var("EMBEDDING_DIMENSIONS", "0");

    assert!(Config::from_env().validate_for_ingest().is_err());

    clear_env();
}
