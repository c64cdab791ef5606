use std::env;
use std::fs;
use std::path::Path;

use serde::Serialize;
use toldo_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries = vec![
        ConfigEntry {
            key: "quoting.currency",
            value: config.quoting.currency.clone(),
            source: source("quoting.currency", &["TOLDO_QUOTING_CURRENCY"]),
        },
        ConfigEntry {
            key: "quoting.min_installment",
            value: config.quoting.min_installment.to_string(),
            source: source("quoting.min_installment", &["TOLDO_QUOTING_MIN_INSTALLMENT"]),
        },
        ConfigEntry {
            key: "quoting.max_installments",
            value: config.quoting.max_installments.to_string(),
            source: source("quoting.max_installments", &["TOLDO_QUOTING_MAX_INSTALLMENTS"]),
        },
        ConfigEntry {
            key: "quoting.id_prefix",
            value: config.quoting.id_prefix.clone().unwrap_or_else(|| "<uuid>".to_string()),
            source: source("quoting.id_prefix", &["TOLDO_QUOTING_ID_PREFIX"]),
        },
        ConfigEntry {
            key: "logging.level",
            value: config.logging.level.clone(),
            source: source("logging.level", &["TOLDO_LOGGING_LEVEL", "TOLDO_LOG_LEVEL"]),
        },
        ConfigEntry {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            source: source("logging.format", &["TOLDO_LOGGING_FORMAT", "TOLDO_LOG_FORMAT"]),
        },
    ];

    CommandResult::success_with(
        "config",
        "effective config (source precedence: env > file > default)",
        entries,
    )
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let from_env = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = from_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
