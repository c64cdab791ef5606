use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpq::installments::{
    InstallmentPolicy, DEFAULT_MAX_INSTALLMENTS, DEFAULT_MIN_INSTALLMENT,
};

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["toldo.toml", "config/toldo.toml"];
pub const MAX_INSTALLMENTS_LIMIT: u32 = 48;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub quoting: QuotingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotingConfig {
    pub currency: String,
    pub min_installment: Decimal,
    pub max_installments: u32,
    /// Prefix for deterministic identifiers. Random UUIDs are used when unset.
    pub id_prefix: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub currency: Option<String>,
    pub min_installment: Option<Decimal>,
    pub max_installments: Option<u32>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quoting: QuotingConfig {
                currency: "BRL".to_string(),
                min_installment: DEFAULT_MIN_INSTALLMENT,
                max_installments: DEFAULT_MAX_INSTALLMENTS,
                id_prefix: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl QuotingConfig {
    pub fn installment_policy(&self) -> Result<InstallmentPolicy, ConfigError> {
        InstallmentPolicy::new(self.min_installment, self.max_installments)
            .map_err(|error| ConfigError::Validation(error.to_string()))
    }
}

impl AppConfig {
    /// Precedence: defaults, then the TOML file, then `TOLDO_*` variables, then `overrides`.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(quoting) = patch.quoting {
            if let Some(currency) = quoting.currency {
                self.quoting.currency = currency;
            }
            if let Some(min_installment) = quoting.min_installment {
                self.quoting.min_installment = min_installment;
            }
            if let Some(max_installments) = quoting.max_installments {
                self.quoting.max_installments = max_installments;
            }
            if let Some(id_prefix) = quoting.id_prefix {
                self.quoting.id_prefix = Some(id_prefix);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TOLDO_QUOTING_CURRENCY") {
            self.quoting.currency = value;
        }
        if let Some(value) = read_env("TOLDO_QUOTING_MIN_INSTALLMENT") {
            self.quoting.min_installment = parse_env("TOLDO_QUOTING_MIN_INSTALLMENT", &value)?;
        }
        if let Some(value) = read_env("TOLDO_QUOTING_MAX_INSTALLMENTS") {
            self.quoting.max_installments = parse_env("TOLDO_QUOTING_MAX_INSTALLMENTS", &value)?;
        }
        if let Some(value) = read_env("TOLDO_QUOTING_ID_PREFIX") {
            self.quoting.id_prefix = Some(value);
        }

        let log_level = read_env("TOLDO_LOGGING_LEVEL").or_else(|| read_env("TOLDO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("TOLDO_LOGGING_FORMAT").or_else(|| read_env("TOLDO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(currency) = overrides.currency {
            self.quoting.currency = currency;
        }
        if let Some(min_installment) = overrides.min_installment {
            self.quoting.min_installment = min_installment;
        }
        if let Some(max_installments) = overrides.max_installments {
            self.quoting.max_installments = max_installments;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_quoting(&self.quoting)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The file `load` would read: `explicit_path` when it exists, otherwise the first existing
/// default candidate.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${VAR}` with the variable's value. Unset variables are an error.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let key = &after[..end];

        let value = env::var(key)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

fn validate_quoting(quoting: &QuotingConfig) -> Result<(), ConfigError> {
    let currency = quoting.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(ConfigError::Validation(format!(
            "quoting.currency must be a 3-letter code, got `{}`",
            quoting.currency
        )));
    }

    if quoting.min_installment <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "quoting.min_installment must be greater than zero".to_string(),
        ));
    }

    if quoting.max_installments == 0 || quoting.max_installments > MAX_INSTALLMENTS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "quoting.max_installments must be in range 1..={MAX_INSTALLMENTS_LIMIT}"
        )));
    }

    if quoting.id_prefix.as_deref().is_some_and(|prefix| prefix.trim().is_empty()) {
        return Err(ConfigError::Validation("quoting.id_prefix must not be blank".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    quoting: Option<QuotingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotingPatch {
    currency: Option<String>,
    min_installment: Option<Decimal>,
    max_installments: Option<u32>,
    id_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_the_store_policy() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.quoting.currency == "BRL", "default currency should be BRL")?;
        ensure(config.quoting.min_installment == Decimal::new(300, 0), "default minimum is 300")?;
        ensure(config.quoting.max_installments == 10, "default maximum is 10")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )?;
        let policy =
            config.quoting.installment_policy().map_err(|err| format!("policy failed: {err}"))?;
        ensure(policy.suggest(Decimal::new(1000, 0)).count == 3, "1000 splits into 3")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_TOLDO_CURRENCY", "USD");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("toldo.toml");
            fs::write(
                &path,
                r#"
[quoting]
currency = "${TEST_TOLDO_CURRENCY}"
min_installment = "250.50"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.quoting.currency == "USD", "currency should come from environment")?;
            ensure(
                config.quoting.min_installment == Decimal::new(25_050, 2),
                "minimum installment should be read from the file",
            )
        })();

        clear_vars(&["TEST_TOLDO_CURRENCY"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TEST_TOLDO_UNSET"]);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("toldo.toml");
        fs::write(&path, "[quoting]\ncurrency = \"${TEST_TOLDO_UNSET}\"\n")
            .map_err(|err| err.to_string())?;

        let error =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .err()
                .ok_or_else(|| "expected interpolation failure".to_string())?;
        ensure(
            matches!(
                error,
                ConfigError::MissingEnvInterpolation { ref var } if var == "TEST_TOLDO_UNSET"
            ),
            "error should name the missing variable",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TOLDO_LOG_LEVEL", "warn");
        env::set_var("TOLDO_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["TOLDO_LOG_LEVEL", "TOLDO_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TOLDO_QUOTING_MAX_INSTALLMENTS", "12");
        env::set_var("TOLDO_QUOTING_CURRENCY", "EUR");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("toldo.toml");
            fs::write(
                &path,
                r#"
[quoting]
currency = "USD"
max_installments = 6
id_prefix = "loja"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    currency: Some("ARS".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.quoting.currency == "ARS", "override currency should win")?;
            ensure(config.quoting.max_installments == 12, "env should win over the file")?;
            ensure(config.quoting.id_prefix.as_deref() == Some("loja"), "file value kept")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["TOLDO_QUOTING_MAX_INSTALLMENTS", "TOLDO_QUOTING_CURRENCY"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TOLDO_QUOTING_MAX_INSTALLMENTS", "60");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("quoting.max_installments")
            );
            ensure(has_message, "validation failure should mention quoting.max_installments")
        })();

        clear_vars(&["TOLDO_QUOTING_MAX_INSTALLMENTS"]);
        result
    }

    #[test]
    fn malformed_numeric_env_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TOLDO_QUOTING_MIN_INSTALLMENT", "trezentos");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars(&["TOLDO_QUOTING_MIN_INSTALLMENT"]);

        ensure(
            matches!(result, Err(ConfigError::InvalidEnvOverride { ref key, .. })
                if key == "TOLDO_QUOTING_MIN_INSTALLMENT"),
            "bad minimum installment should be an env override error",
        )
    }

    #[test]
    fn non_iso_currency_is_rejected() {
        let mut config = AppConfig::default();
        config.quoting.currency = "R$".to_string();

        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
