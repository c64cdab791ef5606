pub mod config;
pub mod installments;
pub mod quote;
pub mod search;
pub mod transition;

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use toldo_core::InterfaceError;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::success_with_data(command, message, Some(data)),
            Err(error) => Self::failure(command, "serialization", error.to_string(), 4),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Reports a mapped core failure with the user-safe text first and the detail after it.
    pub fn from_interface(command: &str, error: InterfaceError) -> Self {
        let (error_class, exit_code) = match &error {
            InterfaceError::BadRequest { .. } => ("bad_request", 2),
            InterfaceError::NothingSelected { .. } => ("empty_selection", 3),
            InterfaceError::Internal { .. } => ("internal", 4),
        };
        let message = format!(
            "{} ({error}; correlation_id={})",
            error.user_message(),
            error.correlation_id()
        );
        Self::failure(command, error_class, message, exit_code)
    }

    fn success_with_data(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read {what} `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse {what} `{}`", path.display()))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
