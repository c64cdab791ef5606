use rust_decimal::Decimal;
use serde::Serialize;
use toldo_core::config::{AppConfig, ConfigOverrides, LoadOptions};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct InstallmentOutput {
    total: Decimal,
    min_installment: Decimal,
    max_installments: u32,
    count: u32,
    per_installment: Decimal,
}

/// Suggests a split for `total`. Flags override the configured limits and are validated the
/// same way.
pub fn run(
    total: Decimal,
    min_installment: Option<Decimal>,
    max_installments: Option<u32>,
) -> CommandResult {
    let options = LoadOptions {
        overrides: ConfigOverrides { min_installment, max_installments, ..Default::default() },
        ..LoadOptions::default()
    };
    let policy = match AppConfig::load(options)
        .and_then(|config| config.quoting.installment_policy())
    {
        Ok(policy) => policy,
        Err(error) => {
            return CommandResult::failure(
                "installments",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let suggestion = policy.suggest(total);
    let message = format!("{}x {}", suggestion.count, suggestion.per_installment.round_dp(2));
    CommandResult::success_with(
        "installments",
        message,
        InstallmentOutput {
            total,
            min_installment: policy.min_installment(),
            max_installments: policy.max_installments(),
            count: suggestion.count,
            per_installment: suggestion.per_installment,
        },
    )
}
