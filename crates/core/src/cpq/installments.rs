use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const DEFAULT_MIN_INSTALLMENT: Decimal = Decimal::from_parts(300, 0, 0, false, 0);
pub const DEFAULT_MAX_INSTALLMENTS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentSuggestion {
    pub count: u32,
    pub per_installment: Decimal,
}

/// Validated pair of installment limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InstallmentPolicy {
    min_installment: Decimal,
    max_installments: u32,
}

impl InstallmentPolicy {
    pub fn new(min_installment: Decimal, max_installments: u32) -> Result<Self, DomainError> {
        if min_installment <= Decimal::ZERO {
            return Err(DomainError::InvariantViolation(format!(
                "minimum installment must be positive, got {min_installment}"
            )));
        }
        if max_installments == 0 {
            return Err(DomainError::InvariantViolation(
                "maximum installments must be at least 1".to_string(),
            ));
        }
        Ok(Self { min_installment, max_installments })
    }

    pub fn min_installment(&self) -> Decimal {
        self.min_installment
    }

    pub fn max_installments(&self) -> u32 {
        self.max_installments
    }

    pub fn suggest(&self, total: Decimal) -> InstallmentSuggestion {
        suggest(total, self.min_installment, self.max_installments)
    }
}

impl Default for InstallmentPolicy {
    fn default() -> Self {
        Self {
            min_installment: DEFAULT_MIN_INSTALLMENT,
            max_installments: DEFAULT_MAX_INSTALLMENTS,
        }
    }
}

/// `count = clamp(floor(total / min_installment), 1, max_installments)`,
/// `per_installment = total / count`.
///
/// A non-positive total is a single installment of `total`. A non-positive minimum places no
/// floor on the installment value, so the full `max_installments` is offered; a maximum of zero
/// is read as one.
pub fn suggest(
    total: Decimal,
    min_installment: Decimal,
    max_installments: u32,
) -> InstallmentSuggestion {
    let max_installments = max_installments.max(1);
    if total <= Decimal::ZERO {
        return InstallmentSuggestion { count: 1, per_installment: total };
    }

    let count = if min_installment <= Decimal::ZERO {
        max_installments
    } else {
        total
            .checked_div(min_installment)
            .and_then(|ratio| ratio.floor().to_u32())
            .unwrap_or(max_installments)
            .clamp(1, max_installments)
    };

    InstallmentSuggestion { count, per_installment: total / Decimal::from(count) }
}
