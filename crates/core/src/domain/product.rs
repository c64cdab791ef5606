use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a product's unit price turns into a line total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingUnit {
    /// `unit_price * quantity`
    PerUnit,
    /// `unit_price * width * height * quantity`
    PerArea,
}

impl PricingUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerUnit => "PER_UNIT",
            Self::PerArea => "PER_AREA",
        }
    }
}

/// Catalog reference data. Loaded by the embedding layer and never mutated here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub unit_price: Decimal,
    pub pricing_unit: PricingUnit,
    /// Accessory products attach to a parent line item instead of standing alone.
    #[serde(default)]
    pub accessory: bool,
}

impl Product {
    pub fn is_area_priced(&self) -> bool {
        self.pricing_unit == PricingUnit::PerArea
    }
}
