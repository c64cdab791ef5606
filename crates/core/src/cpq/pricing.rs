use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::catalog::Catalog;
use crate::domain::item::{ItemId, LineItem};
use crate::domain::product::{PricingUnit, Product, ProductId};
use crate::errors::DomainError;

/// Read-only projection of one line item used to compute its subtotal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub item_id: ItemId,
    pub product_id: Option<ProductId>,
    pub pricing_unit: Option<PricingUnit>,
    pub unit_price: Decimal,
    pub quantity: Decimal,
    pub area: Option<Decimal>,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub currency: String,
    pub steps: Vec<PricingTraceStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub trace: PricingTrace,
}

pub trait PricingEngine: Send + Sync {
    fn price(
        &self,
        items: &[LineItem],
        catalog: &Catalog,
        currency: &str,
    ) -> Result<PricingResult, DomainError>;
}

#[derive(Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price(
        &self,
        items: &[LineItem],
        catalog: &Catalog,
        currency: &str,
    ) -> Result<PricingResult, DomainError> {
        price_items_with_trace(items, catalog, currency)
    }
}

/// `PER_AREA`: `unit_price * width * height * quantity`. `PER_UNIT`: `unit_price * quantity`.
pub fn line_total(item: &LineItem, product: &Product) -> Result<Decimal, DomainError> {
    item.validate_dimensions()?;

    let total = match product.pricing_unit {
        PricingUnit::PerArea => product.unit_price * item.width * item.height * item.quantity,
        PricingUnit::PerUnit => product.unit_price * item.quantity,
    };
    Ok(total)
}

/// Prices one item against the catalog. An item without a product is a pending entry and
/// contributes zero.
pub fn price_line(item: &LineItem, catalog: &Catalog) -> Result<PricedLine, DomainError> {
    let Some(product_id) = &item.product_id else {
        item.validate_dimensions()?;
        return Ok(PricedLine {
            item_id: item.id.clone(),
            product_id: None,
            pricing_unit: None,
            unit_price: Decimal::ZERO,
            quantity: item.quantity,
            area: None,
            total: Decimal::ZERO,
        });
    };

    let product =
        catalog.find(product_id).ok_or_else(|| DomainError::UnknownProduct(product_id.clone()))?;
    let total = line_total(item, product)?;

    Ok(PricedLine {
        item_id: item.id.clone(),
        product_id: Some(product.id.clone()),
        pricing_unit: Some(product.pricing_unit),
        unit_price: product.unit_price,
        quantity: item.quantity,
        area: product.is_area_priced().then(|| item.area()),
        total,
    })
}

pub fn aggregate_total(items: &[LineItem], catalog: &Catalog) -> Result<Decimal, DomainError> {
    items.iter().map(|item| price_line(item, catalog).map(|line| line.total)).sum()
}

pub fn price_items_with_trace(
    items: &[LineItem],
    catalog: &Catalog,
    currency: &str,
) -> Result<PricingResult, DomainError> {
    let lines =
        items.iter().map(|item| price_line(item, catalog)).collect::<Result<Vec<_>, _>>()?;
    let subtotal = lines.iter().map(|line| line.total).sum::<Decimal>();

    let mut steps = lines
        .iter()
        .map(|line| PricingTraceStep {
            stage: format!("line:{}", line.item_id),
            detail: describe_line(line),
            amount: line.total,
        })
        .collect::<Vec<_>>();
    steps.push(PricingTraceStep {
        stage: "subtotal".to_string(),
        detail: "sum(line totals)".to_string(),
        amount: subtotal,
    });

    Ok(PricingResult {
        lines,
        subtotal,
        total: subtotal,
        trace: PricingTrace { currency: currency.to_string(), steps },
    })
}

fn describe_line(line: &PricedLine) -> String {
    match (line.pricing_unit, line.area) {
        (Some(PricingUnit::PerArea), Some(area)) => {
            format!("PER_AREA {} x {} m2 x {}", line.unit_price, area, line.quantity)
        }
        (Some(unit), _) => format!("{} {} x {}", unit.as_str(), line.unit_price, line.quantity),
        (None, _) => "no product selected".to_string(),
    }
}
