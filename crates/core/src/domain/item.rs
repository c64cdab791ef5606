use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::catalog::Catalog;
use crate::domain::product::{Product, ProductId};
use crate::errors::{Dimension, DomainError, GroupingViolation};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One measured position on a sheet or one row of a quick quote.
///
/// `parent_item_id` is a lookup key into the owning collection. It is not kept consistent on
/// delete: a parent can disappear and leave the key dangling, which readers treat as
/// "ungrouped".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ItemId,
    pub environment: String,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub width: Decimal,
    #[serde(default)]
    pub height: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    #[serde(default)]
    pub parent_item_id: Option<ItemId>,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

impl LineItem {
    pub fn validate_dimensions(&self) -> Result<(), DomainError> {
        ensure_non_negative(Dimension::Width, self.width)?;
        ensure_non_negative(Dimension::Height, self.height)?;
        ensure_non_negative(Dimension::Quantity, self.quantity)
    }

    pub fn set_dimensions(
        &mut self,
        width: Decimal,
        height: Decimal,
        quantity: Decimal,
    ) -> Result<(), DomainError> {
        ensure_non_negative(Dimension::Width, width)?;
        ensure_non_negative(Dimension::Height, height)?;
        ensure_non_negative(Dimension::Quantity, quantity)?;

        self.width = width;
        self.height = height;
        self.quantity = quantity;
        Ok(())
    }

    pub fn area(&self) -> Decimal {
        self.width * self.height
    }

    pub fn is_grouped(&self) -> bool {
        self.parent_item_id.is_some()
    }
}

pub(crate) fn ensure_non_negative(field: Dimension, value: Decimal) -> Result<(), DomainError> {
    if value < Decimal::ZERO {
        return Err(DomainError::InvalidDimension { field, value });
    }
    Ok(())
}

/// Editable form of a [`LineItem`]. Blank fields are `None` until validated by
/// [`LineItemDraft::into_item`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemDraft {
    pub environment: String,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub width: Option<Decimal>,
    #[serde(default)]
    pub height: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub parent_item_id: Option<ItemId>,
}

impl LineItemDraft {
    pub fn new(environment: impl Into<String>) -> Self {
        Self { environment: environment.into(), ..Self::default() }
    }

    pub fn product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn dimensions(mut self, width: Decimal, height: Decimal) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn parent(mut self, parent_item_id: ItemId) -> Self {
        self.parent_item_id = Some(parent_item_id);
        self
    }

    /// Validates the draft and commits it under `id`.
    ///
    /// Whether the parent exists in the owning collection is checked by the collection, not
    /// here.
    pub fn into_item(self, id: ItemId, catalog: &Catalog) -> Result<LineItem, DomainError> {
        let product = match &self.product_id {
            Some(product_id) => Some(
                catalog
                    .find(product_id)
                    .ok_or_else(|| DomainError::UnknownProduct(product_id.clone()))?,
            ),
            None => None,
        };

        for (field, value) in [
            (Dimension::Width, self.width),
            (Dimension::Height, self.height),
            (Dimension::Quantity, self.quantity),
        ] {
            if let Some(value) = value {
                ensure_non_negative(field, value)?;
            }
        }

        if let Some(parent) = &self.parent_item_id {
            if parent == &id {
                return Err(DomainError::InvalidGrouping {
                    child: id,
                    parent: parent.clone(),
                    violation: GroupingViolation::SelfReference,
                });
            }
            if !product.is_some_and(|product| product.accessory) {
                return Err(DomainError::InvalidGrouping {
                    child: id,
                    parent: parent.clone(),
                    violation: GroupingViolation::NotAccessory,
                });
            }
        }

        let blank_dimension = blank_dimension_for(product);
        Ok(LineItem {
            id,
            environment: self.environment.trim().to_owned(),
            product_id: self.product_id,
            color: self.color.filter(|color| !color.trim().is_empty()),
            width: self.width.unwrap_or(blank_dimension),
            height: self.height.unwrap_or(blank_dimension),
            quantity: self.quantity.unwrap_or(Decimal::ONE),
            parent_item_id: self.parent_item_id,
        })
    }
}

// Area-priced rows wait for real measurements; unit-priced rows display 1 x 1.
fn blank_dimension_for(product: Option<&Product>) -> Decimal {
    match product {
        Some(product) if product.is_area_priced() => Decimal::ZERO,
        _ => Decimal::ONE,
    }
}
