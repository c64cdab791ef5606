use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cpq::catalog::Catalog;
use crate::cpq::grouping;
use crate::domain::customer::CustomerId;
use crate::domain::item::{ItemId, LineItem};
use crate::errors::{DomainError, GroupingViolation};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SheetId(pub String);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Measurement sheet: the items captured during one customer visit, in entry order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub id: SheetId,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
}

impl Sheet {
    pub fn new(id: SheetId, label: impl Into<String>) -> Self {
        Self {
            id,
            customer_id: None,
            label: label.into(),
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn item(&self, id: &ItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn item_mut(&mut self, id: &ItemId) -> Result<&mut LineItem, DomainError> {
        self.items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| DomainError::UnknownItem(id.clone()))
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.item(id).is_some()
    }

    /// Appends a validated item. Identifiers stay unique and a parent must already be on the
    /// sheet.
    pub fn push(&mut self, item: LineItem) -> Result<(), DomainError> {
        if self.contains(&item.id) {
            return Err(DomainError::InvariantViolation(format!(
                "line item `{}` already exists on sheet `{}`",
                item.id, self.id
            )));
        }

        if let Some(parent) = &item.parent_item_id {
            if !self.contains(parent) {
                return Err(DomainError::InvalidGrouping {
                    child: item.id.clone(),
                    parent: parent.clone(),
                    violation: GroupingViolation::UnknownParent,
                });
            }
        }

        self.items.push(item);
        Ok(())
    }

    /// Re-checks a sheet built without [`Sheet::push`], for instance one read from a document:
    /// identifiers are unique, every product is in the catalog and grouping passes
    /// [`grouping::validate`].
    pub fn validate(&self, catalog: &Catalog) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(&item.id) {
                return Err(DomainError::InvariantViolation(format!(
                    "line item `{}` appears more than once on sheet `{}`",
                    item.id, self.id
                )));
            }
            if let Some(product_id) = &item.product_id {
                if catalog.find(product_id).is_none() {
                    return Err(DomainError::UnknownProduct(product_id.clone()));
                }
            }
        }
        grouping::validate(&self.items, catalog)
    }

    /// Removes one item. Accessories pointing at it keep their (now dangling) parent key.
    pub fn remove(&mut self, id: &ItemId) -> Result<LineItem, DomainError> {
        let position = self
            .items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| DomainError::UnknownItem(id.clone()))?;
        Ok(self.items.remove(position))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
