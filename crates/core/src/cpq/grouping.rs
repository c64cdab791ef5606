//! Parent/accessory grouping among the items of one collection.
//!
//! `parent_item_id` is soft: removing a parent leaves its accessories pointing at a key that
//! no longer resolves, and every reader here treats such an item as ungrouped.

use std::collections::HashSet;

use tracing::warn;

use crate::cpq::catalog::Catalog;
use crate::domain::item::{ItemId, LineItem};
use crate::domain::product::Product;
use crate::errors::{DomainError, GroupingViolation};

/// A top-level item and every item that resolves up to it, in collection order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemGroup<'a> {
    pub root: &'a LineItem,
    pub accessories: Vec<&'a LineItem>,
}

pub fn attach(
    items: &mut [LineItem],
    catalog: &Catalog,
    child: &ItemId,
    parent: &ItemId,
) -> Result<(), DomainError> {
    let reject = |violation: GroupingViolation| {
        warn!(
            event_name = "cpq.grouping.attach_rejected",
            child_id = %child,
            parent_id = %parent,
            violation = %violation,
            "line item grouping rejected"
        );
        Err(DomainError::InvalidGrouping {
            child: child.clone(),
            parent: parent.clone(),
            violation,
        })
    };

    if child == parent {
        return reject(GroupingViolation::SelfReference);
    }

    let child_item = find(items, child).ok_or_else(|| DomainError::UnknownItem(child.clone()))?;
    if find(items, parent).is_none() {
        return reject(GroupingViolation::UnknownParent);
    }

    let accessory = child_item
        .product_id
        .as_ref()
        .and_then(|product_id| catalog.find(product_id))
        .is_some_and(|product| product.accessory);
    if !accessory {
        return reject(GroupingViolation::NotAccessory);
    }

    if ancestors(items, parent).any(|ancestor| &ancestor.id == child) {
        return reject(GroupingViolation::Cycle);
    }

    if let Some(item) = items.iter_mut().find(|item| &item.id == child) {
        item.parent_item_id = Some(parent.clone());
    }
    Ok(())
}

pub fn detach(items: &mut [LineItem], child: &ItemId) -> Result<(), DomainError> {
    let item = items
        .iter_mut()
        .find(|item| &item.id == child)
        .ok_or_else(|| DomainError::UnknownItem(child.clone()))?;
    item.parent_item_id = None;
    Ok(())
}

/// Switches the item's product. Returns `true` when the switch dropped its grouping because
/// the new product (or lack of one) is not an accessory.
pub fn on_product_change(item: &mut LineItem, new_product: Option<&Product>) -> bool {
    item.product_id = new_product.map(|product| product.id.clone());

    let still_accessory = new_product.is_some_and(|product| product.accessory);
    if !still_accessory && item.is_grouped() {
        item.parent_item_id = None;
        return true;
    }
    false
}

pub fn children_of<'a>(items: &'a [LineItem], parent: &ItemId) -> Vec<&'a LineItem> {
    items.iter().filter(|item| item.parent_item_id.as_ref() == Some(parent)).collect()
}

/// Resolves an item's parent. A dangling or self-referencing key resolves to `None`.
pub fn parent_of<'a>(items: &'a [LineItem], item: &LineItem) -> Option<&'a LineItem> {
    let parent_id = item.parent_item_id.as_ref()?;
    if parent_id == &item.id {
        return None;
    }
    find(items, parent_id)
}

/// Items with no resolvable parent, in collection order.
pub fn ungrouped(items: &[LineItem]) -> Vec<&LineItem> {
    items.iter().filter(|item| parent_of(items, item).is_none()).collect()
}

/// Display grouping: every item lands under the top-level item its parent chain ends at.
pub fn groups(items: &[LineItem]) -> Vec<ItemGroup<'_>> {
    let mut groups = ungrouped(items)
        .into_iter()
        .map(|root| ItemGroup { root, accessories: Vec::new() })
        .collect::<Vec<_>>();

    for item in items {
        if parent_of(items, item).is_none() {
            continue;
        }
        let root =
            ancestors(items, &item.id).last().filter(|root| parent_of(items, root).is_none());
        match root.and_then(|root| groups.iter_mut().find(|group| group.root.id == root.id)) {
            Some(group) => group.accessories.push(item),
            None => {
                warn!(
                    event_name = "cpq.grouping.unresolved_chain",
                    item_id = %item.id,
                    "parent chain never reaches a top-level item; shown ungrouped"
                );
                groups.push(ItemGroup { root: item, accessories: Vec::new() });
            }
        }
    }

    groups
}

/// Checks grouping that arrived without going through [`attach`], such as a sheet read from a
/// document. Dangling parents stay allowed; everything `attach` would refuse is rejected.
pub fn validate(items: &[LineItem], catalog: &Catalog) -> Result<(), DomainError> {
    for item in items {
        let Some(parent) = &item.parent_item_id else {
            continue;
        };
        let violation = if parent == &item.id {
            Some(GroupingViolation::SelfReference)
        } else if !is_accessory(item, catalog)? {
            Some(GroupingViolation::NotAccessory)
        } else if ancestors(items, parent).any(|ancestor| ancestor.id == item.id) {
            Some(GroupingViolation::Cycle)
        } else {
            None
        };

        if let Some(violation) = violation {
            return Err(DomainError::InvalidGrouping {
                child: item.id.clone(),
                parent: parent.clone(),
                violation,
            });
        }
    }
    Ok(())
}

fn is_accessory(item: &LineItem, catalog: &Catalog) -> Result<bool, DomainError> {
    let Some(product_id) = &item.product_id else {
        return Ok(false);
    };
    catalog
        .find(product_id)
        .map(|product| product.accessory)
        .ok_or_else(|| DomainError::UnknownProduct(product_id.clone()))
}

fn find<'a>(items: &'a [LineItem], id: &ItemId) -> Option<&'a LineItem> {
    items.iter().find(|item| &item.id == id)
}

/// Walks from `start` up the parent chain, yielding `start` first. Stops at a dangling key or
/// at the first repeated item.
fn ancestors<'a>(items: &'a [LineItem], start: &ItemId) -> impl Iterator<Item = &'a LineItem> {
    let mut seen = HashSet::new();
    let mut next = find(items, start);

    std::iter::from_fn(move || {
        let current = next.take()?;
        if !seen.insert(current.id.clone()) {
            return None;
        }
        next = parent_of(items, current);
        Some(current)
    })
}
