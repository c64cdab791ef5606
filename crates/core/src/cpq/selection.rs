//! Which items go into the next generated quote.
//!
//! One identifier set is kept for the current sheet and one per historical sheet. Items from
//! the current sheet keep their identifiers when materialized; items imported from a
//! historical sheet are cloned under fresh identifiers with their grouping dropped, since the
//! parent they pointed at may not be part of the same batch.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::item::{ItemId, LineItem};
use crate::domain::sheet::{Sheet, SheetId};
use crate::errors::DomainError;
use crate::ids::IdAllocator;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "sheet_id", rename_all = "snake_case")]
pub enum CollectionKey {
    Current,
    Historical(SheetId),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    #[serde(default)]
    current: BTreeSet<ItemId>,
    #[serde(default)]
    historical: BTreeMap<SheetId, BTreeSet<ItemId>>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership and returns whether the item is selected afterwards.
    pub fn toggle(&mut self, key: &CollectionKey, item_id: ItemId) -> bool {
        if self.deselect(key, &item_id) {
            return false;
        }
        self.select(key, item_id);
        true
    }

    pub fn select(&mut self, key: &CollectionKey, item_id: ItemId) {
        self.set_mut(key).insert(item_id);
    }

    pub fn deselect(&mut self, key: &CollectionKey, item_id: &ItemId) -> bool {
        self.forget_item(key, item_id)
    }

    /// Drops one id from a collection. A historical set left empty is removed with it.
    pub fn forget_item(&mut self, key: &CollectionKey, item_id: &ItemId) -> bool {
        match key {
            CollectionKey::Current => self.current.remove(item_id),
            CollectionKey::Historical(sheet_id) => {
                let Some(set) = self.historical.get_mut(sheet_id) else {
                    return false;
                };
                let removed = set.remove(item_id);
                if set.is_empty() {
                    self.historical.remove(sheet_id);
                }
                removed
            }
        }
    }

    pub fn is_selected(&self, key: &CollectionKey, item_id: &ItemId) -> bool {
        self.set(key).is_some_and(|set| set.contains(item_id))
    }

    pub fn selected_in(&self, key: &CollectionKey) -> usize {
        self.set(key).map_or(0, BTreeSet::len)
    }

    /// Sum of every set's size. Quote generation is only offered while this is non-zero.
    pub fn total_selected_count(&self) -> usize {
        self.current.len() + self.historical.values().map(BTreeSet::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.total_selected_count() == 0
    }

    /// Selected ids that still name an item in their sheet.
    pub fn resolved_count(&self, current: &Sheet, historical: &[Sheet]) -> usize {
        self.selected_current(current).len() + self.historical_selected(historical).count()
    }

    pub fn clear(&mut self) {
        self.current.clear();
        self.historical.clear();
    }

    /// Builds the quote-ready item list: selected current items first, then selected items of
    /// each historical sheet in the order `historical` lists them. Within a collection the
    /// sheet's own order is kept. Selected ids missing from their sheet are skipped.
    pub fn materialize(
        &self,
        current: &Sheet,
        historical: &[Sheet],
        ids: &dyn IdAllocator,
    ) -> Result<Vec<LineItem>, DomainError> {
        if self.resolved_count(current, historical) == 0 {
            return Err(DomainError::EmptySelection);
        }

        let mut items = self.selected_current(current);
        let current_count = items.len();
        items.extend(self.import_historical(historical, ids));

        debug!(
            event_name = "cpq.selection.materialized",
            sheet_id = %current.id,
            current_items = current_count,
            historical_items = items.len() - current_count,
            "selection materialized"
        );
        Ok(items)
    }

    /// Defensive copies of the selected current items, identifiers unchanged.
    pub fn selected_current(&self, current: &Sheet) -> Vec<LineItem> {
        current.items.iter().filter(|item| self.current.contains(&item.id)).cloned().collect()
    }

    /// Clones of the selected historical items under fresh identifiers, ungrouped.
    pub fn import_historical(&self, historical: &[Sheet], ids: &dyn IdAllocator) -> Vec<LineItem> {
        self.historical_selected(historical)
            .map(|item| LineItem { id: ids.next_item_id(), parent_item_id: None, ..item.clone() })
            .collect()
    }

    /// The selected historical items as they sit in their sheets, in materialization order.
    pub fn historical_selected<'a>(
        &'a self,
        historical: &'a [Sheet],
    ) -> impl Iterator<Item = &'a LineItem> + 'a {
        historical
            .iter()
            .filter_map(|sheet| self.historical.get(&sheet.id).map(|selected| (sheet, selected)))
            .flat_map(|(sheet, selected)| {
                sheet.items.iter().filter(move |item| selected.contains(&item.id))
            })
    }

    fn set(&self, key: &CollectionKey) -> Option<&BTreeSet<ItemId>> {
        match key {
            CollectionKey::Current => Some(&self.current),
            CollectionKey::Historical(sheet_id) => self.historical.get(sheet_id),
        }
    }

    fn set_mut(&mut self, key: &CollectionKey) -> &mut BTreeSet<ItemId> {
        match key {
            CollectionKey::Current => &mut self.current,
            CollectionKey::Historical(sheet_id) => {
                self.historical.entry(sheet_id.clone()).or_default()
            }
        }
    }
}
