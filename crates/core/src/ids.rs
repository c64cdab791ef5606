//! Identifier allocation for line items, sheets and quotes.
//!
//! Every place that mints an identifier goes through an [`IdAllocator`] so sessions can run
//! against a deterministic allocator in tests.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

use crate::domain::{item::ItemId, quote::QuoteId, sheet::SheetId};

pub trait IdAllocator: Send + Sync {
    fn next_item_id(&self) -> ItemId;
    fn next_sheet_id(&self) -> SheetId;
    fn next_quote_id(&self) -> QuoteId;
}

#[derive(Clone, Debug, Default)]
pub struct UuidIdAllocator;

impl IdAllocator for UuidIdAllocator {
    fn next_item_id(&self) -> ItemId {
        ItemId(Uuid::new_v4().to_string())
    }

    fn next_sheet_id(&self) -> SheetId {
        SheetId(Uuid::new_v4().to_string())
    }

    fn next_quote_id(&self) -> QuoteId {
        QuoteId(Uuid::new_v4().to_string())
    }
}

/// Hands out `{prefix}-item-1`, `{prefix}-item-2`, ... from one shared counter.
#[derive(Debug)]
pub struct SequentialIdAllocator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdAllocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), next: AtomicU64::new(1) }
    }

    fn allocate(&self, kind: &str) -> String {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{kind}-{value}", self.prefix)
    }
}

impl Default for SequentialIdAllocator {
    fn default() -> Self {
        Self::new("seq")
    }
}

impl IdAllocator for SequentialIdAllocator {
    fn next_item_id(&self) -> ItemId {
        ItemId(self.allocate("item"))
    }

    fn next_sheet_id(&self) -> SheetId {
        SheetId(self.allocate("sheet"))
    }

    fn next_quote_id(&self) -> QuoteId {
        QuoteId(self.allocate("quote"))
    }
}
