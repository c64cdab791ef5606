use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::cpq::catalog::Catalog;
use crate::cpq::grouping::{self, ItemGroup};
use crate::cpq::installments::{InstallmentPolicy, InstallmentSuggestion};
use crate::cpq::pricing::{self, DeterministicPricingEngine, PricingEngine};
use crate::cpq::selection::{CollectionKey, Selections};
use crate::domain::item::{ItemId, LineItem, LineItemDraft};
use crate::domain::product::ProductId;
use crate::domain::quote::{Quote, QuoteStatus};
use crate::domain::sheet::Sheet;
use crate::errors::DomainError;
use crate::ids::IdAllocator;

pub const DEFAULT_CURRENCY: &str = "BRL";

/// One open sheet together with its history and selections.
///
/// A session is single-owner state. Callers that edit one sheet from several places serialize
/// access themselves.
pub struct QuoteSession<P = DeterministicPricingEngine> {
    catalog: Catalog,
    sheet: Sheet,
    history: Vec<Sheet>,
    selections: Selections,
    policy: InstallmentPolicy,
    currency: String,
    ids: Arc<dyn IdAllocator>,
    pricing_engine: P,
}

impl QuoteSession<DeterministicPricingEngine> {
    pub fn new(catalog: Catalog, sheet: Sheet, ids: Arc<dyn IdAllocator>) -> Self {
        Self {
            catalog,
            sheet,
            history: Vec::new(),
            selections: Selections::new(),
            policy: InstallmentPolicy::default(),
            currency: DEFAULT_CURRENCY.to_string(),
            ids,
            pricing_engine: DeterministicPricingEngine,
        }
    }

    /// Opens an empty sheet with a freshly allocated identifier.
    pub fn start(catalog: Catalog, label: impl Into<String>, ids: Arc<dyn IdAllocator>) -> Self {
        let sheet = Sheet::new(ids.next_sheet_id(), label);
        Self::new(catalog, sheet, ids)
    }
}

impl<P> QuoteSession<P>
where
    P: PricingEngine,
{
    pub fn with_pricing_engine<Q: PricingEngine>(self, pricing_engine: Q) -> QuoteSession<Q> {
        QuoteSession {
            catalog: self.catalog,
            sheet: self.sheet,
            history: self.history,
            selections: self.selections,
            policy: self.policy,
            currency: self.currency,
            ids: self.ids,
            pricing_engine,
        }
    }

    pub fn with_history(mut self, history: Vec<Sheet>) -> Self {
        self.history = history;
        self
    }

    pub fn with_selections(mut self, selections: Selections) -> Self {
        self.selections = selections;
        self
    }

    pub fn with_policy(mut self, policy: InstallmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn history(&self) -> &[Sheet] {
        &self.history
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn policy(&self) -> InstallmentPolicy {
        self.policy
    }

    /// Validates the draft, appends it to the current sheet and selects it.
    pub fn add_item(&mut self, draft: LineItemDraft) -> Result<ItemId, DomainError> {
        let id = self.ids.next_item_id();
        let item = draft.into_item(id.clone(), &self.catalog)?;
        self.sheet.push(item)?;
        self.selections.select(&CollectionKey::Current, id.clone());

        debug!(
            event_name = "cpq.session.item_added",
            sheet_id = %self.sheet.id,
            item_id = %id,
            "line item added and selected"
        );
        Ok(id)
    }

    pub fn update_dimensions(
        &mut self,
        item_id: &ItemId,
        width: Decimal,
        height: Decimal,
        quantity: Decimal,
    ) -> Result<(), DomainError> {
        self.sheet.item_mut(item_id)?.set_dimensions(width, height, quantity)
    }

    /// Switches an item's product. Returns `true` when the item lost its parent as a result.
    pub fn change_product(
        &mut self,
        item_id: &ItemId,
        product_id: Option<ProductId>,
    ) -> Result<bool, DomainError> {
        let product = match &product_id {
            Some(product_id) => Some(
                self.catalog
                    .find(product_id)
                    .ok_or_else(|| DomainError::UnknownProduct(product_id.clone()))?,
            ),
            None => None,
        };

        let item = self.sheet.item_mut(item_id)?;
        let ungrouped = grouping::on_product_change(item, product);
        if ungrouped {
            debug!(
                event_name = "cpq.session.grouping_cleared",
                item_id = %item_id,
                "product change dropped accessory grouping"
            );
        }
        Ok(ungrouped)
    }

    /// Removes an item from the current sheet. Its accessories stay, now ungrouped.
    pub fn remove_item(&mut self, item_id: &ItemId) -> Result<LineItem, DomainError> {
        let removed = self.sheet.remove(item_id)?;
        self.selections.forget_item(&CollectionKey::Current, item_id);

        debug!(
            event_name = "cpq.session.item_removed",
            sheet_id = %self.sheet.id,
            item_id = %item_id,
            orphaned_accessories = grouping::children_of(&self.sheet.items, item_id).len(),
            "line item removed"
        );
        Ok(removed)
    }

    pub fn attach(&mut self, child: &ItemId, parent: &ItemId) -> Result<(), DomainError> {
        grouping::attach(&mut self.sheet.items, &self.catalog, child, parent)
    }

    pub fn detach(&mut self, child: &ItemId) -> Result<(), DomainError> {
        grouping::detach(&mut self.sheet.items, child)
    }

    pub fn children_of(&self, parent: &ItemId) -> Vec<&LineItem> {
        grouping::children_of(&self.sheet.items, parent)
    }

    pub fn groups(&self) -> Vec<ItemGroup<'_>> {
        grouping::groups(&self.sheet.items)
    }

    /// Flips an item's selection. The item must exist in the named collection.
    pub fn toggle(&mut self, key: &CollectionKey, item_id: &ItemId) -> Result<bool, DomainError> {
        let known = match key {
            CollectionKey::Current => self.sheet.contains(item_id),
            CollectionKey::Historical(sheet_id) => self
                .history
                .iter()
                .find(|sheet| &sheet.id == sheet_id)
                .is_some_and(|sheet| sheet.contains(item_id)),
        };
        if !known {
            return Err(DomainError::UnknownItem(item_id.clone()));
        }

        Ok(self.selections.toggle(key, item_id.clone()))
    }

    pub fn selected_count(&self) -> usize {
        self.selections.total_selected_count()
    }

    /// True while at least one selected id still resolves to an item in its sheet.
    pub fn can_generate_quote(&self) -> bool {
        self.selections.resolved_count(&self.sheet, &self.history) > 0
    }

    /// Total of every item on the current sheet, selected or not.
    pub fn running_total(&self) -> Result<Decimal, DomainError> {
        pricing::aggregate_total(&self.sheet.items, &self.catalog)
    }

    /// Total of what the next quote would contain.
    pub fn selection_total(&self) -> Result<Decimal, DomainError> {
        let current = pricing::aggregate_total(
            &self.selections.selected_current(&self.sheet),
            &self.catalog,
        )?;
        let historical = self
            .selections
            .historical_selected(&self.history)
            .map(|item| pricing::price_line(item, &self.catalog).map(|line| line.total))
            .sum::<Result<Decimal, DomainError>>()?;
        Ok(current + historical)
    }

    pub fn suggest_installments(&self, total: Decimal) -> InstallmentSuggestion {
        self.policy.suggest(total)
    }

    /// Materializes the selection into a draft quote. Selections are left as they are.
    pub fn generate_quote(&self) -> Result<Quote, DomainError> {
        let items = self
            .selections
            .materialize(&self.sheet, &self.history, self.ids.as_ref())
            .map_err(|error| {
                self.log_rejected("generate_quote", &error);
                error
            })?;
        let pricing = self.pricing_engine.price(&items, &self.catalog, &self.currency)?;
        let installments = self.policy.suggest(pricing.total);

        let quote = Quote {
            id: self.ids.next_quote_id(),
            status: QuoteStatus::Draft,
            source_sheet_id: self.sheet.id.clone(),
            customer_id: self.sheet.customer_id.clone(),
            items,
            pricing,
            installments,
            created_at: Utc::now(),
        };

        info!(
            event_name = "cpq.session.quote_generated",
            quote_id = %quote.id,
            sheet_id = %quote.source_sheet_id,
            item_count = quote.items.len(),
            total = %quote.pricing.total,
            installments = quote.installments.count,
            "quote generated from selection"
        );
        Ok(quote)
    }

    /// Saves the current sheet into history and opens a fresh one for the same customer.
    ///
    /// The saved sheet holds every current item followed by clones of the selected historical
    /// items. All selections are cleared afterwards.
    pub fn save_sheet(&mut self) -> Result<Sheet, DomainError> {
        let mut saved = self.sheet.clone();
        saved.items.extend(self.selections.import_historical(&self.history, self.ids.as_ref()));
        if saved.is_empty() {
            let error = DomainError::EmptySelection;
            self.log_rejected("save_sheet", &error);
            return Err(error);
        }
        saved.created_at = Utc::now();

        let mut next = Sheet::new(self.ids.next_sheet_id(), self.sheet.label.clone());
        next.customer_id = self.sheet.customer_id.clone();
        self.sheet = next;
        self.history.push(saved.clone());
        self.selections.clear();

        info!(
            event_name = "cpq.session.sheet_saved",
            sheet_id = %saved.id,
            item_count = saved.len(),
            next_sheet_id = %self.sheet.id,
            "measurement sheet saved"
        );
        Ok(saved)
    }

    fn log_rejected(&self, action: &'static str, error: &DomainError) {
        warn!(
            event_name = "cpq.session.action_rejected",
            action,
            sheet_id = %self.sheet.id,
            error = %error,
            "session action rejected"
        );
    }
}
