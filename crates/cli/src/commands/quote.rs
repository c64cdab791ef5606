use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use toldo_core::config::{AppConfig, LoadOptions};
use toldo_core::cpq::grouping;
use toldo_core::{
    ApplicationError, Catalog, IdAllocator, ItemId, Quote, QuoteSession, Selections,
    SequentialIdAllocator, Sheet, UuidIdAllocator,
};

use crate::commands::{read_json, CommandResult};

/// Everything needed to price one visit: the catalog, the sheet being edited, earlier sheets
/// and the items picked from each.
#[derive(Debug, Deserialize)]
pub struct QuoteDocument {
    pub catalog: Catalog,
    pub sheet: Sheet,
    #[serde(default)]
    pub history: Vec<Sheet>,
    #[serde(default)]
    pub selections: Selections,
}

#[derive(Debug, Serialize)]
struct GroupView<'a> {
    root: &'a ItemId,
    accessories: Vec<&'a ItemId>,
}

#[derive(Debug, Serialize)]
struct QuoteOutput<'a> {
    quote: &'a Quote,
    groups: Vec<GroupView<'a>>,
}

pub fn run(input: &Path) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let policy = match config.quoting.installment_policy() {
        Ok(policy) => policy,
        Err(error) => {
            let error = ApplicationError::Configuration(error.to_string());
            return CommandResult::from_interface("quote", error.into_interface("config"));
        }
    };

    let document: QuoteDocument = match read_json(input, "quote document") {
        Ok(document) => document,
        Err(error) => {
            return CommandResult::failure("quote", "input_parse", format!("{error:#}"), 2);
        }
    };
    let correlation_id = format!("sheet:{}", document.sheet.id);

    let validated = std::iter::once(&document.sheet)
        .chain(&document.history)
        .try_for_each(|sheet| sheet.validate(&document.catalog));
    if let Err(error) = validated {
        let error = ApplicationError::from(error).into_interface(correlation_id);
        return CommandResult::from_interface("quote", error);
    }

    let ids: Arc<dyn IdAllocator> = match &config.quoting.id_prefix {
        Some(prefix) => Arc::new(SequentialIdAllocator::new(prefix.clone())),
        None => Arc::new(UuidIdAllocator),
    };
    let session = QuoteSession::new(document.catalog, document.sheet, ids)
        .with_history(document.history)
        .with_selections(document.selections)
        .with_policy(policy)
        .with_currency(config.quoting.currency.clone());

    let quote = match session.generate_quote() {
        Ok(quote) => quote,
        Err(error) => {
            let error = ApplicationError::from(error).into_interface(correlation_id);
            return CommandResult::from_interface("quote", error);
        }
    };

    let groups = grouping::groups(&quote.items)
        .into_iter()
        .map(|group| GroupView {
            root: &group.root.id,
            accessories: group.accessories.iter().map(|item| &item.id).collect(),
        })
        .collect();

    let message = format!(
        "quote {}: {} item(s), total {} {}, {}x {}",
        quote.id,
        quote.items.len(),
        quote.pricing.trace.currency,
        quote.pricing.total.round_dp(2),
        quote.installments.count,
        quote.installments.per_installment.round_dp(2),
    );
    CommandResult::success_with("quote", message, QuoteOutput { quote: &quote, groups })
}
