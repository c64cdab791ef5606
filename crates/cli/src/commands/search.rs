use std::path::Path;

use serde::Serialize;
use toldo_core::search::filter;
use toldo_core::{Catalog, Customer, Product};
use tracing::debug;

use crate::commands::{read_json, CommandResult};

#[derive(Debug, Serialize)]
struct SearchOutput<'a> {
    needle: &'a str,
    products: Vec<&'a Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    customers: Option<Vec<&'a Customer>>,
}

/// Filters the catalog (and optionally a customer list) by an accent-insensitive needle.
pub fn run(catalog_path: &Path, customers_path: Option<&Path>, needle: &str) -> CommandResult {
    let catalog: Catalog = match read_json(catalog_path, "catalog") {
        Ok(catalog) => catalog,
        Err(error) => {
            return CommandResult::failure("search", "input_parse", format!("{error:#}"), 2);
        }
    };

    let customers: Option<Vec<Customer>> = match customers_path {
        Some(path) => match read_json(path, "customer list") {
            Ok(customers) => Some(customers),
            Err(error) => {
                return CommandResult::failure("search", "input_parse", format!("{error:#}"), 2);
            }
        },
        None => None,
    };

    let output = SearchOutput {
        needle,
        products: catalog.search(needle),
        customers: customers.as_deref().map(|customers| filter(customers, needle)),
    };

    debug!(
        event_name = "cli.search.completed",
        product_matches = output.products.len(),
        customer_matches = output.customers.as_ref().map_or(0, Vec::len),
        "search completed"
    );

    let message = format!(
        "{} product(s){} matching `{needle}`",
        output.products.len(),
        output
            .customers
            .as_ref()
            .map(|customers| format!(" and {} customer(s)", customers.len()))
            .unwrap_or_default()
    );
    CommandResult::success_with("search", message, output)
}
