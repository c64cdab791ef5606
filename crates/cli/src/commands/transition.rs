use std::path::Path;

use toldo_core::{ApplicationError, Quote, QuoteStatus};
use tracing::info;

use crate::commands::{read_json, CommandResult};

/// Moves a previously generated quote to `to` and prints the updated quote.
pub fn run(input: &Path, to: &str) -> CommandResult {
    let mut quote: Quote = match read_json(input, "quote") {
        Ok(quote) => quote,
        Err(error) => {
            return CommandResult::failure("transition", "input_parse", format!("{error:#}"), 2);
        }
    };
    let correlation_id = format!("quote:{}", quote.id);
    let from = quote.status.clone();

    let moved = to.parse::<QuoteStatus>().and_then(|next| quote.transition_to(next));
    if let Err(error) = moved {
        let error = ApplicationError::from(error).into_interface(correlation_id);
        return CommandResult::from_interface("transition", error);
    }

    info!(
        event_name = "cli.transition.applied",
        quote_id = %quote.id,
        from = %from,
        to = %quote.status,
        "quote status changed"
    );
    let message = format!("quote {}: {from} -> {}", quote.id, quote.status);
    CommandResult::success_with("transition", message, &quote)
}
