pub mod catalog;
pub mod grouping;
pub mod installments;
pub mod pricing;
pub mod selection;
pub mod session;

pub use self::{
    catalog::Catalog,
    grouping::ItemGroup,
    installments::{InstallmentPolicy, InstallmentSuggestion},
    pricing::{DeterministicPricingEngine, PricedLine, PricingEngine, PricingResult},
    selection::{CollectionKey, Selections},
    session::QuoteSession,
};
