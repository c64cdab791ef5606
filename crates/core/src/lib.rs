pub mod config;
pub mod cpq;
pub mod domain;
pub mod errors;
pub mod ids;
pub mod search;

pub use cpq::{
    Catalog, CollectionKey, InstallmentPolicy, InstallmentSuggestion, QuoteSession, Selections,
};
pub use domain::customer::{Customer, CustomerId};
pub use domain::item::{ItemId, LineItem, LineItemDraft};
pub use domain::product::{PricingUnit, Product, ProductId};
pub use domain::quote::{Quote, QuoteId, QuoteStatus};
pub use domain::sheet::{Sheet, SheetId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ids::{IdAllocator, SequentialIdAllocator, UuidIdAllocator};
pub use search::{normalize, Searchable};
