use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{item::ItemId, product::ProductId, quote::QuoteStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
    Quantity,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Quantity => "quantity",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupingViolation {
    SelfReference,
    UnknownParent,
    Cycle,
    NotAccessory,
}

impl fmt::Display for GroupingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::SelfReference => "an item cannot be its own parent",
            Self::UnknownParent => "parent is not part of the same collection",
            Self::Cycle => "attachment would create a cycle",
            Self::NotAccessory => "only accessory products can be attached to a parent",
        };
        f.write_str(reason)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {field} `{value}`: must not be negative")]
    InvalidDimension { field: Dimension, value: Decimal },
    #[error("invalid grouping of `{child}` under `{parent}`: {violation}")]
    InvalidGrouping { child: ItemId, parent: ItemId, violation: GroupingViolation },
    #[error("no items are selected for the quote")]
    EmptySelection,
    #[error("unknown product `{0}`")]
    UnknownProduct(ProductId),
    #[error("unknown line item `{0}`")]
    UnknownItem(ItemId),
    #[error("unknown quote status `{0}`")]
    UnknownQuoteStatus(String),
    #[error("invalid quote transition from {from} to {to}")]
    InvalidQuoteTransition { from: QuoteStatus, to: QuoteStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("nothing selected: {message}")]
    NothingSelected { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NothingSelected { .. } => {
                "Select at least one item before generating a quote."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NothingSelected { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NothingSelected { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::EmptySelection) => Self::NothingSelected {
                message: DomainError::EmptySelection.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
