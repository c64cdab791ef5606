use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cpq::installments::InstallmentSuggestion;
use crate::cpq::pricing::PricingResult;
use crate::domain::customer::CustomerId;
use crate::domain::item::LineItem;
use crate::domain::sheet::SheetId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Approved,
    Rejected,
    Expired,
    Cancelled,
    Revised,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Revised => "revised",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            "revised" => Ok(Self::Revised),
            other => Err(DomainError::UnknownQuoteStatus(other.to_owned())),
        }
    }
}

/// A generated quote. `items` is a snapshot; it shares nothing with the sheet it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub status: QuoteStatus,
    pub source_sheet_id: SheetId,
    pub customer_id: Option<CustomerId>,
    pub items: Vec<LineItem>,
    pub pricing: PricingResult,
    pub installments: InstallmentSuggestion,
    pub created_at: DateTime<Utc>,
}

impl Quote {
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (&self.status, next),
            (QuoteStatus::Draft, QuoteStatus::Sent)
                | (QuoteStatus::Sent, QuoteStatus::Approved)
                | (QuoteStatus::Sent, QuoteStatus::Rejected)
                | (QuoteStatus::Sent, QuoteStatus::Expired)
                | (QuoteStatus::Rejected, QuoteStatus::Revised)
                | (QuoteStatus::Expired, QuoteStatus::Revised)
                | (QuoteStatus::Revised, QuoteStatus::Draft)
                | (QuoteStatus::Draft, QuoteStatus::Cancelled)
                | (QuoteStatus::Sent, QuoteStatus::Cancelled)
                | (QuoteStatus::Revised, QuoteStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next.clone()) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidQuoteTransition { from: self.status.clone(), to: next })
    }
}
