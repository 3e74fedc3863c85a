//! Challenge context and placeholder mapping.
//!
//! A recipe never stores user data; its step values carry `{{token}}`
//! placeholders that are resolved against an [`AutomationContext`] built
//! once per challenge from the ticket store. Resolution is total: a token
//! with no value is an error before anything reaches the browser.
//!
//! The inverse direction lives here too: the learner maps a discovered form
//! field onto a placeholder by matching its label/name/placeholder text
//! against an ordered pattern table, first match wins.

mod context;
mod infer;
mod resolve;

pub use context::{AutomationContext, TicketStore};
pub use infer::infer_placeholder;
pub use resolve::resolve_placeholders;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or applying a context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A step value referenced a token the context cannot supply.
    #[error("Unresolved placeholder `{{{{{0}}}}}`")]
    UnresolvedPlaceholder(String),

    /// The ticket store had no record for the requested ticket.
    #[error("Ticket not found: {0}")]
    TicketNotFound(String),
}

/// Canonical field a form input can map to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    PcnNumber,
    VehicleRegistration,
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    AddressLine1,
    City,
    Postcode,
    Reason,
    Narrative,
}

impl Placeholder {
    /// Token as it appears inside step values: `{{pcn_number}}`.
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::PcnNumber => "pcn_number",
            Placeholder::VehicleRegistration => "vehicle_registration",
            Placeholder::FirstName => "first_name",
            Placeholder::LastName => "last_name",
            Placeholder::FullName => "full_name",
            Placeholder::Email => "email",
            Placeholder::Phone => "phone",
            Placeholder::AddressLine1 => "address_line1",
            Placeholder::City => "city",
            Placeholder::Postcode => "postcode",
            Placeholder::Reason => "reason",
            Placeholder::Narrative => "narrative",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "pcn_number" => Placeholder::PcnNumber,
            "vehicle_registration" => Placeholder::VehicleRegistration,
            "first_name" => Placeholder::FirstName,
            "last_name" => Placeholder::LastName,
            "full_name" => Placeholder::FullName,
            "email" => Placeholder::Email,
            "phone" => Placeholder::Phone,
            "address_line1" => Placeholder::AddressLine1,
            "city" => Placeholder::City,
            "postcode" => Placeholder::Postcode,
            "reason" => Placeholder::Reason,
            "narrative" => Placeholder::Narrative,
            _ => return None,
        })
    }

    /// Templated value for a step that fills this placeholder.
    pub fn templated(&self) -> String {
        format!("{{{{{}}}}}", self.token())
    }
}
