//! The flat resolved-value record built once per challenge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use challenger_core_types::TicketId;

use crate::{ContextError, Placeholder};

/// Everything a recipe may need to fill a challenge form, resolved to
/// literals before execution starts. Read-only to every step.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AutomationContext {
    pub pcn_number: String,
    pub vehicle_registration: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address_line1: String,
    pub city: String,
    pub postcode: String,
    /// Short appeal ground, e.g. "The parking charge was paid in full".
    pub reason: String,
    /// Generated long-form representation text.
    pub narrative: String,
}

impl AutomationContext {
    /// Obviously-synthetic values for verification dry runs, which fill a
    /// portal's form but never submit it.
    pub fn verification_sample() -> Self {
        Self {
            pcn_number: "VERIFY000000".into(),
            vehicle_registration: "XX99XXX".into(),
            first_name: "Recipe".into(),
            last_name: "Verifier".into(),
            email: "verifier@invalid.example".into(),
            phone: "01000000000".into(),
            address_line1: "1 Verification Road".into(),
            city: "Testtown".into(),
            postcode: "ZZ1 1ZZ".into(),
            reason: "Automated recipe verification".into(),
            narrative: "Automated recipe verification; this form is never submitted.".into(),
        }
    }

    /// Value for a placeholder. `None` when the context has nothing for it;
    /// empty strings count as missing so resolution stays total.
    pub fn value_of(&self, placeholder: Placeholder) -> Option<String> {
        let value = match placeholder {
            Placeholder::PcnNumber => self.pcn_number.clone(),
            Placeholder::VehicleRegistration => self.vehicle_registration.clone(),
            Placeholder::FirstName => self.first_name.clone(),
            Placeholder::LastName => self.last_name.clone(),
            Placeholder::FullName => {
                let full = format!("{} {}", self.first_name, self.last_name);
                let full = full.trim().to_string();
                full
            }
            Placeholder::Email => self.email.clone(),
            Placeholder::Phone => self.phone.clone(),
            Placeholder::AddressLine1 => self.address_line1.clone(),
            Placeholder::City => self.city.clone(),
            Placeholder::Postcode => self.postcode.clone(),
            Placeholder::Reason => self.reason.clone(),
            Placeholder::Narrative => self.narrative.clone(),
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Read-only collaborator supplying ticket, registrant and narrative data.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn automation_context(&self, ticket: &TicketId) -> Result<AutomationContext, ContextError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_is_derived() {
        let ctx = AutomationContext {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            ..Default::default()
        };
        assert_eq!(ctx.value_of(Placeholder::FullName).unwrap(), "Ada Lovelace");
    }

    #[test]
    fn empty_values_count_as_missing() {
        let ctx = AutomationContext::default();
        assert_eq!(ctx.value_of(Placeholder::PcnNumber), None);
        assert_eq!(ctx.value_of(Placeholder::FullName), None);
    }
}
