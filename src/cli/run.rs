use anyhow::Result;
use async_trait::async_trait;
use clap::Args;

use automation_context::{AutomationContext, ContextError, TicketStore};
use challenger_core_types::{AuthorityId, TicketId};
use issuer_adapters::execute_challenge;

use crate::app::App;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Authority operating the portal.
    pub authority: String,

    /// Ticket id in the ticket store; generated when omitted.
    #[arg(long)]
    pub ticket: Option<String>,

    #[arg(long)]
    pub pcn: String,

    #[arg(long)]
    pub registration: String,

    #[arg(long, default_value = "")]
    pub first_name: String,

    #[arg(long, default_value = "")]
    pub last_name: String,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub phone: String,

    #[arg(long, default_value = "")]
    pub address: String,

    #[arg(long, default_value = "")]
    pub city: String,

    #[arg(long, default_value = "")]
    pub postcode: String,

    #[arg(long, default_value = "")]
    pub reason: String,

    #[arg(long, default_value = "")]
    pub narrative: String,

    /// Fill everything but skip the final submission.
    #[arg(long)]
    pub dry_run: bool,
}

/// The CLI standing in for the ticket/user/vehicle store collaborator:
/// every context field arrives as a flag.
struct FlagTicketStore {
    context: AutomationContext,
}

#[async_trait]
impl TicketStore for FlagTicketStore {
    async fn automation_context(
        &self,
        _ticket: &TicketId,
    ) -> Result<AutomationContext, ContextError> {
        Ok(self.context.clone())
    }
}

pub async fn cmd_run(app: &App, args: RunArgs) -> Result<()> {
    let authority = AuthorityId::new(&args.authority);
    let ticket = args.ticket.map(TicketId).unwrap_or_default();

    let store = FlagTicketStore {
        context: AutomationContext {
            pcn_number: args.pcn,
            vehicle_registration: args.registration,
            first_name: args.first_name,
            last_name: args.last_name,
            email: args.email,
            phone: args.phone,
            address_line1: args.address,
            city: args.city,
            postcode: args.postcode,
            reason: args.reason,
            narrative: args.narrative,
        },
    };
    let context = store.automation_context(&ticket).await?;

    let automation = app.automation_for(&authority);
    let challenge = execute_challenge(automation.as_ref(), &ticket, &context, args.dry_run).await;

    println!("{}", serde_json::to_string_pretty(&challenge)?);
    Ok(())
}
