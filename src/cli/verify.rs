use anyhow::Result;
use clap::Args;

use challenger_core_types::AuthorityId;

use crate::app::App;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Authority whose recipe should be re-verified.
    pub authority: String,
}

pub async fn cmd_verify(app: &App, args: VerifyArgs) -> Result<()> {
    let authority = AuthorityId::new(&args.authority);
    let outcome = app.verifier().check(&authority).await?;

    if outcome.ok {
        println!(
            "verification passed for {authority}; {} evidence artifacts",
            outcome.challenge.evidence.len()
        );
    } else {
        println!(
            "verification FAILED for {authority}: {}",
            outcome
                .challenge
                .failure_reason
                .as_deref()
                .unwrap_or("unknown reason")
        );
    }
    Ok(())
}
