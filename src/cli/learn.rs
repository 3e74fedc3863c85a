use anyhow::Result;
use clap::Args;

use challenger_core_types::AuthorityId;

use crate::app::App;

#[derive(Args, Debug)]
pub struct LearnArgs {
    /// Authority to learn, e.g. "westbridge-council".
    pub authority: String,

    /// Seed URL for the challenge portal, when lookup cannot find one.
    #[arg(long)]
    pub url: Option<String>,
}

pub async fn cmd_learn(app: &App, args: LearnArgs) -> Result<()> {
    let authority = AuthorityId::new(&args.authority);
    let report = app.learner().learn(&authority, args.url.as_deref()).await?;

    if report.needs_human_help {
        println!(
            "learning stopped, needs human help: {}",
            report.reason.as_deref().unwrap_or("unknown reason")
        );
    } else {
        println!(
            "draft recipe ready for review: {} steps, captcha {:?}, account required: {}",
            report.recipe.steps.len(),
            report.recipe.captcha,
            report.recipe.requires_account
        );
        println!("{}", serde_json::to_string_pretty(&report.recipe)?);
    }
    Ok(())
}
