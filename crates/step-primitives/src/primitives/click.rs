//! Click primitive.

use tracing::info;

use browser_session::PageDriver;

use crate::errors::StepError;

pub(super) async fn execute(page: &dyn PageDriver, selector: &str) -> Result<(), StepError> {
    info!(%selector, "click");
    page.click(selector).await?;
    Ok(())
}
