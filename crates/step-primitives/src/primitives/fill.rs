//! Fill primitive. The value arriving here is already resolved; logging
//! deliberately omits it; filled values are personal data.

use tracing::info;

use browser_session::PageDriver;

use crate::errors::StepError;

pub(super) async fn execute(
    page: &dyn PageDriver,
    selector: &str,
    value: &str,
) -> Result<(), StepError> {
    info!(%selector, chars = value.len(), "fill");
    page.fill(selector, value).await?;
    Ok(())
}
