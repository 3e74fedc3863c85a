//! Select primitive.

use tracing::info;

use browser_session::PageDriver;

use crate::errors::StepError;

pub(super) async fn execute(
    page: &dyn PageDriver,
    selector: &str,
    value: &str,
) -> Result<(), StepError> {
    info!(%selector, %value, "select");
    page.select_option(selector, value).await?;
    Ok(())
}
