//! Navigate primitive.

use tracing::info;

use browser_session::PageDriver;

use crate::errors::StepError;

pub(super) async fn execute(page: &dyn PageDriver, url: &str) -> Result<(), StepError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(StepError::Navigation(format!("invalid URL scheme: {url}")));
    }
    info!(%url, "navigate");
    page.navigate(url).await?;
    Ok(())
}
