//! Upload-file primitive.

use tracing::info;

use browser_session::PageDriver;

use crate::errors::StepError;

pub(super) async fn execute(
    page: &dyn PageDriver,
    selector: &str,
    path: &str,
) -> Result<(), StepError> {
    info!(%selector, %path, "upload file");
    page.upload_file(selector, path).await?;
    Ok(())
}
