//! Last resort: preserve the rendered page as an image.

use crate::error::Result;
use crate::strategy::{Artifact, Method, Outcome, Strategy};
use scribe_browser::BrowserActions;
use scribe_core::Item;

/// Succeeds whenever the capture itself succeeds.
#[derive(Debug, Default)]
pub struct Screenshot;

#[async_trait::async_trait]
impl Strategy for Screenshot {
    fn method(&self) -> Method {
        Method::Screenshot
    }

    async fn extract(&self, page: &dyn BrowserActions, _item: &Item) -> Result<Outcome> {
        let png = page.screenshot().await?;
        Ok(Outcome::Found(Artifact::Image(png)))
    }
}
