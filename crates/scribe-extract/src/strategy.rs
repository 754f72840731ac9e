use crate::error::Result;
use scribe_browser::BrowserActions;
use scribe_core::Item;
use std::fmt;

/// Extraction method names, as recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    DirectText,
    StructuredData,
    ExportButton,
    Screenshot,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectText => "direct_text",
            Self::StructuredData => "structured_data",
            Self::ExportButton => "export_button",
            Self::Screenshot => "screenshot",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content produced by a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Transcript text; written with a header block
    Text(String),
    /// A file the service exported; written as-is
    Download(Vec<u8>),
    /// PNG capture of the page
    Image(Vec<u8>),
}

impl Artifact {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text(_) | Self::Download(_) => "txt",
            Self::Image(_) => "png",
        }
    }
}

/// Result of a strategy that ran without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Found(Artifact),
    /// The page did not offer enough content for this method
    Declined(&'static str),
}

/// One self-contained way of obtaining a transcript from a loaded page.
#[async_trait::async_trait]
pub trait Strategy: Send + Sync {
    fn method(&self) -> Method;

    async fn extract(&self, page: &dyn BrowserActions, item: &Item) -> Result<Outcome>;
}
