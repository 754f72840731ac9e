//! The extraction strategies, fastest and most reliable first.

pub mod direct_text;
pub mod export;
pub mod screenshot;
pub mod structured;

pub use direct_text::DirectText;
pub use export::ExportButton;
pub use screenshot::Screenshot;
pub use structured::StructuredData;
