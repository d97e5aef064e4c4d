//! Document→text collaborator trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::segment::table::Sheet;

/// The document→text/layout service.
///
/// Conversion quality is the collaborator's concern; the pipeline only
/// relies on page order being preserved.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    /// Read a document into ordered page contents. Page-break markers in
    /// the content are the generic segmenter's delimiter.
    async fn read_text(&self, location: &str, extension: &str) -> Result<Vec<String>>;

    /// Read a workbook into sheets (cell grids plus merged ranges).
    async fn read_workbook(&self, location: &str) -> Result<Vec<Sheet>>;
}
