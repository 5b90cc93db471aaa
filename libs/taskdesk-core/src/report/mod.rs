//! Report rendering for filtered task lists

use crate::models::Task;
use thiserror::Error;

#[cfg(feature = "export-csv")]
mod csv;
mod metrics;
mod pdf;

#[cfg(feature = "export-csv")]
pub use self::csv::CsvReportRenderer;
pub use self::pdf::{PdfReportConfig, PdfReportRenderer};

/// Failure to produce a report
///
/// A renderer that returns one of these has produced no output at all.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{count} tasks exceed the report limit of {max}")]
    TooManyTasks { count: usize, max: usize },

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[cfg(feature = "export-csv")]
    #[error("CSV generation failed: {0}")]
    Csv(String),
}

/// Turns a task list into a downloadable document
pub trait ReportRenderer: Send + Sync {
    /// Render `tasks` in the order given
    ///
    /// # Errors
    /// Returns a `RenderError` if the document cannot be produced
    fn render(&self, tasks: &[Task]) -> Result<Vec<u8>, RenderError>;

    fn content_type(&self) -> &'static str;

    /// Suggested download filename
    fn filename(&self) -> &'static str;

    /// Largest task list this renderer accepts
    fn max_tasks(&self) -> Option<usize> {
        None
    }
}

pub(crate) fn check_limit(count: usize, max: Option<usize>) -> Result<(), RenderError> {
    match max {
        Some(max) if count > max => Err(RenderError::TooManyTasks { count, max }),
        _ => Ok(()),
    }
}
