//! Task listing pipeline: raw parameters, validated filters, owner-scoped query,
//! then either the matching tasks or a rendered report

use crate::error::Result;
use crate::filter::parse_filter_params;
use crate::models::Task;
use crate::query::TaskQuery;
#[cfg(feature = "export-csv")]
use crate::report::CsvReportRenderer;
use crate::report::{PdfReportRenderer, ReportRenderer};
use crate::store::TaskStore;
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Query parameter selecting report output
pub const EXPORT_PARAM: &str = "export";

/// Output selected by the `export` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Plain list of tasks
    Page,
    Pdf,
    #[cfg(feature = "export-csv")]
    Csv,
}

impl ExportFormat {
    /// Unrecognised or missing values select [`ExportFormat::Page`]
    #[must_use]
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        match params
            .get(EXPORT_PARAM)
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => Self::Pdf,
            #[cfg(feature = "export-csv")]
            Some("csv") => Self::Csv,
            _ => Self::Page,
        }
    }

    #[must_use]
    pub fn is_report(self) -> bool {
        self != Self::Page
    }

    /// Short name used in messages, e.g. `PDF`
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Pdf => "PDF",
            #[cfg(feature = "export-csv")]
            Self::Csv => "CSV",
        }
    }
}

/// A rendered document ready to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskListing {
    Page(Vec<Task>),
    Report(Report),
}

/// The report renderers available to the pipeline
#[derive(Debug, Clone, Default)]
pub struct Renderers {
    pub pdf: PdfReportRenderer,
    #[cfg(feature = "export-csv")]
    pub csv: CsvReportRenderer,
}

impl Renderers {
    /// Renderers sharing one task limit
    #[must_use]
    pub fn with_max_tasks(max_tasks: usize) -> Self {
        Self {
            pdf: PdfReportRenderer::with_max_tasks(max_tasks),
            #[cfg(feature = "export-csv")]
            csv: CsvReportRenderer::new(max_tasks),
        }
    }

    #[must_use]
    pub fn for_format(&self, format: ExportFormat) -> Option<&dyn ReportRenderer> {
        match format {
            ExportFormat::Page => None,
            ExportFormat::Pdf => Some(&self.pdf),
            #[cfg(feature = "export-csv")]
            ExportFormat::Csv => Some(&self.csv),
        }
    }
}

/// List or export the tasks of `owner` selected by raw query parameters
///
/// For reports the query fetches one row past the renderer's limit, so an
/// oversized result fails in the renderer instead of being silently cut short.
///
/// # Errors
/// Returns `InvalidInput` for invalid filters, a store error, or `Render` when
/// the report cannot be produced
#[instrument(skip(store, renderers, params))]
pub async fn run_task_listing(
    store: &dyn TaskStore,
    renderers: &Renderers,
    owner: Uuid,
    params: &HashMap<String, String>,
) -> Result<TaskListing> {
    let filters = parse_filter_params(params)?;
    let query = TaskQuery::from_filters(owner, &filters);
    debug!("Task listing with {} predicate(s)", query.predicates().len());

    let Some(renderer) = renderers.for_format(ExportFormat::from_params(params)) else {
        return Ok(TaskListing::Page(store.query(&query).await?));
    };

    let query = match renderer.max_tasks() {
        Some(max) => query.limit(max.saturating_add(1)),
        None => query,
    };
    debug!("Report query capped at {:?} row(s)", query.max_results());
    let tasks = store.query(&query).await?;
    let bytes = renderer.render(&tasks)?;
    info!(
        "Exported {} task(s) to {}",
        tasks.len(),
        renderer.filename()
    );
    Ok(TaskListing::Report(Report {
        bytes,
        content_type: renderer.content_type(),
        filename: renderer.filename(),
    }))
}
