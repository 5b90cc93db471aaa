use super::{check_limit, RenderError, ReportRenderer};
use crate::models::Task;
use taskdesk_common::{CSV_CONTENT_TYPE, CSV_REPORT_FILENAME, DEFAULT_REPORT_MAX_TASKS};

const HEADER: [&str; 8] = [
    "id",
    "name",
    "description",
    "status",
    "priority",
    "file",
    "created_at",
    "updated_at",
];

/// Renders tasks as a CSV table, one row per task
#[derive(Debug, Clone)]
pub struct CsvReportRenderer {
    max_tasks: usize,
}

impl CsvReportRenderer {
    #[must_use]
    pub fn new(max_tasks: usize) -> Self {
        Self { max_tasks }
    }
}

impl Default for CsvReportRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_MAX_TASKS)
    }
}

fn csv_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Csv(e.to_string())
}

impl ReportRenderer for CsvReportRenderer {
    fn render(&self, tasks: &[Task]) -> Result<Vec<u8>, RenderError> {
        check_limit(tasks.len(), self.max_tasks())?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(HEADER).map_err(csv_error)?;
        for task in tasks {
            writer
                .write_record([
                    task.id.to_string(),
                    task.name.clone(),
                    task.description.clone(),
                    task.status.as_str().to_string(),
                    task.priority.to_string(),
                    task.file.clone().unwrap_or_default(),
                    task.created_at.to_rfc3339(),
                    task.updated_at.to_rfc3339(),
                ])
                .map_err(csv_error)?;
        }
        writer.into_inner().map_err(csv_error)
    }

    fn content_type(&self) -> &'static str {
        CSV_CONTENT_TYPE
    }

    fn filename(&self) -> &'static str {
        CSV_REPORT_FILENAME
    }

    fn max_tasks(&self) -> Option<usize> {
        Some(self.max_tasks)
    }
}
