//! Constants shared by the taskdesk crates

/// Suggested download name for the PDF task report
pub const REPORT_FILENAME: &str = "tasks_report.pdf";

/// Suggested download name for the CSV task report
pub const CSV_REPORT_FILENAME: &str = "tasks_report.csv";

/// Content type of the PDF task report
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Content type of the CSV task report
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Lowest accepted task priority
pub const MIN_PRIORITY: i32 = 1;

/// Highest accepted task priority
pub const MAX_PRIORITY: i32 = 100;

/// Priority assigned when a create request omits one
pub const DEFAULT_PRIORITY: i32 = 1;

/// Maximum task name length, in characters
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum username length, in characters
pub const MAX_USERNAME_LENGTH: usize = 150;

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Default upper bound on the number of tasks a single report may contain
pub const DEFAULT_REPORT_MAX_TASKS: usize = 5000;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Directory task attachments are stored under, relative to the working directory
pub const DEFAULT_UPLOAD_DIR: &str = "task_files";

/// Largest accepted attachment, in bytes
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Longest stored attachment filename, in characters
pub const MAX_UPLOAD_NAME_LENGTH: usize = 100;

/// Calendar date formats accepted by filter input
///
/// The two-digit year form is listed before the four-digit one: `%Y` would
/// otherwise read "06/01/24" as year 24.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];
