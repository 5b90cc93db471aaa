//! Taskdesk Common - Shared constants and helpers
//!
//! # Examples
//!
//! ```
//! use taskdesk_common::{parse_date, REPORT_FILENAME};
//!
//! assert_eq!(REPORT_FILENAME, "tasks_report.pdf");
//! assert!(parse_date("2024-01-01").is_ok());
//! ```

pub mod constants;
pub mod utils;

pub use constants::*;
pub use utils::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_re_exported_items() {
        assert_eq!(PDF_CONTENT_TYPE, "application/pdf");
        assert_eq!(DATE_FORMATS[0], "%Y-%m-%d");
        assert!(parse_date("3/11/24").is_ok());
    }
}
