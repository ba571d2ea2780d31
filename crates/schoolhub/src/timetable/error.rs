//! Error types for the timetable importer.

use thiserror::Error;

/// Request-level failures. Per-cell problems are reported as diagnostics
/// in the import outcome instead.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A required form field was absent or empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A form field could not be interpreted
    #[error("Invalid value for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    /// The academic term does not exist
    #[error("Academic term not found: {0}")]
    TermNotFound(String),

    /// The upload is not a readable spreadsheet
    #[error("Unable to read workbook: {0}")]
    Workbook(String),

    /// The workbook contains no worksheet with content
    #[error("Workbook contains no sheets")]
    EmptyWorkbook,

    /// No teaching (non-break) time slots are configured
    #[error("No teaching time slots are configured")]
    NoTimeSlots,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl ImportError {
    /// Returns true if the caller sent something that can be fixed client-side.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ImportError::MissingField(_)
                | ImportError::InvalidField { .. }
                | ImportError::Workbook(_)
                | ImportError::EmptyWorkbook
        )
    }
}
