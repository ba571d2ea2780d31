//! Timetable import: cell grammar, subject resolution, assignment and
//! conflict checks, and the all-or-nothing spreadsheet orchestrator.

mod assignment;
mod cell;
mod conflict;
mod error;
mod import;
mod resolver;
mod types;
mod workbook;

pub use assignment::AssignmentValidator;
pub use cell::{parse_cell, ParsedCell, SpecialActivity};
pub use conflict::{Conflict, ConflictChecker};
pub use error::ImportError;
pub use import::{file_digest, parse_weekday, TimetableImporter};
pub use resolver::{MatchTier, SubjectResolver};
pub use types::*;
pub use workbook::{read_workbook, SheetGrid};
