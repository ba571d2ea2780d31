/// Types for the timetable importer
use serde::{Deserialize, Serialize};

/// A schedule row assembled during import, before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub class_id: String,
    pub teacher_id: Option<String>,
    pub subject_id: Option<String>,
    pub day_of_week: u8, // 1 = Monday .. 7 = Sunday
    pub time_slot_id: String,
    pub week_number: i64,
    pub room_number: Option<String>,
    pub notes: Option<String>,
    pub is_special_activity: bool,
}

/// The (term, week, day, slot) coordinate a cell occupies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub academic_term_id: String,
    pub week_number: i64,
    pub day_of_week: u8,
    pub time_slot_id: String,
}

/// Options that apply to the whole upload.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub academic_term_id: String,
    pub week_number: i64,
    pub replace_existing: bool,
    pub file_name: Option<String>,
}

/// Diagnostics and counts for one worksheet.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerSheetResult {
    pub sheet_name: String,
    pub class_id: Option<String>,
    pub class_name: Option<String>,
    /// Entries assembled from the sheet
    pub entries_parsed: usize,
    /// Entries written; stays 0 when the import is aborted
    pub entries_created: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PerSheetResult {
    pub fn new(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            ..Default::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub total_sheets: usize,
    pub sheets_with_errors: usize,
    pub total_entries: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub replaced_entries: usize,
}

/// Outcome of an import. `success == false` means nothing was written.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub success: bool,
    pub import_id: String,
    pub results: Vec<PerSheetResult>,
    pub summary: ImportSummary,
}

impl ImportOutcome {
    pub(crate) fn from_results(
        import_id: String,
        results: Vec<PerSheetResult>,
        replaced_entries: usize,
    ) -> Self {
        let sheets_with_errors = results.iter().filter(|r| r.has_errors()).count();
        let summary = ImportSummary {
            total_sheets: results.len(),
            sheets_with_errors,
            total_entries: results.iter().map(|r| r.entries_created).sum(),
            total_errors: results.iter().map(|r| r.errors.len()).sum(),
            total_warnings: results.iter().map(|r| r.warnings.len()).sum(),
            replaced_entries,
        };

        Self {
            success: sheets_with_errors == 0,
            import_id,
            results,
            summary,
        }
    }
}
