//! Spreadsheet timetable import.
//!
//! Each worksheet is the weekly timetable of one class (the sheet name is the
//! class name). The first row holds weekday headers; every following row is
//! one teaching slot, identified by the slot name in the first column or, when
//! that does not match, by its position among the teaching slots.
//!
//! The import is all-or-nothing: if any sheet reports an error, nothing is
//! written and the per-sheet diagnostics are returned.

use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::assignment::AssignmentValidator;
use super::cell::{parse_cell, SpecialActivity};
use super::conflict::ConflictChecker;
use super::error::ImportError;
use super::resolver::SubjectResolver;
use super::types::{ImportOptions, ImportOutcome, PerSheetResult, ScheduleEntry, SlotKey};
use super::workbook::SheetGrid;
use crate::db::{DbClass, DbTimeSlot, ImportRecord, SchoolDbManager};

/// Runs timetable imports against the store.
pub struct TimetableImporter<'a> {
    db: &'a SchoolDbManager,
}

/// Per-import lookups shared by every sheet.
struct ScanContext<'a> {
    options: &'a ImportOptions,
    slots: &'a [DbTimeSlot],
    resolver: &'a SubjectResolver,
    validator: AssignmentValidator<'a>,
}

impl<'a> TimetableImporter<'a> {
    pub fn new(db: &'a SchoolDbManager) -> Self {
        Self { db }
    }

    /// Imports decoded worksheets for one term and week.
    ///
    /// # Returns
    /// * `Ok(outcome)` - `outcome.success` tells whether rows were written
    /// * `Err(ImportError)` - the request itself is invalid or the store failed
    pub fn import(
        &self,
        sheets: &[SheetGrid],
        options: &ImportOptions,
        file_sha256: &str,
    ) -> Result<ImportOutcome, ImportError> {
        let import_id = generate_import_id();
        let start = Instant::now();

        if options.academic_term_id.trim().is_empty() {
            return Err(ImportError::MissingField("academic_term_id"));
        }
        if options.week_number < 1 {
            return Err(ImportError::InvalidField {
                field: "week_number",
                message: format!("must be at least 1, got {}", options.week_number),
            });
        }

        let term = self
            .db
            .get_term(&options.academic_term_id)?
            .ok_or_else(|| ImportError::TermNotFound(options.academic_term_id.clone()))?;

        let slots = self.db.get_time_slots()?;
        if slots.iter().all(|s| s.is_break) {
            return Err(ImportError::NoTimeSlots);
        }

        let sheets: Vec<&SheetGrid> = sheets.iter().filter(|s| !s.is_blank()).collect();
        if sheets.is_empty() {
            return Err(ImportError::EmptyWorkbook);
        }

        info!(
            import_id = %import_id,
            term = %term.id,
            week = options.week_number,
            sheets = sheets.len(),
            replace_existing = options.replace_existing,
            sha256 = %file_sha256,
            "Starting timetable import"
        );

        // Pass 1: every sheet must name a distinct class of the term's year.
        let mut results = Vec::with_capacity(sheets.len());
        let mut classes: Vec<Option<DbClass>> = Vec::with_capacity(sheets.len());
        let mut seen_classes = HashSet::new();

        for sheet in &sheets {
            let mut result = PerSheetResult::new(&sheet.name);
            let class = self.db.find_class_by_name(&term.academic_year_id, &sheet.name)?;

            match class {
                Some(class) if !seen_classes.insert(class.id.clone()) => {
                    result.errors.push(format!(
                        "Class {} appears in more than one sheet",
                        class.name
                    ));
                    classes.push(None);
                }
                Some(class) => {
                    result.class_id = Some(class.id.clone());
                    result.class_name = Some(class.name.clone());
                    classes.push(Some(class));
                }
                None => {
                    result.errors.push(format!(
                        "Class '{}' not found in academic year {}",
                        sheet.name.trim(),
                        term.academic_year_id
                    ));
                    classes.push(None);
                }
            }

            results.push(result);
        }

        let class_ids: Vec<String> = classes.iter().flatten().map(|c| c.id.clone()).collect();

        let mut checker = ConflictChecker::new(self.db);
        if options.replace_existing {
            checker = checker.ignoring_classes(class_ids.iter().cloned());
        }

        let resolver = SubjectResolver::new(self.db.get_subjects()?);
        let ctx = ScanContext {
            options,
            slots: &slots,
            resolver: &resolver,
            validator: AssignmentValidator::new(self.db, &term.id),
        };

        // Pass 2: scan cells.
        let mut entries = Vec::new();
        for ((sheet, class), result) in sheets.iter().zip(&classes).zip(results.iter_mut()) {
            let Some(class) = class else { continue };

            let before = entries.len();
            self.scan_sheet(&ctx, &mut checker, sheet, class, result, &mut entries)?;
            result.entries_parsed = entries.len() - before;

            debug!(
                import_id = %import_id,
                sheet = %sheet.name,
                entries = result.entries_parsed,
                errors = result.errors.len(),
                warnings = result.warnings.len(),
                "Scanned sheet"
            );
        }

        if results.iter().any(PerSheetResult::has_errors) {
            let outcome = ImportOutcome::from_results(import_id, results, 0);
            warn!(
                import_id = %outcome.import_id,
                errors = outcome.summary.total_errors,
                sheets_with_errors = outcome.summary.sheets_with_errors,
                duration_ms = start.elapsed().as_millis() as u64,
                "Timetable import aborted, nothing written"
            );
            return Ok(outcome);
        }

        let record = ImportRecord {
            id: import_id.clone(),
            academic_term_id: term.id.clone(),
            week_number: options.week_number,
            file_name: options.file_name.clone(),
            file_sha256: file_sha256.to_string(),
            sheets: results.len(),
            imported_at: chrono::Utc::now().to_rfc3339(),
        };

        let replace = options.replace_existing.then_some(class_ids.as_slice());
        let stats = self.db.write_schedule_import(replace, &entries, &record)?;

        for result in &mut results {
            result.entries_created = result.entries_parsed;
        }

        let outcome = ImportOutcome::from_results(import_id, results, stats.replaced);
        info!(
            import_id = %outcome.import_id,
            inserted = stats.inserted,
            replaced = stats.replaced,
            warnings = outcome.summary.total_warnings,
            duration_ms = start.elapsed().as_millis() as u64,
            "Timetable import committed"
        );

        Ok(outcome)
    }

    fn scan_sheet(
        &self,
        ctx: &ScanContext<'_>,
        checker: &mut ConflictChecker<'_>,
        sheet: &SheetGrid,
        class: &DbClass,
        result: &mut PerSheetResult,
        entries: &mut Vec<ScheduleEntry>,
    ) -> Result<(), ImportError> {
        let header = sheet.rows.first().map(Vec::as_slice).unwrap_or_default();
        let day_columns = weekday_columns(header);
        if day_columns.is_empty() {
            result
                .errors
                .push("No weekday columns found in the header row".to_string());
            return Ok(());
        }

        let teaching: Vec<&DbTimeSlot> = ctx.slots.iter().filter(|s| !s.is_break).collect();
        let mut position = 0usize;

        for (row_idx, row) in sheet.rows.iter().enumerate().skip(1) {
            if row.iter().all(|c| c.is_empty()) {
                continue;
            }

            let label = sheet.cell(row_idx, 0);
            if ctx
                .slots
                .iter()
                .any(|s| s.is_break && same_name(&s.name, label))
            {
                continue;
            }

            if let Some(idx) = teaching.iter().position(|s| same_name(&s.name, label)) {
                position = idx;
            }

            let Some(slot) = teaching.get(position) else {
                result.warnings.push(format!(
                    "Row {}: no teaching time slot left for this row, ignored",
                    row_idx + 1
                ));
                continue;
            };
            position += 1;

            for &(col, day) in &day_columns {
                let text = sheet.cell(row_idx, col);
                if text.is_empty() {
                    continue;
                }

                let key = SlotKey {
                    academic_term_id: ctx.options.academic_term_id.clone(),
                    week_number: ctx.options.week_number,
                    day_of_week: day,
                    time_slot_id: slot.id.clone(),
                };
                let location = format!("{}, {}", day_label(day), slot.name);

                self.process_cell(ctx, checker, class, &key, &location, text, result, entries)?;
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn process_cell(
        &self,
        ctx: &ScanContext<'_>,
        checker: &mut ConflictChecker<'_>,
        class: &DbClass,
        key: &SlotKey,
        location: &str,
        text: &str,
        result: &mut PerSheetResult,
        entries: &mut Vec<ScheduleEntry>,
    ) -> Result<(), ImportError> {
        let mut entry = ScheduleEntry {
            class_id: class.id.clone(),
            teacher_id: None,
            subject_id: None,
            day_of_week: key.day_of_week,
            time_slot_id: key.time_slot_id.clone(),
            week_number: key.week_number,
            room_number: None,
            notes: None,
            is_special_activity: false,
        };

        if let Some(activity) = SpecialActivity::detect(text) {
            entry.is_special_activity = true;
            entry.notes = Some(activity.label().to_string());
        } else {
            let parsed = parse_cell(text);

            let subject_id = match parsed.subject_id.as_deref() {
                Some(id) if ctx.resolver.get(id).is_some() => Some(id.to_string()),
                Some(id) => {
                    result.warnings.push(format!(
                        "{location}: unknown subject id '{id}', matching by name instead"
                    ));
                    parsed
                        .subject_name
                        .as_deref()
                        .and_then(|n| ctx.resolver.resolve_id(n))
                        .map(str::to_string)
                }
                None => parsed
                    .subject_name
                    .as_deref()
                    .and_then(|n| ctx.resolver.resolve_id(n))
                    .map(str::to_string),
            };

            match subject_id {
                Some(subject_id) => {
                    if let Some(teacher_id) = parsed.teacher_id.as_deref() {
                        if !self.db.teacher_exists(teacher_id)? {
                            result
                                .errors
                                .push(format!("{location}: unknown teacher id '{teacher_id}'"));
                            return Ok(());
                        }

                        if let Some(w) =
                            ctx.validator
                                .warning_for(teacher_id, &class.id, &subject_id)?
                        {
                            result.warnings.push(format!("{location}: {w}"));
                        }
                    }

                    entry.teacher_id = parsed.teacher_id;
                    entry.subject_id = Some(subject_id);
                    entry.room_number = parsed.room_number;
                }
                None => {
                    let name = parsed.subject_name.as_deref().unwrap_or(text);
                    result.warnings.push(format!(
                        "{location}: subject '{name}' not found, imported as a note"
                    ));
                    entry.notes = Some(text.to_string());
                }
            }
        }

        let conflicts = checker.check(entry.teacher_id.as_deref(), &class.id, key)?;
        if !conflicts.is_empty() {
            result
                .errors
                .extend(conflicts.iter().map(|c| format!("{location}: {c}")));
            return Ok(());
        }

        checker.reserve(entry.teacher_id.as_deref(), &class.id, key);
        entries.push(entry);
        Ok(())
    }
}

/// Maps header columns to days of the week (1 = Monday .. 7 = Sunday).
fn weekday_columns(header: &[String]) -> Vec<(usize, u8)> {
    header
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(col, text)| parse_weekday(text).map(|day| (col, day)))
        .collect()
}

/// Recognizes Vietnamese and English weekday headers.
pub fn parse_weekday(text: &str) -> Option<u8> {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let day = match normalized.as_str() {
        "thứ 2" | "thứ hai" | "thu 2" | "t2" | "monday" | "mon" => 1,
        "thứ 3" | "thứ ba" | "thu 3" | "t3" | "tuesday" | "tue" => 2,
        "thứ 4" | "thứ tư" | "thu 4" | "t4" | "wednesday" | "wed" => 3,
        "thứ 5" | "thứ năm" | "thu 5" | "t5" | "thursday" | "thu" => 4,
        "thứ 6" | "thứ sáu" | "thu 6" | "t6" | "friday" | "fri" => 5,
        "thứ 7" | "thứ bảy" | "thu 7" | "t7" | "saturday" | "sat" => 6,
        "chủ nhật" | "chu nhat" | "cn" | "sunday" | "sun" => 7,
        _ => return None,
    };

    Some(day)
}

fn day_label(day: u8) -> String {
    match day {
        7 => "Chủ nhật".to_string(),
        d => format!("Thứ {}", d + 1),
    }
}

fn same_name(slot_name: &str, label: &str) -> bool {
    !label.is_empty() && slot_name.trim().to_lowercase() == label.trim().to_lowercase()
}

/// Hex SHA-256 of an uploaded file, recorded in the import history.
pub fn file_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(&hasher.finalize()[..])
}

/// Generates a unique id for an import run, used in logs and history.
fn generate_import_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("imp-{:x}-{:08x}", timestamp & 0xFFFF_FFFF, random)
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
