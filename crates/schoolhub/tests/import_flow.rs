use schoolhub::db::SchoolDbManager;
use schoolhub::timetable::{ImportError, ImportOptions, ImportOutcome, SheetGrid, TimetableImporter};

const HEADER: [&str; 4] = ["Tiết", "Thứ 2", "Thứ 3", "Thứ 4"];

fn seeded_db() -> SchoolDbManager {
    let db = SchoolDbManager::in_memory().unwrap();
    db.insert_academic_year("Y1", "2025-2026").unwrap();
    db.insert_academic_term("T1", "Y1", "Học kỳ 1").unwrap();
    db.insert_class("C1", "10A1", 10, "Y1").unwrap();
    db.insert_class("C2", "10A2", 10, "Y1").unwrap();
    db.insert_teacher("T01", "Nguyen Van A").unwrap();
    db.insert_teacher("T02", "Tran Thi B").unwrap();
    db.insert_subject("S01", "Toán", "TOAN").unwrap();
    db.insert_subject("S02", "Ngữ văn", "VAN").unwrap();
    db.insert_time_slot("P1", "Tiết 1", "07:00", "07:45", 1, false).unwrap();
    db.insert_time_slot("P2", "Tiết 2", "07:50", "08:35", 2, false).unwrap();
    db.insert_time_slot("BRK", "Ra chơi", "08:35", "08:55", 3, true).unwrap();
    db.insert_time_slot("P3", "Tiết 3", "08:55", "09:40", 4, false).unwrap();
    db.insert_teaching_assignment("T01", "C1", "S01", "T1").unwrap();
    db.insert_teaching_assignment("T01", "C2", "S01", "T1").unwrap();
    db.insert_teaching_assignment("T02", "C1", "S02", "T1").unwrap();
    db
}

fn options(week: i64, replace_existing: bool) -> ImportOptions {
    ImportOptions {
        academic_term_id: "T1".to_string(),
        week_number: week,
        replace_existing,
        file_name: Some("tkb.xlsx".to_string()),
    }
}

fn sheet(name: &str, rows: Vec<[&str; 4]>) -> SheetGrid {
    let mut grid = vec![HEADER.to_vec()];
    grid.extend(rows.into_iter().map(|r| r.to_vec()));
    SheetGrid::new(name, grid)
}

fn run(db: &SchoolDbManager, sheets: &[SheetGrid], opts: &ImportOptions) -> ImportOutcome {
    TimetableImporter::new(db)
        .import(sheets, opts, "digest")
        .unwrap()
}

#[test]
fn imports_a_clean_sheet() {
    let db = seeded_db();
    let sheets = [sheet(
        "10A1",
        vec![["Tiết 1", "Nguyen Van A - Toán (T01|S01) - P101", "", ""]],
    )];

    let outcome = run(&db, &sheets, &options(1, false));

    assert!(outcome.success);
    assert_eq!(outcome.summary.total_entries, 1);
    assert_eq!(outcome.results[0].class_id.as_deref(), Some("C1"));
    assert!(outcome.results[0].warnings.is_empty());

    let stored = db.get_schedule_entries("T1", Some(1), Some("C1")).unwrap();
    assert_eq!(stored.len(), 1);
    let entry = &stored[0];
    assert_eq!(entry.teacher_id.as_deref(), Some("T01"));
    assert_eq!(entry.subject_id.as_deref(), Some("S01"));
    assert_eq!(entry.room_number.as_deref(), Some("P101"));
    assert_eq!(entry.day_of_week, 1);
    assert_eq!(entry.time_slot_id, "P1");
    assert_eq!(db.count_schedule_imports("T1").unwrap(), 1);
}

#[test]
fn teacher_conflict_blocks_the_whole_import() {
    let db = seeded_db();
    let first = [sheet(
        "10A1",
        vec![["Tiết 3", "", "Nguyen Van A - Toán (T01|S01) - P101", ""]],
    )];
    assert!(run(&db, &first, &options(1, false)).success);

    let second = [
        sheet(
            "10A2",
            vec![["Tiết 3", "", "Nguyen Van A - Toán (T01|S01) - P202", ""]],
        ),
        sheet("10A1", vec![["Tiết 1", "", "", "Ngữ văn"]]),
    ];
    let outcome = run(&db, &second, &options(1, false));

    assert!(!outcome.success);
    assert_eq!(outcome.summary.sheets_with_errors, 1);
    assert_eq!(outcome.summary.total_entries, 0);
    assert!(outcome.results[0].errors[0].contains("T01"));
    assert!(outcome.results[1].errors.is_empty());

    assert!(db.get_schedule_entries("T1", Some(1), Some("C2")).unwrap().is_empty());
    assert_eq!(db.get_schedule_entries("T1", Some(1), Some("C1")).unwrap().len(), 1);
    assert_eq!(db.count_schedule_imports("T1").unwrap(), 1);
}

#[test]
fn same_slot_in_another_week_is_free() {
    let db = seeded_db();
    let cell = "Nguyen Van A - Toán (T01|S01) - P101";
    assert!(run(&db, &[sheet("10A1", vec![["Tiết 1", cell, "", ""]])], &options(1, false)).success);
    assert!(run(&db, &[sheet("10A2", vec![["Tiết 1", cell, "", ""]])], &options(2, false)).success);
}

#[test]
fn double_booking_within_one_upload_is_a_conflict() {
    let db = seeded_db();
    let cell = "Nguyen Van A - Toán (T01|S01) - P101";
    let sheets = [
        sheet("10A1", vec![["Tiết 1", cell, "", ""]]),
        sheet("10A2", vec![["Tiết 1", cell, "", ""]]),
    ];

    let outcome = run(&db, &sheets, &options(1, false));

    assert!(!outcome.success);
    assert!(outcome.results[0].errors.is_empty());
    assert_eq!(outcome.results[1].errors.len(), 1);
    assert!(db.get_schedule_entries("T1", None, None).unwrap().is_empty());
}

#[test]
fn unresolved_subject_becomes_a_note() {
    let db = seeded_db();
    let sheets = [sheet("10A1", vec![["Tiết 2", "", "Thể dục", ""]])];

    let outcome = run(&db, &sheets, &options(1, false));

    assert!(outcome.success);
    assert_eq!(outcome.summary.total_warnings, 1);
    let stored = db.get_schedule_entries("T1", Some(1), Some("C1")).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].teacher_id, None);
    assert_eq!(stored[0].subject_id, None);
    assert_eq!(stored[0].notes.as_deref(), Some("Thể dục"));
}

#[test]
fn missing_assignment_is_only_a_warning() {
    let db = seeded_db();
    let sheets = [sheet(
        "10A2",
        vec![["Tiết 1", "Tran Thi B - Ngữ văn (T02|S02) - P105", "", ""]],
    )];

    let outcome = run(&db, &sheets, &options(1, false));

    assert!(outcome.success);
    assert_eq!(outcome.results[0].warnings.len(), 1);
    assert_eq!(outcome.summary.total_entries, 1);
}

#[test]
fn unknown_teacher_is_an_error() {
    let db = seeded_db();
    let sheets = [sheet(
        "10A1",
        vec![["Tiết 1", "Ghost - Toán (T99|S01) - P101", "", ""]],
    )];

    let outcome = run(&db, &sheets, &options(1, false));

    assert!(!outcome.success);
    assert!(outcome.results[0].errors[0].contains("T99"));
}

#[test]
fn special_activities_are_flagged() {
    let db = seeded_db();
    let sheets = [sheet("10A1", vec![["Tiết 1", "Chào cờ", "", "SHL"]])];

    let outcome = run(&db, &sheets, &options(1, false));

    assert!(outcome.success);
    let stored = db.get_schedule_entries("T1", Some(1), Some("C1")).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|e| e.is_special_activity && e.teacher_id.is_none()));
    assert_eq!(stored[0].notes.as_deref(), Some("Chào cờ"));
    assert_eq!(stored[1].notes.as_deref(), Some("Sinh hoạt lớp"));
}

#[test]
fn replace_existing_swaps_the_week_schedule() {
    let db = seeded_db();
    let first = [sheet(
        "10A1",
        vec![
            ["Tiết 1", "Nguyen Van A - Toán (T01|S01) - P101", "", ""],
            ["Tiết 2", "Tran Thi B - Ngữ văn (T02|S02) - P101", "", ""],
        ],
    )];
    assert!(run(&db, &first, &options(1, false)).success);

    let second = [sheet(
        "10A1",
        vec![["Tiết 1", "Tran Thi B - Ngữ văn (T02|S02) - P102", "", ""]],
    )];

    // Without replacing, the class slot is already taken.
    let blocked = run(&db, &second, &options(1, false));
    assert!(!blocked.success);

    let outcome = run(&db, &second, &options(1, true));
    assert!(outcome.success);
    assert_eq!(outcome.summary.replaced_entries, 2);

    let stored = db.get_schedule_entries("T1", Some(1), Some("C1")).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].teacher_id.as_deref(), Some("T02"));
    assert_eq!(stored[0].room_number.as_deref(), Some("P102"));
}

#[test]
fn rows_map_to_slots_by_position_and_skip_breaks() {
    let db = seeded_db();
    let sheets = [sheet(
        "10A1",
        vec![
            ["1", "Toán", "", ""],
            ["2", "Toán", "", ""],
            ["Ra chơi", "Chào cờ", "", ""],
            ["3", "Toán", "", ""],
            ["4", "Toán", "", ""],
        ],
    )];

    let outcome = run(&db, &sheets, &options(1, false));

    assert!(outcome.success);
    // the fourth teaching row has no slot left
    assert_eq!(outcome.results[0].warnings.len(), 1);
    let slots: Vec<String> = db
        .get_schedule_entries("T1", Some(1), Some("C1"))
        .unwrap()
        .into_iter()
        .map(|e| e.time_slot_id)
        .collect();
    assert_eq!(slots, vec!["P1", "P2", "P3"]);
}

#[test]
fn unknown_class_sheet_is_an_error() {
    let db = seeded_db();
    let sheets = [sheet("12C9", vec![["Tiết 1", "Toán", "", ""]])];

    let outcome = run(&db, &sheets, &options(1, false));

    assert!(!outcome.success);
    assert!(outcome.results[0].class_id.is_none());
}

#[test]
fn request_level_failures() {
    let db = seeded_db();
    let importer = TimetableImporter::new(&db);
    let sheets = [sheet("10A1", vec![["Tiết 1", "Toán", "", ""]])];

    let mut bad_term = options(1, false);
    bad_term.academic_term_id = "T404".to_string();
    assert!(matches!(
        importer.import(&sheets, &bad_term, "d"),
        Err(ImportError::TermNotFound(_))
    ));

    assert!(matches!(
        importer.import(&sheets, &options(0, false), "d"),
        Err(ImportError::InvalidField { field: "week_number", .. })
    ));

    let blank = [SheetGrid::new("Sheet1", vec![vec!["", ""]])];
    assert!(matches!(
        importer.import(&blank, &options(1, false), "d"),
        Err(ImportError::EmptyWorkbook)
    ));
}
