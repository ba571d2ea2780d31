/// Database row types for the school store

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DbAcademicTerm {
    pub id: String,
    pub academic_year_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbClass {
    pub id: String,
    pub name: String,
    pub grade_level: i64,
    pub academic_year_id: String,
    pub class_type: String,
    pub subject_group_code: Option<String>,
    pub max_students: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbSubject {
    pub id: String,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbTimeSlot {
    pub id: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub order_index: i64,
    pub is_break: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbStudent {
    pub id: String,
    pub student_code: String,
    pub full_name: String,
    pub subject_group_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbScheduleEntry {
    pub id: String,
    pub academic_term_id: String,
    pub class_id: String,
    pub teacher_id: Option<String>,
    pub subject_id: Option<String>,
    pub day_of_week: u8,
    pub time_slot_id: String,
    pub week_number: i64,
    pub room_number: Option<String>,
    pub notes: Option<String>,
    pub is_special_activity: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbGrade {
    pub subject_id: String,
    pub subject_name: String,
    pub component: String,
    pub score: f64,
}

/// A combined class created by the distributor, with its enrollment count
#[derive(Debug, Clone, Serialize)]
pub struct CreatedClass {
    pub id: String,
    pub name: String,
    pub grade_level: i64,
    pub subject_group_code: String,
    pub max_students: i64,
    pub enrolled_students: usize,
}

/// History row written after a successful import
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub id: String,
    pub academic_term_id: String,
    pub week_number: i64,
    pub file_name: Option<String>,
    pub file_sha256: String,
    pub sheets: usize,
    pub imported_at: String,
}

/// Row counts touched by a schedule write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub inserted: usize,
    pub replaced: usize,
}
