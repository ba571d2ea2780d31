/// Database module for the school store (classes, timetable, grades)

mod types;

pub use types::{
    CreatedClass, DbAcademicTerm, DbClass, DbGrade, DbScheduleEntry, DbStudent, DbSubject,
    DbTimeSlot, ImportRecord, WriteStats,
};

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::timetable::{ScheduleEntry, SlotKey};

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_school.sql");

const SCHEDULE_COLUMNS: &str = "id, academic_term_id, class_id, teacher_id, subject_id,
    day_of_week, time_slot_id, week_number, room_number, notes, is_special_activity";

pub struct SchoolDbManager {
    db: Mutex<Connection>,
}

impl SchoolDbManager {
    /// Opens (or creates) the database file and initializes the schema
    pub fn new(db_path: &str) -> Result<Self> {
        Self::from_connection(Connection::open(db_path)?)
    }

    /// Creates a private in-memory store
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Uncommitted transactions roll back on drop; a poisoned guard is consistent.
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ----- lookups used by the importer -----

    pub fn get_term(&self, term_id: &str) -> Result<Option<DbAcademicTerm>> {
        self.conn()
            .query_row(
                "SELECT id, academic_year_id, name FROM academic_terms WHERE id = ?",
                [term_id],
                |row| {
                    Ok(DbAcademicTerm {
                        id: row.get(0)?,
                        academic_year_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    /// Finds a class of the given academic year by (trimmed, case-insensitive) name
    pub fn find_class_by_name(
        &self,
        academic_year_id: &str,
        name: &str,
    ) -> Result<Option<DbClass>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT id, name, grade_level, academic_year_id, class_type,
                    subject_group_code, max_students
             FROM classes
             WHERE academic_year_id = ?
             ORDER BY name",
        )?;

        let wanted = name.trim().to_lowercase();
        let classes = stmt
            .query_map([academic_year_id], map_class)?
            .collect::<Result<Vec<_>>>()?;

        Ok(classes
            .into_iter()
            .find(|c| c.name.trim().to_lowercase() == wanted))
    }

    /// Gets all time slots ordered by their position in the day
    pub fn get_time_slots(&self) -> Result<Vec<DbTimeSlot>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT id, name, start_time, end_time, order_index, is_break
             FROM time_slots
             ORDER BY order_index, id",
        )?;

        let slots = stmt.query_map([], |row| {
            Ok(DbTimeSlot {
                id: row.get(0)?,
                name: row.get(1)?,
                start_time: row.get(2)?,
                end_time: row.get(3)?,
                order_index: row.get(4)?,
                is_break: row.get(5)?,
            })
        })?;

        slots.collect()
    }

    pub fn get_subjects(&self) -> Result<Vec<DbSubject>> {
        let db = self.conn();
        let mut stmt = db.prepare("SELECT id, name, code FROM subjects ORDER BY id")?;
        let subjects = stmt.query_map([], |row| {
            Ok(DbSubject {
                id: row.get(0)?,
                name: row.get(1)?,
                code: row.get(2)?,
            })
        })?;

        subjects.collect()
    }

    pub fn teacher_exists(&self, teacher_id: &str) -> Result<bool> {
        self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM teachers WHERE id = ?)",
            [teacher_id],
            |row| row.get(0),
        )
    }

    pub fn student_exists(&self, student_id: &str) -> Result<bool> {
        self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?)",
            [student_id],
            |row| row.get(0),
        )
    }

    /// Checks whether the teacher is assigned to teach the subject in the class for the term
    pub fn has_teaching_assignment(
        &self,
        teacher_id: &str,
        class_id: &str,
        subject_id: &str,
        academic_term_id: &str,
    ) -> Result<bool> {
        self.conn().query_row(
            "SELECT EXISTS(
                SELECT 1 FROM teaching_assignments
                WHERE teacher_id = ?1 AND class_id = ?2
                  AND subject_id = ?3 AND academic_term_id = ?4
            )",
            params![teacher_id, class_id, subject_id, academic_term_id],
            |row| row.get(0),
        )
    }

    /// Active schedule rows of a teacher at the given slot
    pub fn find_teacher_entries_at(
        &self,
        teacher_id: &str,
        slot: &SlotKey,
    ) -> Result<Vec<DbScheduleEntry>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM teaching_schedules
             WHERE is_active = 1 AND teacher_id = ?1 AND academic_term_id = ?2
               AND week_number = ?3 AND day_of_week = ?4 AND time_slot_id = ?5"
        ))?;

        let rows = stmt.query_map(
            params![
                teacher_id,
                slot.academic_term_id,
                slot.week_number,
                slot.day_of_week,
                slot.time_slot_id
            ],
            map_schedule_entry,
        )?;

        rows.collect()
    }

    /// Active schedule rows of a class at the given slot
    pub fn find_class_entries_at(
        &self,
        class_id: &str,
        slot: &SlotKey,
    ) -> Result<Vec<DbScheduleEntry>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM teaching_schedules
             WHERE is_active = 1 AND class_id = ?1 AND academic_term_id = ?2
               AND week_number = ?3 AND day_of_week = ?4 AND time_slot_id = ?5"
        ))?;

        let rows = stmt.query_map(
            params![
                class_id,
                slot.academic_term_id,
                slot.week_number,
                slot.day_of_week,
                slot.time_slot_id
            ],
            map_schedule_entry,
        )?;

        rows.collect()
    }

    /// Writes an import in a single transaction.
    ///
    /// When `replace_classes` is given, the existing rows of those classes for
    /// the term/week are deleted first. The history record is written last.
    pub fn write_schedule_import(
        &self,
        replace_classes: Option<&[String]>,
        entries: &[ScheduleEntry],
        record: &ImportRecord,
    ) -> Result<WriteStats> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let mut stats = WriteStats::default();

        if let Some(class_ids) = replace_classes {
            for class_id in class_ids {
                stats.replaced += tx.execute(
                    "DELETE FROM teaching_schedules
                     WHERE class_id = ?1 AND academic_term_id = ?2 AND week_number = ?3",
                    params![class_id, record.academic_term_id, record.week_number],
                )?;
            }
        }

        {
            let mut insert = tx.prepare(
                "INSERT INTO teaching_schedules (
                    id, academic_term_id, class_id, teacher_id, subject_id,
                    day_of_week, time_slot_id, week_number, room_number, notes,
                    is_special_activity, is_active, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, datetime('now'))",
            )?;

            for entry in entries {
                insert.execute(params![
                    new_id(),
                    record.academic_term_id,
                    entry.class_id,
                    entry.teacher_id,
                    entry.subject_id,
                    entry.day_of_week,
                    entry.time_slot_id,
                    entry.week_number,
                    entry.room_number,
                    entry.notes,
                    entry.is_special_activity,
                ])?;
                stats.inserted += 1;
            }
        }

        tx.execute(
            "INSERT INTO schedule_imports (
                id, academic_term_id, week_number, file_name, file_sha256,
                sheets, entries_created, replaced_entries, imported_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.academic_term_id,
                record.week_number,
                record.file_name,
                record.file_sha256,
                record.sheets as i64,
                stats.inserted as i64,
                stats.replaced as i64,
                record.imported_at,
            ],
        )?;

        tx.commit()?;
        debug!(
            inserted = stats.inserted,
            replaced = stats.replaced,
            "Committed schedule import"
        );

        Ok(stats)
    }

    /// Lists active schedule rows of a term, optionally filtered by week and class
    pub fn get_schedule_entries(
        &self,
        academic_term_id: &str,
        week_number: Option<i64>,
        class_id: Option<&str>,
    ) -> Result<Vec<DbScheduleEntry>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM teaching_schedules s
             WHERE is_active = 1 AND academic_term_id = ?1
               AND (?2 IS NULL OR week_number = ?2)
               AND (?3 IS NULL OR class_id = ?3)
             ORDER BY week_number, class_id, day_of_week,
                      (SELECT order_index FROM time_slots t WHERE t.id = s.time_slot_id)"
        ))?;

        let rows = stmt.query_map(
            params![academic_term_id, week_number, class_id],
            map_schedule_entry,
        )?;

        rows.collect()
    }

    pub fn count_schedule_imports(&self, academic_term_id: &str) -> Result<i64> {
        self.conn().query_row(
            "SELECT COUNT(*) FROM schedule_imports WHERE academic_term_id = ?",
            [academic_term_id],
            |row| row.get(0),
        )
    }

    // ----- combined classes -----

    /// Students actively enrolled in a main class of the year/grade, whose
    /// subject group matches and who are not in a combined class for it yet
    pub fn get_combined_class_candidates(
        &self,
        academic_year_id: &str,
        grade_level: i64,
        subject_group_code: &str,
    ) -> Result<Vec<DbStudent>> {
        query_combined_class_candidates(&self.conn(), academic_year_id, grade_level, subject_group_code)
    }

    pub fn count_combined_classes(
        &self,
        academic_year_id: &str,
        grade_level: i64,
        subject_group_code: &str,
    ) -> Result<i64> {
        query_combined_class_count(&self.conn(), academic_year_id, grade_level, subject_group_code)
    }

    /// Reads the candidates, lets `plan` split their ids into groups, then
    /// creates one combined class per group and enrolls its students.
    ///
    /// Everything runs in one transaction under the connection lock, so two
    /// concurrent calls never place the same student twice. Numbering
    /// continues after the existing combined classes. No candidates means
    /// nothing is written and an empty list is returned.
    pub fn create_combined_classes<F>(
        &self,
        academic_year_id: &str,
        grade_level: i64,
        subject_group_code: &str,
        max_students: usize,
        plan: F,
    ) -> Result<Vec<CreatedClass>>
    where
        F: FnOnce(Vec<String>) -> Vec<Vec<String>>,
    {
        let mut db = self.conn();
        let tx = db.transaction()?;

        let candidates =
            query_combined_class_candidates(&tx, academic_year_id, grade_level, subject_group_code)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let first_index =
            query_combined_class_count(&tx, academic_year_id, grade_level, subject_group_code)? as usize + 1;
        let groups = plan(candidates.into_iter().map(|s| s.id).collect());
        let mut created = Vec::with_capacity(groups.len());

        for (offset, student_ids) in groups.iter().enumerate() {
            let class_id = new_id();
            let name = format!(
                "{}-{}-{}",
                grade_level,
                subject_group_code,
                first_index + offset
            );

            tx.execute(
                "INSERT INTO classes (
                    id, name, grade_level, academic_year_id, class_type,
                    subject_group_code, max_students, created_at
                ) VALUES (?1, ?2, ?3, ?4, 'combined', ?5, ?6, datetime('now'))",
                params![
                    class_id,
                    name,
                    grade_level,
                    academic_year_id,
                    subject_group_code,
                    max_students as i64
                ],
            )?;

            for student_id in student_ids {
                tx.execute(
                    "INSERT INTO class_enrollments (class_id, student_id, is_active, enrolled_at)
                     VALUES (?1, ?2, 1, datetime('now'))",
                    params![class_id, student_id],
                )?;
            }

            created.push(CreatedClass {
                id: class_id,
                name,
                grade_level,
                subject_group_code: subject_group_code.to_string(),
                max_students: max_students as i64,
                enrolled_students: student_ids.len(),
            });
        }

        tx.commit()?;
        Ok(created)
    }

    // ----- grades -----

    pub fn get_student_grades(
        &self,
        student_id: &str,
        academic_term_id: &str,
    ) -> Result<Vec<DbGrade>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT g.subject_id, sub.name, g.component, g.score
             FROM grades g
             JOIN subjects sub ON sub.id = g.subject_id
             WHERE g.student_id = ?1 AND g.academic_term_id = ?2
             ORDER BY sub.name, g.component",
        )?;

        let grades = stmt.query_map(params![student_id, academic_term_id], |row| {
            Ok(DbGrade {
                subject_id: row.get(0)?,
                subject_name: row.get(1)?,
                component: row.get(2)?,
                score: row.get(3)?,
            })
        })?;

        grades.collect()
    }

    // ----- reference data -----

    pub fn insert_academic_year(&self, id: &str, name: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO academic_years (id, name) VALUES (?1, ?2)",
            params![id, name],
        )?;
        Ok(())
    }

    pub fn insert_academic_term(&self, id: &str, academic_year_id: &str, name: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO academic_terms (id, academic_year_id, name) VALUES (?1, ?2, ?3)",
            params![id, academic_year_id, name],
        )?;
        Ok(())
    }

    pub fn insert_teacher(&self, id: &str, full_name: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO teachers (id, full_name) VALUES (?1, ?2)",
            params![id, full_name],
        )?;
        Ok(())
    }

    pub fn insert_subject(&self, id: &str, name: &str, code: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO subjects (id, name, code) VALUES (?1, ?2, ?3)",
            params![id, name, code],
        )?;
        Ok(())
    }

    pub fn insert_class(
        &self,
        id: &str,
        name: &str,
        grade_level: i64,
        academic_year_id: &str,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO classes (id, name, grade_level, academic_year_id, class_type, created_at)
             VALUES (?1, ?2, ?3, ?4, 'main', datetime('now'))",
            params![id, name, grade_level, academic_year_id],
        )?;
        Ok(())
    }

    pub fn insert_student(
        &self,
        id: &str,
        student_code: &str,
        full_name: &str,
        subject_group_code: Option<&str>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO students (id, student_code, full_name, subject_group_code)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, student_code, full_name, subject_group_code],
        )?;
        Ok(())
    }

    pub fn enroll_student(&self, class_id: &str, student_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO class_enrollments (class_id, student_id, is_active, enrolled_at)
             VALUES (?1, ?2, 1, datetime('now'))",
            params![class_id, student_id],
        )?;
        Ok(())
    }

    pub fn insert_time_slot(
        &self,
        id: &str,
        name: &str,
        start_time: &str,
        end_time: &str,
        order_index: i64,
        is_break: bool,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO time_slots (id, name, start_time, end_time, order_index, is_break)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, name, start_time, end_time, order_index, is_break],
        )?;
        Ok(())
    }

    pub fn insert_teaching_assignment(
        &self,
        teacher_id: &str,
        class_id: &str,
        subject_id: &str,
        academic_term_id: &str,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO teaching_assignments
                (id, teacher_id, class_id, subject_id, academic_term_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![new_id(), teacher_id, class_id, subject_id, academic_term_id],
        )?;
        Ok(())
    }

    pub fn insert_grade(
        &self,
        student_id: &str,
        subject_id: &str,
        academic_term_id: &str,
        component: &str,
        score: f64,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO grades (id, student_id, subject_id, academic_term_id, component, score)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![new_id(), student_id, subject_id, academic_term_id, component, score],
        )?;
        Ok(())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn query_combined_class_candidates(
    conn: &Connection,
    academic_year_id: &str,
    grade_level: i64,
    subject_group_code: &str,
) -> Result<Vec<DbStudent>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT s.id, s.student_code, s.full_name, s.subject_group_code
         FROM students s
         JOIN class_enrollments e ON e.student_id = s.id AND e.is_active = 1
         JOIN classes c ON c.id = e.class_id
         WHERE c.academic_year_id = ?1 AND c.grade_level = ?2
           AND c.class_type = 'main' AND s.subject_group_code = ?3
           AND NOT EXISTS (
               SELECT 1 FROM class_enrollments e2
               JOIN classes c2 ON c2.id = e2.class_id
               WHERE e2.student_id = s.id AND e2.is_active = 1
                 AND c2.class_type = 'combined'
                 AND c2.academic_year_id = ?1
                 AND c2.subject_group_code = ?3
           )
         ORDER BY s.student_code",
    )?;

    let students = stmt.query_map(
        params![academic_year_id, grade_level, subject_group_code],
        |row| {
            Ok(DbStudent {
                id: row.get(0)?,
                student_code: row.get(1)?,
                full_name: row.get(2)?,
                subject_group_code: row.get(3)?,
            })
        },
    )?;

    students.collect()
}

fn query_combined_class_count(
    conn: &Connection,
    academic_year_id: &str,
    grade_level: i64,
    subject_group_code: &str,
) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM classes
         WHERE class_type = 'combined' AND academic_year_id = ?1
           AND grade_level = ?2 AND subject_group_code = ?3",
        params![academic_year_id, grade_level, subject_group_code],
        |row| row.get(0),
    )
}

fn map_class(row: &Row<'_>) -> Result<DbClass> {
    Ok(DbClass {
        id: row.get(0)?,
        name: row.get(1)?,
        grade_level: row.get(2)?,
        academic_year_id: row.get(3)?,
        class_type: row.get(4)?,
        subject_group_code: row.get(5)?,
        max_students: row.get(6)?,
    })
}

fn map_schedule_entry(row: &Row<'_>) -> Result<DbScheduleEntry> {
    Ok(DbScheduleEntry {
        id: row.get(0)?,
        academic_term_id: row.get(1)?,
        class_id: row.get(2)?,
        teacher_id: row.get(3)?,
        subject_id: row.get(4)?,
        day_of_week: row.get(5)?,
        time_slot_id: row.get(6)?,
        week_number: row.get(7)?,
        room_number: row.get(8)?,
        notes: row.get(9)?,
        is_special_activity: row.get(10)?,
    })
}
