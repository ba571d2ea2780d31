/// Teaching-assignment presence check
use crate::db::SchoolDbManager;

/// Confirms a (teacher, class, subject, term) tuple against the assignment table.
///
/// A missing assignment is only ever reported as a warning by the importer.
pub struct AssignmentValidator<'a> {
    db: &'a SchoolDbManager,
    academic_term_id: &'a str,
}

impl<'a> AssignmentValidator<'a> {
    pub fn new(db: &'a SchoolDbManager, academic_term_id: &'a str) -> Self {
        Self {
            db,
            academic_term_id,
        }
    }

    pub fn is_assigned(
        &self,
        teacher_id: &str,
        class_id: &str,
        subject_id: &str,
    ) -> rusqlite::Result<bool> {
        self.db
            .has_teaching_assignment(teacher_id, class_id, subject_id, self.academic_term_id)
    }

    /// Returns the warning text for an unassigned tuple, if any.
    pub fn warning_for(
        &self,
        teacher_id: &str,
        class_id: &str,
        subject_id: &str,
    ) -> rusqlite::Result<Option<String>> {
        if self.is_assigned(teacher_id, class_id, subject_id)? {
            return Ok(None);
        }

        Ok(Some(format!(
            "Teacher {teacher_id} is not assigned to subject {subject_id} for this class in the term"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_lookup() {
        let db = SchoolDbManager::in_memory().unwrap();
        db.insert_academic_year("Y1", "2025-2026").unwrap();
        db.insert_academic_term("T1", "Y1", "HK1").unwrap();
        db.insert_academic_term("T2", "Y1", "HK2").unwrap();
        db.insert_class("C1", "10A1", 10, "Y1").unwrap();
        db.insert_teacher("T01", "Nguyen Van A").unwrap();
        db.insert_subject("S01", "Toán", "TOAN").unwrap();
        db.insert_teaching_assignment("T01", "C1", "S01", "T1").unwrap();

        let term1 = AssignmentValidator::new(&db, "T1");
        assert!(term1.is_assigned("T01", "C1", "S01").unwrap());
        assert_eq!(term1.warning_for("T01", "C1", "S01").unwrap(), None);

        let term2 = AssignmentValidator::new(&db, "T2");
        assert!(!term2.is_assigned("T01", "C1", "S01").unwrap());
        assert!(term2.warning_for("T01", "C1", "S01").unwrap().is_some());
    }
}
