//! Combined-class distribution.
//!
//! Students of one grade who chose the same subject group are shuffled and
//! split into combined classes of at most `max_class_size` students.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::db::{CreatedClass, SchoolDbManager};

#[derive(Debug, Error)]
pub enum ClassError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid grade level: {0}")]
    InvalidGradeLevel(i64),

    #[error("No eligible students for subject group {code} in grade {grade_level}")]
    NoEligibleStudents { grade_level: i64, code: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Parameters of a combined-class request.
#[derive(Debug, Clone, Deserialize)]
pub struct CombinedClassRequest {
    #[serde(default)]
    pub academic_year_id: String,
    pub grade_level: Option<i64>,
    #[serde(default)]
    pub subject_group_code: String,
}

impl CombinedClassRequest {
    fn validate(&self) -> Result<(&str, i64, &str), ClassError> {
        let year = self.academic_year_id.trim();
        if year.is_empty() {
            return Err(ClassError::MissingField("academic_year_id"));
        }
        let code = self.subject_group_code.trim();
        if code.is_empty() {
            return Err(ClassError::MissingField("subject_group_code"));
        }
        let grade = self
            .grade_level
            .ok_or(ClassError::MissingField("grade_level"))?;
        if !(1..=12).contains(&grade) {
            return Err(ClassError::InvalidGradeLevel(grade));
        }
        Ok((year, grade, code))
    }
}

/// What a creation would do, without writing anything.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedClassPreview {
    pub eligible_students: usize,
    pub max_class_size: usize,
    pub planned_classes: usize,
    pub group_sizes: Vec<usize>,
    pub existing_combined_classes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombinedClassResult {
    pub classes: Vec<CreatedClass>,
    pub total_students: usize,
}

/// Shuffles `items` and splits them into chunks of at most `max_size`.
pub fn distribute<T, R>(mut items: Vec<T>, max_size: usize, rng: &mut R) -> Vec<Vec<T>>
where
    R: Rng + ?Sized,
{
    let max_size = max_size.max(1);
    items.shuffle(rng);

    let mut groups = Vec::with_capacity(items.len().div_ceil(max_size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        groups.push(iter.by_ref().take(max_size).collect());
    }
    groups
}

fn group_sizes(total: usize, max_size: usize) -> Vec<usize> {
    let max_size = max_size.max(1);
    (0..total.div_ceil(max_size))
        .map(|i| (total - i * max_size).min(max_size))
        .collect()
}

pub struct CombinedClassPlanner<'a> {
    db: &'a SchoolDbManager,
    max_class_size: usize,
}

impl<'a> CombinedClassPlanner<'a> {
    pub fn new(db: &'a SchoolDbManager, max_class_size: usize) -> Self {
        Self { db, max_class_size }
    }

    pub fn preview(&self, request: &CombinedClassRequest) -> Result<CombinedClassPreview, ClassError> {
        let (year, grade, code) = request.validate()?;
        let students = self.db.get_combined_class_candidates(year, grade, code)?;
        let existing = self.db.count_combined_classes(year, grade, code)?;
        let sizes = group_sizes(students.len(), self.max_class_size);

        Ok(CombinedClassPreview {
            eligible_students: students.len(),
            max_class_size: self.max_class_size,
            planned_classes: sizes.len(),
            group_sizes: sizes,
            existing_combined_classes: existing,
        })
    }

    /// Creates the combined classes and enrolls their students in one transaction.
    ///
    /// Candidate selection happens inside that transaction, so concurrent
    /// calls never place the same student twice.
    pub fn create<R>(
        &self,
        request: &CombinedClassRequest,
        rng: &mut R,
    ) -> Result<CombinedClassResult, ClassError>
    where
        R: Rng + ?Sized,
    {
        let (year, grade, code) = request.validate()?;
        let max_size = self.max_class_size;
        let classes = self
            .db
            .create_combined_classes(year, grade, code, max_size, |ids| {
                distribute(ids, max_size, rng)
            })?;

        if classes.is_empty() {
            return Err(ClassError::NoEligibleStudents {
                grade_level: grade,
                code: code.to_string(),
            });
        }
        let total_students = classes.iter().map(|c| c.enrolled_students).sum::<usize>();

        info!(
            academic_year = %year,
            grade_level = grade,
            subject_group = %code,
            classes = classes.len(),
            students = total_students,
            "Created combined classes"
        );

        Ok(CombinedClassResult {
            classes,
            total_students,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_distribute_respects_max_and_covers_all() {
        let mut rng = StdRng::seed_from_u64(7);
        let items: Vec<u32> = (0..80).collect();
        let groups = distribute(items, 35, &mut rng);

        assert_eq!(groups.iter().map(Vec::len).collect::<Vec<_>>(), vec![35, 35, 10]);
        let all: HashSet<u32> = groups.into_iter().flatten().collect();
        assert_eq!(all.len(), 80);
    }

    #[test]
    fn test_distribute_edge_sizes() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(distribute(Vec::<u32>::new(), 35, &mut rng).is_empty());
        assert_eq!(distribute(vec![1, 2, 3], 35, &mut rng).len(), 1);
        assert_eq!(distribute(vec![1, 2, 3], 0, &mut rng).len(), 3);
    }

    #[test]
    fn test_group_sizes() {
        assert_eq!(group_sizes(70, 35), vec![35, 35]);
        assert_eq!(group_sizes(71, 35), vec![35, 35, 1]);
        assert!(group_sizes(0, 35).is_empty());
    }

    fn seeded(students: usize) -> SchoolDbManager {
        let db = SchoolDbManager::in_memory().unwrap();
        db.insert_academic_year("Y1", "2025-2026").unwrap();
        db.insert_class("C10A1", "10A1", 10, "Y1").unwrap();
        db.insert_class("C11A1", "11A1", 11, "Y1").unwrap();
        for i in 0..students {
            let id = format!("ST{i:03}");
            db.insert_student(&id, &id, &format!("Student {i}"), Some("KHTN1"))
                .unwrap();
            db.enroll_student("C10A1", &id).unwrap();
        }
        // different grade, same group
        db.insert_student("X1", "X1", "Other", Some("KHTN1")).unwrap();
        db.enroll_student("C11A1", "X1").unwrap();
        // same grade, other group
        db.insert_student("X2", "X2", "Other", Some("KHXH1")).unwrap();
        db.enroll_student("C10A1", "X2").unwrap();
        db
    }

    fn request() -> CombinedClassRequest {
        CombinedClassRequest {
            academic_year_id: "Y1".to_string(),
            grade_level: Some(10),
            subject_group_code: "KHTN1".to_string(),
        }
    }

    #[test]
    fn test_preview_and_create() {
        let db = seeded(40);
        let planner = CombinedClassPlanner::new(&db, 35);

        let preview = planner.preview(&request()).unwrap();
        assert_eq!(preview.eligible_students, 40);
        assert_eq!(preview.group_sizes, vec![35, 5]);
        assert_eq!(preview.existing_combined_classes, 0);

        let mut rng = StdRng::seed_from_u64(42);
        let created = planner.create(&request(), &mut rng).unwrap();
        assert_eq!(created.total_students, 40);
        let names: Vec<_> = created.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["10-KHTN1-1", "10-KHTN1-2"]);
        assert_eq!(
            created.classes.iter().map(|c| c.enrolled_students).sum::<usize>(),
            40
        );

        // everyone is placed now
        assert!(matches!(
            planner.create(&request(), &mut rng),
            Err(ClassError::NoEligibleStudents { .. })
        ));
        assert_eq!(planner.preview(&request()).unwrap().existing_combined_classes, 2);
    }

    #[test]
    fn test_numbering_continues_after_existing() {
        let db = seeded(3);
        let planner = CombinedClassPlanner::new(&db, 35);
        let mut rng = StdRng::seed_from_u64(3);
        planner.create(&request(), &mut rng).unwrap();

        db.insert_student("LATE", "LATE", "Late joiner", Some("KHTN1")).unwrap();
        db.enroll_student("C10A1", "LATE").unwrap();

        let created = planner.create(&request(), &mut rng).unwrap();
        assert_eq!(created.classes[0].name, "10-KHTN1-2");
        assert_eq!(created.total_students, 1);
    }

    #[test]
    fn test_concurrent_creates_place_each_student_once() {
        for round in 0..50u64 {
            let db = seeded(30);
            let planner = CombinedClassPlanner::new(&db, 35);

            let results: Vec<_> = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..2u64)
                    .map(|i| {
                        let planner = &planner;
                        scope.spawn(move || {
                            let mut rng = StdRng::seed_from_u64(round * 2 + i);
                            planner.create(&request(), &mut rng)
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });

            let created: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
            assert_eq!(created.len(), 1, "round {round}");
            assert_eq!(created[0].total_students, 30);
            assert!(results.iter().any(|r| matches!(r, Err(ClassError::NoEligibleStudents { .. }))));
            assert_eq!(db.count_combined_classes("Y1", 10, "KHTN1").unwrap(), 1);
            assert!(db.get_combined_class_candidates("Y1", 10, "KHTN1").unwrap().is_empty());
        }
    }

    #[test]
    fn test_validation() {
        let db = seeded(0);
        let planner = CombinedClassPlanner::new(&db, 35);

        let mut missing = request();
        missing.grade_level = None;
        assert!(matches!(
            planner.preview(&missing),
            Err(ClassError::MissingField("grade_level"))
        ));

        let mut bad = request();
        bad.grade_level = Some(13);
        assert!(matches!(
            planner.preview(&bad),
            Err(ClassError::InvalidGradeLevel(13))
        ));
    }
}
