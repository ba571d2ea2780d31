//! Teacher and class double-booking detection.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use super::types::SlotKey;
use crate::db::SchoolDbManager;

/// A blocking scheduling conflict for one cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("Teacher {teacher_id} is already scheduled in class {other_class_id} at this time")]
    TeacherBusy {
        teacher_id: String,
        other_class_id: String,
    },

    #[error("Teacher {teacher_id} is scheduled twice at this time in this upload (also in class {other_class_id})")]
    TeacherBusyInUpload {
        teacher_id: String,
        other_class_id: String,
    },

    #[error("Class {class_id} already has a lesson at this time")]
    ClassBusy { class_id: String },

    #[error("Class {class_id} has two lessons at this time in this upload")]
    ClassBusyInUpload { class_id: String },
}

/// Detects double-booking against stored rows and rows pending in the same upload.
///
/// Stored rows of classes in `replaced_classes` are ignored, since the write
/// phase deletes them before inserting.
pub struct ConflictChecker<'a> {
    db: &'a SchoolDbManager,
    replaced_classes: HashSet<String>,
    pending_teachers: HashMap<(String, SlotKey), String>,
    pending_classes: HashSet<(String, SlotKey)>,
}

impl<'a> ConflictChecker<'a> {
    pub fn new(db: &'a SchoolDbManager) -> Self {
        Self {
            db,
            replaced_classes: HashSet::new(),
            pending_teachers: HashMap::new(),
            pending_classes: HashSet::new(),
        }
    }

    pub fn ignoring_classes<I>(mut self, class_ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.replaced_classes.extend(class_ids);
        self
    }

    /// Runs the teacher-scoped and class-scoped lookups for one cell.
    pub fn check(
        &self,
        teacher_id: Option<&str>,
        class_id: &str,
        slot: &SlotKey,
    ) -> rusqlite::Result<Vec<Conflict>> {
        let mut conflicts = Vec::new();

        if let Some(teacher_id) = teacher_id {
            let key = (teacher_id.to_string(), slot.clone());
            if let Some(other) = self.pending_teachers.get(&key) {
                conflicts.push(Conflict::TeacherBusyInUpload {
                    teacher_id: teacher_id.to_string(),
                    other_class_id: other.clone(),
                });
            } else if let Some(existing) = self
                .db
                .find_teacher_entries_at(teacher_id, slot)?
                .into_iter()
                .find(|e| !self.replaced_classes.contains(&e.class_id))
            {
                conflicts.push(Conflict::TeacherBusy {
                    teacher_id: teacher_id.to_string(),
                    other_class_id: existing.class_id,
                });
            }
        }

        if self
            .pending_classes
            .contains(&(class_id.to_string(), slot.clone()))
        {
            conflicts.push(Conflict::ClassBusyInUpload {
                class_id: class_id.to_string(),
            });
        } else if !self.replaced_classes.contains(class_id)
            && !self.db.find_class_entries_at(class_id, slot)?.is_empty()
        {
            conflicts.push(Conflict::ClassBusy {
                class_id: class_id.to_string(),
            });
        }

        Ok(conflicts)
    }

    /// Marks the slot as taken by an entry accepted into the upload.
    pub fn reserve(&mut self, teacher_id: Option<&str>, class_id: &str, slot: &SlotKey) {
        if let Some(teacher_id) = teacher_id {
            self.pending_teachers
                .insert((teacher_id.to_string(), slot.clone()), class_id.to_string());
        }
        self.pending_classes
            .insert((class_id.to_string(), slot.clone()));
    }
}
