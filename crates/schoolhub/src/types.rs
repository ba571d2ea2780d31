use dashmap::DashMap;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::SchoolDbManager;

/// Key of an import lock: (academic term id, week number).
pub type ImportKey = (String, i64);

/// Shared state of the HTTP server.
pub struct AppState {
    /// The school database.
    pub db: SchoolDbManager,
    /// The loaded configuration.
    pub config: AppConfig,
    /// Imports touching the same term and week run one at a time.
    pub import_locks: DashMap<ImportKey, Arc<tokio::sync::Mutex<()>>>,
}

impl AppState {
    pub fn new(db: SchoolDbManager, config: AppConfig) -> Self {
        Self {
            db,
            config,
            import_locks: DashMap::new(),
        }
    }

    /// Gets or creates the lock for a term and week.
    pub fn get_import_lock(&self, academic_term_id: &str, week_number: i64) -> Arc<tokio::sync::Mutex<()>> {
        self.import_locks
            .entry((academic_term_id.to_string(), week_number))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drops the lock entry for a term and week once no caller holds it.
    ///
    /// Callers must drop their own `Arc` first.
    pub fn release_import_lock(&self, academic_term_id: &str, week_number: i64) {
        self.import_locks
            .remove_if(&(academic_term_id.to_string(), week_number), |_, lock| {
                Arc::strong_count(lock) == 1
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_lock_is_shared_per_key() {
        let state = AppState::new(SchoolDbManager::in_memory().unwrap(), AppConfig::default());
        let a = state.get_import_lock("T1", 1);
        let b = state.get_import_lock("T1", 1);
        let c = state.get_import_lock("T1", 2);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(state.import_locks.len(), 2);
    }

    #[test]
    fn test_release_keeps_held_locks() {
        let state = AppState::new(SchoolDbManager::in_memory().unwrap(), AppConfig::default());
        let held = state.get_import_lock("T1", 1);

        state.release_import_lock("T1", 1);
        assert_eq!(state.import_locks.len(), 1);

        drop(held);
        state.release_import_lock("T1", 1);
        assert!(state.import_locks.is_empty());
    }
}
