/// Subject lookup by free-text name
use crate::db::DbSubject;

/// How a subject name was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    CaseInsensitive,
    Substring,
}

/// Resolves subject names against the subject catalog.
///
/// Tiers are tried in order (exact name/code, case-insensitive name/code,
/// substring of name/code). Within a tier the shortest name wins, then the
/// smallest id, so the result never depends on row order.
pub struct SubjectResolver {
    subjects: Vec<DbSubject>,
}

impl SubjectResolver {
    pub fn new(subjects: Vec<DbSubject>) -> Self {
        Self { subjects }
    }

    /// Returns the matched subject and the tier that matched it.
    pub fn resolve(&self, name: &str) -> Option<(&DbSubject, MatchTier)> {
        let query = name.trim();
        if query.is_empty() {
            return None;
        }

        let lowered = query.to_lowercase();

        if let Some(s) = self.best(|s| s.name == query || s.code == query) {
            return Some((s, MatchTier::Exact));
        }

        if let Some(s) = self.best(|s| {
            s.name.to_lowercase() == lowered || s.code.to_lowercase() == lowered
        }) {
            return Some((s, MatchTier::CaseInsensitive));
        }

        self.best(|s| {
            s.name.to_lowercase().contains(&lowered) || s.code.to_lowercase().contains(&lowered)
        })
        .map(|s| (s, MatchTier::Substring))
    }

    /// Convenience wrapper returning only the subject id.
    pub fn resolve_id(&self, name: &str) -> Option<&str> {
        self.resolve(name).map(|(s, _)| s.id.as_str())
    }

    /// Looks up a subject by id.
    pub fn get(&self, subject_id: &str) -> Option<&DbSubject> {
        self.subjects.iter().find(|s| s.id == subject_id)
    }

    fn best<F>(&self, predicate: F) -> Option<&DbSubject>
    where
        F: Fn(&DbSubject) -> bool,
    {
        self.subjects
            .iter()
            .filter(|s| predicate(s))
            .min_by(|a, b| {
                a.name
                    .chars()
                    .count()
                    .cmp(&b.name.chars().count())
                    .then_with(|| a.id.cmp(&b.id))
            })
    }
}
