//! Parsing of free-text timetable cells.
//!
//! Accepted shapes, tried in order:
//! - special activity literals (`Chào cờ`, `Sinh hoạt lớp`, ...)
//! - `Name - Subject (teacher_id|subject_id) - Room`
//! - `Name - Subject (teacher_id|subject_id)`
//! - `Name (teacher_id) - Subject - Room` (legacy export format)
//! - anything else is taken as a subject name

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Structured content of a timetable cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedCell {
    pub teacher_id: Option<String>,
    pub subject_id: Option<String>,
    pub subject_name: Option<String>,
    pub room_number: Option<String>,
}

impl ParsedCell {
    pub fn is_empty(&self) -> bool {
        self.teacher_id.is_none()
            && self.subject_id.is_none()
            && self.subject_name.is_none()
            && self.room_number.is_none()
    }
}

/// Fixed whole-school activities that occupy a slot without a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpecialActivity {
    FlagCeremony,
    ClassMeeting,
}

impl SpecialActivity {
    /// Recognizes a special-activity cell, ignoring case and repeated whitespace.
    pub fn detect(text: &str) -> Option<Self> {
        let normalized = normalize(text);
        match normalized.as_str() {
            "chào cờ" | "chao co" | "flag ceremony" => Some(SpecialActivity::FlagCeremony),
            "sinh hoạt lớp" | "sinh hoat lop" | "shl" | "class meeting" => {
                Some(SpecialActivity::ClassMeeting)
            }
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SpecialActivity::FlagCeremony => "Chào cờ",
            SpecialActivity::ClassMeeting => "Sinh hoạt lớp",
        }
    }
}

// The subject is whatever follows the last hyphen before the id group, so
// hyphenated teacher names stay in `name`.
static FULL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>.+)-\s*(?P<subject>[^()\-]+?)\s*\(\s*(?P<tid>[^|()]+?)\s*\|\s*(?P<sid>[^|()]+?)\s*\)\s*-\s*(?P<room>.+?)$",
    )
    .unwrap()
});
static NO_ROOM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>.+)-\s*(?P<subject>[^()\-]+?)\s*\(\s*(?P<tid>[^|()]+?)\s*\|\s*(?P<sid>[^|()]+?)\s*\)$",
    )
    .unwrap()
});
static LEGACY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[^()]+?)\s*\(\s*(?P<tid>[^()|]+?)\s*\)\s*-\s*(?P<subject>.+?)\s*-\s*(?P<room>.+?)$",
    )
    .unwrap()
});

/// Parses a cell into its structured parts.
///
/// Empty cells and special activities yield an empty result; text that
/// matches no pattern is returned as a bare subject name.
pub fn parse_cell(text: &str) -> ParsedCell {
    let text = text.trim();
    if text.is_empty() || SpecialActivity::detect(text).is_some() {
        return ParsedCell::default();
    }

    if let Some(caps) = FULL_PATTERN.captures(text) {
        return ParsedCell {
            teacher_id: capture(&caps, "tid"),
            subject_id: capture(&caps, "sid"),
            subject_name: capture(&caps, "subject"),
            room_number: capture(&caps, "room"),
        };
    }

    if let Some(caps) = NO_ROOM_PATTERN.captures(text) {
        return ParsedCell {
            teacher_id: capture(&caps, "tid"),
            subject_id: capture(&caps, "sid"),
            subject_name: capture(&caps, "subject"),
            room_number: None,
        };
    }

    if let Some(caps) = LEGACY_PATTERN.captures(text) {
        return ParsedCell {
            teacher_id: capture(&caps, "tid"),
            subject_id: None,
            subject_name: capture(&caps, "subject"),
            room_number: capture(&caps, "room"),
        };
    }

    ParsedCell {
        subject_name: Some(text.to_string()),
        ..Default::default()
    }
}

fn capture(caps: &regex::Captures<'_>, group: &str) -> Option<String> {
    caps.name(group)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
