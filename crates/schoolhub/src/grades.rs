//! Coefficient-weighted subject averages.
//!
//! Regular assessments count once, the mid-term twice and the final exam
//! three times. Averages are rounded to one decimal place.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::DbGrade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Regular,
    Midterm,
    Final,
}

impl Component {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(Component::Regular),
            "midterm" => Some(Component::Midterm),
            "final" => Some(Component::Final),
            _ => None,
        }
    }

    pub fn coefficient(&self) -> u32 {
        match self {
            Component::Regular => 1,
            Component::Midterm => 2,
            Component::Final => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Excellent,
    Good,
    Average,
    Weak,
    Poor,
}

impl Classification {
    pub fn from_average(avg: f64) -> Self {
        if avg >= 8.0 {
            Classification::Excellent
        } else if avg >= 6.5 {
            Classification::Good
        } else if avg >= 5.0 {
            Classification::Average
        } else if avg >= 3.5 {
            Classification::Weak
        } else {
            Classification::Poor
        }
    }
}

/// Weighted average of (component, score) pairs, or `None` without scores.
pub fn weighted_average<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = (Component, f64)>,
{
    let (sum, weight) = scores
        .into_iter()
        .fold((0.0, 0u32), |(sum, weight), (component, score)| {
            let c = component.coefficient();
            (sum + score * c as f64, weight + c)
        });

    (weight > 0).then(|| round1(sum / weight as f64))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectAverage {
    pub subject_id: String,
    pub subject_name: String,
    pub regular_scores: Vec<f64>,
    pub midterm: Option<f64>,
    pub final_exam: Option<f64>,
    pub average: Option<f64>,
    pub classification: Option<Classification>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeSummary {
    pub student_id: String,
    pub academic_term_id: String,
    pub subjects: Vec<SubjectAverage>,
    pub overall_average: Option<f64>,
    pub classification: Option<Classification>,
}

/// Builds per-subject averages and the overall term average.
///
/// Rows with an unknown component are skipped. The overall average is the
/// plain mean of subject averages.
pub fn summarize(student_id: &str, academic_term_id: &str, grades: &[DbGrade]) -> GradeSummary {
    let mut by_subject: BTreeMap<(&str, &str), Vec<(Component, f64)>> = BTreeMap::new();
    for grade in grades {
        if let Some(component) = Component::parse(&grade.component) {
            by_subject
                .entry((grade.subject_name.as_str(), grade.subject_id.as_str()))
                .or_default()
                .push((component, grade.score));
        }
    }

    let subjects: Vec<SubjectAverage> = by_subject
        .into_iter()
        .map(|((name, id), scores)| {
            let pick = |wanted: Component| {
                scores
                    .iter()
                    .filter(|(c, _)| *c == wanted)
                    .map(|(_, s)| *s)
                    .last()
            };
            let average = weighted_average(scores.iter().copied());

            SubjectAverage {
                subject_id: id.to_string(),
                subject_name: name.to_string(),
                regular_scores: scores
                    .iter()
                    .filter(|(c, _)| *c == Component::Regular)
                    .map(|(_, s)| *s)
                    .collect(),
                midterm: pick(Component::Midterm),
                final_exam: pick(Component::Final),
                average,
                classification: average.map(Classification::from_average),
            }
        })
        .collect();

    let averages: Vec<f64> = subjects.iter().filter_map(|s| s.average).collect();
    let overall_average =
        (!averages.is_empty()).then(|| round1(averages.iter().sum::<f64>() / averages.len() as f64));

    GradeSummary {
        student_id: student_id.to_string(),
        academic_term_id: academic_term_id.to_string(),
        subjects,
        overall_average,
        classification: overall_average.map(Classification::from_average),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_average() {
        let avg = weighted_average([
            (Component::Regular, 8.0),
            (Component::Regular, 9.0),
            (Component::Midterm, 7.0),
            (Component::Final, 8.0),
        ]);
        // (8 + 9 + 14 + 24) / 7 = 7.857...
        assert_eq!(avg, Some(7.9));
        assert_eq!(weighted_average(Vec::new()), None);
    }

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(Classification::from_average(8.0), Classification::Excellent);
        assert_eq!(Classification::from_average(7.9), Classification::Good);
        assert_eq!(Classification::from_average(6.5), Classification::Good);
        assert_eq!(Classification::from_average(5.0), Classification::Average);
        assert_eq!(Classification::from_average(3.5), Classification::Weak);
        assert_eq!(Classification::from_average(3.4), Classification::Poor);
    }

    fn grade(subject: &str, component: &str, score: f64) -> DbGrade {
        DbGrade {
            subject_id: subject.to_lowercase(),
            subject_name: subject.to_string(),
            component: component.to_string(),
            score,
        }
    }

    #[test]
    fn test_summarize() {
        let grades = vec![
            grade("Toán", "regular", 8.0),
            grade("Toán", "regular", 9.0),
            grade("Toán", "midterm", 7.0),
            grade("Toán", "final", 8.0),
            grade("Văn", "final", 6.1),
            grade("Văn", "bogus", 1.0),
        ];
        let summary = summarize("ST1", "T1", &grades);

        assert_eq!(summary.subjects.len(), 2);
        let toan = &summary.subjects[0];
        assert_eq!(toan.subject_name, "Toán");
        assert_eq!(toan.regular_scores, vec![8.0, 9.0]);
        assert_eq!(toan.midterm, Some(7.0));
        assert_eq!(toan.average, Some(7.9));
        assert_eq!(summary.subjects[1].average, Some(6.1));
        // (7.9 + 6.1) / 2
        assert_eq!(summary.overall_average, Some(7.0));
        assert_eq!(summary.classification, Some(Classification::Good));
    }
}
