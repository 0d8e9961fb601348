//! Section completion summary for one learner.

use crate::course::Course;
use crate::store::LearnerProgress;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    /// Completed ids that still exist in the course, in course order.
    pub completed_sections: Vec<String>,
}

/// Only ids naming a current section count; a learner with no record has done nothing.
pub fn summarize_progress(course: &Course, progress: Option<&LearnerProgress>) -> ProgressSummary {
    let completed_sections: Vec<String> = course
        .section_refs()
        .into_iter()
        .map(|r| r.to_string())
        .filter(|id| {
            progress
                .map(|p| p.completed_sections.contains(id))
                .unwrap_or(false)
        })
        .collect();
    let total = course.total_sections();
    let completed = completed_sections.len();
    let percent = if total == 0 {
        0
    } else {
        ((completed * 100 + total / 2) / total) as u8
    };
    ProgressSummary {
        completed,
        total,
        percent,
        completed_sections,
    }
}
