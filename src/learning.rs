//! Learner-facing reads over a finished course: quiz grading, section progress
//! and certificate eligibility. Everything here is recomputed from stored state.

pub mod certificate;
pub mod progress;
pub mod quiz;

pub use certificate::{certificate_eligible, Certificate};
pub use progress::{summarize_progress, ProgressSummary};
pub use quiz::{grade_quiz, QuizResult};
