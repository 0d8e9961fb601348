//! CLI presentation: text and json formatters per command family.

mod course;
mod learner;
mod shared;

pub use course::{
    format_chunk_result, format_course, format_course_list, format_created,
    format_drive_report, format_journal, format_progress, format_publish_result,
};
pub use learner::{
    format_certificate, format_eligibility, format_progress_summary, format_quiz_result,
};
pub use shared::{to_json, OutputFormat};
