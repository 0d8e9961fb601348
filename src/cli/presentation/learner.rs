//! Learner command presentation: section progress, quiz results, certificates.

use super::shared::{percent_bar, to_json, OutputFormat};
use crate::error::ApiError;
use crate::learning::{Certificate, ProgressSummary, QuizResult};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

pub fn format_progress_summary(
    summary: &ProgressSummary,
    format: OutputFormat,
) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => to_json(summary),
        OutputFormat::Text => Ok(format!(
            "{} sections completed {}",
            format!("{}/{}", summary.completed, summary.total).bold(),
            percent_bar(summary.percent, 20)
        )),
    }
}

pub fn format_quiz_result(result: &QuizResult, format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(result);
    }
    let verdict = if result.passed {
        format!("{}", "PASSED".green().bold())
    } else {
        format!("{}", "NOT PASSED".red().bold())
    };
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Question", "Correct", "Answer"]);
    for (id, correct) in &result.per_question_correct {
        let answer = result
            .correct_answers
            .get(id)
            .map(|a| a.to_string())
            .unwrap_or_default();
        table.add_row(vec![
            id.clone(),
            if *correct { "yes" } else { "no" }.to_string(),
            answer,
        ]);
    }
    Ok(format!(
        "Score: {}% ({} of {} answered) {}\n{}",
        result.score_percent, result.answered, result.total, verdict, table
    ))
}

pub fn format_eligibility(
    user: &str,
    eligible: bool,
    format: OutputFormat,
) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => to_json(&json!({ "user": user, "eligible": eligible })),
        OutputFormat::Text if eligible => Ok(format!("{} is eligible for a certificate", user)),
        OutputFormat::Text => Ok(format!("{} is not yet eligible for a certificate", user)),
    }
}

pub fn format_certificate(
    certificate: &Certificate,
    format: OutputFormat,
) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(certificate);
    }
    let mut out = format!(
        "{}\n\n  This certifies that {} has completed\n  {}\n",
        "Certificate of Completion".bold(),
        certificate.learner_name.bold(),
        certificate.course_title
    );
    if let Some(score) = certificate.score_percent {
        out.push_str(&format!("  Quiz score: {}%\n", score));
    }
    out.push_str(&format!(
        "  Issued: {}\n  Certificate: {}",
        certificate.issued_at.format("%Y-%m-%d"),
        certificate.id
    ));
    Ok(out)
}
