//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// `error[kind]: message`, with a hint when the same command can simply be rerun.
pub fn map_error(e: &ApiError) -> String {
    let mut out = format!("error[{}]: {}", e.kind(), e);
    if e.is_retryable() {
        out.push_str("\nThe course is unchanged; the same command can be retried.");
    }
    out
}

/// Process exit code per error category.
pub fn exit_code(e: &ApiError) -> i32 {
    match e.kind() {
        "not_found" => 2,
        "conflict" => 3,
        "configuration" => 4,
        _ if e.is_retryable() => 75,
        _ => 1,
    }
}
