//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to the course API.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{exit_code, map_error};
pub use parse::{Cli, Commands};
pub use presentation::OutputFormat;
pub use route::{parse_answers, RunContext};
