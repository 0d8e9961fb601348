//! Integration tests for course generation, learners and publication

mod cli_commands;
mod generation_flow;
mod publication;
mod resumability;
pub mod test_utils;
