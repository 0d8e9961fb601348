//! Chunked, resumable course generation.
//!
//! [`state`] decides the next unit of work from the persisted checkpoint,
//! [`executor`] performs exactly one unit per call and commits it, and
//! [`driver`] plays the external caller that keeps calling until a terminal state.

pub mod driver;
pub mod executor;
pub mod parse;
pub mod prompts;
pub mod state;

pub use driver::{DriveOutcome, DriveReport, DriverPolicy, PollingDriver};
pub use executor::{ChunkExecutor, ChunkResult, ChunkStepper};
pub use state::{ChunkAction, Cursor};
