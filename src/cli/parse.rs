//! CLI parse: clap types for Syllabus. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Syllabus CLI - Resumable AI course generation
#[derive(Parser)]
#[command(name = "syllabus")]
#[command(about = "Generate multi-chapter courses chunk by chunk, then track learners through them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a course from a brief (no generation happens yet)
    Create {
        /// What the course is about
        topic: String,
        /// Number of chapters (default from config)
        #[arg(long)]
        chapters: Option<usize>,
        /// Sections per chapter (default from config)
        #[arg(long)]
        sections: Option<usize>,
        #[arg(long)]
        audience: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
        /// Content language
        #[arg(long)]
        language: Option<String>,
        /// Extra instructions for the generator
        #[arg(long)]
        notes: Option<String>,
        /// Skip the final quiz
        #[arg(long)]
        no_quiz: bool,
        /// Number of quiz questions (default from config)
        #[arg(long)]
        questions: Option<usize>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Execute exactly one generation chunk
    Step {
        course_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Drive generation until the course is complete, failed, or the budget runs out
    Run {
        course_id: String,
        /// Override the maximum number of chunk attempts
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Do not pause between chunk calls
        #[arg(long)]
        no_delay: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show generation progress without doing any work
    Status {
        course_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show a course (rendered Markdown, or the stored document as json)
    Show {
        course_id: String,
        /// Output format (markdown or json)
        #[arg(long, default_value = "markdown")]
        format: String,
    },
    /// List stored courses
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Apply manual edits to a finished course
    Edit {
        course_id: String,
        /// JSON or TOML file with the edits
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Delete a course, its learner records and its public page
    Delete { course_id: String },
    /// Publish a complete course (or refresh its page)
    Publish {
        course_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Remove a course's public page, keeping content and learner progress
    Unpublish { course_id: String },
    /// Mark a section complete for a learner
    Complete {
        course_id: String,
        /// Section id, e.g. chapter-0-section-1
        section_id: String,
        #[arg(long)]
        user: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Mark a section incomplete for a learner
    Incomplete {
        course_id: String,
        /// Section id, e.g. chapter-0-section-1
        section_id: String,
        #[arg(long)]
        user: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Grade quiz answers; with --user the attempt is recorded
    Quiz {
        course_id: String,
        /// Answer as question=index, e.g. q1=2 (repeatable)
        #[arg(long = "answer", value_name = "QUESTION=INDEX")]
        answers: Vec<String>,
        #[arg(long)]
        user: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Check certificate eligibility or issue a certificate
    Certificate {
        course_id: String,
        #[arg(long)]
        user: String,
        /// Name printed on the certificate (defaults to the user)
        #[arg(long)]
        name: Option<String>,
        /// Only report eligibility
        #[arg(long)]
        check: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the generation journal of a course
    Log {
        course_id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
