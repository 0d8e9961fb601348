//! Syllabus: Resumable, Chunked Course Generation
//!
//! Generates multi-chapter courses from a short brief by calling a text-generation
//! provider one small, independently committed chunk at a time, then tracks
//! learners through the finished course, grades its quiz and issues certificates.

pub mod api;
pub mod cli;
pub mod config;
pub mod course;
pub mod error;
pub mod generation;
pub mod learning;
pub mod logging;
pub mod provider;
pub mod publish;
pub mod store;
