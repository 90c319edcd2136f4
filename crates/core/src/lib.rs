//! Requirement/test-case validation and document-driven generation.

pub mod agents;
pub mod backend;
pub mod config;
pub mod error;
pub mod judge;
pub mod matcher;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod table;
pub mod types;
