//! Library entry for magsync-cli used by integration tests and embedding.

pub mod commands;

// Re-export commands for convenience
pub use commands::*;

// Re-export commonly used items
pub use crate::commands::session::{load_config, summary_line};
