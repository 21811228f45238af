//! Surveyor - Map the architecture of Laravel applications
//!
//! Scans a Laravel codebase for its components (routes, models, jobs,
//! listeners and the rest), infers how they talk to each other, and
//! exports the result as JSON, Markdown, HTML, PDF or a PHP data file.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;

// Re-export main types
pub use analysis::{Architecture, ComponentKind, ScanOptions, ScanResult, Surveyor, Target};
pub use config::Config;
pub use error::{Error, Result};
pub use output::{ExportArtifact, ExportFormat, Exporter};
