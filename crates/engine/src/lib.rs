//! Engine crate – headless device health diagnostics.
//!
//! Platform tools are reached through the `ProbeGateway` trait, their
//! output is parsed into typed readings, classified into a uniform status
//! taxonomy, and reduced into a device-level summary. Nothing here knows
//! about the command line, so the same engine can back other front ends.

pub mod catalog;
pub mod classify;
pub mod context;
pub mod device;
pub mod error;
pub mod extract;
pub mod platform;
pub mod probes;
pub mod replay;
pub mod runner;
pub mod summary;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use catalog::Platform;
pub use context::DiagContext;
pub use error::{DiagError, DiagResult, ErrorKind};
pub use runner::Runner;
pub use types::{DiagnosticSummary, RunRequest, RunResponse, Status, TestOutcome};
