// Jobs module - tracked background executions
// Start now, poll later, cancel any time.

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::JobsConfig;
pub use error::{JobError, Result};
pub use registry::JobRegistry;
pub use types::{Job, JobStatus};
