// Security module - path and command safety checks
// Defense in depth only: the executor never goes through a shell, so these
// filters are not what stops injection. They reject obviously hostile input
// early and keep it out of logs.

pub mod checker;
pub mod config;
pub mod error;
pub mod redact;

pub use checker::{PathSafetyChecker, Violation};
pub use config::SecurityPolicy;
pub use error::{Result, SecurityError};
pub use redact::redact_params;
