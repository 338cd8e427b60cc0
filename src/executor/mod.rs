// Executor module - sandboxed external process execution
// One child per call, argument vector only, no shell in between.

pub mod capture;
pub mod config;
pub mod error;
pub mod runner;
pub mod sandbox;
pub mod terminate;
pub mod types;

pub use config::ExecutorConfig;
pub use error::{ExecutorError, Result};
pub use runner::Executor;
pub use types::{ExecutionResult, PolicyOverrides, ResourcePolicy};
