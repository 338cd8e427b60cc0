// Router module - operation type to handler dispatch
// Built once at startup and shared read-only; no global handler table.

pub mod error;
pub mod handler;
pub mod dispatch;

pub use error::{HandlerError, Result};
pub use handler::{FnHandler, Handler, TypedHandler, typed};
pub use dispatch::Router;
