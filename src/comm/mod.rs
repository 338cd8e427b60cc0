// Comm module - newline-delimited JSON over TCP or stdio
// One request per line in, one response per line out. Responses may come
// back in a different order than requests; clients match them by id.

pub mod config;
pub mod error;
pub mod lines;
pub mod server;
pub mod session;

pub use config::{CommConfig, Transport};
pub use error::{CommError, CommInitError};
pub use server::Server;
pub use session::{serve_lines, serve_stdio};
