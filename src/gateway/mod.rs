// Gateway module - composition root
// One line in, one response out: parse -> validate -> route.

pub mod error;
pub mod service;

pub use error::{GatewayError, Result};
pub use service::{Catalogue, Gateway};
