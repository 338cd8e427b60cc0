// Protocol module - request/response envelopes and line codec
// One JSON object per line in both directions.

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{decode_line, encode_response};
pub use error::ProtocolError;
pub use types::{ErrorBody, ErrorCode, Request, Response, ResponseStatus};
