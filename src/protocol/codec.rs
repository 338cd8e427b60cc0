use crate::protocol::error::ProtocolError;
use crate::protocol::types::Response;
use serde_json::Value;

/// Decode one request line into a JSON value
///
/// Only JSON syntax is checked here; envelope shape is the validator's job.
pub fn decode_line(line: &str, max_line_bytes: usize) -> Result<Value, ProtocolError> {
    if line.len() > max_line_bytes {
        return Err(ProtocolError::LineTooLong(line.len()));
    }
    serde_json::from_str(line.trim()).map_err(|e| ProtocolError::DecodeError(e.to_string()))
}

/// Encode a response as a single line, newline included
pub fn encode_response(response: &Response) -> Result<String, ProtocolError> {
    let mut line =
        serde_json::to_string(response).map_err(|e| ProtocolError::EncodeError(e.to_string()))?;
    line.push('\n');
    Ok(line)
}
