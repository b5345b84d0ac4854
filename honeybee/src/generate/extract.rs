//! Fenced JSON extraction from model output

use serde_json::Value;

const OPEN_FENCE: &str = "```json";
const CLOSE_FENCE: &str = "```";

/// Why a reply could not be turned into JSON
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// No ```json block closed at the very end of the reply
    NoFencedBlock,
    /// The terminal block does not parse
    InvalidJson(String),
}

/// Body of the terminal ```json block.
///
/// The closing fence must be the last thing in the reply, trailing
/// whitespace aside. Earlier fenced blocks are ignored.
pub fn terminal_json_block(reply: &str) -> Option<&str> {
    let body = reply.trim_end().strip_suffix(CLOSE_FENCE)?;
    let start = body.rfind(OPEN_FENCE)?;
    Some(&body[start + OPEN_FENCE.len()..])
}

/// Parse the terminal ```json block of `reply`
pub fn extract_json(reply: &str) -> Result<Value, ExtractError> {
    let block = terminal_json_block(reply).ok_or(ExtractError::NoFencedBlock)?;
    serde_json::from_str(block).map_err(|e| ExtractError::InvalidJson(e.to_string()))
}
