use thiserror::Error;

use crate::config::NUM_FEATURES;

/// Why a serial line was not accepted as a sample.
///
/// Never fatal: the acquisition loop logs the line and keeps reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Nothing but whitespace (typically a read timeout).
    #[error("empty line")]
    Empty,
    #[error("expected {} comma-separated values, got {got}", NUM_FEATURES)]
    TokenCount { got: usize },
    #[error("value {index} ({token:?}) is not an integer")]
    InvalidToken { index: usize, token: String },
}

/// Parse one serial line of `NUM_FEATURES` comma-separated integers.
///
/// Surrounding whitespace (including the line terminator) is ignored, on the
/// line and on each value.
pub fn parse_record(line: &str) -> Result<[i32; NUM_FEATURES], RecordError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(RecordError::Empty);
    }

    let tokens: Vec<&str> = line.split(',').collect();
    if tokens.len() != NUM_FEATURES {
        return Err(RecordError::TokenCount { got: tokens.len() });
    }

    let mut values = [0i32; NUM_FEATURES];
    for (index, (slot, token)) in values.iter_mut().zip(&tokens).enumerate() {
        *slot = token
            .trim()
            .parse()
            .map_err(|_| RecordError::InvalidToken {
                index,
                token: token.to_string(),
            })?;
    }
    Ok(values)
}
