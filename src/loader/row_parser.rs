//! Parse single data lines of a losses log.
//!
//! A data line holds one run's per-iteration losses for one pyramid level:
//!
//! ```text
//! 0.0412 0.0398 0.0391 ... 0.0207
//! ```
//!
//! Values are separated by single spaces and the line ends with a trailing
//! separator, so the last split field never carries a value.

use std::borrow::Cow;
use std::num::ParseFloatError;

/// A token that failed to parse as a loss value.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidToken {
    pub token: String,
    pub source: ParseFloatError,
}

/// Parse every loss value of a data line.
///
/// The line is split on single spaces and the final field is discarded
/// unconditionally. All other fields must be valid floats; consecutive spaces
/// therefore produce an empty token and fail the parse. Surrounding whitespace
/// such as tabs is ignored, and underscores between digits (`1_000.5`) are
/// accepted as digit separators.
pub fn parse_loss_row(line: &str) -> Result<Vec<f64>, InvalidToken> {
    let mut tokens: Vec<&str> = line.split(' ').collect();
    tokens.pop();

    tokens
        .into_iter()
        .map(|token| {
            normalize_token(token).parse::<f64>().map_err(|source| InvalidToken {
                token: token.to_string(),
                source,
            })
        })
        .collect()
}

/// Trim whitespace and drop underscores that sit between two digits.
///
/// Any other underscore is left in place so the token still fails to parse.
fn normalize_token(token: &str) -> Cow<'_, str> {
    let trimmed = token.trim();
    if !trimmed.contains('_') {
        return Cow::Borrowed(trimmed);
    }

    let bytes = trimmed.as_bytes();
    let separators_valid = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'_' || (i > 0 && i + 1 < bytes.len() && bytes[i - 1].is_ascii_digit() && bytes[i + 1].is_ascii_digit())
    });
    if separators_valid {
        Cow::Owned(trimmed.replace('_', ""))
    } else {
        Cow::Borrowed(trimmed)
    }
}

/// Whether a parsed row has the width every accepted row must have.
///
/// Rows of any other width are dropped from the load without an error; only
/// unparseable tokens are fatal.
pub fn is_accepted_row(row: &[f64], row_width: usize) -> bool {
    row.len() == row_width
}
