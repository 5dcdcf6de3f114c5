//! Helpers for threading a byte slice through a hand written parser.
//!
//! Every function returns what it consumed alongside the rest of the input, and leaves the input
//! untouched when it cannot make progress.

use std::str::FromStr;

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected end of input, expected '{exp}'")]
    UnexpectedEof { exp: char },

    #[error("Expected '{exp}', but got '{got}'")]
    UnexpectedToken { exp: char, got: char },

    #[error("Expected \"{exp}\", but got \"{got}\"")]
    UnexpectedSlice { exp: String, got: String },
}

/// Skip ascii whitespace, line breaks included.
pub fn take_ws(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());

    &bytes[start..]
}

/// Skip spaces and tabs, stopping at line breaks.
pub fn take_blanks(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(bytes.len());

    &bytes[start..]
}

/// Take the next byte, if any.
pub fn take_1(bytes: &[u8]) -> (Option<u8>, &[u8]) {
    match bytes.split_first() {
        Some((&b, rest)) => (Some(b), rest),
        None => (None, bytes),
    }
}

/// Like `take_1`, but doesn't consume the byte
pub fn peek_1(bytes: &[u8]) -> Option<u8> {
    bytes.first().copied()
}

/// Consume `b`, failing if the input starts with anything else.
pub fn expect(b: u8, bytes: &[u8]) -> ParseResult<&[u8]> {
    match take_1(bytes) {
        (Some(a), rest) if a == b => Ok(rest),
        (Some(a), _) => Err(ParseError::UnexpectedToken {
            exp: b as char,
            got: a as char,
        }),
        (None, _) => Err(ParseError::UnexpectedEof { exp: b as char }),
    }
}

/// Consume `bs`, failing if the input starts with anything else.
pub fn expect_slice<'a>(bs: &[u8], bytes: &'a [u8]) -> ParseResult<&'a [u8]> {
    match bytes.strip_prefix(bs) {
        Some(rest) => Ok(rest),
        None => {
            let n = bs.len().min(bytes.len());

            Err(ParseError::UnexpectedSlice {
                exp: String::from_utf8_lossy(bs).to_string(),
                got: String::from_utf8_lossy(&bytes[..n]).to_string(),
            })
        }
    }
}

/// Take bytes up to (not including) the first one satisfying `p`, or up to the end of the input.
///
/// Returns `None` when nothing would be taken.
pub fn take_until_fn<P>(p: P, bytes: &[u8]) -> (Option<&[u8]>, &[u8])
where
    P: Fn(u8) -> bool,
{
    let end = bytes.iter().position(|&b| p(b)).unwrap_or(bytes.len());

    if end == 0 {
        return (None, bytes);
    }

    let (taken, rest) = bytes.split_at(end);

    (Some(taken), rest)
}

/// Like `take_until_fn`, stopping at `b`.
pub fn take_until(b: u8, bytes: &[u8]) -> (Option<&[u8]>, &[u8]) {
    take_until_fn(|a| a == b, bytes)
}

/// Take a run of ascii digits.
pub fn take_digits(bytes: &[u8]) -> (Option<&[u8]>, &[u8]) {
    take_until_fn(|b| !b.is_ascii_digit(), bytes)
}

/// Like `take_until`, but also consumes `b` without returning it.
pub fn take_with(b: u8, bytes: &[u8]) -> (Option<&[u8]>, &[u8]) {
    let (taken, rest) = take_until(b, bytes);
    let rest = rest.strip_prefix(&[b]).unwrap_or(rest);

    (taken, rest)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Input is not valid UTF-8")]
    InvalidUtf8,

    #[error("Failed to convert \"{str}\"")]
    ParseError { str: String },
}

/// Converts `&[u8]` to `T` if `T: FromStr`.
pub fn convert<T: FromStr>(bytes: &[u8]) -> Result<T, ConvertError> {
    let str = std::str::from_utf8(bytes).map_err(|_| ConvertError::InvalidUtf8)?;

    str.trim().parse::<T>().map_err(|_| ConvertError::ParseError {
        str: str.to_string(),
    })
}
