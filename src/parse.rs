//! Decimal parsing for the value field.
//!
//! The pipeline only ever sees the [`DecimalParser`] capability, so the grammar
//! a run accepts is chosen by configuration and can be swapped without touching
//! the scan loop.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ParseError {
    #[error("empty value")]
    Empty,
    #[error("not a decimal number ({0})")]
    Invalid(lexical_core::Error),
    #[error("value is not finite")]
    NonFinite,
}

/// Turns the bytes after the delimiter into a number.
pub trait DecimalParser: Send + Sync {
    fn parse(&self, text: &[u8]) -> Result<f64, ParseError>;
}

/// Digits that fit the fast path exactly: below 2^53 every mantissa is an
/// exact `f64`, so one correctly rounded division gives the nearest value.
const MAX_FAST_DIGITS: usize = 15;

const POW10: [f64; MAX_FAST_DIGITS + 1] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15,
];

/// Fast, non-validating parser.
///
/// Accepts `[+-]digits[.digits]`. Anything outside that shape, or longer than
/// the fast path allows, goes through lexical-core on the longest parseable
/// prefix. Text with no parseable prefix yields `0.0`. This parser never
/// returns an error, so garbage in the value field is aggregated silently.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestEffort;

impl DecimalParser for BestEffort {
    #[inline]
    fn parse(&self, text: &[u8]) -> Result<f64, ParseError> {
        Ok(parse_best_effort(text))
    }
}

#[inline]
pub fn parse_best_effort(text: &[u8]) -> f64 {
    let (negative, body) = match text.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, text),
    };

    let mut mantissa: u64 = 0;
    let mut digits = 0usize;
    let mut frac_digits = 0usize;
    let mut seen_dot = false;
    for &b in body {
        match b {
            b'0'..=b'9' => {
                if digits == MAX_FAST_DIGITS {
                    return parse_prefix(text);
                }
                mantissa = mantissa * 10 + u64::from(b - b'0');
                digits += 1;
                if seen_dot {
                    frac_digits += 1;
                }
            }
            b'.' if !seen_dot => seen_dot = true,
            _ => return parse_prefix(text),
        }
    }
    if digits == 0 {
        return 0.0;
    }

    let value = mantissa as f64 / POW10[frac_digits];
    if negative {
        -value
    } else {
        value
    }
}

#[cold]
fn parse_prefix(text: &[u8]) -> f64 {
    lexical_core::parse_partial::<f64>(text)
        .map(|(value, _)| value)
        .unwrap_or(0.0)
}

/// Validating parser: the whole span must be one finite number.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl DecimalParser for Strict {
    fn parse(&self, text: &[u8]) -> Result<f64, ParseError> {
        if text.is_empty() {
            return Err(ParseError::Empty);
        }
        let value = lexical_core::parse::<f64>(text).map_err(ParseError::Invalid)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ParseError::NonFinite)
        }
    }
}
