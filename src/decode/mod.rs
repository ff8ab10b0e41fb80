//! Fixed-width decoding of data lines against registered widths.
//!
//! Data lines are whitespace-separated, but a field boundary does not always
//! fall on whitespace: two fields may be written back to back. Decoding walks
//! the declared widths left to right over the whitespace tokens:
//!
//! widths [3, 1], line "abcd"  =>  ["abc", "d"]
//!
//! A token that fits its width is taken whole. A token longer than its width
//! is cut at the width and the remainder is tried against the next width.
//! There is no backtracking.

use thiserror::Error;

use crate::spec::SpecRegistry;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no spec registered for table {0}")]
    NoSpecRegistered(String),
    #[error("incomplete record for {table}: expected {expected} fields, found {produced}")]
    IncompleteRecord {
        table: String,
        expected: usize,
        produced: usize,
    },
}

/// Decode `line` using the widths registered for `table`.
///
/// An empty (or whitespace-only) line decodes to no values.
pub fn decode(
    registry: &SpecRegistry,
    table: &str,
    line: &str,
) -> Result<Vec<String>, DecodeError> {
    let widths = registry
        .widths(table)
        .ok_or_else(|| DecodeError::NoSpecRegistered(table.to_string()))?;

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let values = width_fill(widths, &tokens);
    if values.len() < widths.len() {
        return Err(DecodeError::IncompleteRecord {
            table: table.to_string(),
            expected: widths.len(),
            produced: values.len(),
        });
    }
    Ok(values)
}

/// Greedy width-fill over pre-split tokens. Returns at most `widths.len()` values.
pub fn width_fill(widths: &[usize], tokens: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(widths.len());
    let mut rest = tokens.iter();
    let mut current = match rest.next() {
        Some(t) => *t,
        None => return out,
    };

    for (i, &width) in widths.iter().enumerate() {
        match split_at_chars(current, width) {
            // Fits: take the whole token, move to the next one.
            None => {
                out.push(current.to_string());
                if i + 1 == widths.len() {
                    break;
                }
                current = match rest.next() {
                    Some(t) => *t,
                    None => break,
                };
            }
            // Too long: cut at the width, keep the tail for the next width.
            Some((head, tail)) => {
                out.push(head.to_string());
                current = tail;
            }
        }
    }

    out
}

/// Split `s` after `width` characters, or None if it is not longer than that.
fn split_at_chars(s: &str, width: usize) -> Option<(&str, &str)> {
    s.char_indices().nth(width).map(|(idx, _)| s.split_at(idx))
}
