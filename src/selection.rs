//! Range expressions for picking entries out of a numbered list.
//!
//! An expression such as `1-3,5,7-9` or `all` names 1-based positions in a
//! list the operator has just been shown. Tokens that are not numbers are
//! skipped with a warning. Numbers outside the list and parts with more than
//! one hyphen abort the whole parse so the caller can ask again.

use std::collections::BTreeSet;
use std::fmt;
use std::num::IntErrorKind;
use thiserror::Error;
use tracing::warn;

/// A selection token that makes the whole expression unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// A single number outside the list.
    #[error("Number {value} is out of bounds (1-{max})")]
    NumberOutOfBounds {
        /// The offending number, in canonical decimal form.
        value: Position,
        /// Largest valid position.
        max: usize,
    },
    /// A range reaching outside the list (after swapping reversed ends).
    #[error("Range {start}-{end} is out of bounds (1-{max})")]
    RangeOutOfBounds {
        /// Lower end of the range.
        start: Position,
        /// Upper end of the range.
        end: Position,
        /// Largest valid position.
        max: usize,
    },
    /// A part with more than one hyphen, such as `1-2-3` or `1--3`.
    #[error("Malformed range {part}: expected start-end")]
    MalformedRange {
        /// The part as typed, trimmed.
        part: String,
    },
}

/// A number read from a selection token.
///
/// Numbers beyond `usize` keep their digits so errors can show them as typed.
/// Ordering is numeric across both variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Position {
    /// A representable number.
    At(usize),
    /// A number larger than any list can be.
    Beyond {
        /// Digit count, compared first.
        len: usize,
        /// Digits without sign or leading zeros.
        digits: String,
    },
}

impl Position {
    const fn index(&self) -> Option<usize> {
        match self {
            Self::At(value) => Some(*value),
            Self::Beyond { .. } => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(value) => write!(f, "{value}"),
            Self::Beyond { digits, .. } => f.write_str(digits),
        }
    }
}

/// A token that could not be read as a number and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionWarning {
    /// A `start-end` part with a non-numeric end.
    InvalidRange(String),
    /// A part without a hyphen that is not a number.
    InvalidNumber(String),
}

impl fmt::Display for SelectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange(part) => write!(f, "Invalid range: {part}"),
            Self::InvalidNumber(part) => write!(f, "Invalid number: {part}"),
        }
    }
}

/// Ascending, distinct 1-based positions plus the tokens that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: Vec<usize>,
    warnings: Vec<SelectionWarning>,
}

impl Selection {
    /// Selected positions, ascending and without duplicates.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Tokens skipped because they were not numbers.
    #[must_use]
    pub fn warnings(&self) -> &[SelectionWarning] {
        &self.warnings
    }

    /// Number of selected positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Resolve the positions against the list they were parsed for.
    ///
    /// Each entry pairs the 1-based position with the item. Positions past the
    /// end of `items` are ignored.
    #[must_use]
    pub fn pick<'a, T>(&self, items: &'a [T]) -> Vec<(usize, &'a T)> {
        self.indices
            .iter()
            .filter_map(|&index| {
                index
                    .checked_sub(1)
                    .and_then(|offset| items.get(offset))
                    .map(|item| (index, item))
            })
            .collect()
    }
}

/// Parse a range expression against a list of `max` entries.
///
/// `all` (any case) selects every position. Otherwise the expression is a
/// comma-separated list of numbers and `start-end` ranges; reversed ranges
/// are swapped. The empty string is not special: it yields an empty
/// selection with one warning.
///
/// # Errors
///
/// Returns a [`SelectionError`] if any number or range falls outside
/// `1..=max`, or if a part holds more than one hyphen. Other non-numeric
/// tokens never fail the parse.
pub fn parse_selection(expression: &str, max: usize) -> Result<Selection, SelectionError> {
    if expression.trim().eq_ignore_ascii_case("all") {
        return Ok(Selection {
            indices: (1..=max).collect(),
            warnings: Vec::new(),
        });
    }

    let mut indices = BTreeSet::new();
    let mut warnings = Vec::new();

    for part in expression.split(',').map(str::trim) {
        if let Some((start, end)) = part.split_once('-') {
            if end.contains('-') {
                return Err(SelectionError::MalformedRange {
                    part: part.to_string(),
                });
            }
            let (Some(start), Some(end)) = (parse_position(start), parse_position(end)) else {
                warn!(token = part, "Skipping invalid range");
                warnings.push(SelectionWarning::InvalidRange(part.to_string()));
                continue;
            };
            let (start, end) = if start > end { (end, start) } else { (start, end) };
            match (start.index(), end.index()) {
                (Some(first), Some(last)) if first >= 1 && last <= max => {
                    indices.extend(first..=last);
                }
                _ => return Err(SelectionError::RangeOutOfBounds { start, end, max }),
            }
        } else {
            let Some(value) = parse_position(part) else {
                warn!(token = part, "Skipping invalid number");
                warnings.push(SelectionWarning::InvalidNumber(part.to_string()));
                continue;
            };
            let Some(index) = value.index().filter(|index| (1..=max).contains(index)) else {
                return Err(SelectionError::NumberOutOfBounds { value, max });
            };
            indices.insert(index);
        }
    }

    Ok(Selection {
        indices: indices.into_iter().collect(),
        warnings,
    })
}

// Numbers too large to represent are still numbers, just out of bounds.
fn parse_position(token: &str) -> Option<Position> {
    let token = token.trim();
    match token.parse::<usize>() {
        Ok(value) => Some(Position::At(value)),
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => {
            let digits = token.trim_start_matches('+').trim_start_matches('0');
            Some(Position::Beyond {
                len: digits.len(),
                digits: digits.to_string(),
            })
        }
        Err(_) => None,
    }
}
