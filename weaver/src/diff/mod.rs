//! Line-level diff engine
//!
//! Compares two texts line by line using Myers' shortest edit script and
//! produces [`DiffLine`] entries in script order. Lines are split on `'\n'`
//! exactly: no trimming, no CRLF folding, and a trailing newline yields a
//! final empty line. The empty string has no lines at all.
//!
//! For any two strings A and B:
//! - joining every line not marked `removed` reproduces B
//! - joining every line not marked `added` reproduces A

mod myers;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use myers::{Edit, MAX_EDIT_ROUNDS, shortest_edit};

/// One line of a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub value: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub added: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub removed: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl DiffLine {
    pub fn unchanged(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            added: false,
            removed: false,
        }
    }

    pub fn added(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            added: true,
            removed: false,
        }
    }

    pub fn removed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            added: false,
            removed: true,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        !self.added && !self.removed
    }

    /// Unified-diff style marker: '+', '-' or ' '
    pub fn marker(&self) -> char {
        if self.added {
            '+'
        } else if self.removed {
            '-'
        } else {
            ' '
        }
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.marker(), self.value)
    }
}

/// Split text into lines: "" has zero lines, otherwise split on '\n'
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

/// Diff two texts line by line
pub fn diff_lines(original: &str, modified: &str) -> Vec<DiffLine> {
    let a = split_lines(original);
    let b = split_lines(modified);
    tracing::debug!(original_lines = a.len(), modified_lines = b.len(), "diff_lines: called");

    shortest_edit(&a, &b)
        .into_iter()
        .map(|edit| match edit {
            Edit::Equal(i, _) => DiffLine::unchanged(a[i]),
            Edit::Delete(i) => DiffLine::removed(a[i]),
            Edit::Insert(j) => DiffLine::added(b[j]),
        })
        .collect()
}

/// Rebuild the original text from a diff (every line not marked added)
pub fn reconstruct_original(lines: &[DiffLine]) -> String {
    join(lines.iter().filter(|l| !l.added))
}

/// Rebuild the modified text from a diff (every line not marked removed)
pub fn reconstruct_modified(lines: &[DiffLine]) -> String {
    join(lines.iter().filter(|l| !l.removed))
}

fn join<'a>(lines: impl Iterator<Item = &'a DiffLine>) -> String {
    lines.map(|l| l.value.as_str()).collect::<Vec<_>>().join("\n")
}

/// Render a diff as plain text, one marked line per entry
pub fn render(lines: &[DiffLine]) -> String {
    lines.iter().map(|l| l.to_string()).collect::<Vec<_>>().join("\n")
}

/// Line counts of a diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl DiffStats {
    pub fn from_lines(lines: &[DiffLine]) -> Self {
        lines.iter().fold(Self::default(), |mut stats, line| {
            if line.added {
                stats.added += 1;
            } else if line.removed {
                stats.removed += 1;
            } else {
                stats.unchanged += 1;
            }
            stats
        })
    }

    /// True when the two sides were identical
    pub fn is_identical(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} -{}", self.added, self.removed)
    }
}
