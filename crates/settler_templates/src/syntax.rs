//! Placeholder grammar and scanning.
//!
//! Two placeholder syntaxes are recognised:
//!
//! - `{{ NAME }}`, with optional spaces or tabs inside the braces
//! - `__replace_this_NAME_value__`
//!
//! `NAME` is one or more of `A-Z`, `0-9` and `_`. Matching is lazy, so
//! `__replace_this_A_value__B_value__` yields `A`.

use std::cell::Cell;
use std::fmt;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};

/// Opening delimiter of the brace syntax.
pub const BRACE_OPEN: &str = "{{";
/// Closing delimiter of the brace syntax.
pub const BRACE_CLOSE: &str = "}}";
/// Opening delimiter of the marker syntax.
pub const MARKER_PREFIX: &str = "__replace_this_";
/// Closing delimiter of the marker syntax.
pub const MARKER_SUFFIX: &str = "_value__";

const BRACES_PATTERN: &str = r"\{\{[ \t]*(?P<braces>[A-Z0-9_]+)[ \t]*\}\}";
const MARKER_PATTERN: &str = r"__replace_this_(?P<marker>[A-Z0-9_]+?)_value__";

/// Placeholder syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    /// `{{ NAME }}`
    Braces,
    /// `__replace_this_NAME_value__`
    Marker,
}

impl Syntax {
    /// Canonical token text for an identifier.
    pub fn token(&self, name: &str) -> String {
        match self {
            Self::Braces => format!("{} {} {}", BRACE_OPEN, name, BRACE_CLOSE),
            Self::Marker => format!("{}{}{}", MARKER_PREFIX, name, MARKER_SUFFIX),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Braces => "braces",
            Self::Marker => "marker",
        }
    }

    pub fn all() -> [Self; 2] {
        [Self::Braces, Self::Marker]
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The set of syntaxes a scan recognises. Text of an inactive syntax is literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxSet {
    braces: bool,
    marker: bool,
}

impl Default for SyntaxSet {
    fn default() -> Self {
        Self::all()
    }
}

impl SyntaxSet {
    pub fn all() -> Self {
        Self {
            braces: true,
            marker: true,
        }
    }

    pub fn only(syntax: Syntax) -> Self {
        Self::from_slice(&[syntax])
    }

    pub fn from_slice(syntaxes: &[Syntax]) -> Self {
        Self {
            braces: syntaxes.contains(&Syntax::Braces),
            marker: syntaxes.contains(&Syntax::Marker),
        }
    }

    pub fn contains(&self, syntax: Syntax) -> bool {
        match syntax {
            Syntax::Braces => self.braces,
            Syntax::Marker => self.marker,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.braces && !self.marker
    }
}

/// Check an identifier against the placeholder grammar.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// A placeholder occurrence within a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Identifier between the delimiters.
    pub name: String,
    pub syntax: Syntax,
    /// Byte offset of the first delimiter character.
    pub start: usize,
    /// Byte offset one past the closing delimiter.
    pub end: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

/// Result of scanning a template.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    /// Placeholders in document order, non-overlapping.
    pub placeholders: Vec<Placeholder>,
    /// Delimiter pairs that enclose something other than an identifier.
    pub warnings: Vec<String>,
}

/// Maps byte offsets to line and column.
///
/// Queries in increasing offset order resume counting from the previous one.
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
    last: Cell<(usize, usize, usize)>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            text,
            line_starts,
            last: Cell::new((0, 0, 1)),
        }
    }

    /// 1-based (line, column) of a byte offset.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line];

        let (last_line, last_offset, last_column) = self.last.get();
        let (from, column) = if last_line == line && last_offset <= offset {
            (last_offset, last_column)
        } else {
            (start, 1)
        };
        let column = column + self.text[from..offset].chars().count();

        self.last.set((line, offset, column));
        (line + 1, column)
    }
}

/// Compiled placeholder scanner.
#[derive(Debug, Clone)]
pub struct PlaceholderScanner {
    combined: Regex,
    braces: Regex,
    marker: Regex,
}

impl Default for PlaceholderScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        Self {
            combined: Regex::new(&format!("{}|{}", BRACES_PATTERN, MARKER_PATTERN))
                .expect("placeholder patterns are valid"),
            braces: Regex::new(BRACES_PATTERN).expect("brace pattern is valid"),
            marker: Regex::new(MARKER_PATTERN).expect("marker pattern is valid"),
        }
    }

    /// Scan a template for placeholders of the active syntaxes.
    ///
    /// Fails with [`TemplateError::MalformedTemplate`] on the first opening
    /// delimiter that has no closing delimiter on the same line.
    pub fn scan(&self, template: &str, syntaxes: SyntaxSet) -> TemplateResult<Scan> {
        let mut scan = Scan::default();
        if syntaxes.is_empty() {
            return Ok(scan);
        }

        let pattern = match (syntaxes.contains(Syntax::Braces), syntaxes.contains(Syntax::Marker)) {
            (true, true) => &self.combined,
            (true, false) => &self.braces,
            _ => &self.marker,
        };

        let index = LineIndex::new(template);
        let delimiters = Delimiters::new(template, syntaxes);
        let mut cursor = 0;

        for caps in pattern.captures_iter(template) {
            let whole = caps.get(0).expect("group 0 is always present");
            check_gap(cursor, whole.start(), &delimiters, &index, &mut scan)?;

            let (syntax, name) = identifier(&caps);
            let (line, column) = index.position(whole.start());
            scan.placeholders.push(Placeholder {
                name: name.to_string(),
                syntax,
                start: whole.start(),
                end: whole.end(),
                line,
                column,
            });
            cursor = whole.end();
        }
        check_gap(cursor, template.len(), &delimiters, &index, &mut scan)?;

        debug!(
            "Scanned template: {} placeholders, {} warnings",
            scan.placeholders.len(),
            scan.warnings.len()
        );
        Ok(scan)
    }
}

/// Offsets of every delimiter of the active syntaxes, computed once per scan.
struct Delimiters {
    brace_opens: Vec<usize>,
    brace_closes: Vec<usize>,
    marker_opens: Vec<usize>,
    marker_closes: Vec<usize>,
    line_ends: Vec<usize>,
}

impl Delimiters {
    fn new(template: &str, syntaxes: SyntaxSet) -> Self {
        let positions = |active: bool, needle: &str| -> Vec<usize> {
            if active {
                non_overlapping(template, needle).collect()
            } else {
                Vec::new()
            }
        };
        let braces = syntaxes.contains(Syntax::Braces);
        let marker = syntaxes.contains(Syntax::Marker);

        let mut line_ends: Vec<usize> = template.match_indices('\n').map(|(i, _)| i).collect();
        line_ends.push(template.len());

        Self {
            brace_opens: positions(braces, BRACE_OPEN),
            brace_closes: positions(braces, BRACE_CLOSE),
            marker_opens: positions(marker, MARKER_PREFIX),
            marker_closes: positions(marker, MARKER_SUFFIX),
            line_ends,
        }
    }

    /// Opening delimiters lying entirely inside `from..to`, in document order.
    fn stray_in(&self, from: usize, to: usize) -> Vec<(usize, Syntax)> {
        let within = |opens: &[usize], len: usize| -> Vec<usize> {
            let first = opens.partition_point(|&i| i < from);
            opens[first..]
                .iter()
                .copied()
                .take_while(|&i| i + len <= to)
                .collect()
        };

        let mut stray: Vec<(usize, Syntax)> = within(self.brace_opens.as_slice(), BRACE_OPEN.len())
            .into_iter()
            .map(|i| (i, Syntax::Braces))
            .collect();
        stray.extend(
            within(self.marker_opens.as_slice(), MARKER_PREFIX.len())
                .into_iter()
                .map(|i| (i, Syntax::Marker)),
        );
        stray.sort();
        stray
    }

    /// Whether the opening delimiter at `offset` has its closing delimiter on
    /// the same line, ahead of the next opening delimiter of the same syntax.
    fn is_closed(&self, offset: usize, syntax: Syntax) -> bool {
        let (opens, closes, open_len) = match syntax {
            Syntax::Braces => (&self.brace_opens, &self.brace_closes, BRACE_OPEN.len()),
            Syntax::Marker => (&self.marker_opens, &self.marker_closes, MARKER_PREFIX.len()),
        };
        let after = offset + open_len;
        let line_end = next_at(&self.line_ends, offset).unwrap_or(usize::MAX);

        match (next_at(closes, after), next_at(opens, after)) {
            (Some(close), Some(open)) => close < line_end && close < open,
            (Some(close), None) => close < line_end,
            (None, _) => false,
        }
    }
}

/// Look for stray opening delimiters between two placeholders.
fn check_gap(
    from: usize,
    to: usize,
    delimiters: &Delimiters,
    index: &LineIndex<'_>,
    scan: &mut Scan,
) -> TemplateResult<()> {
    // Both kinds are collected first so the earliest problem is reported.
    for (offset, syntax) in delimiters.stray_in(from, to) {
        let (line, column) = index.position(offset);

        if !delimiters.is_closed(offset, syntax) {
            let (open, close) = match syntax {
                Syntax::Braces => (BRACE_OPEN, BRACE_CLOSE),
                Syntax::Marker => (MARKER_PREFIX, MARKER_SUFFIX),
            };
            return Err(TemplateError::MalformedTemplate {
                line,
                column,
                offset,
                message: format!("unterminated '{}', expected '{}' on the same line", open, close),
            });
        }

        scan.warnings.push(format!(
            "line {}, column {}: {} delimiters do not enclose a valid identifier, left as is",
            line, column, syntax
        ));
    }

    Ok(())
}

fn identifier<'t>(caps: &Captures<'t>) -> (Syntax, &'t str) {
    if let Some(m) = caps.name("braces") {
        (Syntax::Braces, m.as_str())
    } else {
        let m = caps.name("marker").expect("one alternative always matches");
        (Syntax::Marker, m.as_str())
    }
}

/// First position at or after `from` in a sorted list.
fn next_at(positions: &[usize], from: usize) -> Option<usize> {
    positions.get(positions.partition_point(|&i| i < from)).copied()
}

/// Byte offsets of non-overlapping occurrences of `needle`.
fn non_overlapping<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    haystack.match_indices(needle).map(|(i, _)| i)
}
