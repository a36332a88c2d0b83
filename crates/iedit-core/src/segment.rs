//! Splitting a document into editable units.
//!
//! Units always tile the document: concatenating every [`Unit::text`] in
//! order gives back the input byte for byte. Context strings are copies of
//! neighbouring text and never part of the tiling.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Default number of editable lines per windowed unit.
pub const DEFAULT_WINDOW: usize = 2;
/// Default number of read-only context lines on each side of a window.
pub const DEFAULT_CONTEXT: usize = 5;

// Head of a sectioning command or environment boundary. The arguments are
// matched by `marker_end` so that nested braces are allowed.
static MARKER_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:(?:sub){0,2}section|paragraph)\*?|\\(?:begin|end)").unwrap()
});

// A lone control word, optionally starred, followed only by its arguments.
static CONTROL_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\\[A-Za-z@]+\*?(?:\s*(?:\[[^\]]*\]|\{[^{}]*\}))*$").unwrap()
});

/// Environments whose body is mathematics and is never submitted.
const MATH_ENVIRONMENTS: &[&str] = &[
    "equation",
    "equation*",
    "align",
    "align*",
    "alignat",
    "alignat*",
    "flalign",
    "flalign*",
    "gather",
    "gather*",
    "multline",
    "multline*",
    "eqnarray",
    "eqnarray*",
    "displaymath",
    "math",
];

/// Byte range of a unit inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// One editable span of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    pub index: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_after: Option<String>,
    pub span: Span,
    /// Set for text inside a display-math environment.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub in_math: bool,
}

impl Unit {
    pub fn has_context(&self) -> bool {
        self.context_before.is_some() || self.context_after.is_some()
    }

    /// Units that are blank, a single control sequence, a single marker or
    /// the body of a math environment are never submitted and keep their
    /// original text.
    pub fn is_passthrough(&self) -> bool {
        let trimmed = self.text.trim();
        self.in_math
            || trimmed.is_empty()
            || CONTROL_SEQUENCE.is_match(trimmed)
            || marker_spans(trimmed).first() == Some(&(0..trimmed.len()))
    }
}

/// How a document is cut into units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum SegmentPolicy {
    /// Split at sectioning commands and `\begin`/`\end` markers.
    #[default]
    Structural,
    /// Fixed line windows with read-only context on both sides.
    Windowed { window: usize, context: usize },
}

impl SegmentPolicy {
    pub fn windowed() -> Self {
        SegmentPolicy::Windowed {
            window: DEFAULT_WINDOW,
            context: DEFAULT_CONTEXT,
        }
    }
}

/// Splits `text` into units according to `policy`.
///
/// An empty document yields no units.
pub fn segment(text: &str, policy: SegmentPolicy) -> Vec<Unit> {
    if text.is_empty() {
        return Vec::new();
    }
    match policy {
        SegmentPolicy::Structural => structural(text),
        SegmentPolicy::Windowed { window, context } => windowed(text, window.max(1), context),
    }
}

fn structural(text: &str) -> Vec<Unit> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    for marker in marker_spans(text) {
        if marker.start > cursor {
            spans.push((cursor..marker.start, false));
        }
        cursor = marker.end;
        spans.push((marker, true));
    }
    if cursor < text.len() {
        spans.push((cursor..text.len(), false));
    }

    // Environments open inside the outermost math environment, itself included.
    let mut math_depth = 0usize;
    spans
        .into_iter()
        .enumerate()
        .map(|(index, (range, is_marker))| {
            let piece = &text[range.clone()];
            if is_marker && math_depth > 0 {
                if piece.starts_with("\\begin") {
                    math_depth += 1;
                } else if piece.starts_with("\\end") {
                    math_depth -= 1;
                }
            } else if is_marker && is_math_begin(piece) {
                math_depth = 1;
            }
            Unit {
                index,
                text: piece.to_string(),
                context_before: None,
                context_after: None,
                span: range.into(),
                in_math: !is_marker && math_depth > 0,
            }
        })
        .collect()
}

/// Byte ranges of every sectioning command and `\begin`/`\end` marker.
fn marker_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(head) = MARKER_HEAD.find_at(text, pos) {
        let sectioning = !matches!(head.as_str(), "\\begin" | "\\end");
        match marker_end(text.as_bytes(), head.end(), sectioning) {
            Some(end) => {
                spans.push(head.start()..end);
                pos = end;
            }
            None => pos = head.end(),
        }
    }
    spans
}

/// Matches the arguments that follow a marker head ending at `i`: an
/// optional `[..]` short title for sectioning commands, then one balanced
/// `{..}` group. Returns the offset just past the group.
fn marker_end(bytes: &[u8], mut i: usize, sectioning: bool) -> Option<usize> {
    if sectioning && bytes.get(i) == Some(&b'[') {
        let close = bytes[i..].iter().position(|&b| b == b']')?;
        i += close + 1;
    }
    if bytes.get(i) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_math_begin(marker: &str) -> bool {
    marker
        .strip_prefix("\\begin{")
        .and_then(|rest| rest.strip_suffix('}'))
        .is_some_and(|name| MATH_ENVIRONMENTS.contains(&name.trim()))
}

fn windowed(text: &str, window: usize, context: usize) -> Vec<Unit> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();

    // offsets[i] is the byte offset where line i starts; the last entry is text.len().
    let mut offsets = Vec::with_capacity(lines.len() + 1);
    offsets.push(0);
    for line in &lines {
        offsets.push(offsets[offsets.len() - 1] + line.len());
    }

    // Short documents fit in one submission and need no context.
    if lines.len() <= window + context {
        return vec![Unit {
            index: 0,
            text: text.to_string(),
            context_before: None,
            context_after: None,
            span: Span::new(0, text.len()),
            in_math: false,
        }];
    }

    (0..lines.len())
        .step_by(window)
        .enumerate()
        .map(|(index, start)| {
            let end = (start + window).min(lines.len());
            let before = lines[start.saturating_sub(context)..start].concat();
            let after = lines[end..(end + context).min(lines.len())].concat();
            Unit {
                index,
                text: text[offsets[start]..offsets[end]].to_string(),
                context_before: non_empty(before),
                context_after: non_empty(after),
                span: Span::new(offsets[start], offsets[end]),
                in_math: false,
            }
        })
        .collect()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}
