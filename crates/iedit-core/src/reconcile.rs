//! Turning raw model output into a proposal for one unit.
//!
//! The model may echo wrappers (code fences, a `document` environment) and,
//! for windowed units, the surrounding context. Those are peeled off before
//! the candidate is compared with the original text.

use crate::prompt::{EDIT_CLOSE, EDIT_OPEN, NO_CHANGE_SENTINEL};
use crate::segment::Unit;
use serde::Serialize;
use std::borrow::Cow;

const BEGIN_DOCUMENT: &str = "\\begin{document}";
const END_DOCUMENT: &str = "\\end{document}";

/// A candidate replacement for one unit, pending approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub unit_index: usize,
    pub original: String,
    pub revised: String,
}

/// How the editable part was located in the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Extraction {
    /// No context was submitted; the whole output is the candidate.
    Whole,
    /// The output kept the edit delimiters.
    Delimited,
    /// Echoed context was cut off by line offset.
    LineSlice,
    /// Context was submitted but could not be aligned; the whole output is used.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub proposal: Option<Proposal>,
    pub extraction: Extraction,
}

impl Reconciled {
    pub fn is_ambiguous(&self) -> bool {
        self.extraction == Extraction::Fallback
    }
}

/// Returns a proposal, or `None` when the model output amounts to no change.
pub fn reconcile(unit: &Unit, raw: &str) -> Option<Proposal> {
    reconcile_detailed(unit, raw).proposal
}

/// Like [`reconcile`] but also reports how the candidate was extracted.
pub fn reconcile_detailed(unit: &Unit, raw: &str) -> Reconciled {
    let original = unit.text.trim();
    let cleaned = strip_wrappers(raw, &unit.text);

    if cleaned == NO_CHANGE_SENTINEL || cleaned == original {
        return Reconciled {
            proposal: None,
            extraction: Extraction::Whole,
        };
    }

    let (candidate, extraction) = extract(unit, cleaned);
    let candidate = candidate.trim();
    let unchanged =
        candidate.is_empty() || candidate == NO_CHANGE_SENTINEL || candidate == original;
    let proposal = (!unchanged).then(|| Proposal {
        unit_index: unit.index,
        original: unit.text.clone(),
        revised: reattach_whitespace(&unit.text, candidate),
    });

    Reconciled {
        proposal,
        extraction,
    }
}

fn strip_wrappers<'a>(raw: &'a str, original: &str) -> &'a str {
    let mut text = raw.trim();
    if let Some(inner) = strip_fence(text) {
        text = inner.trim();
    }
    if !original.contains(BEGIN_DOCUMENT) {
        if let Some(inner) = text
            .strip_prefix(BEGIN_DOCUMENT)
            .and_then(|t| t.strip_suffix(END_DOCUMENT))
        {
            text = inner.trim();
        }
    }
    text
}

fn strip_fence(text: &str) -> Option<&str> {
    let body = text.strip_prefix("```")?.strip_suffix("```")?;
    // The opening line may carry an info string such as `latex`.
    Some(body.split_once('\n').map_or(body, |(_, inner)| inner))
}

fn extract<'a>(unit: &Unit, cleaned: &'a str) -> (Cow<'a, str>, Extraction) {
    if let Some(inner) = between_delimiters(cleaned) {
        return (Cow::Borrowed(inner), Extraction::Delimited);
    }
    if !unit.has_context() {
        return (Cow::Borrowed(cleaned), Extraction::Whole);
    }

    let before: Vec<&str> = unit
        .context_before
        .as_deref()
        .map_or_else(Vec::new, |c| c.trim_start().lines().collect());
    let after: Vec<&str> = unit
        .context_after
        .as_deref()
        .map_or_else(Vec::new, |c| c.trim_end().lines().collect());
    let lines: Vec<&str> = cleaned.lines().collect();

    if lines.len() <= before.len() + after.len() {
        log::debug!(
            "Unit {}: {} output lines cannot hold {} context lines",
            unit.index,
            lines.len(),
            before.len() + after.len()
        );
        return (Cow::Borrowed(cleaned), Extraction::Fallback);
    }

    let tail = lines.len() - after.len();
    if !same_lines(&lines[..before.len()], &before) || !same_lines(&lines[tail..], &after) {
        log::debug!(
            "Unit {}: output does not start and end with the submitted context",
            unit.index
        );
        return (Cow::Borrowed(cleaned), Extraction::Fallback);
    }

    let editable = lines[before.len()..tail].join("\n");
    (Cow::Owned(editable), Extraction::LineSlice)
}

fn same_lines(output: &[&str], context: &[&str]) -> bool {
    output.len() == context.len()
        && output
            .iter()
            .zip(context)
            .all(|(a, b)| a.trim() == b.trim())
}

fn between_delimiters(text: &str) -> Option<&str> {
    let start = text.find(EDIT_OPEN)? + EDIT_OPEN.len();
    let end = start + text[start..].find(EDIT_CLOSE)?;
    Some(&text[start..end])
}

/// Gives `core` the leading and trailing whitespace of `original`.
fn reattach_whitespace(original: &str, core: &str) -> String {
    if original.trim().is_empty() {
        return core.to_string();
    }
    let leading = &original[..original.len() - original.trim_start().len()];
    let trailing = &original[original.trim_end().len()..];
    format!("{leading}{core}{trailing}")
}
