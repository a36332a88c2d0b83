//! Numeric shielding.
//!
//! Numbers and math that contain numbers must survive a model round-trip
//! byte for byte. Before a unit leaves the process every such literal is
//! swapped for a `__NUM_<n>__` token; afterwards the tokens are swapped back.
//!
//! Detection runs as a fold over [`Pass`]es. Each pass recomputes its
//! matches on the output of the previous one, so positions never go stale:
//!
//! 1. literal `__NUM_` text already in the input (keeps tokens unambiguous)
//! 2. decimal numbers, with an optional exponent
//! 3. bare integers
//! 4. inline math `$...$` containing a digit
//! 5. `equation` environments containing a digit
//!
//! Passes 4 and 5 may swallow tokens produced by passes 2 and 3; the map then
//! records the fully restored literal, so a single restore is always enough.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::ser::{Serialize, Serializer};
use std::ops::Range;

/// Prefix shared by every placeholder token.
pub const PLACEHOLDER_PREFIX: &str = "__NUM_";

static RESERVED: Lazy<Regex> = Lazy::new(|| Regex::new(r"__NUM_").unwrap());
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+\.[0-9]+(?:[eE][-+]?[0-9]+)?").unwrap());
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[0-9]+\b").unwrap());
static EQUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\\begin\{equation\*?\}.*?\\end\{equation\*?\}").unwrap());
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"__NUM_([0-9]+)__").unwrap());

/// Renders the placeholder token for slot `n`.
pub fn placeholder(n: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{n}__")
}

/// Returns every placeholder token occurring in `text`, in order.
pub fn placeholders_in(text: &str) -> Vec<&str> {
    TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Placeholder token to original literal.
///
/// Slots are handed out in increasing order and never reused, which makes
/// the mapping injective by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    originals: Vec<String>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Looks up the literal a token stands for.
    pub fn get(&self, token: &str) -> Option<&str> {
        let caps = TOKEN.captures(token)?;
        if caps.get(0)?.as_str().len() != token.len() {
            return None;
        }
        self.slot(&caps)
    }

    /// Iterates `(token, original)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &str)> {
        self.originals
            .iter()
            .enumerate()
            .map(|(n, original)| (placeholder(n), original.as_str()))
    }

    /// Replaces every known token in `text` with its literal.
    ///
    /// The scan is a single left-to-right pass and inserted literals are not
    /// rescanned. Tokens without an entry are left verbatim and reported.
    pub fn restore(&self, text: &str) -> Restored {
        let mut unknown = Vec::new();
        let restored = TOKEN.replace_all(text, |caps: &Captures| match self.slot(caps) {
            Some(original) => original.to_string(),
            None => {
                let token = caps[0].to_string();
                unknown.push(token.clone());
                token
            }
        });
        Restored {
            text: restored.into_owned(),
            unknown,
        }
    }

    fn slot(&self, caps: &Captures) -> Option<&str> {
        let n: usize = caps.get(1)?.as_str().parse().ok()?;
        self.originals.get(n).map(String::as_str)
    }

    fn allocate(&mut self, original: String) -> String {
        let token = placeholder(self.originals.len());
        self.originals.push(original);
        token
    }
}

impl Serialize for PlaceholderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Result of restoring placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub text: String,
    /// Tokens found in the text that the map knows nothing about.
    pub unknown: Vec<String>,
}

impl Restored {
    pub fn is_consistent(&self) -> bool {
        self.unknown.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Reserved,
    Decimal,
    Integer,
    InlineMath,
    Equation,
}

const PASSES: [Pass; 5] = [
    Pass::Reserved,
    Pass::Decimal,
    Pass::Integer,
    Pass::InlineMath,
    Pass::Equation,
];

impl Pass {
    fn spans(self, text: &str) -> Vec<Range<usize>> {
        match self {
            Pass::Reserved => RESERVED.find_iter(text).map(|m| m.range()).collect(),
            Pass::Decimal => DECIMAL.find_iter(text).map(|m| m.range()).collect(),
            Pass::Integer => INTEGER.find_iter(text).map(|m| m.range()).collect(),
            Pass::InlineMath => inline_math_spans(text)
                .into_iter()
                .filter(|span| has_digit(&text[span.clone()]))
                .collect(),
            Pass::Equation => EQUATION
                .find_iter(text)
                .filter(|m| has_digit(m.as_str()))
                .map(|m| m.range())
                .collect(),
        }
    }

    /// Whether a match can contain tokens from an earlier pass.
    fn encloses_tokens(self) -> bool {
        matches!(self, Pass::InlineMath | Pass::Equation)
    }
}

fn has_digit(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
}

/// Finds `$...$` spans, skipping escaped dollars and `$$...$$` display math.
fn inline_math_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    let mut in_display = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'$' => {
                if let Some(start) = open.take() {
                    spans.push(start..i + 1);
                } else if bytes.get(i + 1) == Some(&b'$') {
                    in_display = !in_display;
                    i += 2;
                    continue;
                } else if !in_display {
                    open = Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    spans
}

/// Shield scoped to one document.
///
/// The same instance shields every unit of a file, so token numbers keep
/// increasing across units and never collide within a run.
#[derive(Debug, Default)]
pub struct NumericShield {
    map: PlaceholderMap,
}

impl NumericShield {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces protected literals in `text` with fresh tokens.
    pub fn shield(&mut self, text: &str) -> String {
        PASSES
            .iter()
            .fold(text.to_string(), |current, pass| self.apply(*pass, current))
    }

    /// Restores every token this shield handed out.
    pub fn unshield(&self, text: &str) -> Restored {
        self.map.restore(text)
    }

    pub fn map(&self) -> &PlaceholderMap {
        &self.map
    }

    pub fn into_map(self) -> PlaceholderMap {
        self.map
    }

    fn apply(&mut self, pass: Pass, text: String) -> String {
        let spans = pass.spans(&text);
        if spans.is_empty() {
            return text;
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for span in spans {
            out.push_str(&text[cursor..span.start]);
            let literal = &text[span.clone()];
            let original = if pass.encloses_tokens() {
                self.map.restore(literal).text
            } else {
                literal.to_string()
            };
            out.push_str(&self.map.allocate(original));
            cursor = span.end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}

/// One-shot shield of a standalone text.
pub fn shield(text: &str) -> (String, PlaceholderMap) {
    let mut shield = NumericShield::new();
    let shielded = shield.shield(text);
    (shielded, shield.into_map())
}

/// One-shot restore. Unknown tokens stay in the output and are logged.
pub fn unshield(text: &str, map: &PlaceholderMap) -> String {
    let restored = map.restore(text);
    if !restored.is_consistent() {
        log::warn!(
            "No original value for placeholder(s) {}; left verbatim",
            restored.unknown.join(", ")
        );
    }
    restored.text
}
