//! Instructions sent to the model together with a shielded unit.

/// Opening delimiter around the editable region when context is present.
pub const EDIT_OPEN: &str = "<<<EDIT>>>";
/// Closing delimiter around the editable region.
pub const EDIT_CLOSE: &str = "<<<END>>>";
/// Answer the model gives when a passage needs no change.
pub const NO_CHANGE_SENTINEL: &str = "NONE";

const INSTRUCTIONS: &str = "\
You are an expert LaTeX editor. Improve the grammar, phrasing and style of the LaTeX passage below.

Guidelines:
- Fix grammatical errors and improve phrasing
- Keep the original meaning and do not add or remove substantive content
- Keep every LaTeX command, environment and math expression exactly as written
- Keep every token of the form __NUM_<n>__ exactly as written; each one stands for a number
- Return only the LaTeX passage, without explanations
- If nothing should change, answer with the single word NONE
";

const CONTEXT_INSTRUCTIONS: &str = "\
- Only the lines between <<<EDIT>>> and <<<END>>> may be edited; the lines around them are context
- Return the whole passage, context and both marker lines included, with the context unchanged
";

/// A shielded unit ready to be rendered into a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionRequest<'a> {
    pub text: &'a str,
    pub context_before: Option<&'a str>,
    pub context_after: Option<&'a str>,
}

impl<'a> RevisionRequest<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            context_before: None,
            context_after: None,
        }
    }

    pub fn with_context(mut self, before: Option<&'a str>, after: Option<&'a str>) -> Self {
        self.context_before = before;
        self.context_after = after;
        self
    }

    fn has_context(&self) -> bool {
        self.context_before.is_some() || self.context_after.is_some()
    }
}

/// Renders the full prompt for one unit.
pub fn build_prompt(request: &RevisionRequest<'_>) -> String {
    let mut prompt = String::from(INSTRUCTIONS);
    if request.has_context() {
        prompt.push_str(CONTEXT_INSTRUCTIONS);
    }
    prompt.push_str("\n```latex\n");
    prompt.push_str(&passage(request));
    prompt.push_str("```\n");
    prompt
}

/// The LaTeX the model is asked to edit, delimiters included when context is present.
pub fn passage(request: &RevisionRequest<'_>) -> String {
    if !request.has_context() {
        return with_newline(request.text);
    }

    let mut out = String::new();
    if let Some(before) = request.context_before {
        out.push_str(&with_newline(before));
    }
    out.push_str(EDIT_OPEN);
    out.push('\n');
    out.push_str(&with_newline(request.text));
    out.push_str(EDIT_CLOSE);
    out.push('\n');
    if let Some(after) = request.context_after {
        out.push_str(&with_newline(after));
    }
    out
}

fn with_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}
