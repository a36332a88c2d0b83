use iedit_core::report::FileReport;
use iedit_core::{
    AutoApply, ChangeDecision, Editor, ModelClient, ModelError, NoChangeModel, Proposal,
    RejectAll, SegmentPolicy, UnitWarning, WriteResult,
};
use std::fs;
use std::path::{Path, PathBuf};

const PAPER: &str = "\\section{Intro}\nTeh result was 42 and 3.14 percent.\n\\section{Method}\nWe used teh method.\n";
const FIXED: &str = "\\section{Intro}\nThe result was 42 and 3.14 percent.\n\\section{Method}\nWe used the method.\n";

/// Test double that answers from a closure over the LaTeX passage of the prompt.
struct FnModel<F>(F);

impl<F> std::fmt::Debug for FnModel<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnModel")
    }
}

impl<F> ModelClient for FnModel<F>
where
    F: Fn(&str) -> Result<String, ModelError>,
{
    fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        (self.0)(passage_of(prompt))
    }
}

fn passage_of(prompt: &str) -> &str {
    let start = prompt.find("```latex\n").expect("prompt has a latex block") + "```latex\n".len();
    let end = prompt.rfind("```").expect("prompt closes its latex block");
    &prompt[start..end]
}

fn spell_fixer() -> FnModel<impl Fn(&str) -> Result<String, ModelError>> {
    FnModel(|passage: &str| -> Result<String, ModelError> {
        assert!(!passage.contains("42"), "numbers must be shielded: {passage}");
        assert!(!passage.contains("3.14"), "numbers must be shielded: {passage}");
        Ok(passage.replace("Teh", "The").replace("teh", "the"))
    })
}

fn write_paper(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("paper.tex");
    fs::write(&path, text).unwrap();
    path
}

fn run(editor: &mut Editor, path: &Path) -> FileReport {
    editor.process_file(path).unwrap()
}

#[test]
fn test_auto_apply_fixes_prose_and_keeps_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(dir.path(), PAPER);

    let mut editor = Editor::new(
        SegmentPolicy::Structural,
        Box::new(spell_fixer()),
        Box::new(AutoApply),
    );
    let report = run(&mut editor, &path);

    assert_eq!(report.units, 4);
    assert_eq!(report.submitted, 2);
    assert_eq!(report.proposals, 2);
    assert_eq!(report.approved, 2);
    assert!(report.warnings.is_empty());
    assert_eq!(
        report.outcome,
        WriteResult::Written {
            backup: dir.path().join("paper.tex.bak")
        }
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), FIXED);
    assert_eq!(
        fs::read_to_string(dir.path().join("paper.tex.bak")).unwrap(),
        PAPER
    );
}

#[test]
fn test_model_failure_only_skips_its_unit() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(dir.path(), PAPER);

    let model = FnModel(|passage: &str| {
        if passage.contains("method") {
            Err(ModelError::Invocation("connection reset".into()))
        } else {
            Ok(passage.replace("Teh", "The"))
        }
    });
    let mut editor = Editor::new(SegmentPolicy::Structural, Box::new(model), Box::new(AutoApply));
    let report = run(&mut editor, &path);

    assert_eq!(report.approved, 1);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        &report.warnings[0],
        UnitWarning::ModelFailure { unit: 3, message } if message.contains("connection reset")
    ));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "\\section{Intro}\nThe result was 42 and 3.14 percent.\n\\section{Method}\nWe used teh method.\n"
    );
}

#[test]
fn test_empty_response_is_a_model_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(dir.path(), "Teh only paragraph.\n");

    let model = FnModel(|_: &str| -> Result<String, ModelError> { Ok("  \n".to_string()) });
    let mut editor = Editor::new(SegmentPolicy::Structural, Box::new(model), Box::new(AutoApply));
    let report = run(&mut editor, &path);

    assert_eq!(report.proposals, 0);
    assert!(matches!(
        &report.warnings[..],
        [UnitWarning::ModelFailure { unit: 0, message }] if message.contains("empty response")
    ));
    assert_eq!(report.outcome, WriteResult::Unchanged);
}

#[test]
fn test_dropped_placeholder_skips_the_unit() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(dir.path(), PAPER);

    let model = FnModel(|passage: &str| -> Result<String, ModelError> {
        if passage.contains("__NUM_") {
            Ok("The result was forty-two percent.".to_string())
        } else {
            Ok(passage.replace("teh", "the"))
        }
    });
    let mut editor = Editor::new(SegmentPolicy::Structural, Box::new(model), Box::new(AutoApply));
    let report = run(&mut editor, &path);

    assert_eq!(report.approved, 1);
    assert!(matches!(
        &report.warnings[..],
        [UnitWarning::NumericDrift { unit: 1, missing }] if missing.len() == 2
    ));
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("Teh result was 42 and 3.14 percent."));
    assert!(text.contains("We used the method."));
}

#[test]
fn test_reject_all_leaves_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(dir.path(), PAPER);

    let mut editor = Editor::new(
        SegmentPolicy::Structural,
        Box::new(spell_fixer()),
        Box::new(RejectAll),
    );
    let report = run(&mut editor, &path);

    assert_eq!(report.proposals, 2);
    assert_eq!(report.approved, 0);
    assert_eq!(report.outcome, WriteResult::Unchanged);
    assert_eq!(fs::read_to_string(&path).unwrap(), PAPER);
    assert!(!dir.path().join("paper.tex.bak").exists());
}

#[test]
fn test_closure_authority_approves_selectively() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(dir.path(), PAPER);

    let authority = |proposal: &Proposal| {
        if proposal.unit_index == 3 {
            ChangeDecision::Approved
        } else {
            ChangeDecision::Rejected
        }
    };
    let mut editor = Editor::new(
        SegmentPolicy::Structural,
        Box::new(spell_fixer()),
        Box::new(authority),
    );
    let report = run(&mut editor, &path);

    assert_eq!(report.approved, 1);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "\\section{Intro}\nTeh result was 42 and 3.14 percent.\n\\section{Method}\nWe used the method.\n"
    );
}

#[test]
fn test_no_change_model_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(dir.path(), PAPER);

    let mut editor = Editor::new(
        SegmentPolicy::Structural,
        Box::new(NoChangeModel),
        Box::new(AutoApply),
    );
    let report = run(&mut editor, &path);

    assert_eq!(report.submitted, 2);
    assert_eq!(report.proposals, 0);
    assert_eq!(report.outcome, WriteResult::Unchanged);
    assert!(!dir.path().join("paper.tex.bak").exists());
}

#[test]
fn test_empty_document_never_calls_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(dir.path(), "");

    let model = FnModel(|_: &str| -> Result<String, ModelError> {
        panic!("model must not be called for an empty document")
    });
    let mut editor = Editor::new(SegmentPolicy::Structural, Box::new(model), Box::new(AutoApply));
    let report = run(&mut editor, &path);

    assert_eq!(report.units, 0);
    assert_eq!(report.outcome, WriteResult::Unchanged);
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_windowed_edit_ignores_echoed_context() {
    let dir = tempfile::tempdir().unwrap();
    let original: String = (0..10).map(|i| format!("line {i} has teh typo\n")).collect();
    let path = write_paper(dir.path(), &original);

    let mut editor = Editor::new(
        SegmentPolicy::Windowed {
            window: 2,
            context: 1,
        },
        Box::new(spell_fixer()),
        Box::new(AutoApply),
    );
    let report = run(&mut editor, &path);

    assert_eq!(report.units, 5);
    assert_eq!(report.approved, 5);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(fs::read_to_string(&path).unwrap(), original.replace("teh", "the"));
}

#[test]
fn test_misaligned_context_warns() {
    let dir = tempfile::tempdir().unwrap();
    let original: String = (0..10).map(|i| format!("line {i} has teh typo\n")).collect();
    let path = write_paper(dir.path(), &original);

    // Answers with the edited region only, dropping context and markers.
    let model = FnModel(|passage: &str| -> Result<String, ModelError> {
        let start = passage.find("<<<EDIT>>>\n").unwrap() + "<<<EDIT>>>\n".len();
        let end = passage.find("<<<END>>>").unwrap();
        Ok(passage[start..end].replace("teh", "the"))
    });
    let mut editor = Editor::new(
        SegmentPolicy::Windowed {
            window: 2,
            context: 1,
        },
        Box::new(model),
        Box::new(AutoApply),
    );
    let report = run(&mut editor, &path);

    assert_eq!(report.approved, 5);
    assert_eq!(report.warnings.len(), 5);
    assert!(report
        .warnings
        .iter()
        .all(|w| matches!(w, UnitWarning::ReconciliationAmbiguity { .. })));

    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(written.lines().count(), 10);
    assert_eq!(written, original.replace("teh", "the"));
}

#[test]
fn test_unknown_placeholder_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(dir.path(), "Teh cat sat.\n");

    let model = FnModel(|passage: &str| -> Result<String, ModelError> {
        Ok(format!("{} __NUM_99__", passage.trim().replace("Teh", "The")))
    });
    let mut editor = Editor::new(SegmentPolicy::Structural, Box::new(model), Box::new(AutoApply));
    let report = run(&mut editor, &path);

    assert!(matches!(
        &report.warnings[..],
        [UnitWarning::ShieldInconsistency { unit: 0, placeholders }]
            if placeholders == &["__NUM_99__".to_string()]
    ));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "The cat sat. __NUM_99__\n"
    );
}

#[test]
fn test_headings_and_equations_never_reach_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let paper = "\\section[Short]{Teh title}\nTeh text.\n\\begin{equation}\nteh = mc^2\n\\end{equation}\n\\subsection{Teh \\emph{key} idea}\nMore teh.\n";
    let path = write_paper(dir.path(), paper);

    let model = FnModel(|passage: &str| -> Result<String, ModelError> {
        assert!(!passage.contains("\\section"), "heading submitted: {passage}");
        assert!(!passage.contains("\\subsection"), "heading submitted: {passage}");
        assert!(!passage.contains("mc^2"), "equation submitted: {passage}");
        Ok(passage.replace("Teh", "The").replace("teh", "the"))
    });
    let mut editor = Editor::new(SegmentPolicy::Structural, Box::new(model), Box::new(AutoApply));
    let report = run(&mut editor, &path);

    assert_eq!(report.submitted, 2);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "\\section[Short]{Teh title}\nThe text.\n\\begin{equation}\nteh = mc^2\n\\end{equation}\n\\subsection{Teh \\emph{key} idea}\nMore the.\n"
    );
}

#[test]
fn test_batch_continues_past_bad_paths() {
    let dir = tempfile::tempdir().unwrap();
    write_paper(dir.path(), PAPER);
    fs::write(dir.path().join("notes.txt"), "teh").unwrap();

    let mut editor = Editor::new(
        SegmentPolicy::Structural,
        Box::new(spell_fixer()),
        Box::new(AutoApply),
    );
    let roots = vec![
        dir.path().join("missing.tex"),
        dir.path().join("notes.txt"),
        dir.path().to_path_buf(),
    ];
    let batch = editor.process_paths(&roots, false);

    assert_eq!(batch.files.len(), 3);
    assert_eq!(batch.failed_count(), 2);
    assert_eq!(batch.written_count(), 1);
    assert!(!batch.is_success());
    assert_eq!(
        fs::read_to_string(dir.path().join("paper.tex")).unwrap(),
        FIXED
    );
    assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "teh");
}
