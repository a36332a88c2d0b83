use crate::error::EditError;
use crate::writer::WriteResult;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A recovered problem with one unit. The unit keeps its original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitWarning {
    ModelFailure { unit: usize, message: String },
    ShieldInconsistency { unit: usize, placeholders: Vec<String> },
    NumericDrift { unit: usize, missing: Vec<String> },
    ReconciliationAmbiguity { unit: usize },
}

impl UnitWarning {
    pub fn unit(&self) -> usize {
        match self {
            UnitWarning::ModelFailure { unit, .. }
            | UnitWarning::ShieldInconsistency { unit, .. }
            | UnitWarning::NumericDrift { unit, .. }
            | UnitWarning::ReconciliationAmbiguity { unit } => *unit,
        }
    }
}

impl fmt::Display for UnitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitWarning::ModelFailure { unit, message } => {
                write!(f, "unit {unit}: model call failed ({message}); unit skipped")
            }
            UnitWarning::ShieldInconsistency { unit, placeholders } => write!(
                f,
                "unit {unit}: unknown placeholder(s) {} left in the text",
                placeholders.join(", ")
            ),
            UnitWarning::NumericDrift { unit, missing } => write!(
                f,
                "unit {unit}: model dropped protected value(s) {}; unit skipped",
                missing.join(", ")
            ),
            UnitWarning::ReconciliationAmbiguity { unit } => write!(
                f,
                "unit {unit}: echoed context could not be located; using the whole response"
            ),
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Units the document was split into.
    pub units: usize,
    /// Units sent to the model.
    pub submitted: usize,
    pub proposals: usize,
    pub approved: usize,
    pub warnings: Vec<UnitWarning>,
    pub outcome: WriteResult,
}

impl FileReport {
    pub fn new(path: &Path, units: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            units,
            submitted: 0,
            proposals: 0,
            approved: 0,
            warnings: Vec::new(),
            outcome: WriteResult::Unchanged,
        }
    }

    pub fn warn(&mut self, warning: UnitWarning) {
        log::warn!("{}: {}", self.path.display(), warning);
        self.warnings.push(warning);
    }
}

#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<FileReport, EditError>,
}

/// Results for every file of a run, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn push(&mut self, path: PathBuf, result: Result<FileReport, EditError>) {
        if let Err(e) = &result {
            log::debug!("{}: giving up: {}", path.display(), e);
        }
        self.files.push(FileOutcome { path, result });
    }

    pub fn reports(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter_map(|f| f.result.as_ref().ok())
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_err()).count()
    }

    pub fn written_count(&self) -> usize {
        self.reports()
            .filter(|r| matches!(r.outcome, WriteResult::Written { .. }))
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.reports().map(|r| r.warnings.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}
