//! The per-file pipeline.
//!
//! ```text
//! Document ─► segment ─► for each unit:
//!                          shield ─► model ─► unshield ─► reconcile ─► decide
//!          ◄─ commit ◄──── approved replacements (by unit index)
//! ```
//!
//! Units are handled strictly one after another. Nothing reaches the disk
//! until every unit of the file has been decided, so interrupting a run
//! before [`commit`] leaves the file untouched.

use crate::authority::{ChangeAuthority, ChangeDecision};
use crate::discover::find_latex_files;
use crate::error::{EditError, ModelError};
use crate::model::ModelClient;
use crate::prompt::{RevisionRequest, build_prompt};
use crate::reconcile::{Proposal, reconcile_detailed};
use crate::report::{BatchReport, FileReport, UnitWarning};
use crate::segment::{SegmentPolicy, Unit, segment};
use crate::shield::{NumericShield, placeholders_in};
use crate::writer::{Document, commit};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub struct Editor {
    policy: SegmentPolicy,
    model: Box<dyn ModelClient>,
    authority: Box<dyn ChangeAuthority>,
}

impl Editor {
    pub fn new(
        policy: SegmentPolicy,
        model: Box<dyn ModelClient>,
        authority: Box<dyn ChangeAuthority>,
    ) -> Self {
        Self {
            policy,
            model,
            authority,
        }
    }

    pub fn policy(&self) -> SegmentPolicy {
        self.policy
    }

    /// Processes every LaTeX file reachable from `roots`.
    ///
    /// A failure is confined to its file (or to its root, when the root
    /// itself cannot be expanded); the rest of the batch still runs.
    pub fn process_paths(&mut self, roots: &[PathBuf], recursive: bool) -> BatchReport {
        let mut batch = BatchReport::default();
        for root in roots {
            match find_latex_files(root, recursive) {
                Ok(files) => {
                    for file in files {
                        let result = self.process_file(&file);
                        batch.push(file, result);
                    }
                }
                Err(e) => batch.push(root.clone(), Err(e)),
            }
        }
        batch
    }

    /// Runs the full pipeline on one file.
    pub fn process_file(&mut self, path: &Path) -> Result<FileReport, EditError> {
        log::info!("Processing {}", path.display());
        let document = Document::load(path)?;
        let units = segment(&document.text, self.policy);
        let mut report = FileReport::new(path, units.len());

        if units.is_empty() {
            log::info!("{}: empty document, nothing to do", path.display());
            return Ok(report);
        }

        // One shield per document keeps placeholder numbers unique across units.
        let mut shield = NumericShield::new();
        let mut approved = BTreeMap::new();

        for unit in &units {
            if unit.is_passthrough() {
                log::debug!("{}: unit {} passed through", path.display(), unit.index);
                continue;
            }
            report.submitted += 1;
            log::info!(
                "{}: unit {}/{}",
                path.display(),
                unit.index + 1,
                units.len()
            );

            let Some(proposal) = self.revise(unit, &mut shield, &mut report) else {
                continue;
            };
            report.proposals += 1;

            match self.authority.decide(&proposal) {
                ChangeDecision::Approved => {
                    report.approved += 1;
                    approved.insert(proposal.unit_index, proposal.revised);
                }
                ChangeDecision::Rejected => {
                    log::debug!("{}: unit {} rejected", path.display(), unit.index);
                }
            }
        }

        report.outcome = commit(&document, &units, &approved)?;
        Ok(report)
    }

    fn revise(
        &self,
        unit: &Unit,
        shield: &mut NumericShield,
        report: &mut FileReport,
    ) -> Option<Proposal> {
        let text = shield.shield(&unit.text);
        let before = unit.context_before.as_deref().map(|c| shield.shield(c));
        let after = unit.context_after.as_deref().map(|c| shield.shield(c));
        let request =
            RevisionRequest::new(&text).with_context(before.as_deref(), after.as_deref());

        let raw = match self.model.complete(&build_prompt(&request)) {
            Ok(raw) if raw.trim().is_empty() => Err(ModelError::EmptyResponse),
            other => other,
        };
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                report.warn(UnitWarning::ModelFailure {
                    unit: unit.index,
                    message: format!("{}: {}", self.model.name(), e),
                });
                return None;
            }
        };

        let restored = shield.unshield(&raw);
        if !restored.is_consistent() {
            report.warn(UnitWarning::ShieldInconsistency {
                unit: unit.index,
                placeholders: restored.unknown.clone(),
            });
        }

        let reconciled = reconcile_detailed(unit, &restored.text);
        if reconciled.is_ambiguous() {
            report.warn(UnitWarning::ReconciliationAmbiguity { unit: unit.index });
        }
        let proposal = reconciled.proposal?;

        // Every protected literal of the editable text must come back.
        let missing: Vec<String> = placeholders_in(&text)
            .into_iter()
            .filter(|token| !raw.contains(token))
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            report.warn(UnitWarning::NumericDrift {
                unit: unit.index,
                missing,
            });
            return None;
        }

        Some(proposal)
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("policy", &self.policy)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
