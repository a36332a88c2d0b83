//! # iedit core
//!
//! Segmentation, numeric shielding and safe replacement for model-assisted
//! editing of LaTeX documents.
//!
//! ## Overview
//!
//! A document is cut into units, each unit's numbers and numeric math are
//! swapped for placeholder tokens, the shielded text goes through a
//! [`ModelClient`], and whatever comes back is restored, stripped of echoed
//! wrappers and context, and offered to a [`ChangeAuthority`]. Approved units
//! are spliced back by position and the file is rewritten once, after a
//! `.bak` copy of the original has been made.
//!
//! ## Modules
//!
//! - [`shield`] - placeholder substitution for numeric and math literals
//! - [`segment`] - structural and windowed splitting into [`Unit`]s
//! - [`reconcile`] - extracting a [`Proposal`] from raw model output
//! - [`authority`] - auto-apply, reject-all and interactive decisions
//! - [`writer`] - span-based reassembly, backups and atomic writes
//! - [`engine`] - the per-file and per-batch pipeline
//!
//! ## Example
//!
//! ```no_run
//! use iedit_core::{AutoApply, Editor, NoChangeModel, SegmentPolicy};
//! use std::path::PathBuf;
//!
//! let mut editor = Editor::new(
//!     SegmentPolicy::Structural,
//!     Box::new(NoChangeModel),
//!     Box::new(AutoApply),
//! );
//! let batch = editor.process_paths(&[PathBuf::from("paper.tex")], false);
//! println!("{} file(s) failed", batch.failed_count());
//! ```
//!
//! Shielding on its own:
//!
//! ```
//! use iedit_core::shield::{shield, unshield};
//!
//! let (shielded, map) = shield("The result was 42 and 3.14 percent.");
//! assert_eq!(map.len(), 2);
//! assert_eq!(unshield(&shielded, &map), "The result was 42 and 3.14 percent.");
//! ```

pub mod authority;
pub mod discover;
pub mod engine;
pub mod error;
pub mod model;
pub mod prompt;
pub mod reconcile;
pub mod report;
pub mod segment;
pub mod shield;
pub mod writer;

pub use authority::{AutoApply, ChangeAuthority, ChangeDecision, Interactive, RejectAll};
pub use engine::Editor;
pub use error::{EditError, ModelError, WriteError};
pub use model::{ModelClient, NoChangeModel};
pub use reconcile::{Proposal, reconcile};
pub use report::{BatchReport, FileOutcome, FileReport, UnitWarning};
pub use segment::{SegmentPolicy, Span, Unit, segment};
pub use shield::{NumericShield, PlaceholderMap};
pub use writer::{Document, WriteResult, commit, restore_backup};
