//! Writing approved changes back to disk.
//!
//! The revised document is rebuilt from unit spans, never by searching for
//! the original snippet, so a passage that occurs twice is only replaced
//! where it was approved. Before the file is overwritten its on-disk bytes
//! are copied to `<name>.bak`; the new content then replaces the file
//! through a temporary sibling and a rename.

use crate::error::WriteError;
use crate::segment::Unit;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const BACKUP_SUFFIX: &str = ".bak";

/// The text of a file as it was when the run started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    pub fn load(path: &Path) -> Result<Self, WriteError> {
        let text = fs::read_to_string(path).map_err(|source| WriteError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteResult {
    /// Nothing changed; no backup was made and the file was not touched.
    Unchanged,
    Written { backup: PathBuf },
}

/// Sibling backup path: `paper.tex` becomes `paper.tex.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(BACKUP_SUFFIX);
    path.with_file_name(name)
}

/// Rebuilds the document, swapping in replacements by unit index.
pub fn reassemble(text: &str, units: &[Unit], replacements: &BTreeMap<usize, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for unit in units {
        let span = unit.span;
        debug_assert!(span.start >= cursor && span.end <= text.len());
        out.push_str(&text[cursor..span.start]);
        match replacements.get(&unit.index) {
            Some(revised) => out.push_str(revised),
            None => out.push_str(&text[span.range()]),
        }
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Applies approved replacements to `document` and persists the result.
pub fn commit(
    document: &Document,
    units: &[Unit],
    replacements: &BTreeMap<usize, String>,
) -> Result<WriteResult, WriteError> {
    commit_with(document, units, replacements, write_atomic)
}

fn commit_with(
    document: &Document,
    units: &[Unit],
    replacements: &BTreeMap<usize, String>,
    write: impl FnOnce(&Path, &str) -> io::Result<()>,
) -> Result<WriteResult, WriteError> {
    let revised = reassemble(&document.text, units, replacements);
    if revised == document.text {
        log::info!("{}: no changes to write", document.path.display());
        return Ok(WriteResult::Unchanged);
    }

    let path = &document.path;
    let on_disk = fs::read(path).map_err(|source| WriteError::Read {
        path: path.clone(),
        source,
    })?;
    if on_disk != document.text.as_bytes() {
        return Err(WriteError::ChangedOnDisk { path: path.clone() });
    }

    let backup = backup_path(path);
    fs::write(&backup, &on_disk).map_err(|source| WriteError::Backup {
        backup: backup.clone(),
        source,
    })?;

    write(path, &revised).map_err(|source| WriteError::Write {
        path: path.clone(),
        backup: backup.clone(),
        source,
    })?;

    log::info!(
        "{}: changes saved (backup at {})",
        path.display(),
        backup.display()
    );
    Ok(WriteResult::Written { backup })
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Copies `<file>.bak` back over `<file>`. Returns the restored path.
///
/// The engine never calls this itself; it is for manual recovery.
pub fn restore_backup(backup: &Path) -> Result<PathBuf, WriteError> {
    let restore_error = |source| WriteError::Restore {
        backup: backup.to_path_buf(),
        source,
    };

    let name = backup
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(BACKUP_SUFFIX))
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            restore_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "backup file name must end in .bak",
            ))
        })?;

    let target = backup.with_file_name(name);
    let bytes = fs::read(backup).map_err(restore_error)?;
    fs::write(&target, bytes).map_err(restore_error)?;
    log::info!("Restored {} from {}", target.display(), backup.display());
    Ok(target)
}
