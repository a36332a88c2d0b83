use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of the external model collaborator. Always recovered per unit.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model invocation failed: {0}")]
    Invocation(String),
    #[error("model did not answer within {0:?}")]
    Timeout(Duration),
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("model I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Filesystem failure while reading, backing up, writing or restoring a file.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("{} changed on disk while it was being edited", .path.display())]
    ChangedOnDisk { path: PathBuf },
    #[error("failed to create backup {}: {source}", .backup.display())]
    Backup { backup: PathBuf, source: io::Error },
    #[error(
        "failed to write {} (the original is kept in {}): {source}",
        .path.display(),
        .backup.display()
    )]
    Write {
        path: PathBuf,
        backup: PathBuf,
        source: io::Error,
    },
    #[error("cannot restore from {}: {source}", .backup.display())]
    Restore { backup: PathBuf, source: io::Error },
}

/// Error that ends processing of one file. Other files in a batch carry on.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("{} is not a LaTeX file", .0.display())]
    NotLatex(PathBuf),
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("failed to walk {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
    #[error(transparent)]
    Write(#[from] WriteError),
}
