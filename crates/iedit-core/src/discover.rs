use crate::error::EditError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// True for paths with a `.tex` extension, in any case.
pub fn is_latex_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tex"))
}

/// Expands `root` into the LaTeX files to process.
///
/// A file is returned as is if it has a `.tex` extension. A directory yields
/// its `.tex` files sorted by name, descending into subdirectories only when
/// `recursive` is set.
pub fn find_latex_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, EditError> {
    if root.is_file() {
        return if is_latex_path(root) {
            Ok(vec![root.to_path_buf()])
        } else {
            Err(EditError::NotLatex(root.to_path_buf()))
        };
    }
    if !root.is_dir() {
        return Err(EditError::Missing(root.to_path_buf()));
    }

    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| EditError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_latex_path(entry.path()) {
            files.push(entry.into_path());
        }
    }

    log::debug!("Found {} LaTeX file(s) under {}", files.len(), root.display());
    Ok(files)
}
