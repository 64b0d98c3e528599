use crate::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// One non-directive line of a fragment, kept with its origin for
/// diagnostics. `line` is the 0-based index into the fragment.
#[derive(Debug, Clone)]
pub struct SourceLine {
    pub text: String,
    pub file: String,
    pub line: usize,
}

impl SourceLine {
    pub fn location(&self) -> String {
        format!("{}, line {}", self.file, self.line + 1)
    }
}

/// Collect every `*.s` fragment under `root`, in lexicographic path order
/// so duplicate-address reports are reproducible across runs.
pub fn find_sources(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut found = Vec::new();
    walk(root, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), Error> {
    let entries =
        fs::read_dir(dir).map_err(|e| Error::FileOpen(dir.display().to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::FileRead(dir.display().to_string(), e))?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "s") {
            out.push(path);
        }
    }
    Ok(())
}
