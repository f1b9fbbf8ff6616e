//! Output path resolution: pick a `.docx` name that does not overwrite
//! anything.
//!
//! The result only reflects the filesystem at call time. Two callers racing
//! on the same stem can both receive the same name; the converter runs one
//! job at a time, so this is a documented constraint rather than a guarantee.

use std::path::{Path, PathBuf};

/// Compute `<stem>.docx` next to `input`; if taken, `<stem>_1.docx`,
/// `<stem>_2.docx`, … until a free name is found.
pub fn resolve_output_path(input: impl AsRef<Path>) -> PathBuf {
    let input = input.as_ref();
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let first = dir.join(format!("{stem}.docx"));
    if !first.exists() {
        return first;
    }

    (1u64..)
        .map(|n| dir.join(format!("{stem}_{n}.docx")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}
