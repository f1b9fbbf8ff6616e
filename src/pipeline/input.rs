//! Input validation: the checks a front end runs before starting a job.
//!
//! The converter itself only needs to be able to open the file as a PDF; it
//! fails cleanly when it cannot. These checks exist so a front end can reject
//! obviously wrong input (missing file, wrong extension, not a PDF) with a
//! precise message before any worker thread is started.

use crate::error::ConvertError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether the path carries a `.pdf` extension (case-insensitive).
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Validate a local input path: it must exist, be a regular file, end in
/// `.pdf`, be readable, and start with the `%PDF` magic bytes.
pub fn validate_input(path: impl AsRef<Path>) -> Result<PathBuf, ConvertError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(ConvertError::FileNotFound { path });
    }

    if !has_pdf_extension(&path) {
        return Err(ConvertError::NotPdfExtension { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(ConvertError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ConvertError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ConvertError::FileNotFound { path });
        }
    }

    debug!("Validated input PDF: {}", path.display());
    Ok(path)
}
