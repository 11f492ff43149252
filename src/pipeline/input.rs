//! Input resolution: turn a user-supplied path into PDF bytes.
//!
//! The review itself works on in-memory uploads, so a file on disk ends up
//! as a `Vec<u8>` like any other upload. The PDF magic bytes (`%PDF`) are
//! checked here so a wrong file fails with a clear message instead of a
//! parser error deep inside extraction.

use crate::error::LupiaError;
use crate::pipeline::extract::DocumentRole;
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Read the PDF at `path`.
///
/// `role` only labels errors.
pub async fn resolve_input(path: &Path, role: DocumentRole) -> Result<Vec<u8>, LupiaError> {
    let bytes = read_local(path).await?;
    check_magic(&bytes, role)?;
    Ok(bytes)
}

/// Reject anything that does not start with `%PDF`.
pub fn check_magic(bytes: &[u8], role: DocumentRole) -> Result<(), LupiaError> {
    if bytes.len() >= 4 && &bytes[..4] == PDF_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(LupiaError::NotAPdf { which: role, magic })
}

/// Read a local file, mapping I/O failures to user-facing errors.
async fn read_local(path: &Path) -> Result<Vec<u8>, LupiaError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(LupiaError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(LupiaError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}
