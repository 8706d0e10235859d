//! Home directory resolution and `~` expansion.

use std::path::{Path, PathBuf};

use crate::error::{LedgerError, Result};

/// Resolve the current user's home directory.
///
/// `HOME` wins when set, so tests and sandboxes can redirect every default
/// path; otherwise the platform lookup from `dirs` is used.
pub fn home_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os("HOME").filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir().ok_or(LedgerError::HomeDirUnknown)
}

/// Expand a leading `~` against `home`.
pub fn expand_tilde(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Application data directory: `~/.tokenledger`
pub fn data_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".tokenledger"))
}
