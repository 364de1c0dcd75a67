//! Secret configuration parsing and backup preconditions.
//!
//! The host application keeps its secret keys as quoted assignment
//! statements in a plain-text configuration file. Before every rotation the
//! engine reads that file, extracts the known keys, and persists a snapshot.
//! Fewer than [`MIN_KEYS_FOR_BACKUP`] extracted keys means the file is
//! malformed or the wrong file entirely, and the rotation must abort before
//! the external tool mutates anything.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;

// ---------------------------------------------------------------------------
// Required keys
// ---------------------------------------------------------------------------

/// The canonical secret key names, in their configuration-file order.
pub const SECRET_KEYS: &[&str] = &[
    "AUTH_KEY",
    "SECURE_AUTH_KEY",
    "LOGGED_IN_KEY",
    "NONCE_KEY",
    "AUTH_SALT",
    "SECURE_AUTH_SALT",
    "LOGGED_IN_SALT",
    "NONCE_SALT",
];

/// Minimum number of extracted keys for a snapshot to be considered valid.
pub const MIN_KEYS_FOR_BACKUP: usize = 4;

/// Error text recorded on the audit row when the backup step fails.
/// The concrete [`BackupError`] cause goes to the log, not the audit row.
pub const BACKUP_FAILED_ERROR: &str = "Backup failed";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why the backup step failed. Any of these aborts the rotation before the
/// external command is invoked.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("no readable configuration source among: {0}")]
    ConfigUnreadable(String),

    #[error("only {found} of {required} required secret keys extracted")]
    InsufficientSecrets { found: usize, required: usize },

    #[error("snapshot write failed: {0}")]
    PersistFailure(String),
}

// ---------------------------------------------------------------------------
// Configuration source
// ---------------------------------------------------------------------------

/// Read the first candidate path whose contents can be loaded.
///
/// Candidates are tried in order; unreadable ones (missing, permission
/// denied, not UTF-8) are skipped. Returns the winning path alongside the
/// raw text, or [`BackupError::ConfigUnreadable`] naming every candidate
/// tried.
pub async fn read_first_readable(candidates: &[PathBuf]) -> Result<(PathBuf, String), BackupError> {
    for candidate in candidates {
        if let Ok(raw) = tokio::fs::read_to_string(candidate).await {
            return Ok((candidate.clone(), raw));
        }
    }
    let tried = candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(BackupError::ConfigUnreadable(tried))
}

/// Candidate configuration locations for an application rooted at `app_root`:
/// the root itself, then its parent (some deployments keep the secrets file
/// one level above the web root).
pub fn candidate_paths(app_root: &Path) -> Vec<PathBuf> {
    vec![
        app_root.join("secrets.conf"),
        app_root.join("..").join("secrets.conf"),
    ]
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract quoted assignment values for each of `keys` from raw
/// configuration text.
///
/// Matches lines of the form `NAME = "value"` or `NAME = 'value'`, with
/// arbitrary horizontal whitespace around the `=`. The first assignment of
/// a key wins. Keys without a match are simply absent from the result, as
/// are keys assigned an empty string (an empty secret does not count toward
/// the backup threshold).
pub fn extract_secrets(raw: &str, keys: &[&str]) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for key in keys {
        let pattern = format!(
            r#"(?m)^[ \t]*{}[ \t]*=[ \t]*(?:"([^"]+)"|'([^']+)')"#,
            regex::escape(key)
        );
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        if let Some(caps) = re.captures(raw) {
            if let Some(value) = caps.get(1).or_else(|| caps.get(2)) {
                values.insert((*key).to_string(), value.as_str().to_string());
            }
        }
    }
    values
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
