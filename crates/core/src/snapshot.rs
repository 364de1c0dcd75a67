//! Snapshot keys and the backup payload.
//!
//! Snapshot keys carry a fixed prefix, the capture time as zero-padded
//! epoch seconds, and a process-wide sequence number. Zero-padding keeps
//! lexicographic order aligned with capture order; the sequence keeps keys
//! unique when two triggers race within the same second.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Prefix shared by every snapshot key.
pub const SNAPSHOT_KEY_PREFIX: &str = "secret_snapshot_";

/// Sequence numbers wrap at one million, matching the six padded digits.
const SEQUENCE_MODULUS: u64 = 1_000_000;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate the key for a snapshot captured at `captured_at`.
pub fn next_snapshot_key(captured_at: Timestamp) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) % SEQUENCE_MODULUS;
    format!(
        "{SNAPSHOT_KEY_PREFIX}{:010}_{seq:06}",
        captured_at.timestamp()
    )
}

/// What gets persisted for one snapshot (the JSONB payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPayload {
    /// Extracted secret values, keyed by canonical name.
    pub values: BTreeMap<String, String>,
    /// When the values were read from the configuration source.
    pub captured_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
