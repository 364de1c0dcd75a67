//! Rotation attempt vocabulary: outcome and trigger-source enums with
//! their audit-table string representations.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Outcome constants
// ---------------------------------------------------------------------------

/// The external tool reported a success marker in its output.
pub const OUTCOME_SUCCESS: &str = "success";
/// Backup failed or the external tool did not report success.
pub const OUTCOME_FAILURE: &str = "failure";

/// All valid attempt outcomes.
pub const VALID_OUTCOMES: &[&str] = &[OUTCOME_SUCCESS, OUTCOME_FAILURE];

// ---------------------------------------------------------------------------
// Trigger source constants
// ---------------------------------------------------------------------------

/// Fired by the daily timer.
pub const TRIGGER_SCHEDULED: &str = "scheduled";
/// Fired by the overdue check when no recent success was found.
pub const TRIGGER_OVERDUE_FALLBACK: &str = "overdue-fallback";
/// Fired by an operator through the HTTP surface.
pub const TRIGGER_MANUAL: &str = "manual";

/// All valid trigger sources.
pub const VALID_TRIGGER_SOURCES: &[&str] =
    &[TRIGGER_SCHEDULED, TRIGGER_OVERDUE_FALLBACK, TRIGGER_MANUAL];

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Rotation attempt outcome enum with string conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    Success,
    Failure,
}

impl RotationOutcome {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => OUTCOME_SUCCESS,
            Self::Failure => OUTCOME_FAILURE,
        }
    }

    /// Parse from a string, returning an error for unknown outcomes.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            OUTCOME_SUCCESS => Ok(Self::Success),
            OUTCOME_FAILURE => Ok(Self::Failure),
            other => Err(CoreError::Validation(format!(
                "Unknown attempt outcome: '{other}'. Valid outcomes: {}",
                VALID_OUTCOMES.join(", ")
            ))),
        }
    }
}

/// Why a rotation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Scheduled,
    OverdueFallback,
    Manual,
}

impl TriggerSource {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => TRIGGER_SCHEDULED,
            Self::OverdueFallback => TRIGGER_OVERDUE_FALLBACK,
            Self::Manual => TRIGGER_MANUAL,
        }
    }

    /// Parse from a string, returning an error for unknown sources.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            TRIGGER_SCHEDULED => Ok(Self::Scheduled),
            TRIGGER_OVERDUE_FALLBACK => Ok(Self::OverdueFallback),
            TRIGGER_MANUAL => Ok(Self::Manual),
            other => Err(CoreError::Validation(format!(
                "Unknown trigger source: '{other}'. Valid sources: {}",
                VALID_TRIGGER_SOURCES.join(", ")
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
