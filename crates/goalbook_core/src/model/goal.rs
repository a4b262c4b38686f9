//! Goal domain model.
//!
//! # Responsibility
//! - Define the canonical record persisted and queried by the store.
//! - Provide lifecycle helpers for completion toggling.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another goal.
//! - `title`, `detail` and `deadline_ms` are write-once at creation; only
//!   `is_done` changes over a goal's lifetime.
//! - There is no edit operation and no soft-delete state.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every goal record.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type GoalId = Uuid;

/// Validation failure for goal construction or interactive input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalValidationError {
    /// The nil UUID is reserved and never a valid goal identity.
    NilUuid,
    /// Interactive input contract: title must contain non-whitespace text.
    EmptyTitle,
    /// Interactive input contract: detail must contain non-whitespace text.
    EmptyDetail,
}

impl Display for GoalValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "goal uuid must not be the nil uuid"),
            Self::EmptyTitle => write!(f, "goal title must not be empty"),
            Self::EmptyDetail => write!(f, "goal detail must not be empty"),
        }
    }
}

impl Error for GoalValidationError {}

/// Canonical domain record for a single tracked goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Stable global ID used for toggling, deletion and auditing.
    pub uuid: GoalId,
    /// User-supplied headline text.
    pub title: String,
    /// User-supplied free-form description.
    pub detail: String,
    /// Deadline as Unix epoch milliseconds. Serialized as `deadline` to
    /// match the storage column naming.
    #[serde(rename = "deadline")]
    pub deadline_ms: i64,
    /// Completion flag. The only mutable field.
    pub is_done: bool,
}

impl Goal {
    /// Creates a new goal with a generated stable ID.
    ///
    /// # Invariants
    /// - `is_done` starts as `false`.
    pub fn new(title: impl Into<String>, detail: impl Into<String>, deadline_ms: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            detail: detail.into(),
            deadline_ms,
            is_done: false,
        }
    }

    /// Creates a goal with a caller-provided stable ID.
    ///
    /// Used by import/test paths where identity already exists externally.
    ///
    /// # Errors
    /// - `GoalValidationError::NilUuid` when `uuid` is the nil UUID.
    pub fn with_id(
        uuid: GoalId,
        title: impl Into<String>,
        detail: impl Into<String>,
        deadline_ms: i64,
    ) -> Result<Self, GoalValidationError> {
        if uuid.is_nil() {
            return Err(GoalValidationError::NilUuid);
        }
        Ok(Self {
            uuid,
            title: title.into(),
            detail: detail.into(),
            deadline_ms,
            is_done: false,
        })
    }

    /// Checks structural integrity of this record.
    ///
    /// Deliberately permissive about text content: empty `title`/`detail`
    /// are accepted here so that import scripts and historical data keep
    /// working. Interactive callers use [`validate_new_input`] instead.
    pub fn validate(&self) -> Result<(), GoalValidationError> {
        if self.uuid.is_nil() {
            return Err(GoalValidationError::NilUuid);
        }
        Ok(())
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle_done(&mut self) -> bool {
        self.is_done = !self.is_done;
        self.is_done
    }

    /// Returns whether this goal still needs attention.
    pub fn is_open(&self) -> bool {
        !self.is_done
    }
}

/// Input contract for interactive goal creation.
///
/// The store itself accepts empty text fields; UIs and other interactive
/// collaborators call this before forwarding a create intent, and surface
/// the failure as a blocking warning instead of reaching the store.
pub fn validate_new_input(title: &str, detail: &str) -> Result<(), GoalValidationError> {
    if title.trim().is_empty() {
        return Err(GoalValidationError::EmptyTitle);
    }
    if detail.trim().is_empty() {
        return Err(GoalValidationError::EmptyDetail);
    }
    Ok(())
}
