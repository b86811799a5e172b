//! Local error types
//!
//! Neither of these ever aborts a run. A [`ReconcileError`] turns into a
//! skipped step, a [`ShapeError`] into a template entry that yields nothing.

use crate::resource::Kind;

/// A precondition that failed before any backend call was made
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("{kind} '{name}': parent '{parent}' did not resolve to an identifier")]
    UnresolvedParent {
        kind: Kind,
        name: String,
        parent: String,
    },

    #[error("{kind} '{name}' has no backend identifier")]
    MissingIdentifier { kind: Kind, name: String },

    #[error("{kind} '{name}' already has identifier {current}, refusing {new}")]
    IdentifierReassigned {
        kind: Kind,
        name: String,
        current: String,
        new: String,
    },

    #[error("{kind} '{name}' is declared more than once under the same parent")]
    Duplicate { kind: Kind, name: String },

    #[error("user '{0}' is declared more than once")]
    DuplicateUser(String),

    #[error("user '{0}' is protected")]
    ProtectedUser(String),
}

/// A malformed template section or entry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{section}.{entry}: {reason}")]
pub struct ShapeError {
    pub section: String,
    pub entry: String,
    pub reason: String,
}

impl ShapeError {
    pub fn new(section: &str, entry: &str, reason: impl Into<String>) -> Self {
        Self {
            section: section.to_string(),
            entry: entry.to_string(),
            reason: reason.into(),
        }
    }
}
