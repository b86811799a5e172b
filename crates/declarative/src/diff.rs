//! Diff computation for resources

use crate::resource::Resource;
use crate::types::Change;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One planned or performed change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// What has to happen
    pub change: Change,
    /// Extra detail, e.g. which fields or permissions differ
    pub detail: Option<String>,
}

impl ResourceDiff {
    /// Create a diff for a resource
    pub fn new(resource: &dyn Resource, change: Change) -> Self {
        Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            change,
            detail: None,
        }
    }

    /// Attach a detail line
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        self.change == Change::Create
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        self.change == Change::Delete
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        self.change == Change::Update
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.change {
                Change::Create => summary.additions += 1,
                Change::Delete => summary.removals += 1,
                Change::Update => summary.modifications += 1,
                Change::Unchanged => {}
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ResourceDiff]) -> HashMap<String, Vec<&ResourceDiff>> {
    let mut groups: HashMap<String, Vec<&ResourceDiff>> = HashMap::new();
    for diff in diffs {
        groups
            .entry(diff.resource_type.clone())
            .or_default()
            .push(diff);
    }
    groups
}

/// Elements to add and remove to turn one set into another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDelta<T: Ord> {
    /// In the new set but not the old one
    pub add: BTreeSet<T>,
    /// In the old set but not the new one
    pub remove: BTreeSet<T>,
}

impl<T: Ord + Clone> SetDelta<T> {
    /// Compute `new - old` and `old - new`
    pub fn between(old: &BTreeSet<T>, new: &BTreeSet<T>) -> Self {
        Self {
            add: new.difference(old).cloned().collect(),
            remove: old.difference(new).cloned().collect(),
        }
    }

    /// Check if nothing has to change
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}
