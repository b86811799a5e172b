//! Resource trait for declarative state management
//!
//! A Resource is one object whose desired and current versions can be
//! compared. Comparison is by value over every declared field; identity
//! alone never makes two versions equal.

use crate::types::Change;
use std::fmt;

/// Core trait for declarative resources
///
/// # Example
///
/// ```
/// use declarative::{Change, Resource, classify};
///
/// #[derive(Debug)]
/// struct Package { name: String, version: String }
///
/// impl Resource for Package {
///     fn id(&self) -> String { self.name.clone() }
///     fn description(&self) -> String { format!("{} {}", self.name, self.version) }
///     fn resource_type(&self) -> &'static str { "package" }
///     fn same_as(&self, other: &Self) -> bool {
///         self.name == other.name && self.version == other.version
///     }
/// }
///
/// let desired = Package { name: "rg".into(), version: "14".into() };
/// let current = Package { name: "rg".into(), version: "13".into() };
/// assert_eq!(classify(Some(&desired), Some(&current)), Some(Change::Update));
/// ```
pub trait Resource: fmt::Debug {
    /// Identifier used in reports
    ///
    /// Stable and unique within the resource type, e.g. a name or username.
    fn id(&self) -> String;

    /// Human-readable description of the resource
    fn description(&self) -> String;

    /// Resource type category, used for grouping output
    fn resource_type(&self) -> &'static str;

    /// Value equality over every declared field
    ///
    /// Backend-assigned identifiers are not part of the comparison.
    fn same_as(&self, other: &Self) -> bool
    where
        Self: Sized;
}

/// Classify a desired/current pair
///
/// Returns `None` when neither side exists.
pub fn classify<R: Resource>(desired: Option<&R>, current: Option<&R>) -> Option<Change> {
    match (desired, current) {
        (Some(_), None) => Some(Change::Create),
        (None, Some(_)) => Some(Change::Delete),
        (Some(d), Some(c)) if d.same_as(c) => Some(Change::Unchanged),
        (Some(_), Some(_)) => Some(Change::Update),
        (None, None) => None,
    }
}
