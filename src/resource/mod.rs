//! Entity model for Guacamole objects
//!
//! Groups, connections and sharing profiles form one tree and are handled
//! through the [`Entity`] enum. Users live beside the tree and carry a
//! [`PermissionSet`] referring to tree identifiers.
//!
//! Every type compares by value over its declared fields (`same_as`); the
//! backend identifier never takes part in the comparison.

use guacamole::{ROOT_IDENTIFIER, WireMap};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ReconcileError;

pub mod connection;
pub mod group;
pub mod sharing_profile;
pub mod user;

pub use connection::Connection;
pub use group::ConnectionGroup;
pub use sharing_profile::SharingProfile;
pub use user::{PermissionSet, User};

/// Kind of tree entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Group,
    Connection,
    SharingProfile,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Connection => "connection",
            Self::SharingProfile => "sharing_profile",
        }
    }

    /// Kind a parent reference of this kind points at
    pub fn parent_kind(&self) -> Self {
        match self {
            Self::Group | Self::Connection => Self::Group,
            Self::SharingProfile => Self::Connection,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => write!(f, "group"),
            Self::Connection => write!(f, "connection"),
            Self::SharingProfile => write!(f, "sharing profile"),
        }
    }
}

/// Reference to the parent of an entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParentRef {
    /// The implicit root group
    #[default]
    Root,
    /// A backend identifier
    Id(String),
    /// The name of an entity declared in the same template
    Name(String),
}

impl ParentRef {
    /// Parse a parent written in a template
    ///
    /// `ROOT` is the root, all-digit strings are identifiers, anything else
    /// is a name. An all-digit group name therefore cannot be referenced by
    /// name.
    pub fn parse(value: &str) -> Self {
        if value == ROOT_IDENTIFIER {
            Self::Root
        } else if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            Self::Id(value.to_string())
        } else {
            Self::Name(value.to_string())
        }
    }

    /// Parent as reported by the backend
    pub fn from_backend(value: Option<&str>) -> Self {
        match value {
            None => Self::Root,
            Some(ROOT_IDENTIFIER) => Self::Root,
            Some(id) => Self::Id(id.to_string()),
        }
    }

    /// Identifier to send to the backend, if resolved
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Root => Some(ROOT_IDENTIFIER),
            Self::Id(id) => Some(id),
            Self::Name(_) => None,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "{ROOT_IDENTIFIER}"),
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Normalized attribute or parameter map
///
/// Null and empty values are dropped and scalars are stringified, so two
/// maps are equal exactly when they configure the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a map received from the backend
    pub fn from_wire(map: &WireMap) -> Self {
        Self(
            map.iter()
                .filter_map(|(k, v)| match v.as_deref() {
                    Some(value) if !value.is_empty() => Some((k.clone(), value.to_string())),
                    _ => None,
                })
                .collect(),
        )
    }

    /// Normalize a template value
    ///
    /// Anything but a mapping yields an empty map.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        Self(
            object
                .iter()
                .filter_map(|(k, v)| stringify(v).map(|s| (k.clone(), s)))
                .collect(),
        )
    }

    /// Map in the shape the backend expects
    pub fn to_wire(&self) -> WireMap {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let key = key.into();
        if value.is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Keys whose value differs between the two maps
    pub fn changed_keys(&self, other: &Self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .0
            .iter()
            .filter(|(k, v)| other.0.get(*k) != Some(*v))
            .map(|(k, _)| k.clone())
            .collect();
        keys.extend(
            other
                .0
                .keys()
                .filter(|k| !self.0.contains_key(*k))
                .cloned(),
        );
        keys.sort();
        keys
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Names of the fields that differ, for plan output
fn field_changes(changes: &[(&str, bool)], maps: &[(&str, &Attributes, &Attributes)]) -> String {
    let mut fields: Vec<String> = changes
        .iter()
        .filter(|(_, changed)| *changed)
        .map(|(field, _)| (*field).to_string())
        .collect();
    for (prefix, desired, current) in maps {
        fields.extend(
            desired
                .changed_keys(current)
                .into_iter()
                .map(|k| format!("{prefix}.{k}")),
        );
    }
    fields.join(", ")
}

/// A group, connection or sharing profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Group(ConnectionGroup),
    Connection(Connection),
    SharingProfile(SharingProfile),
}

impl Entity {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Group(_) => Kind::Group,
            Self::Connection(_) => Kind::Connection,
            Self::SharingProfile(_) => Kind::SharingProfile,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Group(g) => &g.name,
            Self::Connection(c) => &c.name,
            Self::SharingProfile(p) => &p.name,
        }
    }

    pub fn parent(&self) -> &ParentRef {
        match self {
            Self::Group(g) => &g.parent,
            Self::Connection(c) => &c.parent,
            Self::SharingProfile(p) => &p.parent,
        }
    }

    pub fn set_parent(&mut self, parent: ParentRef) {
        match self {
            Self::Group(g) => g.parent = parent,
            Self::Connection(c) => c.parent = parent,
            Self::SharingProfile(p) => p.parent = parent,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Group(g) => g.identifier.as_deref(),
            Self::Connection(c) => c.identifier.as_deref(),
            Self::SharingProfile(p) => p.identifier.as_deref(),
        }
    }

    /// Record the identifier the backend assigned
    ///
    /// Assigning the same value again is a no-op; a different value is
    /// refused.
    pub fn assign_identifier(&mut self, id: impl Into<String>) -> Result<(), ReconcileError> {
        let id = id.into();
        let kind = self.kind();
        let name = self.name().to_string();
        let slot = match self {
            Self::Group(g) => &mut g.identifier,
            Self::Connection(c) => &mut c.identifier,
            Self::SharingProfile(p) => &mut p.identifier,
        };
        match slot {
            Some(current) if *current != id => Err(ReconcileError::IdentifierReassigned {
                kind,
                name,
                current: current.clone(),
                new: id,
            }),
            Some(_) => Ok(()),
            None => {
                *slot = Some(id);
                Ok(())
            }
        }
    }

    /// Value equality; entities of different kinds are never the same
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Group(a), Self::Group(b)) => a.same_as(b),
            (Self::Connection(a), Self::Connection(b)) => a.same_as(b),
            (Self::SharingProfile(a), Self::SharingProfile(b)) => a.same_as(b),
            _ => false,
        }
    }

    /// Comma-separated names of the fields that differ from `current`
    pub fn changes_from(&self, current: &Self) -> String {
        match (self, current) {
            (Self::Group(a), Self::Group(b)) => a.changes_from(b),
            (Self::Connection(a), Self::Connection(b)) => a.changes_from(b),
            (Self::SharingProfile(a), Self::SharingProfile(b)) => a.changes_from(b),
            _ => "kind".to_string(),
        }
    }
}

impl declarative::Resource for Entity {
    fn id(&self) -> String {
        self.name().to_string()
    }

    fn description(&self) -> String {
        match self.identifier() {
            Some(id) => format!(
                "{} '{}' (#{id}) under {}",
                self.kind(),
                self.name(),
                self.parent()
            ),
            None => format!("{} '{}' under {}", self.kind(), self.name(), self.parent()),
        }
    }

    fn resource_type(&self) -> &'static str {
        self.kind().as_str()
    }

    fn same_as(&self, other: &Self) -> bool {
        Entity::same_as(self, other)
    }
}
