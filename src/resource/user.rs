//! User entity and its permissions

use guacamole::{PermissionRecord, UserRecord, UserRequest};
use std::collections::{BTreeMap, BTreeSet};

use super::Attributes;

/// Permission granted on every object a user can see
const READ: &str = "READ";

/// Identifiers a user is granted, by category
///
/// The permission a user always has on its own account is implicit and is
/// not part of the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    pub connection_groups: BTreeSet<String>,
    pub connections: BTreeSet<String>,
    pub sharing_profiles: BTreeSet<String>,
    pub user_groups: BTreeSet<String>,
    pub system: BTreeSet<String>,
}

impl PermissionSet {
    /// Read the set out of a backend record
    ///
    /// Object categories keep the identifiers carrying `READ`.
    pub fn from_record(record: &PermissionRecord) -> Self {
        Self {
            connection_groups: readable(&record.connection_group_permissions),
            connections: readable(&record.connection_permissions),
            sharing_profiles: readable(&record.sharing_profile_permissions),
            user_groups: record.user_groups.iter().cloned().collect(),
            system: record.system_permissions.iter().cloned().collect(),
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.connection_groups.is_empty()
            && self.connections.is_empty()
            && self.sharing_profiles.is_empty()
            && self.user_groups.is_empty()
            && self.system.is_empty()
    }
}

fn readable(map: &BTreeMap<String, Vec<String>>) -> BTreeSet<String> {
    map.iter()
        .filter(|(_, granted)| granted.iter().any(|p| p == READ))
        .map(|(id, _)| id.clone())
        .collect()
}

/// A user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: Option<String>,
    pub attributes: Attributes,
    pub permissions: PermissionSet,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
            attributes: Attributes::new(),
            permissions: PermissionSet::default(),
        }
    }

    #[cfg(test)]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            username: record.username.clone(),
            password: record.password.clone(),
            attributes: Attributes::from_wire(&record.attributes),
            permissions: PermissionSet::default(),
        }
    }

    pub fn to_request(&self) -> UserRequest {
        UserRequest {
            username: self.username.clone(),
            password: self.password.clone(),
            attributes: self.attributes.to_wire(),
        }
    }

    /// Take over the password of the existing account
    pub fn carry_password_from(&mut self, current: &Self) {
        self.password = current.password.clone();
    }

    /// Value equality over the account itself
    ///
    /// Permissions are converged separately and do not count here.
    pub fn same_as(&self, other: &Self) -> bool {
        self.username == other.username
            && self.password == other.password
            && self.attributes == other.attributes
    }

    /// Names of the fields that differ from `current`; never any values
    pub fn changes_from(&self, current: &Self) -> String {
        let mut fields = Vec::new();
        if self.password != current.password {
            fields.push("password".to_string());
        }
        fields.extend(
            self.attributes
                .changed_keys(&current.attributes)
                .into_iter()
                .map(|k| format!("attributes.{k}")),
        );
        fields.join(", ")
    }
}

impl declarative::Resource for User {
    fn id(&self) -> String {
        self.username.clone()
    }

    fn description(&self) -> String {
        format!("user '{}'", self.username)
    }

    fn resource_type(&self) -> &'static str {
        "user"
    }

    fn same_as(&self, other: &Self) -> bool {
        User::same_as(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_set_from_record_skips_own_account() {
        let mut record = PermissionRecord::default();
        record
            .user_permissions
            .insert("alice".to_string(), vec!["READ".to_string()]);
        record
            .connection_permissions
            .insert("3".to_string(), vec!["READ".to_string()]);
        record
            .connection_permissions
            .insert("4".to_string(), vec!["UPDATE".to_string()]);
        record.system_permissions = vec!["CREATE_USER".to_string()];
        record.user_groups = vec!["students".to_string()];

        let set = PermissionSet::from_record(&record);
        assert_eq!(set.connections, BTreeSet::from(["3".to_string()]));
        assert_eq!(set.system, BTreeSet::from(["CREATE_USER".to_string()]));
        assert_eq!(set.user_groups, BTreeSet::from(["students".to_string()]));
        assert!(set.connection_groups.is_empty());
    }

    #[test]
    fn test_password_carry_over_makes_users_equal() {
        let current = User::new("alice").with_password("s3cret");
        let mut desired = User::new("alice");
        assert!(!desired.same_as(&current));

        desired.carry_password_from(&current);
        assert!(desired.same_as(&current));
        assert_eq!(desired.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_changes_from_hides_values() {
        let current = User::new("alice").with_password("old");
        let desired = User::new("alice")
            .with_password("new")
            .with_attributes([("guac-full-name", "Alice")].into_iter().collect());
        assert_eq!(
            desired.changes_from(&current),
            "password, attributes.guac-full-name"
        );
    }
}
