//! Backend trait and implementations for talking to Guacamole.
//!
//! [`http::HttpBackend`] speaks the REST API of a live server. [`MockBackend`]
//! keeps everything in memory and records every write, which is what the
//! reconciler tests run against.
//!
//! # Testing
//!
//! ```
//! use guacamole::backend::{Backend, MockBackend};
//! use guacamole::{GroupRequest, GroupType, ROOT_IDENTIFIER};
//!
//! let mock = MockBackend::new();
//! let id = mock
//!     .create_group(&GroupRequest {
//!         parent_identifier: ROOT_IDENTIFIER.to_string(),
//!         name: "range".to_string(),
//!         group_type: GroupType::Organizational,
//!         attributes: Default::default(),
//!     })
//!     .unwrap();
//!
//! let tree = mock.detail_tree(ROOT_IDENTIFIER).unwrap();
//! assert_eq!(tree.child_connection_groups[0].identifier.as_deref(), Some(id.as_str()));
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{
    ConnectionRecord, ConnectionRequest, GroupRecord, GroupRequest, GroupType, PatchOp,
    PermissionKind, PermissionRecord, ROOT_IDENTIFIER, SharingProfileRequest, TreeNode,
    UserRecord, UserRequest, WireMap,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Capability interface of a Guacamole server.
///
/// Every method is a single round trip. Identifiers are the strings the
/// server assigns; users are addressed by username.
pub trait Backend: Send + Sync {
    /// Nested tree of everything below `parent` (the parent itself included).
    fn detail_tree(&self, parent: &str) -> Result<TreeNode>;

    /// Flat list of all connection groups.
    fn list_groups(&self) -> Result<Vec<GroupRecord>>;

    /// Flat list of all connections.
    fn list_connections(&self) -> Result<Vec<ConnectionRecord>>;

    /// All user accounts.
    fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// Parameters of a connection.
    fn connection_parameters(&self, identifier: &str) -> Result<WireMap>;

    /// Parameters of a sharing profile.
    fn sharing_profile_parameters(&self, identifier: &str) -> Result<WireMap>;

    /// Permissions and user group memberships of a user.
    fn detail_permissions(&self, username: &str) -> Result<PermissionRecord>;

    /// Create a connection group, returning its identifier.
    fn create_group(&self, group: &GroupRequest) -> Result<String>;

    /// Replace a connection group.
    fn update_group(&self, identifier: &str, group: &GroupRequest) -> Result<()>;

    /// Delete a connection group and everything below it.
    fn delete_group(&self, identifier: &str) -> Result<()>;

    /// Create a connection, returning its identifier.
    fn create_connection(&self, connection: &ConnectionRequest) -> Result<String>;

    /// Replace a connection.
    fn update_connection(&self, identifier: &str, connection: &ConnectionRequest) -> Result<()>;

    /// Delete a connection and its sharing profiles.
    fn delete_connection(&self, identifier: &str) -> Result<()>;

    /// Create the connection when `identifier` is `None`, update it otherwise.
    ///
    /// Returns the identifier in both cases.
    fn create_or_update_connection(
        &self,
        identifier: Option<&str>,
        connection: &ConnectionRequest,
    ) -> Result<String> {
        match identifier {
            Some(id) => {
                self.update_connection(id, connection)?;
                Ok(id.to_string())
            }
            None => self.create_connection(connection),
        }
    }

    /// Create a sharing profile, returning its identifier.
    fn create_sharing_profile(&self, profile: &SharingProfileRequest) -> Result<String>;

    /// Replace a sharing profile.
    fn update_sharing_profile(&self, identifier: &str, profile: &SharingProfileRequest)
    -> Result<()>;

    /// Delete a sharing profile.
    fn delete_sharing_profile(&self, identifier: &str) -> Result<()>;

    /// Create a user, returning the username.
    fn create_user(&self, user: &UserRequest) -> Result<String>;

    /// Replace a user's attributes (and password, when given).
    fn update_user(&self, user: &UserRequest) -> Result<()>;

    /// Delete a user.
    fn delete_user(&self, username: &str) -> Result<()>;

    /// Grant or revoke `READ` on groups, connections or sharing profiles.
    fn update_connection_permission(
        &self,
        username: &str,
        identifiers: &[String],
        op: PatchOp,
        kind: PermissionKind,
    ) -> Result<()>;

    /// Add the user to, or remove it from, user groups.
    fn update_user_group_permission(
        &self,
        username: &str,
        groups: &[String],
        op: PatchOp,
    ) -> Result<()>;

    /// Grant or revoke system permissions (`ADMINISTER`, `CREATE_USER`, ...).
    fn update_system_permission(
        &self,
        username: &str,
        permissions: &[String],
        op: PatchOp,
    ) -> Result<()>;
}

// =============================================================================
// Mock backend
// =============================================================================

/// Kind of write recorded by [`MockBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Object created.
    Create,
    /// Object replaced.
    Update,
    /// Object deleted.
    Delete,
    /// Permission or membership added.
    Grant,
    /// Permission or membership removed.
    Revoke,
}

/// A write call received by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// What the call did.
    pub kind: CallKind,
    /// Object kind: `group`, `connection`, `sharing_profile`, `user`,
    /// or the permission category for grants and revokes.
    pub object: &'static str,
    /// Name, identifier or username the call addressed.
    pub target: String,
}

impl Call {
    /// Whether this call created, updated or deleted an object.
    pub fn is_object_write(&self) -> bool {
        matches!(
            self.kind,
            CallKind::Create | CallKind::Update | CallKind::Delete
        )
    }
}

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    groups: BTreeMap<String, GroupRequest>,
    connections: BTreeMap<String, ConnectionRequest>,
    profiles: BTreeMap<String, SharingProfileRequest>,
    users: BTreeMap<String, UserRecord>,
    permissions: BTreeMap<String, PermissionRecord>,
    calls: Vec<Call>,
    failing: BTreeSet<String>,
}

impl Store {
    fn allocate(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn record(&mut self, kind: CallKind, object: &'static str, target: &str) {
        self.calls.push(Call {
            kind,
            object,
            target: target.to_string(),
        });
    }

    fn check_failure(&self, target: &str) -> Result<()> {
        if self.failing.contains(target) {
            return Err(Error::http(format!("injected failure for {target}"), Some(500)));
        }
        Ok(())
    }

    fn parent_exists(&self, parent: &str) -> bool {
        parent == ROOT_IDENTIFIER || self.groups.contains_key(parent)
    }

    fn group_node(&self, identifier: &str) -> Option<TreeNode> {
        let (name, parent, group_type, attributes) = if identifier == ROOT_IDENTIFIER {
            (
                ROOT_IDENTIFIER.to_string(),
                None,
                GroupType::Organizational,
                WireMap::new(),
            )
        } else {
            let group = self.groups.get(identifier)?;
            (
                group.name.clone(),
                Some(group.parent_identifier.clone()),
                group.group_type,
                group.attributes.clone(),
            )
        };

        let child_connection_groups = self
            .groups
            .iter()
            .filter(|(_, g)| g.parent_identifier == identifier)
            .filter_map(|(id, _)| self.group_node(id))
            .collect();

        let child_connections = self
            .connections
            .iter()
            .filter(|(_, c)| c.parent_identifier == identifier)
            .map(|(id, c)| TreeNode {
                name: c.name.clone(),
                identifier: Some(id.clone()),
                parent_identifier: Some(c.parent_identifier.clone()),
                protocol: Some(c.protocol.clone()),
                attributes: c.attributes.clone(),
                sharing_profiles: self.profile_nodes(id),
                ..Default::default()
            })
            .collect();

        Some(TreeNode {
            name,
            identifier: Some(identifier.to_string()),
            parent_identifier: parent,
            group_type: Some(group_type),
            attributes,
            child_connection_groups,
            child_connections,
            ..Default::default()
        })
    }

    fn profile_nodes(&self, connection: &str) -> Vec<TreeNode> {
        self.profiles
            .iter()
            .filter(|(_, p)| p.primary_connection_identifier == connection)
            .map(|(id, p)| TreeNode {
                name: p.name.clone(),
                identifier: Some(id.clone()),
                primary_connection_identifier: Some(connection.to_string()),
                attributes: p.attributes.clone(),
                ..Default::default()
            })
            .collect()
    }

    fn remove_connection(&mut self, identifier: &str) {
        self.connections.remove(identifier);
        self.profiles
            .retain(|_, p| p.primary_connection_identifier != identifier);
    }

    fn remove_group(&mut self, identifier: &str) {
        self.groups.remove(identifier);
        let child_groups: Vec<String> = self
            .groups
            .iter()
            .filter(|(_, g)| g.parent_identifier == identifier)
            .map(|(id, _)| id.clone())
            .collect();
        let child_connections: Vec<String> = self
            .connections
            .iter()
            .filter(|(_, c)| c.parent_identifier == identifier)
            .map(|(id, _)| id.clone())
            .collect();
        for id in child_connections {
            self.remove_connection(&id);
        }
        for id in child_groups {
            self.remove_group(&id);
        }
    }

    fn permissions_mut(&mut self, username: &str) -> &mut PermissionRecord {
        self.permissions
            .entry(username.to_string())
            .or_insert_with(|| own_account_permissions(username))
    }
}

fn own_account_permissions(username: &str) -> PermissionRecord {
    let mut record = PermissionRecord::default();
    record
        .user_permissions
        .insert(username.to_string(), vec!["READ".to_string()]);
    record
}

/// In-memory backend for tests.
///
/// Identifiers are assigned sequentially starting at `1`. Deleting a group
/// removes everything below it, like the real server does. Every write is
/// recorded and can be inspected with [`MockBackend::calls`].
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    store: Arc<Mutex<Store>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Make every write addressing `target` (a name, identifier or username)
    /// fail with a server error.
    pub fn fail_on(&self, target: impl Into<String>) {
        self.store().failing.insert(target.into());
    }

    /// All write calls received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.store().calls.clone()
    }

    /// Create, update and delete calls received so far.
    pub fn object_writes(&self) -> Vec<Call> {
        self.store()
            .calls
            .iter()
            .filter(|c| c.is_object_write())
            .cloned()
            .collect()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.store().calls.clear();
    }

    /// Stored user record, password included.
    pub fn user(&self, username: &str) -> Option<UserRecord> {
        self.store().users.get(username).cloned()
    }

    /// Identifier of the first group with the given name.
    pub fn group_id(&self, name: &str) -> Option<String> {
        self.store()
            .groups
            .iter()
            .find(|(_, g)| g.name == name)
            .map(|(id, _)| id.clone())
    }

    /// Identifier of the first connection with the given name.
    pub fn connection_id(&self, name: &str) -> Option<String> {
        self.store()
            .connections
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id.clone())
    }

    /// Stored connection by identifier.
    pub fn connection(&self, identifier: &str) -> Option<ConnectionRequest> {
        self.store().connections.get(identifier).cloned()
    }

    /// Seed a user without recording a call.
    pub fn seed_user(&self, user: UserRecord) {
        let mut store = self.store();
        let username = user.username.clone();
        store.users.insert(username.clone(), user);
        store.permissions_mut(&username);
    }

    /// Seed a group without recording a call, returning its identifier.
    pub fn seed_group(&self, group: GroupRequest) -> String {
        let mut store = self.store();
        let id = store.allocate();
        store.groups.insert(id.clone(), group);
        id
    }

    /// Seed a connection without recording a call, returning its identifier.
    pub fn seed_connection(&self, connection: ConnectionRequest) -> String {
        let mut store = self.store();
        let id = store.allocate();
        store.connections.insert(id.clone(), connection);
        id
    }
}

impl Backend for MockBackend {
    fn detail_tree(&self, parent: &str) -> Result<TreeNode> {
        self.store()
            .group_node(parent)
            .ok_or_else(|| Error::not_found("connection group", parent))
    }

    fn list_groups(&self) -> Result<Vec<GroupRecord>> {
        Ok(self
            .store()
            .groups
            .iter()
            .map(|(id, g)| GroupRecord {
                name: g.name.clone(),
                identifier: id.clone(),
                parent_identifier: Some(g.parent_identifier.clone()),
                group_type: g.group_type,
                attributes: g.attributes.clone(),
            })
            .collect())
    }

    fn list_connections(&self) -> Result<Vec<ConnectionRecord>> {
        Ok(self
            .store()
            .connections
            .iter()
            .map(|(id, c)| ConnectionRecord {
                name: c.name.clone(),
                identifier: id.clone(),
                parent_identifier: Some(c.parent_identifier.clone()),
                protocol: c.protocol.clone(),
                attributes: c.attributes.clone(),
            })
            .collect())
    }

    fn list_users(&self) -> Result<Vec<UserRecord>> {
        Ok(self.store().users.values().cloned().collect())
    }

    fn connection_parameters(&self, identifier: &str) -> Result<WireMap> {
        self.store()
            .connections
            .get(identifier)
            .map(|c| c.parameters.clone())
            .ok_or_else(|| Error::not_found("connection", identifier))
    }

    fn sharing_profile_parameters(&self, identifier: &str) -> Result<WireMap> {
        self.store()
            .profiles
            .get(identifier)
            .map(|p| p.parameters.clone())
            .ok_or_else(|| Error::not_found("sharing profile", identifier))
    }

    fn detail_permissions(&self, username: &str) -> Result<PermissionRecord> {
        let store = self.store();
        if !store.users.contains_key(username) {
            return Err(Error::not_found("user", username));
        }
        Ok(store
            .permissions
            .get(username)
            .cloned()
            .unwrap_or_else(|| own_account_permissions(username)))
    }

    fn create_group(&self, group: &GroupRequest) -> Result<String> {
        let mut store = self.store();
        store.record(CallKind::Create, "group", &group.name);
        store.check_failure(&group.name)?;
        if !store.parent_exists(&group.parent_identifier) {
            return Err(Error::not_found("connection group", &group.parent_identifier));
        }
        let id = store.allocate();
        store.groups.insert(id.clone(), group.clone());
        Ok(id)
    }

    fn update_group(&self, identifier: &str, group: &GroupRequest) -> Result<()> {
        let mut store = self.store();
        store.record(CallKind::Update, "group", &group.name);
        store.check_failure(&group.name)?;
        match store.groups.get_mut(identifier) {
            Some(existing) => {
                *existing = group.clone();
                Ok(())
            }
            None => Err(Error::not_found("connection group", identifier)),
        }
    }

    fn delete_group(&self, identifier: &str) -> Result<()> {
        let mut store = self.store();
        store.record(CallKind::Delete, "group", identifier);
        store.check_failure(identifier)?;
        if !store.groups.contains_key(identifier) {
            return Err(Error::not_found("connection group", identifier));
        }
        store.remove_group(identifier);
        Ok(())
    }

    fn create_connection(&self, connection: &ConnectionRequest) -> Result<String> {
        let mut store = self.store();
        store.record(CallKind::Create, "connection", &connection.name);
        store.check_failure(&connection.name)?;
        if !store.parent_exists(&connection.parent_identifier) {
            return Err(Error::not_found(
                "connection group",
                &connection.parent_identifier,
            ));
        }
        let id = store.allocate();
        store.connections.insert(id.clone(), connection.clone());
        Ok(id)
    }

    fn update_connection(&self, identifier: &str, connection: &ConnectionRequest) -> Result<()> {
        let mut store = self.store();
        store.record(CallKind::Update, "connection", &connection.name);
        store.check_failure(&connection.name)?;
        match store.connections.get_mut(identifier) {
            Some(existing) => {
                *existing = connection.clone();
                Ok(())
            }
            None => Err(Error::not_found("connection", identifier)),
        }
    }

    fn delete_connection(&self, identifier: &str) -> Result<()> {
        let mut store = self.store();
        store.record(CallKind::Delete, "connection", identifier);
        store.check_failure(identifier)?;
        if !store.connections.contains_key(identifier) {
            return Err(Error::not_found("connection", identifier));
        }
        store.remove_connection(identifier);
        Ok(())
    }

    fn create_sharing_profile(&self, profile: &SharingProfileRequest) -> Result<String> {
        let mut store = self.store();
        store.record(CallKind::Create, "sharing_profile", &profile.name);
        store.check_failure(&profile.name)?;
        if !store
            .connections
            .contains_key(&profile.primary_connection_identifier)
        {
            return Err(Error::not_found(
                "connection",
                &profile.primary_connection_identifier,
            ));
        }
        let id = store.allocate();
        store.profiles.insert(id.clone(), profile.clone());
        Ok(id)
    }

    fn update_sharing_profile(
        &self,
        identifier: &str,
        profile: &SharingProfileRequest,
    ) -> Result<()> {
        let mut store = self.store();
        store.record(CallKind::Update, "sharing_profile", &profile.name);
        store.check_failure(&profile.name)?;
        match store.profiles.get_mut(identifier) {
            Some(existing) => {
                *existing = profile.clone();
                Ok(())
            }
            None => Err(Error::not_found("sharing profile", identifier)),
        }
    }

    fn delete_sharing_profile(&self, identifier: &str) -> Result<()> {
        let mut store = self.store();
        store.record(CallKind::Delete, "sharing_profile", identifier);
        store.check_failure(identifier)?;
        match store.profiles.remove(identifier) {
            Some(_) => Ok(()),
            None => Err(Error::not_found("sharing profile", identifier)),
        }
    }

    fn create_user(&self, user: &UserRequest) -> Result<String> {
        let mut store = self.store();
        store.record(CallKind::Create, "user", &user.username);
        store.check_failure(&user.username)?;
        if store.users.contains_key(&user.username) {
            return Err(Error::AlreadyExists {
                kind: "user",
                name: user.username.clone(),
            });
        }
        store.users.insert(
            user.username.clone(),
            UserRecord {
                username: user.username.clone(),
                password: user.password.clone(),
                attributes: user.attributes.clone(),
            },
        );
        store.permissions_mut(&user.username);
        Ok(user.username.clone())
    }

    fn update_user(&self, user: &UserRequest) -> Result<()> {
        let mut store = self.store();
        store.record(CallKind::Update, "user", &user.username);
        store.check_failure(&user.username)?;
        match store.users.get_mut(&user.username) {
            Some(existing) => {
                existing.attributes = user.attributes.clone();
                if user.password.is_some() {
                    existing.password = user.password.clone();
                }
                Ok(())
            }
            None => Err(Error::not_found("user", &user.username)),
        }
    }

    fn delete_user(&self, username: &str) -> Result<()> {
        let mut store = self.store();
        store.record(CallKind::Delete, "user", username);
        store.check_failure(username)?;
        if store.users.remove(username).is_none() {
            return Err(Error::not_found("user", username));
        }
        store.permissions.remove(username);
        Ok(())
    }

    fn update_connection_permission(
        &self,
        username: &str,
        identifiers: &[String],
        op: PatchOp,
        kind: PermissionKind,
    ) -> Result<()> {
        let mut store = self.store();
        let object = match kind {
            PermissionKind::ConnectionGroup => "connection_group_permission",
            PermissionKind::Connection => "connection_permission",
            PermissionKind::SharingProfile => "sharing_profile_permission",
        };
        store.record(patch_call(op), object, username);
        store.check_failure(username)?;
        if !store.users.contains_key(username) {
            return Err(Error::not_found("user", username));
        }
        let record = store.permissions_mut(username);
        let map = match kind {
            PermissionKind::ConnectionGroup => &mut record.connection_group_permissions,
            PermissionKind::Connection => &mut record.connection_permissions,
            PermissionKind::SharingProfile => &mut record.sharing_profile_permissions,
        };
        for id in identifiers {
            match op {
                PatchOp::Add => {
                    map.insert(id.clone(), vec!["READ".to_string()]);
                }
                PatchOp::Remove => {
                    map.remove(id);
                }
            }
        }
        Ok(())
    }

    fn update_user_group_permission(
        &self,
        username: &str,
        groups: &[String],
        op: PatchOp,
    ) -> Result<()> {
        let mut store = self.store();
        store.record(patch_call(op), "user_group_membership", username);
        store.check_failure(username)?;
        if !store.users.contains_key(username) {
            return Err(Error::not_found("user", username));
        }
        let record = store.permissions_mut(username);
        apply_list_patch(&mut record.user_groups, groups, op);
        Ok(())
    }

    fn update_system_permission(
        &self,
        username: &str,
        permissions: &[String],
        op: PatchOp,
    ) -> Result<()> {
        let mut store = self.store();
        store.record(patch_call(op), "system_permission", username);
        store.check_failure(username)?;
        if !store.users.contains_key(username) {
            return Err(Error::not_found("user", username));
        }
        let record = store.permissions_mut(username);
        apply_list_patch(&mut record.system_permissions, permissions, op);
        Ok(())
    }
}

fn patch_call(op: PatchOp) -> CallKind {
    match op {
        PatchOp::Add => CallKind::Grant,
        PatchOp::Remove => CallKind::Revoke,
    }
}

fn apply_list_patch(list: &mut Vec<String>, values: &[String], op: PatchOp) {
    match op {
        PatchOp::Add => {
            for value in values {
                if !list.contains(value) {
                    list.push(value.clone());
                }
            }
        }
        PatchOp::Remove => list.retain(|v| !values.contains(v)),
    }
}
