//! Wire types for the Guacamole REST API.
//!
//! These mirror the JSON documents exchanged with the server. They are kept
//! deliberately loose (optional fields, string maps) because the server omits
//! fields freely and reports attributes it does not know about as `null`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of the implicit root connection group.
pub const ROOT_IDENTIFIER: &str = "ROOT";

/// String map as sent and received by the API (attributes, parameters).
///
/// Values may be `null` on the wire.
pub type WireMap = BTreeMap<String, Option<String>>;

/// Deserialize `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Kind of connection group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupType {
    /// Plain folder of connections.
    Organizational,
    /// Load-balancing group.
    Balancing,
}

impl Default for GroupType {
    fn default() -> Self {
        Self::Organizational
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organizational => write!(f, "ORGANIZATIONAL"),
            Self::Balancing => write!(f, "BALANCING"),
        }
    }
}

/// One node of the `connectionGroups/{id}/tree` response.
///
/// Groups, connections and sharing profiles all share this shape; which one a
/// node is follows from the optional fields it carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_identifier: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub group_type: Option<GroupType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_connection_identifier: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: WireMap,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub child_connection_groups: Vec<TreeNode>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub child_connections: Vec<TreeNode>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub sharing_profiles: Vec<TreeNode>,
}

impl TreeNode {
    /// Whether this node stands for the implicit root group.
    pub fn is_root(&self) -> bool {
        self.identifier.as_deref() == Some(ROOT_IDENTIFIER)
    }

    /// Copy of this node with its child containers removed.
    pub fn without_children(&self) -> Self {
        Self {
            child_connection_groups: Vec::new(),
            child_connections: Vec::new(),
            sharing_profiles: Vec::new(),
            ..self.clone()
        }
    }
}

/// Entry of the flat `connectionGroups` listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub name: String,
    pub identifier: String,
    #[serde(default)]
    pub parent_identifier: Option<String>,
    #[serde(rename = "type", default)]
    pub group_type: GroupType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: WireMap,
}

/// Entry of the flat `connections` listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub name: String,
    pub identifier: String,
    #[serde(default)]
    pub parent_identifier: Option<String>,
    pub protocol: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: WireMap,
}

/// Entry of the `users` listing.
///
/// The real server never returns passwords; the field exists so that
/// backends which do know it can hand it back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: WireMap,
}

/// Body for creating or updating a connection group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRequest {
    pub parent_identifier: String,
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    pub attributes: WireMap,
}

/// Body for creating or updating a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub parent_identifier: String,
    pub name: String,
    pub protocol: String,
    pub parameters: WireMap,
    pub attributes: WireMap,
}

/// Body for creating or updating a sharing profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingProfileRequest {
    pub primary_connection_identifier: String,
    pub name: String,
    pub parameters: WireMap,
    pub attributes: WireMap,
}

/// Body for creating or updating a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub attributes: WireMap,
}

/// Response to a create call.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Created {
    pub identifier: String,
}

/// Permissions granted to a user, as returned by `users/{name}/permissions`.
///
/// Object permissions map an identifier to the granted permission names
/// (`READ`, `UPDATE`, ...). `user_groups` is filled from the separate
/// `users/{name}/userGroups` listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub connection_permissions: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub connection_group_permissions: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sharing_profile_permissions: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_connection_permissions: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_permissions: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_group_permissions: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub system_permissions: Vec<String>,
    #[serde(skip)]
    pub user_groups: Vec<String>,
}

/// Object permission categories that are granted per identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PermissionKind {
    ConnectionGroup,
    Connection,
    SharingProfile,
}

impl PermissionKind {
    /// JSON-patch path prefix for this kind.
    pub fn patch_prefix(&self) -> &'static str {
        match self {
            Self::ConnectionGroup => "/connectionGroupPermissions",
            Self::Connection => "/connectionPermissions",
            Self::SharingProfile => "/sharingProfilePermissions",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionGroup => write!(f, "connection group"),
            Self::Connection => write!(f, "connection"),
            Self::SharingProfile => write!(f, "sharing profile"),
        }
    }
}

/// Operation in a permission patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// One JSON-patch operation against a user's permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPatch {
    pub op: PatchOp,
    pub path: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_node_accepts_id_alias_and_nulls() {
        let json = r#"{
            "name": "root",
            "id": "ROOT",
            "attributes": null,
            "childConnectionGroups": [
                {"name": "g1", "type": "ORGANIZATIONAL", "id": "5", "childConnections": null}
            ]
        }"#;
        let node: TreeNode = serde_json::from_str(json).unwrap();
        assert!(node.is_root());
        assert!(node.attributes.is_empty());
        assert_eq!(node.child_connection_groups.len(), 1);
        let g1 = &node.child_connection_groups[0];
        assert_eq!(g1.identifier.as_deref(), Some("5"));
        assert_eq!(g1.group_type, Some(GroupType::Organizational));
        assert!(g1.child_connections.is_empty());
    }

    #[test]
    fn test_tree_node_without_children() {
        let node = TreeNode {
            name: "conn".to_string(),
            protocol: Some("ssh".to_string()),
            sharing_profiles: vec![TreeNode::default()],
            ..Default::default()
        };
        let stripped = node.without_children();
        assert!(stripped.sharing_profiles.is_empty());
        assert_eq!(stripped.protocol.as_deref(), Some("ssh"));
    }

    #[test]
    fn test_permission_record_parses_server_shape() {
        let json = r#"{
            "connectionPermissions": {"3": ["READ"]},
            "connectionGroupPermissions": {},
            "sharingProfilePermissions": {"7": ["READ"]},
            "activeConnectionPermissions": {},
            "userPermissions": {"alice": ["READ"]},
            "userGroupPermissions": {},
            "systemPermissions": ["CREATE_CONNECTION"]
        }"#;
        let record: PermissionRecord = serde_json::from_str(json).unwrap();
        assert!(record.connection_permissions.contains_key("3"));
        assert_eq!(record.system_permissions, vec!["CREATE_CONNECTION"]);
        assert!(record.user_groups.is_empty());
    }

    #[test]
    fn test_group_request_serializes_type() {
        let request = GroupRequest {
            parent_identifier: ROOT_IDENTIFIER.to_string(),
            name: "range".to_string(),
            group_type: GroupType::Balancing,
            attributes: WireMap::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "BALANCING");
        assert_eq!(value["parentIdentifier"], "ROOT");
    }

    #[test]
    fn test_patch_op_serializes_lowercase() {
        let patch = PermissionPatch {
            op: PatchOp::Remove,
            path: "/systemPermissions".to_string(),
            value: "ADMINISTER".to_string(),
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value["op"], "remove");
    }
}
