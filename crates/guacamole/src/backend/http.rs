//! REST backend for a live Guacamole server.
//!
//! All calls go to `{url}/api/session/data/{data_source}/...` and carry the
//! auth token in the `Guacamole-Token` header. Obtaining the token is up to
//! the caller.

use crate::backend::Backend;
use crate::error::Result;
use crate::types::{
    ConnectionRecord, ConnectionRequest, Created, GroupRecord, GroupRequest, PatchOp,
    PermissionKind, PermissionPatch, PermissionRecord, SharingProfileRequest, TreeNode,
    UserRecord, UserRequest, WireMap,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use urlencoding::encode;

const TOKEN_HEADER: &str = "Guacamole-Token";
const USER_AGENT: &str = "guacform";

/// Blocking REST client for one Guacamole data source.
///
/// # Example
///
/// ```no_run
/// use guacamole::backend::Backend;
/// use guacamole::backend::http::HttpBackend;
///
/// let backend = HttpBackend::new("https://guac.example.org/guacamole", "postgresql", "TOKEN");
/// let tree = backend.detail_tree("ROOT").unwrap();
/// println!("{} top-level groups", tree.child_connection_groups.len());
/// ```
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// `{url}/api/session/data/{data_source}`.
    base: String,
    /// Auth token sent with every request.
    token: String,
}

impl HttpBackend {
    /// Create a backend for `url` (the Guacamole web application root).
    #[must_use]
    pub fn new(url: &str, data_source: &str, token: impl Into<String>) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            base: format!(
                "{}/api/session/data/{}",
                url.trim_end_matches('/'),
                encode(data_source)
            ),
            token: token.into(),
        }
    }

    /// Base URL all requests are issued against.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        log::trace!("GET {path}");
        let value = self
            .agent
            .get(&self.url(path))
            .header(TOKEN_HEADER, &self.token)
            .header("User-Agent", USER_AGENT)
            .call()?
            .body_mut()
            .read_json()?;
        Ok(value)
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Created> {
        log::trace!("POST {path}");
        let created = self
            .agent
            .post(&self.url(path))
            .header(TOKEN_HEADER, &self.token)
            .header("User-Agent", USER_AGENT)
            .send_json(body)?
            .body_mut()
            .read_json()?;
        Ok(created)
    }

    fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        log::trace!("PUT {path}");
        self.agent
            .put(&self.url(path))
            .header(TOKEN_HEADER, &self.token)
            .header("User-Agent", USER_AGENT)
            .send_json(body)?;
        Ok(())
    }

    fn patch<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        log::trace!("PATCH {path}");
        self.agent
            .patch(&self.url(path))
            .header(TOKEN_HEADER, &self.token)
            .header("User-Agent", USER_AGENT)
            .send_json(body)?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        log::trace!("DELETE {path}");
        self.agent
            .delete(&self.url(path))
            .header(TOKEN_HEADER, &self.token)
            .header("User-Agent", USER_AGENT)
            .call()?;
        Ok(())
    }
}

impl Backend for HttpBackend {
    fn detail_tree(&self, parent: &str) -> Result<TreeNode> {
        self.get(&format!("connectionGroups/{}/tree", encode(parent)))
    }

    fn list_groups(&self) -> Result<Vec<GroupRecord>> {
        let groups: BTreeMap<String, GroupRecord> = self.get("connectionGroups")?;
        Ok(groups.into_values().collect())
    }

    fn list_connections(&self) -> Result<Vec<ConnectionRecord>> {
        let connections: BTreeMap<String, ConnectionRecord> = self.get("connections")?;
        Ok(connections.into_values().collect())
    }

    fn list_users(&self) -> Result<Vec<UserRecord>> {
        let users: BTreeMap<String, UserRecord> = self.get("users")?;
        Ok(users.into_values().collect())
    }

    fn connection_parameters(&self, identifier: &str) -> Result<WireMap> {
        self.get(&format!("connections/{}/parameters", encode(identifier)))
    }

    fn sharing_profile_parameters(&self, identifier: &str) -> Result<WireMap> {
        self.get(&format!(
            "sharingProfiles/{}/parameters",
            encode(identifier)
        ))
    }

    fn detail_permissions(&self, username: &str) -> Result<PermissionRecord> {
        let user = encode(username);
        let mut record: PermissionRecord = self.get(&format!("users/{user}/permissions"))?;
        record.user_groups = self.get(&format!("users/{user}/userGroups"))?;
        Ok(record)
    }

    fn create_group(&self, group: &GroupRequest) -> Result<String> {
        Ok(self.post("connectionGroups", group)?.identifier)
    }

    fn update_group(&self, identifier: &str, group: &GroupRequest) -> Result<()> {
        self.put(
            &format!("connectionGroups/{}", encode(identifier)),
            group,
        )
    }

    fn delete_group(&self, identifier: &str) -> Result<()> {
        self.delete(&format!("connectionGroups/{}", encode(identifier)))
    }

    fn create_connection(&self, connection: &ConnectionRequest) -> Result<String> {
        Ok(self.post("connections", connection)?.identifier)
    }

    fn update_connection(&self, identifier: &str, connection: &ConnectionRequest) -> Result<()> {
        self.put(
            &format!("connections/{}", encode(identifier)),
            connection,
        )
    }

    fn delete_connection(&self, identifier: &str) -> Result<()> {
        self.delete(&format!("connections/{}", encode(identifier)))
    }

    fn create_sharing_profile(&self, profile: &SharingProfileRequest) -> Result<String> {
        Ok(self.post("sharingProfiles", profile)?.identifier)
    }

    fn update_sharing_profile(
        &self,
        identifier: &str,
        profile: &SharingProfileRequest,
    ) -> Result<()> {
        self.put(
            &format!("sharingProfiles/{}", encode(identifier)),
            profile,
        )
    }

    fn delete_sharing_profile(&self, identifier: &str) -> Result<()> {
        self.delete(&format!("sharingProfiles/{}", encode(identifier)))
    }

    fn create_user(&self, user: &UserRequest) -> Result<String> {
        log::trace!("POST users");
        let created: UserRecord = self
            .agent
            .post(&self.url("users"))
            .header(TOKEN_HEADER, &self.token)
            .header("User-Agent", USER_AGENT)
            .send_json(user)?
            .body_mut()
            .read_json()?;
        Ok(created.username)
    }

    fn update_user(&self, user: &UserRequest) -> Result<()> {
        self.put(&format!("users/{}", encode(&user.username)), user)
    }

    fn delete_user(&self, username: &str) -> Result<()> {
        self.delete(&format!("users/{}", encode(username)))
    }

    fn update_connection_permission(
        &self,
        username: &str,
        identifiers: &[String],
        op: PatchOp,
        kind: PermissionKind,
    ) -> Result<()> {
        let patches = object_permission_patches(identifiers, op, kind);
        if patches.is_empty() {
            return Ok(());
        }
        self.patch(
            &format!("users/{}/permissions", encode(username)),
            &patches,
        )
    }

    fn update_user_group_permission(
        &self,
        username: &str,
        groups: &[String],
        op: PatchOp,
    ) -> Result<()> {
        if groups.is_empty() {
            return Ok(());
        }
        let patches: Vec<PermissionPatch> = groups
            .iter()
            .map(|group| PermissionPatch {
                op,
                path: "/".to_string(),
                value: group.clone(),
            })
            .collect();
        self.patch(
            &format!("users/{}/userGroups", encode(username)),
            &patches,
        )
    }

    fn update_system_permission(
        &self,
        username: &str,
        permissions: &[String],
        op: PatchOp,
    ) -> Result<()> {
        if permissions.is_empty() {
            return Ok(());
        }
        let patches: Vec<PermissionPatch> = permissions
            .iter()
            .map(|permission| PermissionPatch {
                op,
                path: "/systemPermissions".to_string(),
                value: permission.clone(),
            })
            .collect();
        self.patch(
            &format!("users/{}/permissions", encode(username)),
            &patches,
        )
    }
}

/// JSON-patch document granting or revoking `READ` on objects.
fn object_permission_patches(
    identifiers: &[String],
    op: PatchOp,
    kind: PermissionKind,
) -> Vec<PermissionPatch> {
    identifiers
        .iter()
        .map(|id| PermissionPatch {
            op,
            path: format!("{}/{}", kind.patch_prefix(), id),
            value: "READ".to_string(),
        })
        .collect()
}
