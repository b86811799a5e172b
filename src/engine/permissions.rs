//! Permission resolver
//!
//! Converges a user's permissions with the fewest calls: one grant and one
//! revoke per category at most, and none for a category that already
//! matches. The permission a user has on its own account is never part of
//! a [`PermissionSet`], so it is never diffed.

use declarative::{Change, Executor, ResourceDiff, SetDelta};
use guacamole::{Backend, PatchOp, PermissionKind};
use std::collections::BTreeSet;
use std::fmt;

use crate::resource::PermissionSet;

/// Permission category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    ConnectionGroup,
    Connection,
    SharingProfile,
    UserGroup,
    System,
}

impl Category {
    pub const ALL: [Self; 5] = [
        Self::ConnectionGroup,
        Self::Connection,
        Self::SharingProfile,
        Self::UserGroup,
        Self::System,
    ];

    /// The part of a permission set this category covers
    pub fn select(self, set: &PermissionSet) -> &BTreeSet<String> {
        match self {
            Self::ConnectionGroup => &set.connection_groups,
            Self::Connection => &set.connections,
            Self::SharingProfile => &set.sharing_profiles,
            Self::UserGroup => &set.user_groups,
            Self::System => &set.system,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionGroup => write!(f, "connection group"),
            Self::Connection => write!(f, "connection"),
            Self::SharingProfile => write!(f, "sharing profile"),
            Self::UserGroup => write!(f, "user group"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Per-category changes between two permission sets
///
/// Categories without changes are left out.
pub fn deltas(old: &PermissionSet, new: &PermissionSet) -> Vec<(Category, SetDelta<String>)> {
    Category::ALL
        .into_iter()
        .map(|category| {
            (
                category,
                SetDelta::between(category.select(old), category.select(new)),
            )
        })
        .filter(|(_, delta)| !delta.is_empty())
        .collect()
}

/// Issues permission patches for one user at a time
pub struct PermissionResolver<'a> {
    backend: &'a dyn Backend,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Move `username` from `old` to `new`
    ///
    /// Within a category the grant and the revoke are independent: a
    /// failed grant does not stop the revoke.
    pub fn converge(
        &self,
        exec: &mut Executor<'_>,
        username: &str,
        old: &PermissionSet,
        new: &PermissionSet,
    ) {
        for (category, delta) in deltas(old, new) {
            for (op, ids) in [(PatchOp::Add, delta.add), (PatchOp::Remove, delta.remove)] {
                if ids.is_empty() {
                    continue;
                }
                let ids: Vec<String> = ids.into_iter().collect();
                exec.apply(patch_diff(username, category, op, &ids), || {
                    self.patch(username, category, &ids, op)
                });
            }
        }
    }

    fn patch(
        &self,
        username: &str,
        category: Category,
        ids: &[String],
        op: PatchOp,
    ) -> guacamole::Result<()> {
        let kind = match category {
            Category::ConnectionGroup => PermissionKind::ConnectionGroup,
            Category::Connection => PermissionKind::Connection,
            Category::SharingProfile => PermissionKind::SharingProfile,
            Category::UserGroup => {
                return self.backend.update_user_group_permission(username, ids, op);
            }
            Category::System => {
                return self.backend.update_system_permission(username, ids, op);
            }
        };
        self.backend
            .update_connection_permission(username, ids, op, kind)
    }
}

fn patch_diff(username: &str, category: Category, op: PatchOp, ids: &[String]) -> ResourceDiff {
    let sign = match op {
        PatchOp::Add => '+',
        PatchOp::Remove => '-',
    };
    ResourceDiff {
        resource_id: format!("{username}: {category}"),
        resource_type: "permission".to_string(),
        description: format!("{op} {category} permissions of '{username}'"),
        change: Change::Update,
        detail: Some(
            ids.iter()
                .map(|id| format!("{sign}{id}"))
                .collect::<Vec<_>>()
                .join(" "),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{ExecuteOptions, NoProgress};
    use guacamole::{CallKind, MockBackend, UserRequest, WireMap};

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(ToString::to_string).collect()
    }

    fn with_connections(ids: &[&str]) -> PermissionSet {
        PermissionSet {
            connections: set(ids),
            ..Default::default()
        }
    }

    fn mock_with_user(name: &str) -> MockBackend {
        let mock = MockBackend::new();
        mock.create_user(&UserRequest {
            username: name.to_string(),
            password: None,
            attributes: WireMap::new(),
        })
        .unwrap();
        mock.clear_calls();
        mock
    }

    #[test]
    fn test_symmetric_difference() {
        let old = with_connections(&["A", "B", "C"]);
        let new = with_connections(&["B", "C", "D"]);

        let deltas = deltas(&old, &new);
        assert_eq!(deltas.len(), 1);
        let (category, delta) = &deltas[0];
        assert_eq!(*category, Category::Connection);
        assert_eq!(delta.add, set(&["D"]));
        assert_eq!(delta.remove, set(&["A"]));
    }

    #[test]
    fn test_symmetric_difference_calls() {
        let mock = mock_with_user("alice");
        mock.update_connection_permission(
            "alice",
            &["A".to_string(), "B".to_string(), "C".to_string()],
            PatchOp::Add,
            PermissionKind::Connection,
        )
        .unwrap();
        mock.clear_calls();

        let mut progress = NoProgress;
        let mut exec = Executor::new(ExecuteOptions::default(), &mut progress);
        PermissionResolver::new(&mock).converge(
            &mut exec,
            "alice",
            &with_connections(&["A", "B", "C"]),
            &with_connections(&["B", "C", "D"]),
        );

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].kind, CallKind::Grant);
        assert_eq!(calls[1].kind, CallKind::Revoke);
        let granted = PermissionSet::from_record(&mock.detail_permissions("alice").unwrap());
        assert_eq!(granted.connections, set(&["B", "C", "D"]));
        assert!(mock.detail_permissions("alice").unwrap().user_permissions.contains_key("alice"));
    }

    #[test]
    fn test_equal_sets_make_no_calls() {
        let mock = mock_with_user("alice");
        let same = PermissionSet {
            system: set(&["CREATE_CONNECTION"]),
            user_groups: set(&["students"]),
            ..with_connections(&["1"])
        };

        let mut progress = NoProgress;
        let mut exec = Executor::new(ExecuteOptions::default(), &mut progress);
        PermissionResolver::new(&mock).converge(&mut exec, "alice", &same, &same);

        assert!(mock.calls().is_empty());
        assert!(exec.finish().steps.is_empty());
    }

    #[test]
    fn test_each_category_uses_its_call() {
        let mock = mock_with_user("alice");
        let new = PermissionSet {
            connection_groups: set(&["1"]),
            sharing_profiles: set(&["2"]),
            user_groups: set(&["students"]),
            system: set(&["CREATE_USER"]),
            ..Default::default()
        };

        let mut progress = NoProgress;
        let mut exec = Executor::new(ExecuteOptions::default(), &mut progress);
        PermissionResolver::new(&mock).converge(
            &mut exec,
            "alice",
            &PermissionSet::default(),
            &new,
        );

        let objects: Vec<&str> = mock.calls().iter().map(|c| c.object).collect();
        assert_eq!(
            objects,
            vec![
                "connection_group_permission",
                "sharing_profile_permission",
                "user_group_membership",
                "system_permission"
            ]
        );
        let record = mock.detail_permissions("alice").unwrap();
        assert_eq!(PermissionSet::from_record(&record), new);
    }

    #[test]
    fn test_revoke_attempted_after_failed_grant() {
        let mock = mock_with_user("alice");
        mock.fail_on("alice");

        let mut progress = NoProgress;
        let mut exec = Executor::new(ExecuteOptions::default(), &mut progress);
        PermissionResolver::new(&mock).converge(
            &mut exec,
            "alice",
            &with_connections(&["A"]),
            &with_connections(&["B"]),
        );

        assert_eq!(mock.calls().len(), 2);
        assert_eq!(exec.finish().summary.failed, 2);
    }
}
