//! User reconciliation
//!
//! Users are converged after the tree, against a fresh walk, so permission
//! patterns can name connections created in the same run.

use declarative::{Change, Executor, ResourceDiff, Step, classify};
use guacamole::ROOT_IDENTIFIER;
use rand::Rng;
use rand::distributions::Alphanumeric;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use super::anchored;
use super::expander::{DesiredUser, PermissionPatterns};
use super::permissions::PermissionResolver;
use super::reconciler::Reconciler;
use super::walker::{CurrentTree, Walker};
use crate::error::ReconcileError;
use crate::resource::{Kind, PermissionSet, User};

const PASSWORD_LEN: usize = 24;

/// Which current users a run may delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserScope {
    /// Every user the template does not declare
    All,
    /// Only these users
    Only(BTreeSet<String>),
}

impl UserScope {
    pub fn covers(&self, username: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(username),
        }
    }
}

fn compile(patterns: &[String], what: &str) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match anchored(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("Ignoring invalid {what} pattern '{pattern}': {e}");
                None
            }
        })
        .collect()
}

/// Resolve permission patterns to identifiers in `tree`
///
/// A matching connection brings along every group above it and every
/// sharing profile below it; a matching group brings along the groups
/// above it.
pub fn resolve_permissions(tree: &CurrentTree, patterns: &PermissionPatterns) -> PermissionSet {
    let mut set = PermissionSet {
        user_groups: patterns.user_groups.iter().cloned().collect(),
        system: patterns.system.iter().cloned().collect(),
        ..Default::default()
    };

    for re in compile(&patterns.connections, "connection") {
        let matching = tree
            .of_kind(Kind::Connection)
            .filter(|c| re.is_match(c.name()));
        for connection in matching {
            let Some(id) = connection.identifier() else {
                continue;
            };
            set.connections.insert(id.to_string());
            set.connection_groups.extend(
                tree.ancestors(id)
                    .iter()
                    .filter(|a| a.kind() == Kind::Group)
                    .filter_map(|a| a.identifier().map(str::to_string)),
            );
            set.sharing_profiles.extend(
                tree.sharing_profiles_of(id)
                    .filter_map(|p| p.identifier().map(str::to_string)),
            );
        }
    }

    for re in compile(&patterns.connection_groups, "connection group") {
        for group in tree.of_kind(Kind::Group).filter(|g| re.is_match(g.name())) {
            let Some(id) = group.identifier() else {
                continue;
            };
            set.connection_groups.insert(id.to_string());
            set.connection_groups.extend(
                tree.ancestors(id)
                    .iter()
                    .filter_map(|a| a.identifier().map(str::to_string)),
            );
        }
    }

    for re in compile(&patterns.sharing_profiles, "sharing profile") {
        set.sharing_profiles.extend(
            tree.of_kind(Kind::SharingProfile)
                .filter(|p| re.is_match(p.name()))
                .filter_map(|p| p.identifier().map(str::to_string)),
        );
    }

    set
}

/// Random alphanumeric password for a new account
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(char::from)
        .collect()
}

fn user_diff(user: &User, change: Change) -> ResourceDiff {
    ResourceDiff::new(user, change)
}

impl Reconciler<'_> {
    /// Converge users and their permissions
    ///
    /// Returns the passwords generated for created users.
    pub fn converge_users(
        &self,
        desired: &[DesiredUser],
        scope: &UserScope,
        exec: &mut Executor<'_>,
    ) -> guacamole::Result<Vec<(String, String)>> {
        let tree = if desired.is_empty() {
            CurrentTree::default()
        } else {
            Walker::new(self.backend).walk(ROOT_IDENTIFIER)?
        };
        let current: BTreeMap<String, User> = self
            .backend
            .list_users()?
            .iter()
            .map(|record| (record.username.clone(), User::from_record(record)))
            .collect();

        let resolver = PermissionResolver::new(self.backend);
        let mut declared = BTreeSet::new();
        let mut generated = Vec::new();

        for entry in desired {
            let mut user = entry.user.clone();
            let username = user.username.clone();

            if !declared.insert(username.clone()) {
                let err = ReconcileError::DuplicateUser(username);
                exec.skip(user_diff(&user, Change::Create), err.to_string());
                continue;
            }
            if self.protected_users.contains(&username) {
                let err = ReconcileError::ProtectedUser(username);
                exec.skip(user_diff(&user, Change::Update), err.to_string());
                continue;
            }
            user.permissions = resolve_permissions(&tree, &entry.patterns);

            let Some(existing) = current.get(&username) else {
                let password = match &user.password {
                    Some(_) => None,
                    None => Some(generate_password()),
                };
                if let Some(password) = &password {
                    user.password = Some(password.clone());
                }
                let request = user.to_request();
                let step = exec.apply(user_diff(&user, Change::Create), || {
                    self.backend.create_user(&request)
                });
                if step.is_failed() {
                    continue;
                }
                if let (Step::Applied(_), Some(password)) = (&step, password) {
                    log::info!("Generated a password for '{username}'");
                    generated.push((username.clone(), password));
                }
                resolver.converge(exec, &username, &PermissionSet::default(), &user.permissions);
                continue;
            };

            user.carry_password_from(existing);
            if classify(Some(&user), Some(existing)) == Some(Change::Update) {
                let diff =
                    user_diff(&user, Change::Update).with_detail(user.changes_from(existing));
                let request = user.to_request();
                exec.apply(diff, || self.backend.update_user(&request));
            } else {
                exec.unchanged("user", &username);
            }

            match self.backend.detail_permissions(&username) {
                Ok(record) => {
                    let old = PermissionSet::from_record(&record);
                    resolver.converge(exec, &username, &old, &user.permissions);
                }
                Err(e) => log::warn!("Could not read permissions of '{username}': {e}"),
            }
        }

        for (username, user) in &current {
            if declared.contains(username)
                || self.protected_users.contains(username)
                || !scope.covers(username)
            {
                continue;
            }
            exec.apply(user_diff(user, Change::Delete), || {
                self.backend.delete_user(username)
            });
        }

        Ok(generated)
    }
}
