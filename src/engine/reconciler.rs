//! Reconciler
//!
//! Converges the live tree onto the desired entities. Every desired entity
//! is in one of four states against the current tree:
//!
//! | current  | desired  | action |
//! |----------|----------|--------|
//! | absent   | present  | create |
//! | present  | absent   | delete |
//! | equal    | equal    | none   |
//! | differs  | differs  | update |
//!
//! An entity is matched on its kind, name and resolved parent, so a renamed
//! or moved entity is a delete of the old one plus a create of the new one.
//! Only the remaining fields are ever updated in place.
//!
//! Entities are processed groups first, then connections, then sharing
//! profiles, so a parent declared by name is always created before the
//! children that refer to it. The identifiers this produces are threaded
//! through an [`IdentifierMap`] owned by the loop.

use declarative::{Change, Executor, ResourceDiff, Step, classify};
use guacamole::{
    Backend, ConnectionRequest, GroupRequest, ROOT_IDENTIFIER, SharingProfileRequest,
};
use std::collections::{BTreeSet, HashMap, HashSet};

use super::expander::Desired;
use super::users::UserScope;
use super::walker::{CurrentTree, Walker};
use crate::error::ReconcileError;
use crate::resource::{Entity, Kind, ParentRef};

/// The part of the live tree a template owns
///
/// A template owns the full subtree of every root-level group it declares
/// and every root-level connection it declares. Everything else on the
/// server is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    groups: BTreeSet<String>,
    connections: BTreeSet<String>,
}

impl Scope {
    pub fn of(entities: &[Entity]) -> Self {
        let mut scope = Self::default();
        for entity in entities.iter().filter(|e| e.parent().is_root()) {
            match entity.kind() {
                Kind::Group => {
                    scope.groups.insert(entity.name().to_string());
                }
                Kind::Connection => {
                    scope.connections.insert(entity.name().to_string());
                }
                Kind::SharingProfile => {}
            }
        }
        scope
    }

    /// Whether `entity` from `tree` lies inside the owned part
    pub fn covers(&self, tree: &CurrentTree, entity: &Entity) -> bool {
        let Some(top) = entity.identifier().and_then(|id| tree.top_level(id)) else {
            return false;
        };
        match top.kind() {
            Kind::Group => self.groups.contains(top.name()),
            Kind::Connection => self.connections.contains(top.name()),
            Kind::SharingProfile => false,
        }
    }
}

/// Names to backend identifiers, per kind
///
/// Seeded from the current tree and extended with every matched or created
/// entity. Names declared by the run are claimed up front: until the
/// declared entity is matched or created they resolve to nothing, so a
/// failed parent never falls back to an unrelated entity of the same name.
/// Each step takes the map by value and hands back the extended one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMap {
    by_name: HashMap<(Kind, String), Option<String>>,
    by_place: HashMap<(Kind, String, String), String>,
}

impl IdentifierMap {
    /// Start from the current tree; the first entity with a name wins
    pub fn seeded(tree: &CurrentTree) -> Self {
        let mut ids = Self::default();
        for entity in tree.entities() {
            let Some(id) = entity.identifier() else {
                continue;
            };
            ids.by_name
                .entry((entity.kind(), entity.name().to_string()))
                .or_insert_with(|| Some(id.to_string()));
            if let Some(parent) = entity.parent().identifier() {
                ids.by_place
                    .entry((entity.kind(), parent.to_string(), entity.name().to_string()))
                    .or_insert_with(|| id.to_string());
            }
        }
        ids
    }

    /// Claim names for the entities of this run
    #[must_use]
    pub fn claimed<'e>(mut self, entities: impl IntoIterator<Item = &'e Entity>) -> Self {
        for entity in entities {
            self.by_name
                .insert((entity.kind(), entity.name().to_string()), None);
        }
        self
    }

    /// Record `id` for the entity `name` under the parent identifier `parent`
    #[must_use]
    pub fn with(mut self, kind: Kind, parent: &str, name: &str, id: &str) -> Self {
        self.by_name
            .insert((kind, name.to_string()), Some(id.to_string()));
        self.by_place
            .insert((kind, parent.to_string(), name.to_string()), id.to_string());
        self
    }

    pub fn get(&self, kind: Kind, name: &str) -> Option<&str> {
        self.by_name
            .get(&(kind, name.to_string()))
            .and_then(Option::as_deref)
    }

    /// Identifier of `name` placed directly under the parent identifier `parent`
    pub fn get_within(&self, kind: Kind, parent: &str, name: &str) -> Option<&str> {
        self.by_place
            .get(&(kind, parent.to_string(), name.to_string()))
            .map(String::as_str)
    }

    /// Turn a parent reference into one the backend understands
    ///
    /// Names are looked up among entities of `parent_kind`.
    pub fn resolve(&self, parent: &ParentRef, parent_kind: Kind) -> Option<ParentRef> {
        match parent {
            ParentRef::Root | ParentRef::Id(_) => Some(parent.clone()),
            ParentRef::Name(name) => self
                .get(parent_kind, name)
                .map(|id| ParentRef::Id(id.to_string())),
        }
    }

    /// Resolve the parent of `entity`
    ///
    /// A sharing profile that knows where its connection lives is matched
    /// on that place as well as the connection name.
    pub fn parent_of(&self, entity: &Entity) -> Option<ParentRef> {
        if let Entity::SharingProfile(profile) = entity
            && let (ParentRef::Name(connection), Some(place)) =
                (&profile.parent, &profile.connection_parent)
        {
            let place = self.resolve(place, Kind::Group)?;
            return self
                .get_within(Kind::Connection, place.identifier()?, connection)
                .map(|id| ParentRef::Id(id.to_string()));
        }
        self.resolve(entity.parent(), entity.kind().parent_kind())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}

/// Result of a run beyond what the executor recorded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Passwords generated for newly created users, by username
    pub generated_passwords: Vec<(String, String)>,
}

/// Wire body of a tree entity
enum Request {
    Group(GroupRequest),
    Connection(ConnectionRequest),
    SharingProfile(SharingProfileRequest),
}

impl Request {
    fn of(entity: &Entity) -> Option<Self> {
        match entity {
            Entity::Group(g) => g.to_request().map(Self::Group),
            Entity::Connection(c) => c.to_request().map(Self::Connection),
            Entity::SharingProfile(p) => p.to_request().map(Self::SharingProfile),
        }
    }
}

/// Converges a backend onto desired state
pub struct Reconciler<'a> {
    pub(super) backend: &'a dyn Backend,
    pub(super) protected_users: BTreeSet<String>,
}

impl<'a> Reconciler<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            protected_users: BTreeSet::new(),
        }
    }

    /// Users that are never updated or deleted
    #[must_use]
    pub fn with_protected_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_users = users.into_iter().map(Into::into).collect();
        self
    }

    /// Converge everything a template declares
    ///
    /// Users not declared are deleted unless protected. Only a failure to
    /// read current state is returned as an error; failed writes are in the
    /// executor's report.
    pub fn apply(&self, desired: &Desired, exec: &mut Executor<'_>) -> guacamole::Result<Outcome> {
        let scope = Scope::of(&desired.entities);
        let ids = self.converge_entities(&desired.entities, &scope, exec)?;
        log::debug!("Identifier map holds {} names", ids.len());
        let generated_passwords = self.converge_users(&desired.users, &UserScope::All, exec)?;
        Ok(Outcome {
            generated_passwords,
        })
    }

    /// Remove everything a template declares
    pub fn destroy(
        &self,
        desired: &Desired,
        exec: &mut Executor<'_>,
    ) -> guacamole::Result<Outcome> {
        let scope = Scope::of(&desired.entities);
        self.converge_entities(&[], &scope, exec)?;
        self.converge_users(&[], &UserScope::Only(desired.usernames()), exec)?;
        Ok(Outcome::default())
    }

    /// Converge groups, connections and sharing profiles
    ///
    /// Leftover current entities inside `scope` are deleted, except those
    /// whose ancestor is deleted too: the backend removes them with it.
    pub fn converge_entities(
        &self,
        desired: &[Entity],
        scope: &Scope,
        exec: &mut Executor<'_>,
    ) -> guacamole::Result<IdentifierMap> {
        let tree = Walker::new(self.backend).walk(ROOT_IDENTIFIER)?;
        let mut ids = IdentifierMap::seeded(&tree).claimed(desired);

        let mut index: HashMap<(Kind, String, String), usize> = HashMap::new();
        for (i, entity) in tree.entities().iter().enumerate() {
            let parent = entity.parent().identifier().unwrap_or_default();
            index
                .entry((entity.kind(), parent.to_string(), entity.name().to_string()))
                .or_insert(i);
        }

        let mut ordered: Vec<&Entity> = desired.iter().collect();
        ordered.sort_by_key(|e| e.kind());

        let mut consumed = HashSet::new();
        let mut declared = HashSet::new();
        let mut planned = 0;

        for template in ordered {
            let mut entity = template.clone();
            let kind = entity.kind();

            let Some(parent) = ids.parent_of(&entity) else {
                let err = ReconcileError::UnresolvedParent {
                    kind,
                    name: entity.name().to_string(),
                    parent: entity.parent().to_string(),
                };
                exec.skip(ResourceDiff::new(&entity, Change::Create), err.to_string());
                continue;
            };
            entity.set_parent(parent);

            let place = entity.parent().identifier().unwrap_or_default().to_string();
            let key = (kind, place.clone(), entity.name().to_string());
            if !declared.insert(key.clone()) {
                let err = ReconcileError::Duplicate {
                    kind,
                    name: entity.name().to_string(),
                };
                exec.skip(ResourceDiff::new(&entity, Change::Create), err.to_string());
                continue;
            }

            let found = index
                .get(&key)
                .copied()
                .filter(|i| !consumed.contains(i));

            match found {
                Some(i) => {
                    consumed.insert(i);
                    let current = &tree.entities()[i];
                    let Some(id) = current.identifier() else {
                        continue;
                    };
                    ids = ids.with(kind, &place, entity.name(), id);
                    if let Err(err) = entity.assign_identifier(id) {
                        exec.skip(ResourceDiff::new(&entity, Change::Update), err.to_string());
                        continue;
                    }
                    if classify(Some(&entity), Some(current)) == Some(Change::Update) {
                        let diff = ResourceDiff::new(&entity, Change::Update)
                            .with_detail(entity.changes_from(current));
                        self.update(&entity, diff, exec);
                    } else {
                        exec.unchanged(kind.as_str(), entity.name());
                    }
                }
                None => {
                    let diff = ResourceDiff::new(&entity, Change::Create);
                    match self.create(&entity, diff, exec) {
                        Step::Applied(id) => ids = ids.with(kind, &place, entity.name(), &id),
                        Step::Planned => {
                            planned += 1;
                            let placeholder = format!("new-{planned}");
                            ids = ids.with(kind, &place, entity.name(), &placeholder);
                        }
                        Step::Failed => {}
                    }
                }
            }
        }

        self.delete_leftovers(&tree, &consumed, scope, exec);
        Ok(ids)
    }

    fn create(&self, entity: &Entity, diff: ResourceDiff, exec: &mut Executor<'_>) -> Step<String> {
        let Some(request) = Request::of(entity) else {
            let err = ReconcileError::UnresolvedParent {
                kind: entity.kind(),
                name: entity.name().to_string(),
                parent: entity.parent().to_string(),
            };
            exec.skip(diff, err.to_string());
            return Step::Failed;
        };
        exec.apply(diff, || match &request {
            Request::Group(r) => self.backend.create_group(r),
            Request::Connection(r) => self.backend.create_or_update_connection(None, r),
            Request::SharingProfile(r) => self.backend.create_sharing_profile(r),
        })
    }

    fn update(&self, entity: &Entity, diff: ResourceDiff, exec: &mut Executor<'_>) {
        let Some(id) = entity.identifier() else {
            let err = ReconcileError::MissingIdentifier {
                kind: entity.kind(),
                name: entity.name().to_string(),
            };
            exec.skip(diff, err.to_string());
            return;
        };
        let Some(request) = Request::of(entity) else {
            let err = ReconcileError::UnresolvedParent {
                kind: entity.kind(),
                name: entity.name().to_string(),
                parent: entity.parent().to_string(),
            };
            exec.skip(diff, err.to_string());
            return;
        };
        exec.apply(diff, || match &request {
            Request::Group(r) => self.backend.update_group(id, r),
            Request::Connection(r) => self
                .backend
                .create_or_update_connection(Some(id), r)
                .map(|_| ()),
            Request::SharingProfile(r) => self.backend.update_sharing_profile(id, r),
        });
    }

    fn delete_leftovers(
        &self,
        tree: &CurrentTree,
        consumed: &HashSet<usize>,
        scope: &Scope,
        exec: &mut Executor<'_>,
    ) {
        let leftovers: Vec<&Entity> = tree
            .entities()
            .iter()
            .enumerate()
            .filter(|(i, e)| !consumed.contains(i) && scope.covers(tree, e))
            .map(|(_, e)| e)
            .collect();
        let doomed: HashSet<&str> = leftovers.iter().filter_map(|e| e.identifier()).collect();

        for &entity in &leftovers {
            let Some(id) = entity.identifier() else {
                let err = ReconcileError::MissingIdentifier {
                    kind: entity.kind(),
                    name: entity.name().to_string(),
                };
                exec.skip(ResourceDiff::new(entity, Change::Delete), err.to_string());
                continue;
            };
            let cascaded = tree
                .ancestors(id)
                .iter()
                .any(|a| a.identifier().is_some_and(|a| doomed.contains(a)));
            if cascaded {
                log::debug!("{} '{}' goes with its parent", entity.kind(), entity.name());
                continue;
            }
            exec.apply(ResourceDiff::new(entity, Change::Delete), || match entity.kind() {
                Kind::Group => self.backend.delete_group(id),
                Kind::Connection => self.backend.delete_connection(id),
                Kind::SharingProfile => self.backend.delete_sharing_profile(id),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Attributes, Connection, ConnectionGroup, SharingProfile};
    use declarative::{ApplyResult, ExecuteOptions, NoProgress};
    use guacamole::{CallKind, GroupType, MockBackend, WireMap};

    fn group(name: &str, parent: ParentRef) -> Entity {
        Entity::Group(ConnectionGroup::new(name, parent))
    }

    fn ssh(name: &str, parent: ParentRef, host: &str) -> Entity {
        Entity::Connection(
            Connection::new(name, parent, "ssh")
                .with_parameters([("hostname", host), ("port", "22")].into_iter().collect()),
        )
    }

    fn profile(name: &str, connection: &str) -> Entity {
        Entity::SharingProfile(
            SharingProfile::new(name, ParentRef::Name(connection.to_string()))
                .with_parameters([("read-only", "true")].into_iter().collect()),
        )
    }

    fn name(n: &str) -> ParentRef {
        ParentRef::Name(n.to_string())
    }

    fn lab() -> Desired {
        Desired {
            entities: vec![
                group("g1", ParentRef::Root),
                group("team", name("g1")),
                ssh("kali", name("team"), "10.0.0.5"),
                profile("watch", "kali"),
            ],
            users: Vec::new(),
        }
    }

    fn run(mock: &MockBackend, desired: &Desired, opts: ExecuteOptions) -> declarative::Report {
        let mut progress = NoProgress;
        let mut exec = Executor::new(opts, &mut progress);
        Reconciler::new(mock).apply(desired, &mut exec).unwrap();
        exec.finish()
    }

    fn seed_group(mock: &MockBackend, name: &str, parent: &str) -> String {
        mock.seed_group(GroupRequest {
            parent_identifier: parent.to_string(),
            name: name.to_string(),
            group_type: GroupType::Organizational,
            attributes: WireMap::new(),
        })
    }

    fn seed_ssh(mock: &MockBackend, name: &str, parent: &str) -> String {
        mock.seed_connection(ConnectionRequest {
            parent_identifier: parent.to_string(),
            name: name.to_string(),
            protocol: "ssh".to_string(),
            parameters: WireMap::new(),
            attributes: WireMap::new(),
        })
    }

    #[test]
    fn test_parent_created_before_child() {
        let mock = MockBackend::new();
        let report = run(&mock, &lab(), ExecuteOptions::default());

        assert!(report.summary.is_success());
        assert_eq!(report.summary.created, 4);
        let g1 = mock.group_id("g1").unwrap();
        let team = mock.group_id("team").unwrap();
        let kali = mock.connection_id("kali").unwrap();
        assert_ne!(g1, "g1");
        assert_eq!(mock.connection(&kali).unwrap().parent_identifier, team);
        let tree = Walker::new(&mock).walk(ROOT_IDENTIFIER).unwrap();
        assert_eq!(tree.top_level(&kali).map(Entity::name), Some("g1"));
        assert_eq!(tree.sharing_profiles_of(&kali).count(), 1);
    }

    #[test]
    fn test_connection_parent_is_created_group_id() {
        let mock = MockBackend::new();
        let desired = Desired {
            entities: vec![ssh("kali", name("g1"), "10.0.0.5"), group("g1", ParentRef::Root)],
            users: Vec::new(),
        };
        run(&mock, &desired, ExecuteOptions::default());

        let g1 = mock.group_id("g1").unwrap();
        let kali = mock.connection_id("kali").unwrap();
        assert_eq!(mock.connection(&kali).unwrap().parent_identifier, g1);
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let mock = MockBackend::new();
        run(&mock, &lab(), ExecuteOptions::default());
        mock.clear_calls();

        let report = run(&mock, &lab(), ExecuteOptions::default());
        assert!(mock.object_writes().is_empty());
        assert_eq!(report.summary.no_change, 4);
        assert!(report.steps.is_empty());
    }

    #[test]
    fn test_changed_parameter_updates_in_place() {
        let mock = MockBackend::new();
        run(&mock, &lab(), ExecuteOptions::default());
        let kali = mock.connection_id("kali").unwrap();
        mock.clear_calls();

        let mut desired = lab();
        desired.entities[2] = ssh("kali", name("team"), "10.0.0.6");
        let report = run(&mock, &desired, ExecuteOptions::default());

        let writes = mock.object_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].kind, CallKind::Update);
        assert_eq!(report.steps[0].diff.detail.as_deref(), Some("parameters.hostname"));
        let stored = mock.connection(&kali).unwrap();
        assert_eq!(
            Attributes::from_wire(&stored.parameters).get("hostname"),
            Some("10.0.0.6")
        );
    }

    #[test]
    fn test_moved_connection_is_recreated() {
        let mock = MockBackend::new();
        let mut desired = Desired {
            entities: vec![
                group("a", ParentRef::Root),
                group("b", ParentRef::Root),
                ssh("kali", name("a"), "10.0.0.5"),
            ],
            users: Vec::new(),
        };
        run(&mock, &desired, ExecuteOptions::default());
        let old = mock.connection_id("kali").unwrap();
        mock.clear_calls();

        desired.entities[2] = ssh("kali", name("b"), "10.0.0.5");
        let report = run(&mock, &desired, ExecuteOptions::default());

        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.removed, 1);
        let writes = mock.object_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].kind, CallKind::Create);
        assert_eq!(writes[1].kind, CallKind::Delete);
        assert_eq!(writes[1].target, old);
        let moved = mock.connection_id("kali").unwrap();
        assert_eq!(
            mock.connection(&moved).unwrap().parent_identifier,
            mock.group_id("b").unwrap()
        );
    }

    #[test]
    fn test_undeclared_subgroup_is_deleted_once() {
        let mock = MockBackend::new();
        let g1 = seed_group(&mock, "g1", ROOT_IDENTIFIER);
        let old = seed_group(&mock, "old", &g1);
        seed_ssh(&mock, "a", &old);
        seed_ssh(&mock, "b", &old);

        let desired = Desired {
            entities: vec![group("g1", ParentRef::Root)],
            users: Vec::new(),
        };
        run(&mock, &desired, ExecuteOptions::default());

        let writes = mock.object_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].kind, CallKind::Delete);
        assert_eq!(writes[0].target, old);
        assert!(mock.connection_id("a").is_none());
        assert!(mock.group_id("g1").is_some());
    }

    #[test]
    fn test_destroy_deletes_group_with_one_call() {
        let mock = MockBackend::new();
        let g1 = seed_group(&mock, "g1", ROOT_IDENTIFIER);
        seed_ssh(&mock, "a", &g1);
        seed_ssh(&mock, "b", &g1);
        seed_ssh(&mock, "unrelated", ROOT_IDENTIFIER);

        let mut progress = NoProgress;
        let mut exec = Executor::new(ExecuteOptions::default(), &mut progress);
        let desired = Desired {
            entities: vec![group("g1", ParentRef::Root)],
            users: Vec::new(),
        };
        Reconciler::new(&mock).destroy(&desired, &mut exec).unwrap();

        let writes = mock.object_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].target, g1);
        assert!(mock.connection_id("unrelated").is_some());
        assert_eq!(exec.finish().summary.removed, 1);
    }

    #[test]
    fn test_unmanaged_root_objects_are_left_alone() {
        let mock = MockBackend::new();
        seed_group(&mock, "handmade", ROOT_IDENTIFIER);
        seed_ssh(&mock, "jump", ROOT_IDENTIFIER);

        run(&mock, &lab(), ExecuteOptions::default());
        assert!(
            mock.object_writes()
                .iter()
                .all(|c| c.kind == CallKind::Create)
        );
        assert!(mock.group_id("handmade").is_some());
    }

    #[test]
    fn test_dry_run_writes_nothing_and_plans_children() {
        let mock = MockBackend::new();
        let report = run(&mock, &lab(), ExecuteOptions::dry_run());

        assert!(mock.calls().is_empty());
        assert_eq!(report.steps.len(), 4);
        assert!(report.steps.iter().all(|s| s.diff.change == Change::Create));
        assert_eq!(report.summary.failed, 0);
    }

    #[test]
    fn test_unresolved_parent_is_skipped() {
        let mock = MockBackend::new();
        let desired = Desired {
            entities: vec![
                ssh("kali", name("nowhere"), "10.0.0.5"),
                ssh("jump", ParentRef::Root, "10.0.0.1"),
            ],
            users: Vec::new(),
        };
        let report = run(&mock, &desired, ExecuteOptions::default());

        assert_eq!(mock.object_writes().len(), 1);
        assert!(mock.connection_id("kali").is_none());
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.created, 1);
    }

    #[test]
    fn test_failure_is_isolated() {
        let mock = MockBackend::new();
        mock.fail_on("team");
        let desired = Desired {
            entities: vec![
                group("g1", ParentRef::Root),
                group("team", name("g1")),
                ssh("kali", name("team"), "10.0.0.5"),
                ssh("jump", name("g1"), "10.0.0.1"),
            ],
            users: Vec::new(),
        };
        let report = run(&mock, &desired, ExecuteOptions::default());

        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.created, 2);
        assert!(mock.connection_id("jump").is_some());
    }

    #[test]
    fn test_duplicate_declaration_is_skipped() {
        let mock = MockBackend::new();
        let desired = Desired {
            entities: vec![group("g1", ParentRef::Root), group("g1", ParentRef::Root)],
            users: Vec::new(),
        };
        let report = run(&mock, &desired, ExecuteOptions::default());
        assert_eq!(mock.object_writes().len(), 1);
        assert_eq!(report.summary.skipped, 1);
    }

    #[test]
    fn test_same_name_under_different_parents() {
        let mock = MockBackend::new();
        let desired = Desired {
            entities: vec![
                group("a", ParentRef::Root),
                group("b", ParentRef::Root),
                ssh("kali", name("a"), "10.0.0.5"),
                ssh("kali", name("b"), "10.0.0.6"),
            ],
            users: Vec::new(),
        };
        run(&mock, &desired, ExecuteOptions::default());
        mock.clear_calls();

        run(&mock, &desired, ExecuteOptions::default());
        assert!(mock.object_writes().is_empty());
    }

    #[test]
    fn test_failed_group_does_not_lend_its_name() {
        let mock = MockBackend::new();
        let other = seed_group(&mock, "other", ROOT_IDENTIFIER);
        let foreign = seed_group(&mock, "team", &other);
        mock.fail_on("team");
        let desired = Desired {
            entities: vec![
                group("range", ParentRef::Root),
                group("team", name("range")),
                ssh("kali", name("team"), "10.0.0.5"),
            ],
            users: Vec::new(),
        };
        let report = run(&mock, &desired, ExecuteOptions::default());

        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 1);
        assert!(mock.connection_id("kali").is_none());
        let tree = Walker::new(&mock).walk(ROOT_IDENTIFIER).unwrap();
        assert!(
            tree.entities()
                .iter()
                .all(|e| e.parent().identifier() != Some(foreign.as_str()))
        );
    }

    #[test]
    fn test_declared_name_waits_for_its_entity() {
        let mock = MockBackend::new();
        seed_group(&mock, "team", ROOT_IDENTIFIER);
        let tree = Walker::new(&mock).walk(ROOT_IDENTIFIER).unwrap();
        let declared = [group("team", name("range"))];

        let ids = IdentifierMap::seeded(&tree);
        assert!(ids.get(Kind::Group, "team").is_some());
        let ids = ids.claimed(&declared);
        assert_eq!(ids.get(Kind::Group, "team"), None);
        assert_eq!(ids.resolve(&name("team"), Kind::Group), None);
    }

    #[test]
    fn test_profiles_follow_their_connection() {
        let mock = MockBackend::new();
        let watch = |range: &str| {
            Entity::SharingProfile(
                SharingProfile::new("watch", name("kali"))
                    .within(name(range))
                    .with_parameters([("read-only", "true")].into_iter().collect()),
            )
        };
        let desired = Desired {
            entities: vec![
                group("range-1", ParentRef::Root),
                group("range-2", ParentRef::Root),
                ssh("kali", name("range-1"), "10.0.1.10"),
                ssh("kali", name("range-2"), "10.0.2.10"),
                watch("range-1"),
                watch("range-2"),
            ],
            users: Vec::new(),
        };
        let report = run(&mock, &desired, ExecuteOptions::default());
        assert!(report.summary.is_success());
        assert_eq!(report.summary.created, 6);

        let tree = Walker::new(&mock).walk(ROOT_IDENTIFIER).unwrap();
        let connections: Vec<&Entity> = tree.of_kind(Kind::Connection).collect();
        assert_eq!(connections.len(), 2);
        for connection in connections {
            let id = connection.identifier().unwrap();
            assert_eq!(tree.sharing_profiles_of(id).count(), 1);
        }

        mock.clear_calls();
        run(&mock, &desired, ExecuteOptions::default());
        assert!(mock.object_writes().is_empty());
    }

    #[test]
    fn test_dry_run_places_profiles_under_planned_connections() {
        let mock = MockBackend::new();
        let desired = Desired {
            entities: vec![
                group("range-1", ParentRef::Root),
                ssh("kali", name("range-1"), "10.0.1.10"),
                Entity::SharingProfile(
                    SharingProfile::new("watch", name("kali")).within(name("range-1")),
                ),
            ],
            users: Vec::new(),
        };
        let report = run(&mock, &desired, ExecuteOptions::dry_run());
        assert_eq!(report.steps.len(), 3);
        let planned = ApplyResult::Skipped {
            reason: "dry run".to_string(),
        };
        assert!(report.steps.iter().all(|s| s.result == planned));
    }

    #[test]
    fn test_identifier_map_resolution() {
        let ids = IdentifierMap::default()
            .with(Kind::Group, ROOT_IDENTIFIER, "g1", "5")
            .with(Kind::Connection, "5", "kali", "7");
        assert_eq!(ids.get_within(Kind::Connection, "5", "kali"), Some("7"));
        assert_eq!(ids.get_within(Kind::Connection, ROOT_IDENTIFIER, "kali"), None);
        assert_eq!(
            ids.resolve(&name("g1"), Kind::Group),
            Some(ParentRef::Id("5".to_string()))
        );
        assert_eq!(ids.resolve(&name("kali"), Kind::Group), None);
        assert_eq!(
            ids.resolve(&name("kali"), Kind::Connection),
            Some(ParentRef::Id("7".to_string()))
        );
        assert_eq!(ids.resolve(&ParentRef::Root, Kind::Group), Some(ParentRef::Root));
    }

    #[test]
    fn test_scope_of_root_level_entities() {
        let scope = Scope::of(&lab().entities);
        assert!(scope.groups.contains("g1"));
        assert!(!scope.groups.contains("team"));
        assert!(scope.connections.is_empty());
        assert_eq!(Scope::of(&[]), Scope::default());
    }
}
