//! Current-state walker
//!
//! Turns the nested `tree` response into a flat pre-order list of
//! entities. Every node is classified exactly once, by [`classify`]; the
//! rest of the engine only ever sees [`Entity`] values.

use guacamole::{Backend, TreeNode};
use std::collections::HashMap;

use crate::resource::{Attributes, Connection, ConnectionGroup, Entity, Kind, SharingProfile};

/// Decide what a tree node is
///
/// `type` marks a group, `protocol` a connection and
/// `primaryConnectionIdentifier` a sharing profile. The implicit root is
/// not an entity.
pub fn classify(node: &TreeNode) -> Option<Kind> {
    if node.is_root() {
        None
    } else if node.group_type.is_some() {
        Some(Kind::Group)
    } else if node.protocol.is_some() {
        Some(Kind::Connection)
    } else if node.primary_connection_identifier.is_some() {
        Some(Kind::SharingProfile)
    } else {
        None
    }
}

/// Flatten a tree without contacting the backend
///
/// Each node is emitted before its child groups, then its child
/// connections, then its sharing profiles.
pub fn flatten(node: &TreeNode) -> Vec<Entity> {
    let mut out = Vec::new();
    flatten_into(node, None, &mut out);
    out
}

fn flatten_into(node: &TreeNode, enclosing: Option<&str>, out: &mut Vec<Entity>) {
    let stripped = node.without_children();
    match classify(node) {
        Some(Kind::Group) => {
            let group = ConnectionGroup::from_node(&stripped, enclosing);
            out.push(Entity::Group(group));
        }
        Some(Kind::Connection) => {
            let connection = Connection::from_node(&stripped, enclosing);
            out.push(Entity::Connection(connection));
        }
        Some(Kind::SharingProfile) => {
            let profile = SharingProfile::from_node(&stripped, enclosing);
            out.push(Entity::SharingProfile(profile));
        }
        None if node.is_root() => {}
        None => log::debug!("Skipping unclassifiable tree node '{}'", node.name),
    }

    let own = node.identifier.as_deref();
    for child in node
        .child_connection_groups
        .iter()
        .chain(&node.child_connections)
        .chain(&node.sharing_profiles)
    {
        flatten_into(child, own, out);
    }
}

/// Flattened snapshot of the live tree
#[derive(Debug, Clone, Default)]
pub struct CurrentTree {
    entities: Vec<Entity>,
    by_id: HashMap<String, usize>,
}

impl CurrentTree {
    pub fn new(entities: Vec<Entity>) -> Self {
        let by_id = entities
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.identifier().map(|id| (id.to_string(), i)))
            .collect();
        Self { entities, by_id }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.by_id.get(id).map(|&i| &self.entities[i])
    }

    pub fn of_kind(&self, kind: Kind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind() == kind)
    }

    /// Parent chain of `id`, nearest first, stopping below the root
    pub fn ancestors(&self, id: &str) -> Vec<&Entity> {
        let mut chain = Vec::new();
        let mut next = self.get(id).and_then(|e| e.parent().identifier());
        while let Some(parent) = next {
            let Some(entity) = self.get(parent) else {
                break;
            };
            if chain.len() > self.entities.len() {
                log::warn!("Parent cycle at '{}'", entity.name());
                break;
            }
            chain.push(entity);
            next = entity.parent().identifier();
        }
        chain
    }

    /// The root-level entity `id` hangs under (possibly itself)
    pub fn top_level(&self, id: &str) -> Option<&Entity> {
        let entity = self.get(id)?;
        if entity.parent().is_root() {
            return Some(entity);
        }
        self.ancestors(id)
            .into_iter()
            .last()
            .filter(|top| top.parent().is_root())
    }

    /// Sharing profiles of a connection
    pub fn sharing_profiles_of<'a>(
        &'a self,
        connection: &'a str,
    ) -> impl Iterator<Item = &'a Entity> {
        self.of_kind(Kind::SharingProfile)
            .filter(move |p| p.parent().identifier() == Some(connection))
    }

    /// Entities whose name is in `allow`
    pub fn filter_names<S: AsRef<str>>(&self, allow: &[S]) -> Vec<&Entity> {
        self.entities
            .iter()
            .filter(|e| allow.iter().any(|name| name.as_ref() == e.name()))
            .collect()
    }
}

/// Reads the current tree from a backend
pub struct Walker<'a> {
    backend: &'a dyn Backend,
}

impl<'a> Walker<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Walk everything below `parent`, parameters included
    ///
    /// A failed parameter fetch is logged and leaves that entity's
    /// parameters empty, so it shows up as changed.
    pub fn walk(&self, parent: &str) -> guacamole::Result<CurrentTree> {
        let tree = self.backend.detail_tree(parent)?;
        let mut entities = flatten(&tree);
        for entity in &mut entities {
            self.enrich(entity);
        }
        log::debug!("Walked {} entities below {parent}", entities.len());
        Ok(CurrentTree::new(entities))
    }

    fn enrich(&self, entity: &mut Entity) {
        let (parameters, id, fetched) = match entity {
            Entity::Group(_) => return,
            Entity::Connection(c) => {
                let Some(id) = c.identifier.clone() else {
                    return;
                };
                let fetched = self.backend.connection_parameters(&id);
                (&mut c.parameters, id, fetched)
            }
            Entity::SharingProfile(p) => {
                let Some(id) = p.identifier.clone() else {
                    return;
                };
                let fetched = self.backend.sharing_profile_parameters(&id);
                (&mut p.parameters, id, fetched)
            }
        };
        match fetched {
            Ok(wire) => *parameters = Attributes::from_wire(&wire),
            Err(e) => log::warn!("Could not read parameters of #{id}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ParentRef;
    use guacamole::{
        ConnectionRequest, GroupRequest, GroupType, MockBackend, ROOT_IDENTIFIER, WireMap,
    };

    fn node(json: &str) -> TreeNode {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_tree_extraction_drops_root() {
        let tree = node(
            r#"{"name": "root", "id": "ROOT",
                "childConnectionGroups": [{"name": "g1", "type": "ORGANIZATIONAL", "id": "5"}]}"#,
        );
        let entities = flatten(&tree);
        assert_eq!(entities.len(), 1);
        let Entity::Group(group) = &entities[0] else {
            panic!("expected a group, got {:?}", entities[0]);
        };
        assert_eq!(group.name, "g1");
        assert_eq!(group.identifier.as_deref(), Some("5"));
        assert_eq!(group.parent, ParentRef::Root);
    }

    #[test]
    fn test_classify() {
        let root = node(r#"{"name": "r", "id": "ROOT", "type": "ORGANIZATIONAL"}"#);
        assert_eq!(classify(&root), None);
        assert_eq!(
            classify(&node(r#"{"name": "g", "type": "BALANCING"}"#)),
            Some(Kind::Group)
        );
        assert_eq!(
            classify(&node(r#"{"name": "c", "protocol": "ssh"}"#)),
            Some(Kind::Connection)
        );
        assert_eq!(
            classify(&node(r#"{"name": "s", "primaryConnectionIdentifier": "3"}"#)),
            Some(Kind::SharingProfile)
        );
        assert_eq!(classify(&node(r#"{"name": "?"}"#)), None);
    }

    #[test]
    fn test_flatten_is_pre_order_with_parents() {
        let tree = node(
            r#"{"name": "ROOT", "id": "ROOT", "type": "ORGANIZATIONAL",
                "childConnectionGroups": [
                  {"name": "range", "id": "1", "type": "ORGANIZATIONAL",
                   "childConnectionGroups": [
                     {"name": "team", "id": "2", "type": "ORGANIZATIONAL"}
                   ],
                   "childConnections": [
                     {"name": "kali", "id": "3", "protocol": "ssh",
                      "sharingProfiles": [
                        {"name": "watch", "id": "4", "primaryConnectionIdentifier": "3"}
                      ]}
                   ]}
                ],
                "childConnections": [{"name": "jump", "id": "5", "protocol": "ssh"}]}"#,
        );
        let entities = flatten(&tree);
        let names: Vec<&str> = entities.iter().map(Entity::name).collect();
        assert_eq!(names, vec!["range", "team", "kali", "watch", "jump"]);
        assert_eq!(entities[1].parent(), &ParentRef::Id("1".to_string()));
        assert_eq!(entities[2].parent(), &ParentRef::Id("1".to_string()));
        assert_eq!(entities[3].parent(), &ParentRef::Id("3".to_string()));
        assert_eq!(entities[4].parent(), &ParentRef::Root);

        let current = CurrentTree::new(entities);
        let ancestors: Vec<&str> = current
            .ancestors("4")
            .iter()
            .map(|e| e.name())
            .collect();
        assert_eq!(ancestors, vec!["kali", "range"]);
        assert_eq!(current.top_level("4").map(Entity::name), Some("range"));
        assert_eq!(current.top_level("5").map(Entity::name), Some("jump"));
        assert_eq!(current.sharing_profiles_of("3").count(), 1);
        assert_eq!(current.filter_names(&["kali", "jump"]).len(), 2);
        assert_eq!(current.filter_names(&["team"]).len(), 1);
    }

    #[test]
    fn test_walk_fetches_parameters() {
        let mock = MockBackend::new();
        let group = mock.seed_group(GroupRequest {
            parent_identifier: ROOT_IDENTIFIER.to_string(),
            name: "range".to_string(),
            group_type: GroupType::Organizational,
            attributes: WireMap::new(),
        });
        mock.seed_connection(ConnectionRequest {
            parent_identifier: group.clone(),
            name: "kali".to_string(),
            protocol: "ssh".to_string(),
            parameters: WireMap::from([
                ("hostname".to_string(), Some("10.0.0.5".to_string())),
                ("password".to_string(), None),
            ]),
            attributes: WireMap::new(),
        });

        let tree = Walker::new(&mock).walk(ROOT_IDENTIFIER).unwrap();
        assert_eq!(tree.entities().len(), 2);
        let Entity::Connection(kali) = &tree.entities()[1] else {
            panic!("expected a connection");
        };
        assert_eq!(kali.parent, ParentRef::Id(group));
        assert_eq!(kali.parameters.get("hostname"), Some("10.0.0.5"));
        assert!(!kali.parameters.contains_key("password"));
    }
}
