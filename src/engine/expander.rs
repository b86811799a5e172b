//! Template expander
//!
//! Turns a template plus discovered addresses into the desired entities and
//! users of one run. Each entry is merged over its section's defaults,
//! copied `count` times with `%index%` substituted, and then read into
//! typed entities. A malformed entry is logged and contributes nothing.

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::LazyLock;

use guacamole::GroupType;

use crate::discovery::{AddressMap, Discovery};
use crate::error::ShapeError;
use crate::resource::{
    Attributes, Connection, ConnectionGroup, Entity, ParentRef, SharingProfile, User,
};
use crate::template::{CONNECTION_TEMPLATES, GROUPS, STACKS, Template, USERS};

use super::anchored;

/// `%index%`, optionally followed by `+N` or `-N`
static INDEX: LazyLock<Regex> = LazyLock::new(|| {
    // Checked pattern, cannot fail
    Regex::new(r"%index%(?:([+-])(\d+))?").expect("index pattern is valid")
});

/// Upper bound on `count`
const MAX_COUNT: u64 = 10_000;

const RESOURCE: &str = "%resource%";
const HOSTNAME: &str = "hostname";
const GUACD_HOSTNAME: &str = "guacd-hostname";

/// Permission references of a user, before resolution
///
/// Group, connection and sharing profile entries are regular expressions
/// matched against whole names in the live tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PermissionPatterns {
    #[serde(rename = "connectionGroupPermissions")]
    pub connection_groups: Vec<String>,
    #[serde(rename = "connectionPermissions")]
    pub connections: Vec<String>,
    #[serde(rename = "sharingProfilePermissions")]
    pub sharing_profiles: Vec<String>,
    #[serde(rename = "userGroupPermissions")]
    pub user_groups: Vec<String>,
    #[serde(rename = "systemPermissions")]
    pub system: Vec<String>,
}

/// A user as declared, with unresolved permission references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredUser {
    pub user: User,
    pub patterns: PermissionPatterns,
}

/// Everything one template describes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Desired {
    /// Groups, then connections, then sharing profiles, each in
    /// declaration order
    pub entities: Vec<Entity>,
    pub users: Vec<DesiredUser>,
}

impl Desired {
    pub fn usernames(&self) -> BTreeSet<String> {
        self.users.iter().map(|u| u.user.username.clone()).collect()
    }
}

#[derive(Debug, Deserialize)]
struct GroupEntry {
    #[serde(default)]
    parent: Option<Value>,
    #[serde(default, rename = "type")]
    group_type: Option<GroupType>,
    #[serde(default)]
    attributes: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionEntry {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    parent: Option<Value>,
    #[serde(default)]
    parameters: Value,
    #[serde(default)]
    attributes: Value,
    #[serde(default)]
    sharing_profiles: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ProfileEntry {
    #[serde(default)]
    parameters: Value,
    #[serde(default)]
    attributes: Value,
}

#[derive(Debug, Deserialize)]
struct UserEntry {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    attributes: Value,
    #[serde(default)]
    permissions: PermissionPatterns,
}

/// Expands templates against a discovery source
pub struct Expander<'a> {
    discovery: &'a dyn Discovery,
}

impl<'a> Expander<'a> {
    pub fn new(discovery: &'a dyn Discovery) -> Self {
        Self { discovery }
    }

    pub fn expand(&self, template: &Template) -> Desired {
        let stacks = self.addresses(template);

        let mut entities = self.groups(template);
        let (connections, profiles) = self.connections(template, &stacks);
        entities.extend(connections);
        entities.extend(profiles);

        let users = self.users(template);
        log::info!(
            "Template declares {} entities and {} users",
            entities.len(),
            users.len()
        );
        Desired { entities, users }
    }

    /// Addresses of every declared stack, in declaration order
    fn addresses(&self, template: &Template) -> Vec<(String, AddressMap)> {
        let names: Vec<String> = match &template.stacks {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item.as_str() {
                    Some(name) => Some(name.to_string()),
                    None => {
                        log::warn!("{STACKS}: ignoring non-string entry {item}");
                        None
                    }
                })
                .collect(),
            other => {
                log::warn!("{STACKS}: expected a list of stack names, got {other}");
                Vec::new()
            }
        };

        names
            .into_iter()
            .map(|stack| {
                let addresses = self.discovery.addresses(&stack).unwrap_or_else(|e| {
                    log::warn!("Could not discover addresses of stack '{stack}': {e:#}");
                    AddressMap::new()
                });
                log::debug!("Stack '{stack}': {} resources", addresses.len());
                (stack, addresses)
            })
            .collect()
    }

    fn groups(&self, template: &Template) -> Vec<Entity> {
        let defaults = template.defaults_for(GROUPS);
        expand_section(GROUPS, &template.groups, &defaults)
            .into_iter()
            .filter_map(|(name, value)| match group_from(&name, value) {
                Ok(group) => Some(Entity::Group(group)),
                Err(e) => {
                    log::warn!("Skipping template entry {e}");
                    None
                }
            })
            .collect()
    }

    fn connections(
        &self,
        template: &Template,
        stacks: &[(String, AddressMap)],
    ) -> (Vec<Entity>, Vec<Entity>) {
        let defaults = template.defaults_for(CONNECTION_TEMPLATES);
        let mut connections = Vec::new();
        let mut profiles = Vec::new();
        let entries = expand_section(
            CONNECTION_TEMPLATES,
            &template.connection_templates,
            &defaults,
        );
        for (key, value) in entries {
            match connections_from(&key, value, stacks) {
                Ok((c, p)) => {
                    connections.extend(c.into_iter().map(Entity::Connection));
                    profiles.extend(p.into_iter().map(Entity::SharingProfile));
                }
                Err(e) => log::warn!("Skipping template entry {e}"),
            }
        }
        (connections, profiles)
    }

    fn users(&self, template: &Template) -> Vec<DesiredUser> {
        let defaults = template.defaults_for(USERS);
        expand_section(USERS, &template.users, &defaults)
            .into_iter()
            .filter_map(|(key, value)| match user_from(&key, value) {
                Ok(user) => Some(user),
                Err(e) => {
                    log::warn!("Skipping template entry {e}");
                    None
                }
            })
            .collect()
    }
}

/// Merge `overlay` over `base`
///
/// Mappings merge key by key, lists concatenate (base first) and anything
/// else in `overlay` replaces what `base` has.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged = base.clone();
            for (key, value) in overlay {
                let next = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (Value::Array(base), Value::Array(overlay)) => {
            Value::Array(base.iter().chain(overlay).cloned().collect())
        }
        _ => overlay.clone(),
    }
}

/// Replace every `%index%[+N|-N]` in `text`
///
/// An offset that does not fit leaves its placeholder as written.
pub fn substitute_index(text: &str, index: i64) -> String {
    INDEX
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let shifted = caps.get(2).map_or(Some(index), |n| {
                let offset: i64 = n.as_str().parse().ok()?;
                match caps.get(1).map(|m| m.as_str()) {
                    Some("-") => index.checked_sub(offset),
                    _ => index.checked_add(offset),
                }
            });
            match shifted {
                Some(value) => value.to_string(),
                None => {
                    log::warn!("Index offset out of range in '{}'", &caps[0]);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Substitute in every string and mapping key of `value`
fn substitute_value(value: &Value, index: i64) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_index(s, index)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| substitute_value(v, index)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (substitute_index(k, index), substitute_value(v, index)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Number of copies an entry asks for
fn copies(section: &str, entry: &str, count: Option<&Value>) -> Result<u64, ShapeError> {
    match count {
        None | Some(Value::Null) => Ok(1),
        Some(value) => match value.as_u64() {
            Some(count) if count <= MAX_COUNT => Ok(count),
            Some(count) => Err(ShapeError::new(
                section,
                entry,
                format!("count must be at most {MAX_COUNT}, got {count}"),
            )),
            None => Err(ShapeError::new(
                section,
                entry,
                format!("count must be a non-negative integer, got {value}"),
            )),
        },
    }
}

/// Expand a section into `(name, entry)` pairs, one per copy
pub fn expand_section(section: &str, value: &Value, defaults: &Value) -> Vec<(String, Value)> {
    let entries = match value {
        Value::Null => return Vec::new(),
        Value::Object(entries) => entries,
        other => {
            log::warn!("Skipping section {section}: expected a mapping, got {other}");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for (key, raw) in entries {
        let raw = match raw {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => raw.clone(),
            other => {
                log::warn!("Skipping {section}.{key}: expected a mapping, got {other}");
                continue;
            }
        };
        let Value::Object(mut merged) = deep_merge(defaults, &raw) else {
            log::warn!("Skipping template entry {section}.{key}: defaults are not a mapping");
            continue;
        };
        let count = match copies(section, key, merged.remove("count").as_ref()) {
            Ok(count) => count,
            Err(e) => {
                log::warn!("Skipping template entry {e}");
                continue;
            }
        };
        let merged = Value::Object(merged);
        for index in 1..=count as i64 {
            out.push((substitute_index(key, index), substitute_value(&merged, index)));
        }
    }
    out
}

/// Parent reference from a template value; strings and numbers only
fn parent_from(
    section: &str,
    entry: &str,
    value: Option<&Value>,
) -> Result<ParentRef, ShapeError> {
    match value {
        None | Some(Value::Null) => Ok(ParentRef::Root),
        Some(Value::String(s)) => Ok(ParentRef::parse(s)),
        Some(Value::Number(n)) => Ok(ParentRef::Id(n.to_string())),
        Some(other) => Err(ShapeError::new(
            section,
            entry,
            format!("parent must be a name or identifier, got {other}"),
        )),
    }
}

fn group_from(name: &str, value: Value) -> Result<ConnectionGroup, ShapeError> {
    let entry: GroupEntry =
        serde_json::from_value(value).map_err(|e| ShapeError::new(GROUPS, name, e.to_string()))?;
    let parent = parent_from(GROUPS, name, entry.parent.as_ref())?;
    Ok(ConnectionGroup::new(name, parent)
        .with_type(entry.group_type.unwrap_or_default())
        .with_attributes(Attributes::from_json(&entry.attributes)))
}

fn is_literal(pattern: &str) -> bool {
    !pattern.chars().any(|c| r"\.+*?()|[]{}^$".contains(c))
}

/// Resolve a `guacd-hostname` naming a discovered resource to its address
fn resolve_guacd(attributes: &mut Attributes, own: &AddressMap, stacks: &[(String, AddressMap)]) {
    let Some(target) = attributes.get(GUACD_HOSTNAME).map(str::to_string) else {
        return;
    };
    let address = own
        .get(&target)
        .or_else(|| stacks.iter().find_map(|(_, addresses)| addresses.get(&target)));
    if let Some(address) = address {
        attributes.insert(GUACD_HOSTNAME, address.clone());
    }
}

fn connections_from(
    key: &str,
    value: Value,
    stacks: &[(String, AddressMap)],
) -> Result<(Vec<Connection>, Vec<SharingProfile>), ShapeError> {
    let shape = |reason: String| ShapeError::new(CONNECTION_TEMPLATES, key, reason);

    let entry: ConnectionEntry = serde_json::from_value(value).map_err(|e| shape(e.to_string()))?;
    let protocol = entry
        .protocol
        .ok_or_else(|| shape("protocol is required".to_string()))?;
    let parent = parent_from(CONNECTION_TEMPLATES, key, entry.parent.as_ref())?;
    let pattern = entry.pattern.unwrap_or_else(|| key.to_string());
    let matcher = anchored(&pattern).map_err(|e| shape(format!("invalid pattern: {e}")))?;
    let parameters = Attributes::from_json(&entry.parameters);
    let attributes = Attributes::from_json(&entry.attributes);
    let name_for = |resource: &str| match &entry.name {
        Some(name) => name.replace(RESOURCE, resource),
        None => resource.to_string(),
    };

    let mut seen = BTreeSet::new();
    let mut connections = Vec::new();
    for (stack, addresses) in stacks {
        for (resource, address) in addresses {
            if !matcher.is_match(resource) {
                continue;
            }
            let name = name_for(resource);
            if !seen.insert(name.clone()) {
                log::warn!("{key}: '{name}' from '{stack}' matched twice, keeping the first");
                continue;
            }
            let mut parameters = parameters.clone();
            parameters.insert(HOSTNAME, address.clone());
            let mut attributes = attributes.clone();
            resolve_guacd(&mut attributes, addresses, stacks);
            connections.push(
                Connection::new(name, parent.clone(), protocol.clone())
                    .with_parameters(parameters)
                    .with_attributes(attributes),
            );
        }
    }

    if connections.is_empty() {
        if is_literal(&pattern) && parameters.contains_key(HOSTNAME) {
            let name = entry
                .name
                .as_ref()
                .map_or_else(|| key.to_string(), |n| n.replace(RESOURCE, &pattern));
            let mut attributes = attributes.clone();
            resolve_guacd(&mut attributes, &AddressMap::new(), stacks);
            connections.push(
                Connection::new(name, parent.clone(), protocol.clone())
                    .with_parameters(parameters.clone())
                    .with_attributes(attributes),
            );
        } else {
            log::info!("{CONNECTION_TEMPLATES}.{key}: no discovered resource matches '{pattern}'");
        }
    }

    let mut profiles = Vec::new();
    for (profile_name, profile_value) in &entry.sharing_profiles {
        let profile: ProfileEntry = match serde_json::from_value(profile_value.clone()) {
            Ok(profile) => profile,
            Err(e) => {
                log::warn!("Skipping profile {CONNECTION_TEMPLATES}.{key}.{profile_name}: {e}");
                continue;
            }
        };
        for connection in &connections {
            profiles.push(
                SharingProfile::new(
                    profile_name.clone(),
                    ParentRef::Name(connection.name.clone()),
                )
                .within(connection.parent.clone())
                .with_parameters(Attributes::from_json(&profile.parameters))
                .with_attributes(Attributes::from_json(&profile.attributes)),
            );
        }
    }

    Ok((connections, profiles))
}

fn user_from(key: &str, value: Value) -> Result<DesiredUser, ShapeError> {
    let entry: UserEntry =
        serde_json::from_value(value).map_err(|e| ShapeError::new(USERS, key, e.to_string()))?;
    let mut user = User::new(entry.username.unwrap_or_else(|| key.to_string()))
        .with_attributes(Attributes::from_json(&entry.attributes));
    user.password = entry.password.filter(|p| !p.is_empty());
    Ok(DesiredUser {
        user,
        patterns: entry.permissions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::StaticDiscovery;
    use serde_json::json;

    fn template(value: Value) -> Template {
        Template::from_value(value).unwrap()
    }

    fn names(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(Entity::name).collect()
    }

    #[test]
    fn test_index_substitution() {
        let discovery = StaticDiscovery::new();
        let desired = Expander::new(&discovery).expand(&template(json!({
            "groups": {
                "range-%index%": {"count": 3},
                "host-%index%+1": {"count": 2}
            }
        })));
        assert_eq!(
            names(&desired.entities),
            vec!["range-1", "range-2", "range-3", "host-2", "host-3"]
        );
    }

    #[test]
    fn test_substitute_index_offsets() {
        assert_eq!(substitute_index("team-%index%", 4), "team-4");
        assert_eq!(substitute_index("10.0.%index%-1.5", 3), "10.0.2.5");
        assert_eq!(substitute_index("%index%+10/%index%", 2), "12/2");
        assert_eq!(substitute_index("no index", 2), "no index");
    }

    #[test]
    fn test_substitute_index_out_of_range_offset() {
        assert_eq!(
            substitute_index("a-%index%+9223372036854775807", 1),
            "a-%index%+9223372036854775807"
        );
        assert_eq!(
            substitute_index("%index%+99999999999999999999/%index%", 3),
            "%index%+99999999999999999999/3"
        );
        assert_eq!(substitute_index("%index%-5", 2), "-3");
    }

    #[test]
    fn test_deep_merge() {
        let defaults = json!({
            "protocol": "ssh",
            "parameters": {"port": 22, "username": "kali"},
            "tags": ["a"]
        });
        let entry = json!({"parameters": {"port": 2222}, "tags": ["b"], "protocol": "rdp"});
        assert_eq!(
            deep_merge(&defaults, &entry),
            json!({
                "protocol": "rdp",
                "parameters": {"port": 2222, "username": "kali"},
                "tags": ["a", "b"]
            })
        );
    }

    #[test]
    fn test_count_zero_and_absent() {
        let out = expand_section(GROUPS, &json!({"a": {"count": 0}, "b": {}}), &json!({}));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "b");
    }

    #[test]
    fn test_count_is_capped() {
        let out = expand_section(
            GROUPS,
            &json!({
                "huge": {"count": u64::MAX},
                "over": {"count": MAX_COUNT + 1},
                "edge-%index%": {"count": 2}
            }),
            &json!({}),
        );
        let names: Vec<&str> = out.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["edge-1", "edge-2"]);
        assert!(copies(GROUPS, "max", Some(&json!(MAX_COUNT))).is_ok());
    }

    #[test]
    fn test_shape_errors_are_isolated() {
        let discovery = StaticDiscovery::new();
        let desired = Expander::new(&discovery).expand(&template(json!({
            "groups": {
                "bad-count": {"count": "three"},
                "bad-type": {"type": "FOLDER"},
                "not-a-mapping": 7,
                "good": {}
            },
            "connectionTemplates": ["not", "a", "mapping"],
            "users": {"alice": {"permissions": {"connectionPermission": ["x"]}}, "bob": {}}
        })));
        assert_eq!(names(&desired.entities), vec!["good"]);
        assert_eq!(desired.usernames(), BTreeSet::from(["bob".to_string()]));
    }

    #[test]
    fn test_group_fields() {
        let discovery = StaticDiscovery::new();
        let desired = Expander::new(&discovery).expand(&template(json!({
            "defaults": {"groups": {"attributes": {"max-connections": 5}}},
            "groups": {
                "range": {"type": "BALANCING"},
                "team": {"parent": "range"},
                "legacy": {"parent": 12}
            }
        })));
        let Entity::Group(range) = &desired.entities[0] else {
            panic!("expected a group");
        };
        assert_eq!(range.group_type, GroupType::Balancing);
        assert_eq!(range.parent, ParentRef::Root);
        assert_eq!(range.attributes.get("max-connections"), Some("5"));
        assert_eq!(desired.entities[1].parent(), &ParentRef::Name("range".to_string()));
        assert_eq!(desired.entities[2].parent(), &ParentRef::Id("12".to_string()));
    }

    #[test]
    fn test_connections_match_discovered_resources() {
        let discovery = StaticDiscovery::new()
            .with_stack(
                "range-1",
                [
                    ("kali-1", "10.0.1.10"),
                    ("kali-2", "10.0.1.11"),
                    ("guacd", "10.0.1.2"),
                    ("kali-10x", "10.0.1.99"),
                ],
            )
            .with_stack("range-2", [("kali-3", "10.0.2.10")]);
        let desired = Expander::new(&discovery).expand(&template(json!({
            "stacks": ["range-1", "range-2", "range-9"],
            "connectionTemplates": {
                "kali": {
                    "pattern": "kali-\\d",
                    "name": "%resource%-ssh",
                    "protocol": "ssh",
                    "parent": "range",
                    "parameters": {"port": 22},
                    "attributes": {"guacd-hostname": "guacd"},
                    "sharingProfiles": {"watch": {"parameters": {"read-only": true}}}
                }
            }
        })));

        let connections: Vec<&Connection> = desired
            .entities
            .iter()
            .filter_map(|e| match e {
                Entity::Connection(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(
            connections.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["kali-1-ssh", "kali-2-ssh", "kali-3-ssh"]
        );
        assert_eq!(connections[0].parameters.get("hostname"), Some("10.0.1.10"));
        assert_eq!(connections[0].parameters.get("port"), Some("22"));
        assert_eq!(connections[0].attributes.get("guacd-hostname"), Some("10.0.1.2"));
        assert_eq!(connections[2].parameters.get("hostname"), Some("10.0.2.10"));

        let profiles: Vec<&Entity> = desired
            .entities
            .iter()
            .filter(|e| matches!(e, Entity::SharingProfile(_)))
            .collect();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].parent(), &ParentRef::Name("kali-1-ssh".to_string()));
        let Entity::SharingProfile(first) = profiles[0] else {
            panic!("expected a sharing profile");
        };
        assert_eq!(first.connection_parent, Some(ParentRef::Name("range".to_string())));
    }

    #[test]
    fn test_literal_pattern_fallback() {
        let discovery = StaticDiscovery::new();
        let desired = Expander::new(&discovery).expand(&template(json!({
            "connectionTemplates": {
                "jump": {"protocol": "ssh", "parameters": {"hostname": "jump.example.org"}},
                "web-.*": {"protocol": "http", "parameters": {"hostname": "x"}},
                "db": {"protocol": "ssh"}
            }
        })));
        assert_eq!(names(&desired.entities), vec!["jump"]);
        let Entity::Connection(jump) = &desired.entities[0] else {
            panic!("expected a connection");
        };
        assert_eq!(jump.parameters.get("hostname"), Some("jump.example.org"));
    }

    #[test]
    fn test_invalid_pattern_is_shape_error() {
        let discovery = StaticDiscovery::new().with_stack("s", [("a", "1.1.1.1")]);
        let desired = Expander::new(&discovery).expand(&template(json!({
            "stacks": ["s"],
            "connectionTemplates": {"broken": {"pattern": "(", "protocol": "ssh"}}
        })));
        assert!(desired.entities.is_empty());
    }

    #[test]
    fn test_users_with_count_and_permissions() {
        let discovery = StaticDiscovery::new();
        let desired = Expander::new(&discovery).expand(&template(json!({
            "defaults": {"users": {"permissions": {"systemPermissions": ["CREATE_CONNECTION"]}}},
            "users": {
                "student-%index%": {
                    "count": 2,
                    "attributes": {"guac-full-name": "Student %index%"},
                    "permissions": {"connectionPermissions": ["kali-%index%"]}
                },
                "instructor": {"username": "t.smith", "password": "pw"}
            }
        })));
        assert_eq!(desired.users.len(), 3);
        let second = &desired.users[1];
        assert_eq!(second.user.username, "student-2");
        assert_eq!(second.user.attributes.get("guac-full-name"), Some("Student 2"));
        assert_eq!(second.patterns.connections, vec!["kali-2"]);
        assert_eq!(second.patterns.system, vec!["CREATE_CONNECTION"]);
        assert!(second.user.password.is_none());
        assert_eq!(desired.users[2].user.username, "t.smith");
        assert_eq!(desired.users[2].user.password.as_deref(), Some("pw"));
    }
}
