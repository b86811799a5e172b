//! Template documents
//!
//! A template is read as loosely typed data and handed to the expander,
//! which checks the shape of each entry on its own. Sections keep their
//! declaration order.
//!
//! ```toml
//! stacks = ["range-1"]
//!
//! [defaults.connectionTemplates]
//! protocol = "ssh"
//! parameters = { port = 22 }
//!
//! [groups."range-%index%"]
//! count = 2
//!
//! [connectionTemplates.kali]
//! parent = "range-1"
//! sharingProfiles = { watch = { parameters = { read-only = true } } }
//!
//! [users."student-%index%"]
//! count = 2
//! permissions = { connectionPermissions = ["kali"] }
//! ```
//!
//! A `parent` of `ROOT` is the root group and a `parent` made only of digits
//! is a backend identifier. Any other value names a group declared in the
//! template, so a group whose name is all digits (say `2024`) cannot be
//! used as a parent by name; refer to it by identifier instead.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Section names as written in the document
pub const GROUPS: &str = "groups";
pub const CONNECTION_TEMPLATES: &str = "connectionTemplates";
pub const USERS: &str = "users";
pub const DEFAULTS: &str = "defaults";
pub const STACKS: &str = "stacks";

/// A parsed template document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub defaults: Value,
    pub groups: Value,
    pub connection_templates: Value,
    pub users: Value,
    pub stacks: Value,
}

impl Template {
    /// Load a template from a `.json` or TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read template {}", path.display()))?;
        let value: Value = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        };
        Self::from_value(value)
    }

    /// Split a document into its sections
    ///
    /// Only a document that is not a mapping at all is an error; malformed
    /// sections are reported by the expander.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut document) = value else {
            bail!("template must be a mapping of sections");
        };
        let mut take = |key: &str| document.remove(key).unwrap_or(Value::Null);
        let template = Self {
            defaults: take(DEFAULTS),
            groups: take(GROUPS),
            connection_templates: take(CONNECTION_TEMPLATES),
            users: take(USERS),
            stacks: take(STACKS),
        };
        for unknown in document.keys() {
            log::warn!("Ignoring unknown template section '{unknown}'");
        }
        Ok(template)
    }

    /// Defaults for one section, empty when not given
    pub fn defaults_for(&self, section: &str) -> Value {
        self.defaults
            .get(section)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_from_value_splits_sections() {
        let template = Template::from_value(json!({
            "groups": {"range": {}},
            "stacks": ["range-1"],
            "defaults": {"users": {"attributes": {"disabled": ""}}}
        }))
        .unwrap();
        assert_eq!(template.groups, json!({"range": {}}));
        assert_eq!(template.users, Value::Null);
        assert_eq!(template.defaults_for(USERS)["attributes"]["disabled"], "");
        assert_eq!(template.defaults_for(GROUPS), json!({}));
    }

    #[test]
    fn test_from_value_rejects_non_mapping() {
        assert!(Template::from_value(json!(["groups"])).is_err());
    }

    #[test]
    fn test_load_toml_keeps_declaration_order() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[groups.zulu]\n[groups.alpha]\nparent = \"zulu\"\n[groups.mike]"
        )
        .unwrap();

        let template = Template::load(file.path()).unwrap();
        let names: Vec<&String> = template.groups.as_object().unwrap().keys().collect();
        assert_eq!(names, vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"connectionTemplates": {{"kali": {{"protocol": "ssh"}}}}}}"#
        )
        .unwrap();

        let template = Template::load(file.path()).unwrap();
        assert_eq!(template.connection_templates["kali"]["protocol"], "ssh");
    }
}
