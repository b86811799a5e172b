//! Sharing profile entity

use guacamole::{SharingProfileRequest, TreeNode};

use super::{Attributes, ParentRef, field_changes};

/// Restricted variant of a connection, e.g. read-only viewing
///
/// The parent is always a connection. Connection names are only unique
/// under one group, so a profile declared by connection name also carries
/// the parent of that connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharingProfile {
    pub name: String,
    pub parent: ParentRef,
    /// Parent of the connection named by `parent`
    pub connection_parent: Option<ParentRef>,
    pub identifier: Option<String>,
    pub parameters: Attributes,
    pub attributes: Attributes,
}

impl SharingProfile {
    pub fn new(name: impl Into<String>, parent: ParentRef) -> Self {
        Self {
            name: name.into(),
            parent,
            connection_parent: None,
            identifier: None,
            parameters: Attributes::new(),
            attributes: Attributes::new(),
        }
    }

    /// Place the named parent connection under `parent`
    pub fn within(mut self, parent: ParentRef) -> Self {
        self.connection_parent = Some(parent);
        self
    }

    pub fn with_parameters(mut self, parameters: Attributes) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Build from a tree node nested under the connection `enclosing`
    pub fn from_node(node: &TreeNode, enclosing: Option<&str>) -> Self {
        let parent = enclosing
            .or(node.primary_connection_identifier.as_deref())
            .map_or(ParentRef::Root, |id| ParentRef::Id(id.to_string()));
        Self {
            name: node.name.clone(),
            parent,
            connection_parent: None,
            identifier: node.identifier.clone(),
            parameters: Attributes::new(),
            attributes: Attributes::from_wire(&node.attributes),
        }
    }

    /// Request body, or `None` while the parent connection is unresolved
    pub fn to_request(&self) -> Option<SharingProfileRequest> {
        let ParentRef::Id(connection) = &self.parent else {
            return None;
        };
        Some(SharingProfileRequest {
            primary_connection_identifier: connection.clone(),
            name: self.name.clone(),
            parameters: self.parameters.to_wire(),
            attributes: self.attributes.to_wire(),
        })
    }

    pub fn same_as(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parent == other.parent
            && self.parameters == other.parameters
            && self.attributes == other.attributes
    }

    pub(super) fn changes_from(&self, current: &Self) -> String {
        field_changes(
            &[],
            &[
                ("parameters", &self.parameters, &current.parameters),
                ("attributes", &self.attributes, &current.attributes),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_node_prefers_enclosing_connection() {
        let node = TreeNode {
            name: "watch".to_string(),
            identifier: Some("11".to_string()),
            primary_connection_identifier: Some("8".to_string()),
            ..Default::default()
        };
        assert_eq!(
            SharingProfile::from_node(&node, Some("9")).parent,
            ParentRef::Id("9".to_string())
        );
        assert_eq!(
            SharingProfile::from_node(&node, None).parent,
            ParentRef::Id("8".to_string())
        );
    }

    #[test]
    fn test_to_request_needs_connection_id() {
        let unresolved = SharingProfile::new("watch", ParentRef::Name("kali".to_string()));
        assert!(unresolved.to_request().is_none());

        let resolved = SharingProfile::new("watch", ParentRef::Id("9".to_string()))
            .with_parameters([("read-only", "true")].into_iter().collect());
        let request = resolved.to_request().unwrap();
        assert_eq!(request.primary_connection_identifier, "9");
        assert_eq!(
            request.parameters.get("read-only"),
            Some(&Some("true".to_string()))
        );
    }
}
