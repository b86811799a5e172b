//! Connection entity

use guacamole::{ConnectionRequest, TreeNode};

use super::{Attributes, ParentRef, field_changes};

/// A remote-access endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub name: String,
    pub parent: ParentRef,
    pub identifier: Option<String>,
    pub protocol: String,
    pub parameters: Attributes,
    pub attributes: Attributes,
}

impl Connection {
    pub fn new(name: impl Into<String>, parent: ParentRef, protocol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent,
            identifier: None,
            protocol: protocol.into(),
            parameters: Attributes::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Attributes) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Build from a tree node; parameters are filled in separately
    pub fn from_node(node: &TreeNode, enclosing: Option<&str>) -> Self {
        Self {
            name: node.name.clone(),
            parent: ParentRef::from_backend(node.parent_identifier.as_deref().or(enclosing)),
            identifier: node.identifier.clone(),
            protocol: node.protocol.clone().unwrap_or_default(),
            parameters: Attributes::new(),
            attributes: Attributes::from_wire(&node.attributes),
        }
    }

    /// Request body, or `None` while the parent is an unresolved name
    pub fn to_request(&self) -> Option<ConnectionRequest> {
        Some(ConnectionRequest {
            parent_identifier: self.parent.identifier()?.to_string(),
            name: self.name.clone(),
            protocol: self.protocol.clone(),
            parameters: self.parameters.to_wire(),
            attributes: self.attributes.to_wire(),
        })
    }

    pub fn same_as(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parent == other.parent
            && self.protocol == other.protocol
            && self.parameters == other.parameters
            && self.attributes == other.attributes
    }

    pub(super) fn changes_from(&self, current: &Self) -> String {
        field_changes(
            &[("protocol", self.protocol != current.protocol)],
            &[
                ("parameters", &self.parameters, &current.parameters),
                ("attributes", &self.attributes, &current.attributes),
            ],
        )
    }
}
