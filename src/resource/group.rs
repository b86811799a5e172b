//! Connection group entity

use guacamole::{GroupRequest, GroupType, TreeNode};

use super::{Attributes, ParentRef, field_changes};

/// A folder or load-balancing group of connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionGroup {
    pub name: String,
    pub parent: ParentRef,
    pub identifier: Option<String>,
    pub group_type: GroupType,
    pub attributes: Attributes,
}

impl ConnectionGroup {
    pub fn new(name: impl Into<String>, parent: ParentRef) -> Self {
        Self {
            name: name.into(),
            parent,
            identifier: None,
            group_type: GroupType::Organizational,
            attributes: Attributes::new(),
        }
    }

    pub fn with_type(mut self, group_type: GroupType) -> Self {
        self.group_type = group_type;
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Build from a tree node whose children were already stripped
    pub fn from_node(node: &TreeNode, enclosing: Option<&str>) -> Self {
        Self {
            name: node.name.clone(),
            parent: ParentRef::from_backend(node.parent_identifier.as_deref().or(enclosing)),
            identifier: node.identifier.clone(),
            group_type: node.group_type.unwrap_or_default(),
            attributes: Attributes::from_wire(&node.attributes),
        }
    }

    /// Request body, or `None` while the parent is an unresolved name
    pub fn to_request(&self) -> Option<GroupRequest> {
        Some(GroupRequest {
            parent_identifier: self.parent.identifier()?.to_string(),
            name: self.name.clone(),
            group_type: self.group_type,
            attributes: self.attributes.to_wire(),
        })
    }

    pub fn same_as(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parent == other.parent
            && self.group_type == other.group_type
            && self.attributes == other.attributes
    }

    pub(super) fn changes_from(&self, current: &Self) -> String {
        field_changes(
            &[("type", self.group_type != current.group_type)],
            &[("attributes", &self.attributes, &current.attributes)],
        )
    }
}
