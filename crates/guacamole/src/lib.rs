//! # guacamole
//!
//! Blocking client for the Apache Guacamole REST API.
//!
//! This crate provides:
//! - The [`Backend`] trait, one method per API round trip
//! - [`HttpBackend`], the implementation for a live server
//! - [`MockBackend`], an in-memory server that records every write
//! - Wire types for connection trees, groups, connections, sharing
//!   profiles, users and permissions
//!
//! ## Example
//!
//! ```no_run
//! use guacamole::{Backend, HttpBackend, ROOT_IDENTIFIER};
//!
//! let backend = HttpBackend::new("https://guac.example.org/guacamole", "postgresql", "TOKEN");
//!
//! for user in backend.list_users().unwrap() {
//!     println!("{}", user.username);
//! }
//!
//! let tree = backend.detail_tree(ROOT_IDENTIFIER).unwrap();
//! for group in &tree.child_connection_groups {
//!     println!("{} ({:?})", group.name, group.identifier);
//! }
//! ```
//!
//! Authentication is not handled here: the caller supplies a token obtained
//! elsewhere.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
#[allow(missing_docs)]
pub mod types;

pub use backend::http::HttpBackend;
pub use backend::{Backend, Call, CallKind, MockBackend};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    ConnectionRecord, ConnectionRequest, GroupRecord, GroupRequest, GroupType, PatchOp,
    PermissionKind, PermissionPatch, PermissionRecord, ROOT_IDENTIFIER, SharingProfileRequest,
    TreeNode, UserRecord, UserRequest, WireMap,
};
