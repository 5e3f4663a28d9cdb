//! model-acl - batch editor for group read permissions on AI models
//!
//! Lists the groups and models of a self-hosted chat service (`Open WebUI`
//! and compatible), lets an operator pick some of each with range expressions
//! such as `1-3,5` or `all`, and appends or replaces the picked groups in the
//! read ACL of every picked model.

pub mod acl;
pub mod api;
pub mod config;
pub mod paths;
pub mod selection;
pub mod session;

pub use acl::{AccessControl, MergeMode, Permission, merge_group_ids};
pub use api::{AclService, ApiClient, Group, Model, UpdatePayload};
pub use config::Config;
pub use selection::{Position, Selection, SelectionError, SelectionWarning, parse_selection};
