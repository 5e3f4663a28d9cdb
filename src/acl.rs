//! Access control lists and the read-group merge policy

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Group and user identifiers granted one kind of access
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Groups granted this access
    #[serde(default)]
    pub group_ids: BTreeSet<String>,

    /// Individual users granted this access
    #[serde(default)]
    pub user_ids: BTreeSet<String>,
}

/// Read and write permissions of a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    /// Who may use the model
    #[serde(default)]
    pub read: Permission,

    /// Who may edit the model
    #[serde(default)]
    pub write: Permission,
}

impl AccessControl {
    /// The ACL sent on every update: only `read.group_ids` is populated.
    ///
    /// Read user ids and all write permissions are emitted empty, so an
    /// update always clears whatever the model had there before.
    #[must_use]
    pub fn read_groups_only(group_ids: BTreeSet<String>) -> Self {
        Self {
            read: Permission {
                group_ids,
                user_ids: BTreeSet::new(),
            },
            write: Permission::default(),
        }
    }

    /// Groups that currently have read access
    #[must_use]
    pub const fn read_group_ids(&self) -> &BTreeSet<String> {
        &self.read.group_ids
    }
}

/// How newly chosen groups combine with a model's existing read groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergeMode {
    /// Union the chosen groups into the existing ones
    #[default]
    Append,
    /// Discard the existing groups in favor of the chosen ones
    Replace,
}

impl MergeMode {
    /// Mode selected by the `--replace` flag
    #[must_use]
    pub const fn from_replace_flag(replace: bool) -> Self {
        if replace { Self::Replace } else { Self::Append }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Append => "Append",
            Self::Replace => "Replace",
        };
        write!(f, "{s}")
    }
}

/// Compute a model's new read groups from its current ones and the chosen ones.
///
/// `Replace` drops every current group, including groups the operator was
/// never shown. `Append` keeps them and adds the chosen ones.
#[must_use]
pub fn merge_group_ids(
    current: &BTreeSet<String>,
    chosen: &BTreeSet<String>,
    mode: MergeMode,
) -> BTreeSet<String> {
    match mode {
        MergeMode::Replace => chosen.clone(),
        MergeMode::Append => current.union(chosen).cloned().collect(),
    }
}
