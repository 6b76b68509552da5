use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Read/write permission scoped to a lifecycle state, separately for
/// metadata and binary content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ReadPendingMetadata,
    ReadSubmittedMetadata,
    ReadReleasedMetadata,
    ReadWithdrawnMetadata,
    WritePendingMetadata,
    WriteSubmittedMetadata,
    WriteReleasedMetadata,
    WriteWithdrawnMetadata,
    ReadPendingBinary,
    ReadSubmittedBinary,
    ReadReleasedBinary,
    ReadWithdrawnBinary,
    WritePendingBinary,
    WriteSubmittedBinary,
    WriteReleasedBinary,
    WriteWithdrawnBinary,
}

/// Per-user permission sets within a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkspacePermissions {
    #[serde(default)]
    pub permissions: BTreeMap<String, BTreeSet<Permission>>,
}

impl WorkspacePermissions {
    pub fn grant(&mut self, username: impl Into<String>, permission: Permission) {
        self.permissions
            .entry(username.into())
            .or_default()
            .insert(permission);
    }

    pub fn has(&self, username: &str, permission: Permission) -> bool {
        self.permissions
            .get(username)
            .map_or(false, |set| set.contains(&permission))
    }
}

/// A named container governing access to entities, with an independent
/// lifecycle from the entities themselves.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub permissions: WorkspacePermissions,
}

impl Workspace {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            owner: owner.into(),
            permissions: WorkspacePermissions::default(),
        }
    }
}
