use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mutations that emit an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CreateEntity,
    UpdateEntity,
    DeleteEntity,
    CreateBinary,
    DeleteBinary,
    DeleteMetadata,
    CreateIdentifier,
    DeleteIdentifier,
    CreateRelation,
    PublishEntity,
}

/// Best-effort record of a successful mutation. Emitted after the mutation
/// commits; never part of the versioning protocol's atomicity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub entity_id: String,
    pub agent: String,
    pub action: AuditAction,
    pub utc_timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(entity_id: impl Into<String>, agent: impl Into<String>, action: AuditAction) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            entity_id: entity_id.into(),
            agent: agent.into(),
            action,
            utc_timestamp: Utc::now(),
        }
    }
}
