use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Actor, ActorRole};

/// Action classes recorded in an entity's audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StatusChanged,
    Updated,
    PaymentRecorded,
    CycleRecorded,
    Cancelled,
}

/// Snapshot of who performed an audited action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditActor {
    pub id: String,
    pub name: String,
    pub role: ActorRole,
}

impl From<&Actor> for AuditActor {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id.clone(),
            name: actor.name.clone(),
            role: actor.role,
        }
    }
}

/// One audit event: the fields that changed, keyed by field name, plus the
/// action class, the acting user, and the moment it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u32,
    pub action: AuditAction,
    pub changed: BTreeMap<String, String>,
    pub actor: AuditActor,
    pub at: DateTime<Utc>,
}

/// Append-only audit log owned by an entity. Entries are extended, never
/// rewritten; `seq` is assigned from the current length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn record(
        &mut self,
        action: AuditAction,
        changed: BTreeMap<String, String>,
        actor: &Actor,
    ) {
        let seq = self.entries.len() as u32 + 1;
        self.entries.push(AuditEntry {
            seq,
            action,
            changed,
            actor: AuditActor::from(actor),
            at: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shorthand for building the `changed` map of an audit entry.
pub(crate) fn changed_fields<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
