use super::domain::{HoldRef, PropertyRecord, PropertyRef, PropertyStatus};

/// Snapshot of the `(status, hold)` pair used as a compare-and-swap witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyState {
    pub status: PropertyStatus,
    pub hold: Option<HoldRef>,
}

impl PropertyState {
    pub fn available() -> Self {
        Self {
            status: PropertyStatus::Available,
            hold: None,
        }
    }

    pub fn held(status: PropertyStatus, hold: HoldRef) -> Self {
        Self {
            status,
            hold: Some(hold),
        }
    }
}

impl From<&PropertyRecord> for PropertyState {
    fn from(record: &PropertyRecord) -> Self {
        Self {
            status: record.status,
            hold: record.hold.clone(),
        }
    }
}

/// External collaborator owning unit availability.
///
/// `transition` must behave as a serializable compare-and-swap: the write
/// succeeds only when the stored `(status, hold)` pair equals `expected`
/// exactly, otherwise `RegistryError::Conflict` is returned with the state
/// that was actually found. This is the contention point for concurrent
/// requests targeting the same property.
pub trait PropertyRegistry: Send + Sync {
    fn fetch(&self, reference: &PropertyRef) -> Result<Option<PropertyRecord>, RegistryError>;

    fn transition(
        &self,
        reference: &PropertyRef,
        expected: &PropertyState,
        next: PropertyState,
    ) -> Result<PropertyRecord, RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("property not found in registry")]
    NotFound,
    #[error("property state changed concurrently (now {actual:?})")]
    Conflict { actual: PropertyStatus },
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}
