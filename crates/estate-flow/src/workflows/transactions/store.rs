//! Storage seams for the transaction entities.
//!
//! The uniqueness contracts documented on `insert_active`/`insert` are the
//! load-bearing part: they are what closes the check-then-act race between
//! concurrent requests targeting the same property or sale, so an
//! implementation must enforce them atomically (a unique index, a table
//! lock, a mutex over the map).

use super::domain::{LetterId, PlanId, PropertyRef, ReservationId, SaleId};
use super::letters::{Letter, LetterKind};
use super::plans::PaymentPlan;
use super::reservations::Reservation;
use super::sales::Sale;

/// Error enumeration shared by the entity stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Reservation persistence. `insert_active` must reject a second
/// non-terminal reservation for the same property with `Conflict`.
pub trait ReservationStore: Send + Sync {
    fn insert_active(&self, reservation: Reservation) -> Result<Reservation, StoreError>;
    fn update(&self, reservation: Reservation) -> Result<(), StoreError>;
    fn fetch(&self, id: &ReservationId) -> Result<Option<Reservation>, StoreError>;
    fn find_active_by_property(
        &self,
        reference: &PropertyRef,
    ) -> Result<Option<Reservation>, StoreError>;
    fn find_by_code(&self, code: &str) -> Result<Option<Reservation>, StoreError>;
    fn delete(&self, id: &ReservationId) -> Result<(), StoreError>;
}

/// Sale persistence. `insert_active` mirrors the reservation uniqueness
/// rule: at most one non-terminal sale per property.
pub trait SaleStore: Send + Sync {
    fn insert_active(&self, sale: Sale) -> Result<Sale, StoreError>;
    fn update(&self, sale: Sale) -> Result<(), StoreError>;
    fn fetch(&self, id: &SaleId) -> Result<Option<Sale>, StoreError>;
    fn delete(&self, id: &SaleId) -> Result<(), StoreError>;
}

/// Letter persistence. `insert` must reject a second letter for the same
/// `(sale, kind)` pair so issuance stays idempotent under races.
pub trait LetterStore: Send + Sync {
    fn insert(&self, letter: Letter) -> Result<Letter, StoreError>;
    fn update(&self, letter: Letter) -> Result<(), StoreError>;
    fn fetch(&self, id: &LetterId) -> Result<Option<Letter>, StoreError>;
    fn find_by_sale(&self, sale_id: &SaleId, kind: LetterKind)
        -> Result<Option<Letter>, StoreError>;
    fn delete(&self, id: &LetterId) -> Result<(), StoreError>;
}

/// Payment plan persistence.
pub trait PlanStore: Send + Sync {
    fn insert(&self, plan: PaymentPlan) -> Result<PaymentPlan, StoreError>;
    fn update(&self, plan: PaymentPlan) -> Result<(), StoreError>;
    fn fetch(&self, id: &PlanId) -> Result<Option<PaymentPlan>, StoreError>;
    fn delete(&self, id: &PlanId) -> Result<(), StoreError>;
}
