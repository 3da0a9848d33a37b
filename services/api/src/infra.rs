use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use estate_flow::workflows::transactions::{
    DispatchError, Letter, LetterId, LetterKind, LetterStore, NotificationMessage,
    NotificationPublisher, PaymentPlan, PlanId, PlanStore, PropertyKind, PropertyRecord,
    PropertyRef, PropertyRegistry, PropertyState, PropertyStatus, RegistryError, Reservation,
    ReservationId, ReservationStore, Sale, SaleId, SaleStatus, SaleStore, StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local property registry. Production deployments speak to the
/// registry service instead; the trait seam is the same either way.
#[derive(Default)]
pub(crate) struct InMemoryPropertyRegistry {
    records: Mutex<HashMap<PropertyRef, PropertyRecord>>,
}

impl InMemoryPropertyRegistry {
    pub(crate) fn seed(&self, record: PropertyRecord) {
        self.records
            .lock()
            .expect("registry mutex poisoned")
            .insert(record.reference.clone(), record);
    }
}

impl PropertyRegistry for InMemoryPropertyRegistry {
    fn fetch(&self, reference: &PropertyRef) -> Result<Option<PropertyRecord>, RegistryError> {
        Ok(self
            .records
            .lock()
            .expect("registry mutex poisoned")
            .get(reference)
            .cloned())
    }

    fn transition(
        &self,
        reference: &PropertyRef,
        expected: &PropertyState,
        next: PropertyState,
    ) -> Result<PropertyRecord, RegistryError> {
        let mut guard = self.records.lock().expect("registry mutex poisoned");
        let record = guard.get_mut(reference).ok_or(RegistryError::NotFound)?;
        if record.status != expected.status || record.hold != expected.hold {
            return Err(RegistryError::Conflict {
                actual: record.status,
            });
        }
        record.status = next.status;
        record.hold = next.hold;
        Ok(record.clone())
    }
}

/// A handful of units so `serve` and `demo` have something to sell.
pub(crate) fn seed_demo_properties(registry: &InMemoryPropertyRegistry) {
    let units = [
        (PropertyKind::House, "H-12", "B4", "12"),
        (PropertyKind::House, "H-30", "E2", "30"),
        (PropertyKind::Plot, "P-7", "C1", "7"),
        (PropertyKind::Plot, "P-9", "C2", "9"),
    ];
    for (kind, id, block, unit) in units {
        registry.seed(PropertyRecord {
            reference: PropertyRef {
                id: id.to_string(),
                kind,
            },
            block: block.to_string(),
            unit_number: unit.to_string(),
            status: PropertyStatus::Available,
            hold: None,
        });
    }
}

#[derive(Default)]
pub(crate) struct InMemoryReservationStore {
    rows: Mutex<HashMap<ReservationId, Reservation>>,
}

impl ReservationStore for InMemoryReservationStore {
    fn insert_active(&self, reservation: Reservation) -> Result<Reservation, StoreError> {
        let mut guard = self.rows.lock().expect("reservation mutex poisoned");
        if guard
            .values()
            .any(|row| row.property == reservation.property)
        {
            return Err(StoreError::Conflict);
        }
        guard.insert(reservation.id.clone(), reservation.clone());
        Ok(reservation)
    }

    fn update(&self, reservation: Reservation) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().expect("reservation mutex poisoned");
        if guard.contains_key(&reservation.id) {
            guard.insert(reservation.id.clone(), reservation);
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn fetch(&self, id: &ReservationId) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("reservation mutex poisoned")
            .get(id)
            .cloned())
    }

    fn find_active_by_property(
        &self,
        reference: &PropertyRef,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("reservation mutex poisoned")
            .values()
            .find(|row| &row.property == reference)
            .cloned())
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("reservation mutex poisoned")
            .values()
            .find(|row| row.code.as_str() == code)
            .cloned())
    }

    fn delete(&self, id: &ReservationId) -> Result<(), StoreError> {
        self.rows
            .lock()
            .expect("reservation mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(crate) struct InMemorySaleStore {
    rows: Mutex<HashMap<SaleId, Sale>>,
}

impl SaleStore for InMemorySaleStore {
    fn insert_active(&self, sale: Sale) -> Result<Sale, StoreError> {
        let mut guard = self.rows.lock().expect("sale mutex poisoned");
        if guard
            .values()
            .any(|row| row.property == sale.property && row.status != SaleStatus::Declined)
        {
            return Err(StoreError::Conflict);
        }
        guard.insert(sale.id.clone(), sale.clone());
        Ok(sale)
    }

    fn update(&self, sale: Sale) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().expect("sale mutex poisoned");
        if guard.contains_key(&sale.id) {
            guard.insert(sale.id.clone(), sale);
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn fetch(&self, id: &SaleId) -> Result<Option<Sale>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("sale mutex poisoned")
            .get(id)
            .cloned())
    }

    fn delete(&self, id: &SaleId) -> Result<(), StoreError> {
        self.rows
            .lock()
            .expect("sale mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(crate) struct InMemoryLetterStore {
    rows: Mutex<HashMap<LetterId, Letter>>,
}

impl LetterStore for InMemoryLetterStore {
    fn insert(&self, letter: Letter) -> Result<Letter, StoreError> {
        let mut guard = self.rows.lock().expect("letter mutex poisoned");
        if guard
            .values()
            .any(|row| row.sale_id == letter.sale_id && row.kind == letter.kind)
        {
            return Err(StoreError::Conflict);
        }
        guard.insert(letter.id.clone(), letter.clone());
        Ok(letter)
    }

    fn update(&self, letter: Letter) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().expect("letter mutex poisoned");
        if guard.contains_key(&letter.id) {
            guard.insert(letter.id.clone(), letter);
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn fetch(&self, id: &LetterId) -> Result<Option<Letter>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("letter mutex poisoned")
            .get(id)
            .cloned())
    }

    fn find_by_sale(
        &self,
        sale_id: &SaleId,
        kind: LetterKind,
    ) -> Result<Option<Letter>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("letter mutex poisoned")
            .values()
            .find(|row| &row.sale_id == sale_id && row.kind == kind)
            .cloned())
    }

    fn delete(&self, id: &LetterId) -> Result<(), StoreError> {
        self.rows
            .lock()
            .expect("letter mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(crate) struct InMemoryPlanStore {
    rows: Mutex<HashMap<PlanId, PaymentPlan>>,
}

impl PlanStore for InMemoryPlanStore {
    fn insert(&self, plan: PaymentPlan) -> Result<PaymentPlan, StoreError> {
        self.rows
            .lock()
            .expect("plan mutex poisoned")
            .insert(plan.id.clone(), plan.clone());
        Ok(plan)
    }

    fn update(&self, plan: PaymentPlan) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().expect("plan mutex poisoned");
        if guard.contains_key(&plan.id) {
            guard.insert(plan.id.clone(), plan);
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    fn fetch(&self, id: &PlanId) -> Result<Option<PaymentPlan>, StoreError> {
        Ok(self
            .rows
            .lock()
            .expect("plan mutex poisoned")
            .get(id)
            .cloned())
    }

    fn delete(&self, id: &PlanId) -> Result<(), StoreError> {
        self.rows
            .lock()
            .expect("plan mutex poisoned")
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

/// Dispatcher adapter that hands messages to the log pipeline. The real
/// deployment publishes to the notification service queue.
#[derive(Default)]
pub(crate) struct LogNotificationPublisher;

impl NotificationPublisher for LogNotificationPublisher {
    fn publish(&self, message: NotificationMessage) -> Result<(), DispatchError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            category = ?message.category,
            "notification queued"
        );
        Ok(())
    }
}
