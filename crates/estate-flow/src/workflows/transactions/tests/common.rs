use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::workflows::transactions::domain::{
    Actor, ActorRole, ClientSnapshot, LetterId, PlanId, PropertyKind, PropertyRecord, PropertyRef,
    PropertyStatus, ReservationId, SaleId,
};
use crate::workflows::transactions::letters::{Letter, LetterKind, LetterService};
use crate::workflows::transactions::notify::{
    DispatchError, NotificationMessage, NotificationPublisher,
};
use crate::workflows::transactions::plans::{PaymentPlan, PlanService};
use crate::workflows::transactions::registry::{PropertyRegistry, PropertyState, RegistryError};
use crate::workflows::transactions::reservations::{Reservation, ReservationService};
use crate::workflows::transactions::sales::{Sale, SaleService, SaleStatus};
use crate::workflows::transactions::store::{
    LetterStore, PlanStore, ReservationStore, SaleStore, StoreError,
};

#[derive(Default)]
pub(super) struct MemoryRegistry {
    records: Mutex<HashMap<PropertyRef, PropertyRecord>>,
}

impl MemoryRegistry {
    pub(super) fn seed(&self, record: PropertyRecord) {
        self.records
            .lock()
            .expect("registry mutex poisoned")
            .insert(record.reference.clone(), record);
    }

    pub(super) fn state_of(&self, reference: &PropertyRef) -> Option<PropertyState> {
        self.records
            .lock()
            .expect("registry mutex poisoned")
            .get(reference)
            .map(PropertyState::from)
    }
}

impl PropertyRegistry for MemoryRegistry {
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

#[derive(Default)]
pub(super) struct MemoryReservations {
    rows: Mutex<HashMap<ReservationId, Reservation>>,
}

impl ReservationStore for MemoryReservations {
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
        let guard = self.rows.lock().expect("reservation mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_active_by_property(
        &self,
        reference: &PropertyRef,
    ) -> Result<Option<Reservation>, StoreError> {
        let guard = self.rows.lock().expect("reservation mutex poisoned");
        Ok(guard
            .values()
            .find(|row| &row.property == reference)
            .cloned())
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Reservation>, StoreError> {
        let guard = self.rows.lock().expect("reservation mutex poisoned");
        Ok(guard.values().find(|row| row.code.as_str() == code).cloned())
    }

    fn delete(&self, id: &ReservationId) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().expect("reservation mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(super) struct MemorySales {
    rows: Mutex<HashMap<SaleId, Sale>>,
}

impl SaleStore for MemorySales {
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
        let guard = self.rows.lock().expect("sale mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn delete(&self, id: &SaleId) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().expect("sale mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(super) struct MemoryLetters {
    rows: Mutex<HashMap<LetterId, Letter>>,
}

impl LetterStore for MemoryLetters {
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
        let guard = self.rows.lock().expect("letter mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_sale(
        &self,
        sale_id: &SaleId,
        kind: LetterKind,
    ) -> Result<Option<Letter>, StoreError> {
        let guard = self.rows.lock().expect("letter mutex poisoned");
        Ok(guard
            .values()
            .find(|row| &row.sale_id == sale_id && row.kind == kind)
            .cloned())
    }

    fn delete(&self, id: &LetterId) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().expect("letter mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(super) struct MemoryPlans {
    rows: Mutex<HashMap<PlanId, PaymentPlan>>,
}

impl PlanStore for MemoryPlans {
    fn insert(&self, plan: PaymentPlan) -> Result<PaymentPlan, StoreError> {
        let mut guard = self.rows.lock().expect("plan mutex poisoned");
        guard.insert(plan.id.clone(), plan.clone());
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
        let guard = self.rows.lock().expect("plan mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn delete(&self, id: &PlanId) -> Result<(), StoreError> {
        let mut guard = self.rows.lock().expect("plan mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<NotificationMessage>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<NotificationMessage> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, message: NotificationMessage) -> Result<(), DispatchError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(message);
        Ok(())
    }
}

/// Publisher whose transport is permanently down, for the fire-and-forget
/// contract.
pub(super) struct DownNotifier;

impl NotificationPublisher for DownNotifier {
    fn publish(&self, _message: NotificationMessage) -> Result<(), DispatchError> {
        Err(DispatchError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) struct Engine {
    pub(super) registry: Arc<MemoryRegistry>,
    pub(super) reservation_rows: Arc<MemoryReservations>,
    pub(super) sale_rows: Arc<MemorySales>,
    pub(super) letter_rows: Arc<MemoryLetters>,
    pub(super) plan_rows: Arc<MemoryPlans>,
    pub(super) notifier: Arc<MemoryNotifier>,
    pub(super) reservations: ReservationService<MemoryReservations, MemoryRegistry, MemoryNotifier>,
    pub(super) sales: SaleService<MemorySales, MemoryReservations, MemoryRegistry, MemoryNotifier>,
    pub(super) letters: LetterService<MemoryLetters, MemorySales, MemoryNotifier>,
    pub(super) plans: PlanService<MemoryPlans, MemorySales, MemoryNotifier>,
}

pub(super) fn engine() -> Engine {
    let registry = Arc::new(MemoryRegistry::default());
    let reservation_rows = Arc::new(MemoryReservations::default());
    let sale_rows = Arc::new(MemorySales::default());
    let letter_rows = Arc::new(MemoryLetters::default());
    let plan_rows = Arc::new(MemoryPlans::default());
    let notifier = Arc::new(MemoryNotifier::default());

    Engine {
        reservations: ReservationService::new(
            reservation_rows.clone(),
            registry.clone(),
            notifier.clone(),
        ),
        sales: SaleService::new(
            sale_rows.clone(),
            reservation_rows.clone(),
            registry.clone(),
            notifier.clone(),
        ),
        letters: LetterService::new(letter_rows.clone(), sale_rows.clone(), notifier.clone()),
        plans: PlanService::new(plan_rows.clone(), sale_rows.clone(), notifier.clone()),
        registry,
        reservation_rows,
        sale_rows,
        letter_rows,
        plan_rows,
        notifier,
    }
}

pub(super) fn house(id: &str) -> PropertyRef {
    PropertyRef {
        id: id.to_string(),
        kind: PropertyKind::House,
    }
}

pub(super) fn plot(id: &str) -> PropertyRef {
    PropertyRef {
        id: id.to_string(),
        kind: PropertyKind::Plot,
    }
}

pub(super) fn available_record(reference: &PropertyRef, block: &str, unit: &str) -> PropertyRecord {
    PropertyRecord {
        reference: reference.clone(),
        block: block.to_string(),
        unit_number: unit.to_string(),
        status: PropertyStatus::Available,
        hold: None,
    }
}

pub(super) fn client_a() -> ClientSnapshot {
    ClientSnapshot {
        client_id: Some("cli-001".to_string()),
        name: "Adaeze Obi".to_string(),
        email: "adaeze.obi@example.com".to_string(),
        phone: "+2348010000001".to_string(),
    }
}

pub(super) fn client_b() -> ClientSnapshot {
    ClientSnapshot {
        client_id: Some("cli-002".to_string()),
        name: "Bode Akintola".to_string(),
        email: "bode.akintola@example.com".to_string(),
        phone: "+2348010000002".to_string(),
    }
}

pub(super) fn manager() -> Actor {
    Actor {
        id: "usr-mgr".to_string(),
        name: "Sales Manager".to_string(),
        role: ActorRole::Manager,
    }
}

pub(super) fn front_desk() -> Actor {
    Actor {
        id: "usr-desk".to_string(),
        name: "Front Desk".to_string(),
        role: ActorRole::FrontDesk,
    }
}

pub(super) fn walk_in() -> Actor {
    Actor {
        id: "usr-cli".to_string(),
        name: "Adaeze Obi".to_string(),
        role: ActorRole::Client,
    }
}
