use serde::{Deserialize, Serialize};

/// Monetary amounts in the operation's minor currency unit.
pub type Money = u64;

/// Identifier wrapper for reservations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub String);

/// Identifier wrapper for sales.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaleId(pub String);

/// Identifier wrapper for offer and allocation letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LetterId(pub String);

/// Identifier wrapper for payment plans.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub String);

/// Unit classes the registry can sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    House,
    Plot,
}

impl PropertyKind {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyKind::House => "House",
            PropertyKind::Plot => "Plot",
        }
    }
}

/// Identity of a sellable unit: registry id plus unit class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyRef {
    pub id: String,
    pub kind: PropertyKind,
}

/// Availability states tracked by the property registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Available,
    Reserved,
    Sold,
    Unavailable,
}

impl PropertyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyStatus::Available => "available",
            PropertyStatus::Reserved => "reserved",
            PropertyStatus::Sold => "sold",
            PropertyStatus::Unavailable => "unavailable",
        }
    }
}

/// Back-reference to the record currently holding a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldRef {
    Reservation(ReservationId),
    Sale(SaleId),
}

/// Registry-owned record for one sellable unit. `status` must always agree
/// with `hold`: Reserved and Sold imply a holder, Available implies none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub reference: PropertyRef,
    pub block: String,
    pub unit_number: String,
    pub status: PropertyStatus,
    pub hold: Option<HoldRef>,
}

impl PropertyRecord {
    /// Human-readable unit label used in client-facing messages.
    pub fn label(&self) -> String {
        format!(
            "{} {}/{}",
            self.reference.kind.label(),
            self.block,
            self.unit_number
        )
    }
}

/// Client identity captured at the moment a reservation or sale is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    #[serde(default)]
    pub client_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl ClientSnapshot {
    /// Whether two snapshots denote the same person. Registered clients
    /// compare by id, walk-ins by contact address.
    pub fn same_client(&self, other: &ClientSnapshot) -> bool {
        match (&self.client_id, &other.client_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.email.eq_ignore_ascii_case(&other.email),
        }
    }
}

/// Roles recognised by the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    SuperAdmin,
    Admin,
    Manager,
    FrontDesk,
    Client,
}

impl ActorRole {
    pub const fn is_staff(self) -> bool {
        matches!(
            self,
            ActorRole::SuperAdmin | ActorRole::Admin | ActorRole::Manager
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::SuperAdmin => "super_admin",
            ActorRole::Admin => "admin",
            ActorRole::Manager => "manager",
            ActorRole::FrontDesk => "front_desk",
            ActorRole::Client => "client",
        }
    }
}

/// Authenticated caller identity attached to every mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: ActorRole,
}
