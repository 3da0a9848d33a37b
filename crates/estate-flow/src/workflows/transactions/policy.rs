use super::domain::ActorRole;

/// Engine operations gated by the role policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ReserveProperty,
    ReviewReservation,
    CancelReservation,
    ValidateReservation,
    CreateSale,
    ApproveSale,
    DeclineSale,
    RecordSalePayment,
    IssueOffer,
    ReviewOffer,
    DeleteOffer,
    IssueAllocation,
    ReviewAllocation,
    DeleteAllocation,
    CreatePaymentPlan,
    RecordPlanCycle,
    CancelPaymentPlan,
}

const STAFF: &[ActorRole] = &[ActorRole::SuperAdmin, ActorRole::Admin, ActorRole::Manager];

const DESK: &[ActorRole] = &[
    ActorRole::SuperAdmin,
    ActorRole::Admin,
    ActorRole::Manager,
    ActorRole::FrontDesk,
];

const EVERYONE: &[ActorRole] = &[
    ActorRole::SuperAdmin,
    ActorRole::Admin,
    ActorRole::Manager,
    ActorRole::FrontDesk,
    ActorRole::Client,
];

/// Allow-list per operation. The lists are data so the whole policy can be
/// read and audited in one place.
pub const fn allowed_roles(operation: Operation) -> &'static [ActorRole] {
    use Operation::*;

    match operation {
        ReserveProperty | CancelReservation | ValidateReservation | CreateSale => EVERYONE,
        RecordSalePayment | CreatePaymentPlan | RecordPlanCycle => DESK,
        ReviewReservation | ApproveSale | DeclineSale | IssueOffer | ReviewOffer | DeleteOffer
        | IssueAllocation | ReviewAllocation | DeleteAllocation | CancelPaymentPlan => STAFF,
    }
}

pub fn can_perform(role: ActorRole, operation: Operation) -> bool {
    allowed_roles(operation).contains(&role)
}
