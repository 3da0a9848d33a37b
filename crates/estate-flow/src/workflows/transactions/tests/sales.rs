use super::common::*;
use crate::workflows::transactions::domain::{HoldRef, PropertyRef, PropertyStatus};
use crate::workflows::transactions::registry::PropertyState;
use crate::workflows::transactions::reservations::ReserveRequest;
use crate::workflows::transactions::sales::{
    ApprovalTerms, CreateSaleRequest, FeeAmounts, PaymentInput, PaymentMethod, PaymentStatus,
    PaymentTarget, SaleError, SaleStatus,
};

fn sale_request(property: &PropertyRef) -> CreateSaleRequest {
    CreateSaleRequest {
        property: property.clone(),
        client: client_a(),
        company_name: None,
        property_price: 5_000_000,
        fees: FeeAmounts {
            facility: 200_000,
            ..FeeAmounts::default()
        },
        discount: 100_000,
        registration_fee: 50_000,
        reservation_code: None,
    }
}

fn payment(amount: u64, target: PaymentTarget) -> PaymentInput {
    PaymentInput {
        amount,
        method: PaymentMethod::BankTransfer,
        reference: format!("TRX-{amount}"),
        target,
    }
}

#[test]
fn direct_sale_computes_payable_and_claims_the_unit() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));

    let sale = engine
        .sales
        .create(sale_request(&property), &front_desk())
        .expect("sale created");

    assert_eq!(sale.total_payable, 5_100_000);
    assert_eq!(sale.status, SaleStatus::Pending);
    assert_eq!(sale.payment_status, PaymentStatus::Unpaid);
    assert_eq!(sale.registration.amount, 50_000);
    assert!(sale.reservation_id.is_none());

    let state = engine.registry.state_of(&property).expect("seeded");
    assert_eq!(state.status, PropertyStatus::Reserved);
    assert_eq!(state.hold, Some(HoldRef::Sale(sale.id.clone())));
}

#[test]
fn sale_from_reservation_transfers_the_hold() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));

    let reservation = engine
        .reservations
        .reserve(
            ReserveRequest {
                property: property.clone(),
                client: client_a(),
            },
            &manager(),
        )
        .expect("reservation succeeds");

    let mut request = sale_request(&property);
    request.reservation_code = Some(reservation.code.as_str().to_string());
    let sale = engine
        .sales
        .create(request, &front_desk())
        .expect("sale created from reservation");

    assert_eq!(sale.reservation_id, Some(reservation.id.clone()));
    let state = engine.registry.state_of(&property).expect("seeded");
    assert_eq!(state.status, PropertyStatus::Reserved);
    assert_eq!(state.hold, Some(HoldRef::Sale(sale.id.clone())));
}

#[test]
fn sale_rejects_an_unknown_reservation_code() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));

    let mut request = sale_request(&property);
    request.reservation_code = Some("123456".to_string());
    match engine.sales.create(request, &front_desk()) {
        Err(SaleError::InvalidReservationCode) => {}
        other => panic!("expected invalid-code error, got {other:?}"),
    }
}

#[test]
fn sale_rejects_a_code_bound_to_another_property() {
    let engine = engine();
    let house_ref = house("H-12");
    let plot_ref = plot("P-7");
    engine.registry.seed(available_record(&house_ref, "B4", "12"));
    engine.registry.seed(available_record(&plot_ref, "C1", "7"));

    let reservation = engine
        .reservations
        .reserve(
            ReserveRequest {
                property: plot_ref,
                client: client_a(),
            },
            &manager(),
        )
        .expect("reservation succeeds");

    let mut request = sale_request(&house_ref);
    request.reservation_code = Some(reservation.code.as_str().to_string());
    match engine.sales.create(request, &front_desk()) {
        Err(SaleError::ReservationPropertyMismatch) => {}
        other => panic!("expected property-mismatch error, got {other:?}"),
    }
}

#[test]
fn sale_rejects_an_unreviewed_client_reservation() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));

    let reservation = engine
        .reservations
        .reserve(
            ReserveRequest {
                property: property.clone(),
                client: client_a(),
            },
            &walk_in(),
        )
        .expect("pending reservation");

    let mut request = sale_request(&property);
    request.reservation_code = Some(reservation.code.as_str().to_string());
    match engine.sales.create(request, &front_desk()) {
        Err(SaleError::ReservationNotConfirmed { .. }) => {}
        other => panic!("expected not-confirmed error, got {other:?}"),
    }
}

#[test]
fn direct_sale_requires_an_available_unit() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));

    engine
        .reservations
        .reserve(
            ReserveRequest {
                property: property.clone(),
                client: client_b(),
            },
            &manager(),
        )
        .expect("hold placed");

    match engine.sales.create(sale_request(&property), &front_desk()) {
        Err(SaleError::PropertyNotAvailable {
            status: PropertyStatus::Reserved,
        }) => {}
        other => panic!("expected not-available error, got {other:?}"),
    }
}

#[test]
fn approval_applies_overrides_and_marks_sold() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));

    let sale = engine
        .sales
        .create(sale_request(&property), &front_desk())
        .expect("sale created");

    let approved = engine
        .sales
        .approve(
            &sale.id,
            ApprovalTerms {
                discount: Some(200_000),
                opening_payment: Some(1_000_000),
                ..ApprovalTerms::default()
            },
            &manager(),
        )
        .expect("approval succeeds");

    assert_eq!(approved.status, SaleStatus::Approved);
    assert_eq!(approved.total_payable, 5_000_000);
    assert_eq!(approved.paid_amount, 1_000_000);
    assert_eq!(approved.payment_status, PaymentStatus::Partial);
    assert_eq!(approved.audit.len(), 2);

    let state = engine.registry.state_of(&property).expect("seeded");
    assert_eq!(state.status, PropertyStatus::Sold);
    assert_eq!(state.hold, Some(HoldRef::Sale(sale.id.clone())));
}

#[test]
fn approval_is_staff_only_and_single_shot() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));
    let sale = engine
        .sales
        .create(sale_request(&property), &front_desk())
        .expect("sale created");

    match engine
        .sales
        .approve(&sale.id, ApprovalTerms::default(), &front_desk())
    {
        Err(SaleError::PermissionDenied { .. }) => {}
        other => panic!("expected permission error, got {other:?}"),
    }

    engine
        .sales
        .approve(&sale.id, ApprovalTerms::default(), &manager())
        .expect("approval succeeds");
    match engine
        .sales
        .approve(&sale.id, ApprovalTerms::default(), &manager())
    {
        Err(SaleError::AlreadyDecided {
            status: SaleStatus::Approved,
        }) => {}
        other => panic!("expected already-decided error, got {other:?}"),
    }
}

#[test]
fn decline_releases_the_unit() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));
    let sale = engine
        .sales
        .create(sale_request(&property), &front_desk())
        .expect("sale created");

    let declined = engine
        .sales
        .decline(&sale.id, "incomplete documentation", &manager())
        .expect("decline succeeds");

    assert_eq!(declined.status, SaleStatus::Declined);
    assert_eq!(
        engine.registry.state_of(&property).expect("seeded"),
        PropertyState::available()
    );

    // Terminal: the unit can be sold to someone else afterwards.
    let mut request = sale_request(&property);
    request.client = client_b();
    engine
        .sales
        .create(request, &front_desk())
        .expect("new sale after decline");
}

#[test]
fn payments_walk_unpaid_partial_paid() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));
    let sale = engine
        .sales
        .create(sale_request(&property), &front_desk())
        .expect("sale created");
    engine
        .sales
        .approve(&sale.id, ApprovalTerms::default(), &manager())
        .expect("approval succeeds");

    let after_first = engine
        .sales
        .record_payment(
            &sale.id,
            payment(4_900_000, PaymentTarget::PropertyPrice),
            &front_desk(),
        )
        .expect("payment recorded");
    assert_eq!(after_first.payment_status, PaymentStatus::Partial);
    assert_eq!(after_first.outstanding(), 200_000);

    let after_fee = engine
        .sales
        .record_payment(
            &sale.id,
            payment(200_000, PaymentTarget::Facility),
            &front_desk(),
        )
        .expect("fee payment recorded");
    assert_eq!(after_fee.payment_status, PaymentStatus::Paid);
    assert_eq!(after_fee.fees.facility.paid, 200_000);
    assert!(after_fee.fees.facility.is_settled());
    assert_eq!(after_fee.paid_amount, after_fee.total_payable);
}

#[test]
fn overpayment_is_rejected_everywhere() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));
    let sale = engine
        .sales
        .create(sale_request(&property), &front_desk())
        .expect("sale created");
    engine
        .sales
        .approve(&sale.id, ApprovalTerms::default(), &manager())
        .expect("approval succeeds");

    match engine.sales.record_payment(
        &sale.id,
        payment(5_100_001, PaymentTarget::PropertyPrice),
        &front_desk(),
    ) {
        Err(SaleError::PaymentExceedsPayable { outstanding }) => {
            assert_eq!(outstanding, 5_100_000)
        }
        other => panic!("expected exceeds-payable error, got {other:?}"),
    }

    match engine.sales.record_payment(
        &sale.id,
        payment(200_001, PaymentTarget::Facility),
        &front_desk(),
    ) {
        Err(SaleError::PaymentExceedsBucket { outstanding, .. }) => {
            assert_eq!(outstanding, 200_000)
        }
        other => panic!("expected exceeds-bucket error, got {other:?}"),
    }
}

#[test]
fn payments_require_an_approved_sale() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));
    let sale = engine
        .sales
        .create(sale_request(&property), &front_desk())
        .expect("sale created");

    match engine.sales.record_payment(
        &sale.id,
        payment(1_000, PaymentTarget::PropertyPrice),
        &front_desk(),
    ) {
        Err(SaleError::SaleNotApproved {
            status: SaleStatus::Pending,
        }) => {}
        other => panic!("expected not-approved error, got {other:?}"),
    }

    match engine.sales.record_payment(
        &crate::workflows::transactions::domain::SaleId("sale-999999".to_string()),
        payment(1_000, PaymentTarget::PropertyPrice),
        &front_desk(),
    ) {
        Err(SaleError::SaleNotAvailable) => {}
        other => panic!("expected not-available error, got {other:?}"),
    }
}

#[test]
fn registration_settles_beside_the_payable_sum() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));
    let sale = engine
        .sales
        .create(sale_request(&property), &front_desk())
        .expect("sale created");
    engine
        .sales
        .approve(&sale.id, ApprovalTerms::default(), &manager())
        .expect("approval succeeds");

    let updated = engine
        .sales
        .record_payment(
            &sale.id,
            payment(50_000, PaymentTarget::Registration),
            &front_desk(),
        )
        .expect("registration payment recorded");

    assert_eq!(updated.registration.paid, 50_000);
    assert!(updated.registration.is_settled());
    assert_eq!(updated.paid_amount, 0);
    assert_eq!(updated.payment_status, PaymentStatus::Unpaid);
}

#[test]
fn discount_larger_than_price_plus_fees_is_invalid() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));

    let mut request = sale_request(&property);
    request.discount = 5_200_001;
    match engine.sales.create(request, &front_desk()) {
        Err(SaleError::InvalidDiscount) => {}
        other => panic!("expected invalid-discount error, got {other:?}"),
    }
}

#[test]
fn every_mutation_appends_audit_history() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));
    let sale = engine
        .sales
        .create(sale_request(&property), &front_desk())
        .expect("sale created");
    assert_eq!(sale.audit.len(), 1);

    let approved = engine
        .sales
        .approve(&sale.id, ApprovalTerms::default(), &manager())
        .expect("approval succeeds");
    assert_eq!(approved.audit.len(), 2);

    let paid = engine
        .sales
        .record_payment(
            &sale.id,
            payment(1_000, PaymentTarget::PropertyPrice),
            &front_desk(),
        )
        .expect("payment recorded");
    assert_eq!(paid.audit.len(), 3);
    assert_eq!(paid.audit.entries()[2].changed.get("amount"), Some(&"1000".to_string()));
}
