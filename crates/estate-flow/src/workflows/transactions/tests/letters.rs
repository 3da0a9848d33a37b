use super::common::*;
use crate::workflows::transactions::domain::{LetterId, PropertyRef};
use crate::workflows::transactions::letters::{
    LetterDecision, LetterError, LetterKind, LetterStatus,
};
use crate::workflows::transactions::notify::NotificationCategory;
use crate::workflows::transactions::sales::{ApprovalTerms, CreateSaleRequest, FeeAmounts};
use crate::workflows::transactions::store::SaleStore;

fn approved_sale(engine: &Engine, property: &PropertyRef) -> crate::workflows::transactions::sales::Sale {
    engine
        .registry
        .seed(available_record(property, "B4", "12"));
    let sale = engine
        .sales
        .create(
            CreateSaleRequest {
                property: property.clone(),
                client: client_a(),
                company_name: None,
                property_price: 5_000_000,
                fees: FeeAmounts::default(),
                discount: 0,
                registration_fee: 0,
                reservation_code: None,
            },
            &front_desk(),
        )
        .expect("sale created");
    engine
        .sales
        .approve(&sale.id, ApprovalTerms::default(), &manager())
        .expect("sale approved")
}

#[test]
fn issuing_against_a_pending_sale_is_rejected() {
    let engine = engine();
    let property = house("H-12");
    engine.registry.seed(available_record(&property, "B4", "12"));
    let sale = engine
        .sales
        .create(
            CreateSaleRequest {
                property: property.clone(),
                client: client_a(),
                company_name: None,
                property_price: 5_000_000,
                fees: FeeAmounts::default(),
                discount: 0,
                registration_fee: 0,
                reservation_code: None,
            },
            &front_desk(),
        )
        .expect("sale created");

    match engine.letters.issue(
        LetterKind::Offer,
        &sale.id,
        "s3://letters/of-1.pdf".to_string(),
        &manager(),
    ) {
        Err(LetterError::PendingSale {
            kind: LetterKind::Offer,
        }) => {}
        other => panic!("expected pending-sale error, got {other:?}"),
    }
}

#[test]
fn first_issuance_creates_numbers_mirrors_and_notifies() {
    let engine = engine();
    let sale = approved_sale(&engine, &house("H-12"));
    let events_before = engine.notifier.events().len();

    let letter = engine
        .letters
        .issue(
            LetterKind::Offer,
            &sale.id,
            "s3://letters/of-1.pdf".to_string(),
            &manager(),
        )
        .expect("offer issued");

    assert!(letter.number.starts_with("OF"));
    assert_eq!(letter.number.len(), 8);
    assert_eq!(letter.status, LetterStatus::Issued);
    assert_eq!(letter.property, sale.property);

    let stored_sale = engine
        .sale_rows
        .fetch(&sale.id)
        .expect("fetch succeeds")
        .expect("sale present");
    let link = stored_sale.offer.expect("mirror link written");
    assert_eq!(link.id, letter.id);
    assert_eq!(link.status, LetterStatus::Issued);

    let events = engine.notifier.events();
    assert_eq!(events.len(), events_before + 1);
    assert_eq!(events.last().expect("event").category, NotificationCategory::Offer);
}

#[test]
fn second_issuance_updates_the_same_letter() {
    let engine = engine();
    let sale = approved_sale(&engine, &house("H-12"));

    let first = engine
        .letters
        .issue(
            LetterKind::Offer,
            &sale.id,
            "s3://letters/of-1.pdf".to_string(),
            &manager(),
        )
        .expect("offer issued");
    let events_after_first = engine.notifier.events().len();

    let second = engine
        .letters
        .issue(
            LetterKind::Offer,
            &sale.id,
            "s3://letters/of-1-rev2.pdf".to_string(),
            &manager(),
        )
        .expect("offer re-issued");

    assert_eq!(second.id, first.id);
    assert_eq!(second.number, first.number);
    assert_eq!(second.file_url, "s3://letters/of-1-rev2.pdf");
    assert_eq!(second.audit.len(), 2);
    // Only the first issuance notifies the client.
    assert_eq!(engine.notifier.events().len(), events_after_first);
}

#[test]
fn offers_and_allocations_coexist_on_one_sale() {
    let engine = engine();
    let sale = approved_sale(&engine, &house("H-12"));

    let offer = engine
        .letters
        .issue(
            LetterKind::Offer,
            &sale.id,
            "s3://letters/of-1.pdf".to_string(),
            &manager(),
        )
        .expect("offer issued");
    let allocation = engine
        .letters
        .issue(
            LetterKind::Allocation,
            &sale.id,
            "s3://letters/al-1.pdf".to_string(),
            &manager(),
        )
        .expect("allocation issued");

    assert!(allocation.number.starts_with("AL"));
    assert_ne!(offer.id, allocation.id);

    let stored_sale = engine
        .sale_rows
        .fetch(&sale.id)
        .expect("fetch succeeds")
        .expect("sale present");
    assert!(stored_sale.offer.is_some());
    assert!(stored_sale.allocation.is_some());
}

#[test]
fn cancel_decision_mirrors_onto_the_sale() {
    let engine = engine();
    let sale = approved_sale(&engine, &house("H-12"));
    let letter = engine
        .letters
        .issue(
            LetterKind::Allocation,
            &sale.id,
            "s3://letters/al-1.pdf".to_string(),
            &manager(),
        )
        .expect("allocation issued");

    let cancelled = engine
        .letters
        .change_status(
            LetterKind::Allocation,
            &letter.id,
            LetterDecision::Canceled,
            &manager(),
        )
        .expect("cancel succeeds");
    assert_eq!(cancelled.status, LetterStatus::Canceled);

    let stored_sale = engine
        .sale_rows
        .fetch(&sale.id)
        .expect("fetch succeeds")
        .expect("sale present");
    assert_eq!(
        stored_sale.allocation.expect("link present").status,
        LetterStatus::Canceled
    );

    // Approval re-issues and the mirror follows again.
    engine
        .letters
        .change_status(
            LetterKind::Allocation,
            &letter.id,
            LetterDecision::Approved,
            &manager(),
        )
        .expect("re-approval succeeds");
    let stored_sale = engine
        .sale_rows
        .fetch(&sale.id)
        .expect("fetch succeeds")
        .expect("sale present");
    assert_eq!(
        stored_sale.allocation.expect("link present").status,
        LetterStatus::Issued
    );
}

#[test]
fn kind_mismatch_reads_as_not_found() {
    let engine = engine();
    let sale = approved_sale(&engine, &house("H-12"));
    let letter = engine
        .letters
        .issue(
            LetterKind::Offer,
            &sale.id,
            "s3://letters/of-1.pdf".to_string(),
            &manager(),
        )
        .expect("offer issued");

    match engine.letters.change_status(
        LetterKind::Allocation,
        &letter.id,
        LetterDecision::Canceled,
        &manager(),
    ) {
        Err(LetterError::NotFound {
            kind: LetterKind::Allocation,
        }) => {}
        other => panic!("expected not-found error, got {other:?}"),
    }
}

#[test]
fn delete_clears_the_sale_mirror() {
    let engine = engine();
    let sale = approved_sale(&engine, &house("H-12"));
    let letter = engine
        .letters
        .issue(
            LetterKind::Offer,
            &sale.id,
            "s3://letters/of-1.pdf".to_string(),
            &manager(),
        )
        .expect("offer issued");

    engine
        .letters
        .delete(LetterKind::Offer, &letter.id, &manager())
        .expect("delete succeeds");

    use crate::workflows::transactions::store::LetterStore;
    assert!(engine
        .letter_rows
        .fetch(&letter.id)
        .expect("fetch succeeds")
        .is_none());
    let stored_sale = engine
        .sale_rows
        .fetch(&sale.id)
        .expect("fetch succeeds")
        .expect("sale present");
    assert!(stored_sale.offer.is_none());

    // A fresh issuance starts a new letter record.
    let reissued = engine
        .letters
        .issue(
            LetterKind::Offer,
            &sale.id,
            "s3://letters/of-2.pdf".to_string(),
            &manager(),
        )
        .expect("offer issued again");
    assert_ne!(reissued.id, letter.id);
}

#[test]
fn letter_operations_are_staff_only() {
    let engine = engine();
    let sale = approved_sale(&engine, &house("H-12"));

    match engine.letters.issue(
        LetterKind::Offer,
        &sale.id,
        "s3://letters/of-1.pdf".to_string(),
        &front_desk(),
    ) {
        Err(LetterError::PermissionDenied { .. }) => {}
        other => panic!("expected permission error, got {other:?}"),
    }

    match engine
        .letters
        .delete(LetterKind::Offer, &LetterId("ltr-000001".to_string()), &walk_in())
    {
        Err(LetterError::PermissionDenied { .. }) => {}
        other => panic!("expected permission error, got {other:?}"),
    }
}

#[test]
fn missing_sale_reads_as_not_available() {
    let engine = engine();
    match engine.letters.issue(
        LetterKind::Allocation,
        &crate::workflows::transactions::domain::SaleId("sale-999999".to_string()),
        "s3://letters/al-x.pdf".to_string(),
        &manager(),
    ) {
        Err(LetterError::SaleNotAvailable) => {}
        other => panic!("expected not-available error, got {other:?}"),
    }
}
