use crate::infra::{
    seed_demo_properties, InMemoryLetterStore, InMemoryPlanStore, InMemoryPropertyRegistry,
    InMemoryReservationStore, InMemorySaleStore, LogNotificationPublisher,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use estate_flow::error::AppError;
use estate_flow::workflows::transactions::{
    Actor, ActorRole, ApprovalTerms, ClientSnapshot, CreatePlanRequest, CreateSaleRequest,
    FeeAmounts, LetterKind, LetterService, PlanFrequency, PlanService, PropertyKind, PropertyRef,
    ReservationDecision, ReservationService, ReserveRequest, SaleService,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First installment date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Skip the payment plan portion of the demo.
    #[arg(long)]
    pub(crate) skip_plan: bool,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Scripted walk through the whole engine against in-memory adapters:
/// reserve a unit, approve the hold, convert it into a sale, approve and
/// pay, issue both letters, and attach an installment plan.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let registry = Arc::new(InMemoryPropertyRegistry::default());
    seed_demo_properties(&registry);
    let reservation_rows = Arc::new(InMemoryReservationStore::default());
    let sale_rows = Arc::new(InMemorySaleStore::default());
    let letter_rows = Arc::new(InMemoryLetterStore::default());
    let plan_rows = Arc::new(InMemoryPlanStore::default());
    let notifier = Arc::new(LogNotificationPublisher);

    let reservations = ReservationService::new(
        reservation_rows.clone(),
        registry.clone(),
        notifier.clone(),
    );
    let sales = SaleService::new(
        sale_rows.clone(),
        reservation_rows,
        registry,
        notifier.clone(),
    );
    let letters = LetterService::new(letter_rows, sale_rows.clone(), notifier.clone());
    let plans = PlanService::new(plan_rows, sale_rows, notifier);

    let property = PropertyRef {
        id: "H-12".to_string(),
        kind: PropertyKind::House,
    };
    let buyer = ClientSnapshot {
        client_id: Some("cli-001".to_string()),
        name: "Adaeze Obi".to_string(),
        email: "adaeze.obi@example.com".to_string(),
        phone: "+2348010000001".to_string(),
    };
    let desk = Actor {
        id: "usr-desk".to_string(),
        name: "Front Desk".to_string(),
        role: ActorRole::FrontDesk,
    };
    let manager = Actor {
        id: "usr-mgr".to_string(),
        name: "Sales Manager".to_string(),
        role: ActorRole::Manager,
    };

    println!("== Estate transaction engine demo ==");

    let reservation = reservations
        .reserve(
            ReserveRequest {
                property: property.clone(),
                client: buyer.clone(),
            },
            &desk,
        )
        .map_err(demo_failure)?;
    println!(
        "reserved {} for {} (code {}, status {:?})",
        property.id,
        buyer.name,
        reservation.code.as_str(),
        reservation.status
    );

    reservations
        .change_status(&reservation.id, ReservationDecision::Approved, &manager)
        .map_err(demo_failure)?;
    println!("reservation {} approved", reservation.id.0);

    let sale = sales
        .create(
            CreateSaleRequest {
                property: property.clone(),
                client: buyer.clone(),
                company_name: None,
                property_price: 5_000_000,
                fees: FeeAmounts {
                    facility: 200_000,
                    ..FeeAmounts::default()
                },
                discount: 100_000,
                registration_fee: 50_000,
                reservation_code: Some(reservation.code.as_str().to_string()),
            },
            &desk,
        )
        .map_err(demo_failure)?;
    println!(
        "sale {} opened, total payable {}",
        sale.id.0, sale.total_payable
    );

    let approved = sales
        .approve(
            &sale.id,
            ApprovalTerms {
                opening_payment: Some(1_100_000),
                ..ApprovalTerms::default()
            },
            &manager,
        )
        .map_err(demo_failure)?;
    println!(
        "sale approved, paid {} of {}, unit now sold",
        approved.paid_amount, approved.total_payable
    );

    let offer = letters
        .issue(
            LetterKind::Offer,
            &sale.id,
            "s3://letters/of-h12.pdf".to_string(),
            &manager,
        )
        .map_err(demo_failure)?;
    let allocation = letters
        .issue(
            LetterKind::Allocation,
            &sale.id,
            "s3://letters/al-h12.pdf".to_string(),
            &manager,
        )
        .map_err(demo_failure)?;
    println!("letters issued: {} / {}", offer.number, allocation.number);

    if !args.skip_plan {
        let start_date = args
            .start_date
            .unwrap_or_else(|| Local::now().date_naive());
        let plan = plans
            .create(
                CreatePlanRequest {
                    sale_id: sale.id.clone(),
                    frequency: PlanFrequency::Monthly,
                    amount_per_cycle: 500_000,
                    total_cycles: 8,
                    total_amount: None,
                    start_date,
                    custom_date: None,
                },
                &desk,
            )
            .map_err(demo_failure)?;
        println!(
            "payment plan {}: {} cycles of {}, next due {}",
            plan.id.0, plan.total_cycles, plan.amount_per_cycle, plan.next_payment_date
        );
    }

    println!("== demo complete ==");
    Ok(())
}

fn demo_failure(err: impl std::fmt::Display) -> AppError {
    AppError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    ))
}
