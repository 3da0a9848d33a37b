//! Installment payment plans attached to approved sales.

pub mod domain;
pub mod service;

pub use domain::{PaymentPlan, PlanFrequency, PlanStatus};
pub use service::{CreatePlanRequest, PlanError, PlanService};
