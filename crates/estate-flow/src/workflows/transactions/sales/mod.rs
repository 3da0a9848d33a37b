//! The central sale state machine and its fee/payment bookkeeping.

pub mod domain;
pub mod service;

pub use domain::{
    FeeAmounts, FeeLine, FeeSchedule, LetterLink, PaymentMethod, PaymentStatus, PaymentTarget,
    Sale, SaleStatus,
};
pub use service::{ApprovalTerms, CreateSaleRequest, PaymentInput, SaleError, SaleService};
