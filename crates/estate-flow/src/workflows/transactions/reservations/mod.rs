//! Holds placed on a property ahead of a sale.

pub mod domain;
pub mod service;

pub use domain::{Reservation, ReservationCode, ReservationDecision, ReservationStatus};
pub use service::{ReservationError, ReservationService, ReserveRequest};
