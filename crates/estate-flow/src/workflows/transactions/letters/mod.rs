//! Offer and allocation letters. The two families are exactly symmetric,
//! so one service handles both, discriminated by `LetterKind`.

pub mod domain;
pub mod service;

pub use domain::{Letter, LetterDecision, LetterKind, LetterStatus};
pub use service::{LetterError, LetterService};
