//! Predictive targeting: reservation ledger plus candidate selection

pub mod coordinator;
pub mod selection;

pub use coordinator::{Reservation, TargetingCoordinator};
pub use selection::{candidates_in_range, score_candidate, select_target, Candidate};
