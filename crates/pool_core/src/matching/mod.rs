pub mod availability;
pub mod engine;
pub mod insertion;
pub mod types;

pub use availability::VehicleAvailabilityResolver;
pub use engine::MatchingEngine;
pub use insertion::InsertionEvaluator;
pub use types::{
    peak_onboard, AvailabilityOutcome, InsertionCandidate, InsertionRejection, MatchResult,
    PlannedStop, RejectionReason,
};
