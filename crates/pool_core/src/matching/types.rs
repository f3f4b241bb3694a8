//! Result and candidate types shared by the matching components.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fleet::{BookingId, StopId, StopKind, TimestampMs, TripId, VehicleId};
use crate::geo::Place;

/// One stop of a rebuilt visiting plan. The caller turns these into
/// persisted [`crate::fleet::TripStop`]s when it commits a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStop {
    pub id: StopId,
    pub place: Place,
    pub kind: StopKind,
    /// Booking this stop serves; `None` marks the incoming request, whose
    /// booking is only created once the caller commits.
    pub booking: Option<BookingId>,
    /// Riders boarding or alighting here.
    pub passengers: u32,
    pub scheduled_ms: TimestampMs,
    pub sequence: u32,
}

/// Why a request could not be served at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    RouteUnavailable,
    NoVehicleAvailable,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::RouteUnavailable => write!(f, "could not calculate route"),
            RejectionReason::NoVehicleAvailable => write!(f, "no vehicle available"),
        }
    }
}

/// Outcome of one matching call. The engine only computes the shape a
/// commit should take; it never mutates fleet state itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchResult {
    /// Splice the request into an existing planned trip.
    Pool {
        trip: TripId,
        vehicle: VehicleId,
        pickup_ms: TimestampMs,
        dropoff_ms: TimestampMs,
        duration_secs: f64,
        path: String,
        /// Full rebuilt visiting plan, existing stops rescheduled and the
        /// two new stops marked with `booking: None`.
        stops: Vec<PlannedStop>,
    },
    /// Start a fresh trip on an idle vehicle.
    NewTrip {
        vehicle: VehicleId,
        pickup_ms: TimestampMs,
        dropoff_ms: TimestampMs,
        duration_secs: f64,
        path: String,
        stops: Vec<PlannedStop>,
    },
    /// Nothing feasible today.
    Rejected {
        reason: RejectionReason,
        /// Earliest projected vehicle ready time, when one could be computed.
        earliest_available_ms: Option<TimestampMs>,
    },
}

impl MatchResult {
    pub fn is_rejected(&self) -> bool {
        matches!(self, MatchResult::Rejected { .. })
    }
}

/// Why one insertion position pair was turned down. Candidate-local; the
/// search simply moves on to the next pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionRejection {
    /// Routing failed or timed out for this stop order.
    RouteUnavailable,
    /// Running on-board count would exceed the vehicle's seats.
    CapacityExceeded { peak: u32, seats: u32 },
    /// An already-confirmed rider would be dropped off too late.
    ExistingDetourExceeded { booking: BookingId, delay_ms: u64 },
    /// The new rider's own dropoff drifts too far past the direct ride.
    NewRiderDetourExceeded { delay_ms: u64 },
    /// Computed pickup lands too far from the requested time.
    PickupOutsideWindow { offset_ms: i64 },
    /// The rebuilt plan contradicts the trip data; indicates a bug upstream,
    /// handled as a local failure for this pair.
    PlanInconsistent { detail: &'static str },
}

/// A feasible splice of the request into one trip, plus ranking data.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertionCandidate {
    pub trip: TripId,
    pub vehicle: VehicleId,
    pub stops: Vec<PlannedStop>,
    pub pickup_ms: TimestampMs,
    pub dropoff_ms: TimestampMs,
    pub duration_secs: f64,
    pub path: String,
    /// Confirmed passengers already on the trip before the splice; fuller
    /// trips win the cross-trip ranking.
    pub score: u32,
}

/// Outcome of the fleet availability search.
#[derive(Debug, Clone, PartialEq)]
pub enum AvailabilityOutcome {
    Available(VehicleId),
    Unavailable {
        /// Minimum projected ready time across the fleet, when computable.
        earliest_ready_ms: Option<TimestampMs>,
    },
}

/// Highest simultaneous on-board passenger count along a visiting plan.
pub fn peak_onboard(stops: &[PlannedStop]) -> u32 {
    let mut onboard: u32 = 0;
    let mut peak: u32 = 0;
    for stop in stops {
        match stop.kind {
            StopKind::Pickup => onboard += stop.passengers,
            StopKind::Dropoff => onboard = onboard.saturating_sub(stop.passengers),
        }
        peak = peak.max(onboard);
    }
    peak
}
