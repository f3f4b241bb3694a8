//! Per-request matching orchestration.
//!
//! One call answers one rider: splice into a planned trip, start a new trip
//! on an idle vehicle, or reject. The engine is a pure function of the
//! snapshot, the config and the routing answers; the caller commits the
//! returned plan (or doesn't) on its own authority.
//!
//! Two concurrent callers could both receive a feasible result for the same
//! seat before either commits. A deployment serving concurrent requests must
//! serialize its read-snapshot, match, commit sequence per fleet; the engine
//! itself holds no locks and keeps no state between calls.

use serde_json::json;

use crate::config::{MatchingConfig, TRIP_PRUNE_WINDOW_MS};
use crate::diagnostics::{DiagnosticCategory, DiagnosticSink};
use crate::fleet::{BookingRequest, FleetSnapshot, StopIdSource, TripStatus};
use crate::routing::RouteProvider;

use super::availability::VehicleAvailabilityResolver;
use super::insertion::{new_trip_plan, InsertionEvaluator};
use super::types::{AvailabilityOutcome, InsertionCandidate, MatchResult, RejectionReason};

pub struct MatchingEngine<'a> {
    router: &'a dyn RouteProvider,
    config: &'a MatchingConfig,
}

impl<'a> MatchingEngine<'a> {
    pub fn new(router: &'a dyn RouteProvider, config: &'a MatchingConfig) -> Self {
        Self { router, config }
    }

    /// Decide how to serve `request` against the given fleet snapshot.
    ///
    /// Searches every temporally plausible planned trip for the first
    /// feasible insertion position pair, ranks the per-trip survivors by how
    /// many confirmed passengers they already carry, and falls back to the
    /// fleet availability search when no trip can absorb the rider.
    pub fn find_match(
        &self,
        request: &BookingRequest,
        snapshot: &FleetSnapshot,
        ids: &mut dyn StopIdSource,
        diag: &mut dyn DiagnosticSink,
    ) -> MatchResult {
        diag.record(
            DiagnosticCategory::Api,
            "match_requested",
            json!({
                "requested_pickup_ms": request.requested_pickup_ms,
                "passengers": request.passengers,
            }),
        );

        let candidates = self.collect_pool_candidates(request, snapshot, ids, diag);
        if let Some(best) = pick_best(candidates) {
            diag.record(
                DiagnosticCategory::Booking,
                "pool_match",
                json!({ "trip": best.trip.0, "vehicle": best.vehicle.0, "score": best.score }),
            );
            return MatchResult::Pool {
                trip: best.trip,
                vehicle: best.vehicle,
                pickup_ms: best.pickup_ms,
                dropoff_ms: best.dropoff_ms,
                duration_secs: best.duration_secs,
                path: best.path,
                stops: best.stops,
            };
        }

        // No trip can absorb the rider; try a fresh trip on an idle vehicle.
        let Some(direct) = self
            .router
            .route(&[request.pickup.point, request.dropoff.point])
        else {
            diag.record(
                DiagnosticCategory::Algorithm,
                "direct_route_unavailable",
                json!({}),
            );
            return MatchResult::Rejected {
                reason: RejectionReason::RouteUnavailable,
                earliest_available_ms: None,
            };
        };

        let resolver = VehicleAvailabilityResolver::new(self.router, self.config);
        match resolver.find_vehicle(
            request.requested_pickup_ms,
            direct.duration_ms(),
            request.pickup.point,
            snapshot,
            diag,
        ) {
            AvailabilityOutcome::Available(vehicle) => {
                let (stops, dropoff_ms) = new_trip_plan(
                    request,
                    request.requested_pickup_ms,
                    direct.duration_ms(),
                    self.config.stop_service_ms(),
                    ids,
                );
                diag.record(
                    DiagnosticCategory::Trip,
                    "new_trip_match",
                    json!({ "vehicle": vehicle.0, "dropoff_ms": dropoff_ms }),
                );
                MatchResult::NewTrip {
                    vehicle,
                    pickup_ms: request.requested_pickup_ms,
                    dropoff_ms,
                    duration_secs: direct.duration_secs,
                    path: direct.path,
                    stops,
                }
            }
            AvailabilityOutcome::Unavailable { earliest_ready_ms } => {
                diag.record(
                    DiagnosticCategory::Booking,
                    "request_rejected",
                    json!({ "earliest_ready_ms": earliest_ready_ms }),
                );
                MatchResult::Rejected {
                    reason: RejectionReason::NoVehicleAvailable,
                    earliest_available_ms: earliest_ready_ms,
                }
            }
        }
    }

    /// First feasible insertion per temporally plausible planned trip.
    fn collect_pool_candidates(
        &self,
        request: &BookingRequest,
        snapshot: &FleetSnapshot,
        ids: &mut dyn StopIdSource,
        diag: &mut dyn DiagnosticSink,
    ) -> Vec<InsertionCandidate> {
        let evaluator = InsertionEvaluator::new(self.router, self.config);
        let mut candidates = Vec::new();

        for trip in snapshot.trips.iter().filter(|t| t.status == TripStatus::Planned) {
            // Coarse temporal prune before any routing work.
            if trip.departure_ms > request.requested_pickup_ms + TRIP_PRUNE_WINDOW_MS {
                diag.record(
                    DiagnosticCategory::Algorithm,
                    "trip_skipped",
                    json!({ "trip": trip.id.0, "why": "departs_too_late" }),
                );
                continue;
            }
            if trip.last_stop_ms() < request.requested_pickup_ms.saturating_sub(TRIP_PRUNE_WINDOW_MS)
            {
                diag.record(
                    DiagnosticCategory::Algorithm,
                    "trip_skipped",
                    json!({ "trip": trip.id.0, "why": "ends_too_early" }),
                );
                continue;
            }
            let Some(vehicle) = snapshot.vehicle(trip.vehicle) else {
                diag.record(
                    DiagnosticCategory::Algorithm,
                    "trip_skipped",
                    json!({ "trip": trip.id.0, "why": "vehicle_missing" }),
                );
                continue;
            };

            let bookings = snapshot.confirmed_bookings_for_trip(trip.id);

            // Fixed scan order; the first feasible pair wins for this trip.
            'positions: for pickup_pos in 0..=trip.stops.len() {
                for dropoff_pos in (pickup_pos + 1)..=(trip.stops.len() + 1) {
                    match evaluator.evaluate(
                        trip,
                        vehicle,
                        &bookings,
                        request,
                        pickup_pos,
                        dropoff_pos,
                        ids,
                    ) {
                        Ok(candidate) => {
                            diag.record(
                                DiagnosticCategory::Algorithm,
                                "insertion_accepted",
                                json!({
                                    "trip": trip.id.0,
                                    "pickup_pos": pickup_pos,
                                    "dropoff_pos": dropoff_pos,
                                    "score": candidate.score,
                                }),
                            );
                            candidates.push(candidate);
                            break 'positions;
                        }
                        Err(rejection) => {
                            diag.record(
                                DiagnosticCategory::Algorithm,
                                "insertion_rejected",
                                json!({
                                    "trip": trip.id.0,
                                    "pickup_pos": pickup_pos,
                                    "dropoff_pos": dropoff_pos,
                                    "rejection": rejection,
                                }),
                            );
                        }
                    }
                }
            }
        }
        candidates
    }
}

/// Fullest trip first; earlier snapshot position breaks ties so the result
/// never depends on evaluation completion order.
fn pick_best(candidates: Vec<InsertionCandidate>) -> Option<InsertionCandidate> {
    let mut best: Option<InsertionCandidate> = None;
    for candidate in candidates {
        match &best {
            Some(current) if candidate.score <= current.score => {}
            _ => best = Some(candidate),
        }
    }
    best
}
