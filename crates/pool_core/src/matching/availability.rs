//! Decides whether an idle vehicle can absorb a brand-new trip at the
//! requested time, given every vehicle's other commitments.

use serde_json::json;

use crate::config::MatchingConfig;
use crate::diagnostics::{DiagnosticCategory, DiagnosticSink};
use crate::fleet::{FleetSnapshot, TimestampMs, Trip};
use crate::geo::GeoPoint;
use crate::routing::RouteProvider;

use super::types::AvailabilityOutcome;

pub struct VehicleAvailabilityResolver<'a> {
    router: &'a dyn RouteProvider,
    config: &'a MatchingConfig,
}

impl<'a> VehicleAvailabilityResolver<'a> {
    pub fn new(router: &'a dyn RouteProvider, config: &'a MatchingConfig) -> Self {
        Self { router, config }
    }

    /// Pick the first vehicle (in fleet order) that can drive a new trip of
    /// `trip_duration_ms` starting at `requested_pickup_ms` from `pickup`.
    ///
    /// When nothing fits, the outcome carries the minimum projected ready
    /// time collected across busy or too-late vehicles, when one could be
    /// computed at all.
    pub fn find_vehicle(
        &self,
        requested_pickup_ms: TimestampMs,
        trip_duration_ms: u64,
        pickup: GeoPoint,
        snapshot: &FleetSnapshot,
        diag: &mut dyn DiagnosticSink,
    ) -> AvailabilityOutcome {
        let buffer_ms = self.config.trip_buffer_ms();
        let window_end_ms = requested_pickup_ms + trip_duration_ms + self.config.stop_service_ms();
        let mut earliest_ready_ms: Option<TimestampMs> = None;
        fn track_earliest(candidate: TimestampMs, best: &mut Option<TimestampMs>) {
            *best = Some(best.map_or(candidate, |b| b.min(candidate)));
        }

        'vehicles: for vehicle in &snapshot.vehicles {
            let mut trips = snapshot.active_trips_for_vehicle(vehicle.id);
            trips.sort_by_key(|t| t.departure_ms);

            // A trip whose own window touches the candidate window makes the
            // vehicle busy outright.
            if let Some(busy) = trips
                .iter()
                .find(|t| t.departure_ms <= window_end_ms && t.last_stop_ms() >= requested_pickup_ms)
            {
                if let Some(ready_ms) = self.projected_ready_ms(busy, pickup, buffer_ms) {
                    track_earliest(ready_ms, &mut earliest_ready_ms);
                    diag.record(
                        DiagnosticCategory::Algorithm,
                        "vehicle_busy",
                        json!({ "vehicle": vehicle.id.0, "trip": busy.id.0, "ready_ms": ready_ms }),
                    );
                } else {
                    diag.record(
                        DiagnosticCategory::Algorithm,
                        "vehicle_busy",
                        json!({ "vehicle": vehicle.id.0, "trip": busy.id.0 }),
                    );
                }
                continue 'vehicles;
            }

            // Latest trip already finished by the requested pickup.
            let prior = trips
                .iter()
                .filter(|t| t.last_stop_ms() <= requested_pickup_ms)
                .max_by_key(|t| t.last_stop_ms());
            if let Some(prior) = prior {
                match self.repositioning_arrival_ms(prior, pickup) {
                    Some(arrival_ms) => {
                        if arrival_ms > requested_pickup_ms.saturating_sub(buffer_ms) {
                            track_earliest(arrival_ms + buffer_ms, &mut earliest_ready_ms);
                            diag.record(
                                DiagnosticCategory::Algorithm,
                                "vehicle_arrives_too_late",
                                json!({
                                    "vehicle": vehicle.id.0,
                                    "prior_trip": prior.id.0,
                                    "arrival_ms": arrival_ms,
                                }),
                            );
                            continue 'vehicles;
                        }
                    }
                    None => {
                        diag.record(
                            DiagnosticCategory::Algorithm,
                            "vehicle_repositioning_unroutable",
                            json!({ "vehicle": vehicle.id.0, "prior_trip": prior.id.0 }),
                        );
                        continue 'vehicles;
                    }
                }
            }

            // Earliest trip departing after the candidate window; the gap is
            // a static buffer check, no repositioning leg is routed here.
            let next = trips
                .iter()
                .filter(|t| t.departure_ms > window_end_ms)
                .min_by_key(|t| t.departure_ms);
            if let Some(next) = next {
                if next.departure_ms - window_end_ms < buffer_ms {
                    diag.record(
                        DiagnosticCategory::Algorithm,
                        "vehicle_next_trip_too_close",
                        json!({ "vehicle": vehicle.id.0, "next_trip": next.id.0 }),
                    );
                    continue 'vehicles;
                }
            }

            diag.record(
                DiagnosticCategory::Algorithm,
                "vehicle_selected",
                json!({ "vehicle": vehicle.id.0 }),
            );
            return AvailabilityOutcome::Available(vehicle.id);
        }

        AvailabilityOutcome::Unavailable { earliest_ready_ms }
    }

    /// When the busy trip ends, plus the drive to the new pickup, plus the
    /// slack between trips. `None` when the leg cannot be routed.
    fn projected_ready_ms(
        &self,
        busy: &Trip,
        pickup: GeoPoint,
        buffer_ms: u64,
    ) -> Option<TimestampMs> {
        let last = busy.last_stop()?;
        let leg = self.router.route(&[last.place.point, pickup])?;
        Some(busy.last_stop_ms() + leg.duration_ms() + buffer_ms)
    }

    /// Projected arrival at the new pickup after finishing `prior`.
    fn repositioning_arrival_ms(&self, prior: &Trip, pickup: GeoPoint) -> Option<TimestampMs> {
        let last = prior.last_stop()?;
        let leg = self.router.route(&[last.place.point, pickup])?;
        Some(prior.last_stop_ms() + leg.duration_ms())
    }
}
