//! Evaluates one candidate splice of a request into a planned trip.
//!
//! The evaluator rebuilds the whole visiting plan for a single
//! (pickup position, dropoff position) pair: one routing call over the full
//! stop order, a departure-anchored reschedule, then the capacity, detour
//! and pickup-proximity rules. Any failure rejects only this pair; the
//! surrounding search decides what to try next.

use std::collections::HashMap;

use crate::config::{MatchingConfig, PICKUP_PROXIMITY_MS};
use crate::fleet::{
    Booking, BookingId, BookingRequest, StopId, StopIdSource, StopKind, TimestampMs, Trip, TripStop,
    Vehicle,
};
use crate::geo::GeoPoint;
use crate::routing::RouteProvider;

use super::types::{peak_onboard, InsertionCandidate, InsertionRejection, PlannedStop};

/// Working entry of the spliced stop order, before rescheduling.
enum SpliceEntry<'t> {
    Existing(&'t TripStop),
    NewPickup,
    NewDropoff,
}

impl SpliceEntry<'_> {
    fn point(&self, request: &BookingRequest) -> GeoPoint {
        match self {
            SpliceEntry::Existing(stop) => stop.place.point,
            SpliceEntry::NewPickup => request.pickup.point,
            SpliceEntry::NewDropoff => request.dropoff.point,
        }
    }
}

pub struct InsertionEvaluator<'a> {
    router: &'a dyn RouteProvider,
    config: &'a MatchingConfig,
}

impl<'a> InsertionEvaluator<'a> {
    pub fn new(router: &'a dyn RouteProvider, config: &'a MatchingConfig) -> Self {
        Self { router, config }
    }

    /// Test splicing `request` into `trip` with its pickup inserted at
    /// `pickup_pos` and its dropoff at `dropoff_pos`, where `dropoff_pos`
    /// counts positions in the list that already contains the new pickup.
    ///
    /// `bookings` are the trip's confirmed bookings. Stop ids are drawn from
    /// `ids` only when the pair is feasible.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &self,
        trip: &Trip,
        vehicle: &Vehicle,
        bookings: &[&Booking],
        request: &BookingRequest,
        pickup_pos: usize,
        dropoff_pos: usize,
        ids: &mut dyn StopIdSource,
    ) -> Result<InsertionCandidate, InsertionRejection> {
        if pickup_pos > trip.stops.len() || dropoff_pos <= pickup_pos || dropoff_pos > trip.stops.len() + 1 {
            return Err(InsertionRejection::PlanInconsistent {
                detail: "insertion positions out of range",
            });
        }

        // Splice, preserving the relative order of all existing stops.
        let mut entries: Vec<SpliceEntry<'_>> =
            trip.stops.iter().map(SpliceEntry::Existing).collect();
        entries.insert(pickup_pos, SpliceEntry::NewPickup);
        entries.insert(dropoff_pos, SpliceEntry::NewDropoff);

        // One routing call over the full stop order; no reordering.
        let points: Vec<GeoPoint> = entries.iter().map(|e| e.point(request)).collect();
        let route = self
            .router
            .route(&points)
            .ok_or(InsertionRejection::RouteUnavailable)?;
        if route.leg_duration_secs.len() != points.len() - 1 {
            return Err(InsertionRejection::RouteUnavailable);
        }

        let loads: HashMap<BookingId, u32> =
            bookings.iter().map(|b| (b.id, b.passengers)).collect();

        // Reschedule from the trip's departure: each stop beyond the first
        // is reached after its leg plus the boarding dwell.
        let service_ms = self.config.stop_service_ms();
        let mut clock = trip.departure_ms;
        let mut plan: Vec<PlannedStop> = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                let leg_ms = route
                    .leg_duration_ms(i - 1)
                    .ok_or(InsertionRejection::RouteUnavailable)?;
                clock += leg_ms + service_ms;
            }
            let stop = match entry {
                SpliceEntry::Existing(stop) => PlannedStop {
                    id: stop.id,
                    place: stop.place.clone(),
                    kind: stop.kind,
                    booking: Some(stop.booking),
                    passengers: loads.get(&stop.booking).copied().unwrap_or(0),
                    scheduled_ms: clock,
                    sequence: i as u32,
                },
                SpliceEntry::NewPickup => PlannedStop {
                    id: StopId(0), // assigned once the pair is accepted
                    place: request.pickup.clone(),
                    kind: StopKind::Pickup,
                    booking: None,
                    passengers: request.passengers,
                    scheduled_ms: clock,
                    sequence: i as u32,
                },
                SpliceEntry::NewDropoff => PlannedStop {
                    id: StopId(0),
                    place: request.dropoff.clone(),
                    kind: StopKind::Dropoff,
                    booking: None,
                    passengers: request.passengers,
                    scheduled_ms: clock,
                    sequence: i as u32,
                },
            };
            plan.push(stop);
        }

        // Locate the new stops in the rebuilt plan.
        let new_pickup_idx = plan
            .iter()
            .position(|s| s.booking.is_none() && s.kind == StopKind::Pickup)
            .ok_or(InsertionRejection::PlanInconsistent {
                detail: "new pickup missing after rebuild",
            })?;
        let new_dropoff_idx = plan
            .iter()
            .position(|s| s.booking.is_none() && s.kind == StopKind::Dropoff)
            .ok_or(InsertionRejection::PlanInconsistent {
                detail: "new dropoff missing after rebuild",
            })?;
        let pickup_ms = plan[new_pickup_idx].scheduled_ms;
        let dropoff_ms = plan[new_dropoff_idx].scheduled_ms;

        // Capacity: running on-board count may never exceed the seats.
        let peak = peak_onboard(&plan);
        if peak > vehicle.seats {
            return Err(InsertionRejection::CapacityExceeded {
                peak,
                seats: vehicle.seats,
            });
        }

        // Existing riders: nobody's dropoff may slip past the allowance.
        let max_detour_ms = self.config.max_detour_ms();
        for booking in bookings {
            let promised = trip.dropoff_stop_for(booking.id).ok_or(
                InsertionRejection::PlanInconsistent {
                    detail: "confirmed booking has no dropoff stop",
                },
            )?;
            let rescheduled = plan
                .iter()
                .find(|s| s.booking == Some(booking.id) && s.kind == StopKind::Dropoff)
                .ok_or(InsertionRejection::PlanInconsistent {
                    detail: "confirmed dropoff missing after rebuild",
                })?;
            let delay_ms = rescheduled.scheduled_ms.saturating_sub(promised.scheduled_ms);
            if delay_ms > max_detour_ms {
                return Err(InsertionRejection::ExistingDetourExceeded {
                    booking: booking.id,
                    delay_ms,
                });
            }
        }

        // New rider: compare against a private direct ride.
        let direct = self
            .router
            .route(&[request.pickup.point, request.dropoff.point])
            .ok_or(InsertionRejection::RouteUnavailable)?;
        let direct_dropoff_ms = pickup_ms + direct.duration_ms();
        let delay_ms = dropoff_ms.saturating_sub(direct_dropoff_ms);
        if delay_ms > max_detour_ms {
            return Err(InsertionRejection::NewRiderDetourExceeded { delay_ms });
        }

        // Pickup proximity: the computed pickup must stay close to the ask.
        let offset_ms = pickup_ms as i64 - request.requested_pickup_ms as i64;
        if offset_ms.unsigned_abs() > PICKUP_PROXIMITY_MS {
            return Err(InsertionRejection::PickupOutsideWindow { offset_ms });
        }

        plan[new_pickup_idx].id = ids.next_stop_id();
        plan[new_dropoff_idx].id = ids.next_stop_id();

        let score = bookings.iter().map(|b| b.passengers).sum();
        Ok(InsertionCandidate {
            trip: trip.id,
            vehicle: trip.vehicle,
            stops: plan,
            pickup_ms,
            dropoff_ms,
            duration_secs: route.duration_secs,
            path: route.path,
            score,
        })
    }
}

/// Build the two-stop plan of a brand-new trip: pickup at the requested
/// time, dropoff after the direct ride plus the alighting dwell.
pub fn new_trip_plan(
    request: &BookingRequest,
    pickup_ms: TimestampMs,
    direct_duration_ms: u64,
    service_ms: u64,
    ids: &mut dyn StopIdSource,
) -> (Vec<PlannedStop>, TimestampMs) {
    let dropoff_ms = pickup_ms + direct_duration_ms + service_ms;
    let stops = vec![
        PlannedStop {
            id: ids.next_stop_id(),
            place: request.pickup.clone(),
            kind: StopKind::Pickup,
            booking: None,
            passengers: request.passengers,
            scheduled_ms: pickup_ms,
            sequence: 0,
        },
        PlannedStop {
            id: ids.next_stop_id(),
            place: request.dropoff.clone(),
            kind: StopKind::Dropoff,
            booking: None,
            passengers: request.passengers,
            scheduled_ms: dropoff_ms,
            sequence: 1,
        },
    ];
    (stops, dropoff_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MINUTE_MS;
    use crate::fleet::SequentialStopIds;
    use crate::test_support::{
        confirmed_booking, place_km_east, planned_trip, request_at, trip_stop, vehicle, BASE_MS,
    };

    /// Trip A->B carrying booking 1 (1 rider), departing at BASE_MS.
    /// New rider asks C->D where C and D sit between A and B.
    struct Fixture {
        trip: crate::fleet::Trip,
        vehicle: crate::fleet::Vehicle,
        booking: crate::fleet::Booking,
        request: BookingRequest,
    }

    fn fixture(existing_dropoff_ms: u64) -> Fixture {
        let a = place_km_east(0.0, "Start");
        let b = place_km_east(12.0, "End");
        let c = place_km_east(3.0, "New pickup");
        let d = place_km_east(9.0, "New dropoff");
        let trip = planned_trip(
            1,
            1,
            BASE_MS,
            vec![
                trip_stop(10, 1, StopKind::Pickup, a.clone(), BASE_MS, 0),
                trip_stop(11, 1, StopKind::Dropoff, b.clone(), existing_dropoff_ms, 1),
            ],
        );
        let booking = confirmed_booking(1, Some(trip.id), a, b.clone(), BASE_MS, 1);
        let request = request_at(c, d, BASE_MS + 5 * MINUTE_MS, 1);
        Fixture {
            vehicle: vehicle(1, 8),
            trip,
            booking,
            request,
        }
    }

    fn evaluate(
        fixture: &Fixture,
        router: &dyn RouteProvider,
        config: &MatchingConfig,
        pickup_pos: usize,
        dropoff_pos: usize,
    ) -> Result<InsertionCandidate, InsertionRejection> {
        let evaluator = InsertionEvaluator::new(router, config);
        let mut ids = SequentialStopIds::starting_at(100);
        evaluator.evaluate(
            &fixture.trip,
            &fixture.vehicle,
            &[&fixture.booking],
            &fixture.request,
            pickup_pos,
            dropoff_pos,
            &mut ids,
        )
    }

    // At 40 km/h a kilometre takes 90 s; the A->C->D->B detour is the same
    // 12 km as A->B, so the only extra delay is the two added dwells.
    #[test]
    fn accepts_on_route_splice_and_rebuilds_schedule() {
        let fixture = fixture(BASE_MS + 20 * MINUTE_MS);
        let router = crate::test_support::FixedRouteProvider::at_kmh(40.0);
        let config = MatchingConfig::default();

        let candidate =
            evaluate(&fixture, &router, &config, 1, 2).expect("splice should be feasible");

        assert_eq!(candidate.trip, fixture.trip.id);
        assert_eq!(candidate.stops.len(), 4);
        // Dense, strictly increasing sequence and non-decreasing times.
        for (i, stop) in candidate.stops.iter().enumerate() {
            assert_eq!(stop.sequence, i as u32);
            if i > 0 {
                assert!(stop.scheduled_ms >= candidate.stops[i - 1].scheduled_ms);
            }
        }
        // New stops carry fresh ids and no booking yet.
        let new_stops: Vec<_> = candidate
            .stops
            .iter()
            .filter(|s| s.booking.is_none())
            .collect();
        assert_eq!(new_stops.len(), 2);
        assert_eq!(new_stops[0].id, StopId(100));
        assert_eq!(new_stops[1].id, StopId(101));
        // 3 km to the new pickup at 90 s/km plus one dwell.
        let expected_pickup = BASE_MS + 3 * 90 * 1000 + config.stop_service_ms();
        assert_eq!(candidate.pickup_ms, expected_pickup);
        assert_eq!(candidate.score, 1);
    }

    #[test]
    fn rejects_when_existing_rider_slips_past_allowance() {
        // Promise the existing dropoff so tightly that the two added dwells
        // (4 min) exceed a 3-minute allowance.
        let on_time_dropoff = BASE_MS + (12 * 90 * 1000) + 2 * MINUTE_MS;
        let fixture = fixture(on_time_dropoff);
        let router = crate::test_support::FixedRouteProvider::at_kmh(40.0);
        let config = MatchingConfig::default().with_max_detour_mins(3);

        let result = evaluate(&fixture, &router, &config, 1, 2);
        match result {
            Err(InsertionRejection::ExistingDetourExceeded { booking, delay_ms }) => {
                assert_eq!(booking, BookingId(1));
                assert_eq!(delay_ms, 4 * MINUTE_MS);
            }
            other => panic!("expected existing-detour rejection, got {other:?}"),
        }
    }

    #[test]
    fn rejects_when_capacity_would_overflow() {
        let fixture = {
            let mut f = fixture(BASE_MS + 60 * MINUTE_MS);
            f.request.passengers = 8; // 1 already on board in an 8-seater
            f
        };
        let router = crate::test_support::FixedRouteProvider::at_kmh(40.0);
        let config = MatchingConfig::default();

        let result = evaluate(&fixture, &router, &config, 1, 2);
        match result {
            Err(InsertionRejection::CapacityExceeded { peak, seats }) => {
                assert_eq!(peak, 9);
                assert_eq!(seats, 8);
            }
            other => panic!("expected capacity rejection, got {other:?}"),
        }
    }

    #[test]
    fn capacity_ignores_detour_headroom() {
        // Generous detour allowance must not rescue an overfull vehicle.
        let fixture = {
            let mut f = fixture(BASE_MS + 60 * MINUTE_MS);
            f.request.passengers = 8;
            f
        };
        let router = crate::test_support::FixedRouteProvider::at_kmh(40.0);
        let config = MatchingConfig::default().with_max_detour_mins(600);
        assert!(matches!(
            evaluate(&fixture, &router, &config, 1, 2),
            Err(InsertionRejection::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn rejects_pickup_far_from_requested_time() {
        let fixture = {
            let mut f = fixture(BASE_MS + 60 * MINUTE_MS);
            // Ask for a pickup an hour before the trip can reach it.
            f.request.requested_pickup_ms = BASE_MS.saturating_sub(60 * MINUTE_MS);
            f
        };
        let router = crate::test_support::FixedRouteProvider::at_kmh(40.0);
        let config = MatchingConfig::default().with_max_detour_mins(600);
        assert!(matches!(
            evaluate(&fixture, &router, &config, 1, 2),
            Err(InsertionRejection::PickupOutsideWindow { .. })
        ));
    }

    #[test]
    fn routing_failure_rejects_only_this_pair() {
        let fixture = fixture(BASE_MS + 20 * MINUTE_MS);
        let router = crate::test_support::FixedRouteProvider::failing();
        let config = MatchingConfig::default();
        assert_eq!(
            evaluate(&fixture, &router, &config, 1, 2),
            Err(InsertionRejection::RouteUnavailable)
        );
    }

    #[test]
    fn out_of_range_positions_are_an_internal_failure() {
        let fixture = fixture(BASE_MS + 20 * MINUTE_MS);
        let router = crate::test_support::FixedRouteProvider::at_kmh(40.0);
        let config = MatchingConfig::default();
        assert!(matches!(
            evaluate(&fixture, &router, &config, 5, 6),
            Err(InsertionRejection::PlanInconsistent { .. })
        ));
        assert!(matches!(
            evaluate(&fixture, &router, &config, 1, 1),
            Err(InsertionRejection::PlanInconsistent { .. })
        ));
    }

    #[test]
    fn new_trip_plan_places_dropoff_after_ride_and_dwell() {
        let request = request_at(
            place_km_east(0.0, "Home"),
            place_km_east(4.0, "Office"),
            BASE_MS,
            2,
        );
        let mut ids = SequentialStopIds::starting_at(7);
        let (stops, dropoff_ms) = new_trip_plan(&request, BASE_MS, 10 * MINUTE_MS, 2 * MINUTE_MS, &mut ids);
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].sequence, 0);
        assert_eq!(stops[1].sequence, 1);
        assert_eq!(stops[0].scheduled_ms, BASE_MS);
        assert_eq!(dropoff_ms, BASE_MS + 12 * MINUTE_MS);
        assert_eq!(stops[1].scheduled_ms, dropoff_ms);
        assert!(stops.iter().all(|s| s.booking.is_none()));
    }
}
