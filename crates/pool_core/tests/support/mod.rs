#![allow(dead_code)]

//! Caller-side helpers for integration tests: committing a match result
//! back into a snapshot (the engine itself never does this) and checking
//! the invariants every committed trip must keep.

use std::collections::HashMap;

use pool_core::fleet::{
    Booking, BookingId, BookingRequest, BookingStatus, FleetSnapshot, StopKind, Trip, TripId,
    TripStatus, TripStop,
};
use pool_core::matching::{MatchResult, PlannedStop};

fn to_trip_stop(planned: &PlannedStop, new_booking: BookingId) -> TripStop {
    TripStop {
        id: planned.id,
        place: planned.place.clone(),
        kind: planned.kind,
        booking: planned.booking.unwrap_or(new_booking),
        scheduled_ms: planned.scheduled_ms,
        sequence: planned.sequence,
    }
}

/// Turn a non-rejected result into the snapshot mutations a real caller
/// would persist. Returns whether anything was committed.
pub fn apply_result(
    snapshot: &mut FleetSnapshot,
    request: &BookingRequest,
    result: &MatchResult,
    booking_id: u64,
    trip_id: u64,
) -> bool {
    let booking_id = BookingId(booking_id);
    match result {
        MatchResult::Pool {
            trip,
            pickup_ms,
            dropoff_ms,
            path,
            stops,
            ..
        } => {
            let trip = snapshot
                .trips
                .iter_mut()
                .find(|t| t.id == *trip)
                .expect("pooled trip must exist in the snapshot");
            trip.stops = stops.iter().map(|s| to_trip_stop(s, booking_id)).collect();
            trip.path = path.clone();
            snapshot.bookings.push(Booking {
                id: booking_id,
                number: format!("B-{:04}", booking_id.0),
                trip: Some(trip.id),
                pickup: request.pickup.clone(),
                dropoff: request.dropoff.clone(),
                requested_pickup_ms: request.requested_pickup_ms,
                estimated_pickup_ms: Some(*pickup_ms),
                estimated_dropoff_ms: Some(*dropoff_ms),
                passengers: request.passengers,
                status: BookingStatus::Confirmed,
            });
            true
        }
        MatchResult::NewTrip {
            vehicle,
            pickup_ms,
            dropoff_ms,
            path,
            stops,
            ..
        } => {
            let trip_id = TripId(trip_id);
            snapshot.trips.push(Trip {
                id: trip_id,
                vehicle: *vehicle,
                status: TripStatus::Planned,
                stops: stops.iter().map(|s| to_trip_stop(s, booking_id)).collect(),
                departure_ms: *pickup_ms,
                path: path.clone(),
            });
            snapshot.bookings.push(Booking {
                id: booking_id,
                number: format!("B-{:04}", booking_id.0),
                trip: Some(trip_id),
                pickup: request.pickup.clone(),
                dropoff: request.dropoff.clone(),
                requested_pickup_ms: request.requested_pickup_ms,
                estimated_pickup_ms: Some(*pickup_ms),
                estimated_dropoff_ms: Some(*dropoff_ms),
                passengers: request.passengers,
                status: BookingStatus::Confirmed,
            });
            true
        }
        MatchResult::Rejected { .. } => false,
    }
}

/// Check the promises every committed trip must keep: dense increasing
/// sequences, non-decreasing times, pickup before dropoff per booking, and
/// an on-board count that never exceeds the vehicle's seats.
pub fn assert_fleet_invariants(snapshot: &FleetSnapshot) {
    let passengers: HashMap<BookingId, u32> = snapshot
        .bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Confirmed)
        .map(|b| (b.id, b.passengers))
        .collect();

    for trip in &snapshot.trips {
        let seats = snapshot
            .vehicle(trip.vehicle)
            .expect("trip vehicle must exist")
            .seats;
        let mut onboard: u32 = 0;
        for (i, stop) in trip.stops.iter().enumerate() {
            assert_eq!(
                stop.sequence, i as u32,
                "trip {:?} has a gap in its stop sequence",
                trip.id
            );
            if i > 0 {
                assert!(
                    stop.scheduled_ms >= trip.stops[i - 1].scheduled_ms,
                    "trip {:?} schedules stop {} before its predecessor",
                    trip.id,
                    i
                );
            }
            let riders = passengers.get(&stop.booking).copied().unwrap_or(0);
            match stop.kind {
                StopKind::Pickup => onboard += riders,
                StopKind::Dropoff => onboard = onboard.saturating_sub(riders),
            }
            assert!(
                onboard <= seats,
                "trip {:?} carries {} riders in a {}-seater after stop {}",
                trip.id,
                onboard,
                seats,
                i
            );
        }
        for stop in &trip.stops {
            if stop.kind == StopKind::Pickup {
                let dropoff = trip
                    .stops
                    .iter()
                    .find(|s| s.kind == StopKind::Dropoff && s.booking == stop.booking)
                    .expect("every pickup needs a dropoff on the same trip");
                assert!(
                    dropoff.sequence > stop.sequence,
                    "booking {:?} is dropped off before boarding",
                    stop.booking
                );
            }
        }
    }
}
