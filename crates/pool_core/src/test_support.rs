//! Shared fixtures for unit, integration and load tests.
//!
//! Geometry here lives on a flat synthetic map: one degree is exactly
//! 100 km, so distances built with [`place_km_east`] come out in round
//! numbers and expected schedules can be written down by hand.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::fleet::{
    Booking, BookingId, BookingRequest, BookingStatus, FleetSnapshot, StopId, StopKind,
    TimestampMs, Trip, TripId, TripStatus, TripStop, Vehicle, VehicleId,
};
use crate::geo::{GeoPoint, Place};
use crate::routing::{RouteProvider, RouteResult};

/// 08:00 on the operating day.
pub const BASE_MS: TimestampMs = 8 * 60 * 60 * 1000;

/// Anchor of the synthetic map.
pub const BASE_LAT: f64 = 52.52;
pub const BASE_LNG: f64 = 13.40;

/// Kilometres per degree on the synthetic map.
const KM_PER_DEGREE: f64 = 100.0;

/// Flat-map distance in kilometres.
pub fn grid_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (a.lat - b.lat) * KM_PER_DEGREE;
    let dlng = (a.lng - b.lng) * KM_PER_DEGREE;
    (dlat * dlat + dlng * dlng).sqrt()
}

/// A place `km` kilometres east of the map anchor.
pub fn place_km_east(km: f64, address: &str) -> Place {
    Place::new(BASE_LAT, BASE_LNG + km / KM_PER_DEGREE, address)
}

fn quantize(p: GeoPoint) -> (i64, i64) {
    ((p.lat * 1e6).round() as i64, (p.lng * 1e6).round() as i64)
}

/// Deterministic routing stub: constant speed over the flat map, with
/// optional per-leg overrides and failure injection.
pub struct FixedRouteProvider {
    speed_kmh: f64,
    fail_all: bool,
    leg_secs: HashMap<((i64, i64), (i64, i64)), f64>,
    failing_legs: Vec<((i64, i64), (i64, i64))>,
}

impl FixedRouteProvider {
    pub fn at_kmh(speed_kmh: f64) -> Self {
        Self {
            speed_kmh,
            fail_all: false,
            leg_secs: HashMap::new(),
            failing_legs: Vec::new(),
        }
    }

    /// A provider whose every query fails.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::at_kmh(40.0)
        }
    }

    /// Force a specific directed leg to a fixed travel time.
    pub fn with_leg_secs(mut self, from: GeoPoint, to: GeoPoint, secs: f64) -> Self {
        self.leg_secs.insert((quantize(from), quantize(to)), secs);
        self
    }

    /// Make any route containing this directed leg fail.
    pub fn with_failing_leg(mut self, from: GeoPoint, to: GeoPoint) -> Self {
        self.failing_legs.push((quantize(from), quantize(to)));
        self
    }
}

impl RouteProvider for FixedRouteProvider {
    fn route(&self, points: &[GeoPoint]) -> Option<RouteResult> {
        if self.fail_all || points.len() < 2 {
            return None;
        }
        let mut leg_duration_secs = Vec::with_capacity(points.len() - 1);
        let mut leg_distance_km = Vec::with_capacity(points.len() - 1);
        for pair in points.windows(2) {
            let key = (quantize(pair[0]), quantize(pair[1]));
            if self.failing_legs.contains(&key) {
                return None;
            }
            let km = grid_km(pair[0], pair[1]);
            let secs = self
                .leg_secs
                .get(&key)
                .copied()
                .unwrap_or_else(|| (km / self.speed_kmh) * 3600.0);
            leg_duration_secs.push(secs);
            leg_distance_km.push(km);
        }
        Some(RouteResult {
            distance_km: leg_distance_km.iter().sum(),
            duration_secs: leg_duration_secs.iter().sum(),
            path: format!("stub:{}", points.len()),
            leg_duration_secs,
            leg_distance_km,
        })
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn vehicle(id: u64, seats: u32) -> Vehicle {
    Vehicle {
        id: VehicleId(id),
        seats,
        last_known_position: None,
    }
}

pub fn trip_stop(
    id: u64,
    booking: u64,
    kind: StopKind,
    place: Place,
    scheduled_ms: TimestampMs,
    sequence: u32,
) -> TripStop {
    TripStop {
        id: StopId(id),
        place,
        kind,
        booking: BookingId(booking),
        scheduled_ms,
        sequence,
    }
}

pub fn planned_trip(id: u64, vehicle: u64, departure_ms: TimestampMs, stops: Vec<TripStop>) -> Trip {
    Trip {
        id: TripId(id),
        vehicle: VehicleId(vehicle),
        status: TripStatus::Planned,
        stops,
        departure_ms,
        path: String::new(),
    }
}

pub fn confirmed_booking(
    id: u64,
    trip: Option<TripId>,
    pickup: Place,
    dropoff: Place,
    requested_pickup_ms: TimestampMs,
    passengers: u32,
) -> Booking {
    Booking {
        id: BookingId(id),
        number: format!("B-{id:04}"),
        trip,
        pickup,
        dropoff,
        requested_pickup_ms,
        estimated_pickup_ms: None,
        estimated_dropoff_ms: None,
        passengers,
        status: BookingStatus::Confirmed,
    }
}

pub fn request_at(
    pickup: Place,
    dropoff: Place,
    requested_pickup_ms: TimestampMs,
    passengers: u32,
) -> BookingRequest {
    BookingRequest {
        pickup,
        dropoff,
        requested_pickup_ms,
        passengers,
    }
}

/// A reproducible fleet: `num_vehicles` eight-seaters, the first
/// `num_trips` of them already carrying one planned two-stop trip with a
/// single confirmed rider. Schedules follow [`FixedRouteProvider::at_kmh`]
/// at 40 km/h with a 2-minute dwell.
pub fn seeded_snapshot(seed: u64, num_vehicles: usize, num_trips: usize) -> FleetSnapshot {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut snapshot = FleetSnapshot::default();
    for v in 0..num_vehicles {
        snapshot.vehicles.push(vehicle(v as u64 + 1, 8));
    }
    for t in 0..num_trips.min(num_vehicles) {
        let trip_id = t as u64 + 1;
        let booking_id = t as u64 + 1;
        let origin_km = rng.gen_range(0.0..10.0);
        let length_km = rng.gen_range(2.0..8.0);
        let departure = BASE_MS + rng.gen_range(0..120) * 60 * 1000;
        let pickup = place_km_east(origin_km, "pickup");
        let dropoff = place_km_east(origin_km + length_km, "dropoff");
        let ride_ms = ((length_km / 40.0) * 3600.0 * 1000.0).round() as u64;
        let dropoff_ms = departure + ride_ms + 2 * 60 * 1000;
        snapshot.trips.push(planned_trip(
            trip_id,
            t as u64 + 1,
            departure,
            vec![
                trip_stop(
                    trip_id * 100,
                    booking_id,
                    StopKind::Pickup,
                    pickup.clone(),
                    departure,
                    0,
                ),
                trip_stop(
                    trip_id * 100 + 1,
                    booking_id,
                    StopKind::Dropoff,
                    dropoff.clone(),
                    dropoff_ms,
                    1,
                ),
            ],
        ));
        snapshot.bookings.push(confirmed_booking(
            booking_id,
            Some(TripId(trip_id)),
            pickup,
            dropoff,
            departure,
            rng.gen_range(1..=3),
        ));
    }
    snapshot
}

/// Reproducible stream of ride requests over a three-hour window.
pub fn random_requests(seed: u64, count: usize) -> Vec<BookingRequest> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let from_km = rng.gen_range(0.0..12.0);
            let hop_km = rng.gen_range(1.0..6.0);
            request_at(
                place_km_east(from_km, &format!("from-{i}")),
                place_km_east(from_km + hop_km, &format!("to-{i}")),
                BASE_MS + rng.gen_range(0..180) * 60 * 1000,
                rng.gen_range(1..=3),
            )
        })
        .collect()
}
