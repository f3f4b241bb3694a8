//! Fleet data model: vehicles, trips, stops, bookings and the read-only
//! snapshot handed to the matching engine.
//!
//! The engine never mutates these structures and never persists them; the
//! caller owns the authoritative state and commits a [`crate::matching::MatchResult`]
//! back into it.

use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, Place};

/// Milliseconds since the operating day's epoch.
pub type TimestampMs = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookingId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StopId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    /// Completed and cancelled trips no longer occupy their vehicle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    Pickup,
    Dropoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Seats available for passengers.
    pub seats: u32,
    /// Where the vehicle parked after its last completed trip; `None` while
    /// it is executing a trip or has not driven yet today.
    pub last_known_position: Option<GeoPoint>,
}

/// One scheduled visit within a trip. Stops are stored in visiting order;
/// `sequence` is dense and strictly increasing within a trip, and a booking's
/// pickup always precedes its dropoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripStop {
    pub id: StopId,
    pub place: Place,
    pub kind: StopKind,
    pub booking: BookingId,
    pub scheduled_ms: TimestampMs,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub vehicle: VehicleId,
    pub status: TripStatus,
    /// Visiting plan ordered by `sequence`.
    pub stops: Vec<TripStop>,
    pub departure_ms: TimestampMs,
    /// Encoded polyline of the planned path.
    pub path: String,
}

impl Trip {
    pub fn last_stop(&self) -> Option<&TripStop> {
        self.stops.last()
    }

    /// Scheduled end of the trip; the departure time when no stops are planned.
    pub fn last_stop_ms(&self) -> TimestampMs {
        self.last_stop()
            .map(|stop| stop.scheduled_ms)
            .unwrap_or(self.departure_ms)
    }

    /// Find the scheduled dropoff stop of a booking on this trip.
    pub fn dropoff_stop_for(&self, booking: BookingId) -> Option<&TripStop> {
        self.stops
            .iter()
            .find(|stop| stop.kind == StopKind::Dropoff && stop.booking == booking)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    /// Human-readable booking number shown to dispatchers.
    pub number: String,
    /// Set by the caller once a match result has been committed.
    pub trip: Option<TripId>,
    pub pickup: Place,
    pub dropoff: Place,
    pub requested_pickup_ms: TimestampMs,
    pub estimated_pickup_ms: Option<TimestampMs>,
    pub estimated_dropoff_ms: Option<TimestampMs>,
    pub passengers: u32,
    pub status: BookingStatus,
}

/// Ephemeral ride request consumed by one engine call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub pickup: Place,
    pub dropoff: Place,
    pub requested_pickup_ms: TimestampMs,
    pub passengers: u32,
}

/// Read-only view of the fleet for one matching call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub vehicles: Vec<Vehicle>,
    pub trips: Vec<Trip>,
    pub bookings: Vec<Booking>,
}

impl FleetSnapshot {
    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn trip(&self, id: TripId) -> Option<&Trip> {
        self.trips.iter().find(|t| t.id == id)
    }

    pub fn booking(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    /// Confirmed bookings currently assigned to the given trip.
    pub fn confirmed_bookings_for_trip(&self, trip: TripId) -> Vec<&Booking> {
        self.bookings
            .iter()
            .filter(|b| b.trip == Some(trip) && b.status == BookingStatus::Confirmed)
            .collect()
    }

    /// Trips still occupying the given vehicle, in snapshot order.
    pub fn active_trips_for_vehicle(&self, vehicle: VehicleId) -> Vec<&Trip> {
        self.trips
            .iter()
            .filter(|t| t.vehicle == vehicle && !t.status.is_terminal())
            .collect()
    }
}

/// Allocator for stop ids, injected into the engine so it never invents
/// identifiers on its own.
pub trait StopIdSource {
    fn next_stop_id(&mut self) -> StopId;
}

/// Counter-backed allocator; the caller picks the starting value above its
/// persisted id range.
#[derive(Debug, Clone)]
pub struct SequentialStopIds {
    next: u64,
}

impl SequentialStopIds {
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl StopIdSource for SequentialStopIds {
    fn next_stop_id(&mut self) -> StopId {
        let id = StopId(self.next);
        self.next += 1;
        id
    }
}
