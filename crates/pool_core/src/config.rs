//! Operating parameters for the matching engine.

use serde::{Deserialize, Serialize};

/// Milliseconds in one minute.
pub const MINUTE_MS: u64 = 60 * 1000;

/// Planned trips departing more than this long after the requested pickup,
/// or ending more than this long before it, are not searched.
pub const TRIP_PRUNE_WINDOW_MS: u64 = 30 * MINUTE_MS;

/// A computed pickup must land within this distance of the requested pickup
/// time, in either direction.
pub const PICKUP_PROXIMITY_MS: u64 = 15 * MINUTE_MS;

/// Fleet-wide matching parameters. All durations are configured in whole
/// minutes, the granularity dispatchers work in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Default seat capacity for newly registered vehicles.
    pub vehicle_seats: u32,
    /// Maximum extra delay a rider's dropoff may accumulate from pooling.
    pub max_detour_mins: u64,
    /// Dwell time spent at every stop for boarding or alighting.
    pub stop_service_mins: u64,
    /// Minimum slack between two consecutive trips of one vehicle.
    pub trip_buffer_mins: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            vehicle_seats: 8,
            max_detour_mins: 8,
            stop_service_mins: 2,
            trip_buffer_mins: 5,
        }
    }
}

impl MatchingConfig {
    pub fn with_vehicle_seats(mut self, seats: u32) -> Self {
        self.vehicle_seats = seats;
        self
    }

    pub fn with_max_detour_mins(mut self, mins: u64) -> Self {
        self.max_detour_mins = mins;
        self
    }

    pub fn with_stop_service_mins(mut self, mins: u64) -> Self {
        self.stop_service_mins = mins;
        self
    }

    pub fn with_trip_buffer_mins(mut self, mins: u64) -> Self {
        self.trip_buffer_mins = mins;
        self
    }

    pub fn max_detour_ms(&self) -> u64 {
        self.max_detour_mins * MINUTE_MS
    }

    pub fn stop_service_ms(&self) -> u64 {
        self.stop_service_mins * MINUTE_MS
    }

    pub fn trip_buffer_ms(&self) -> u64 {
        self.trip_buffer_mins * MINUTE_MS
    }
}
