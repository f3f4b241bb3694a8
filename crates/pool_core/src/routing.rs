//! Pluggable route providers: trait abstraction for routing backends.
//!
//! Three implementations, selectable via [`RouteProviderKind`]:
//!
//! - **`HaversineRouteProvider`**: Great-circle legs at free-flow speed. Zero dependencies.
//! - **`OsrmRouteProvider`** (feature `osrm`): Calls a local/remote OSRM HTTP endpoint.
//! - **`PrecomputedRouteProvider`** (feature `precomputed`): Loads a serialized route table from disk.
//!
//! A provider answers one question: given an ordered list of waypoints, what
//! does driving them in exactly that order cost? Waypoints are never
//! reordered; the matching engine owns stop ordering.

use serde::{Deserialize, Serialize};

use crate::geo::{haversine_km, GeoPoint};

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Result of a route query over an ordered waypoint list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Road-network distance in kilometres, summed over all legs.
    pub distance_km: f64,
    /// Travel time in seconds, summed over all legs.
    pub duration_secs: f64,
    /// Encoded polyline of the driven path (empty for the haversine provider).
    pub path: String,
    /// Travel time per leg, `points.len() - 1` entries in waypoint order.
    pub leg_duration_secs: Vec<f64>,
    /// Distance per leg, same shape as `leg_duration_secs`.
    pub leg_distance_km: Vec<f64>,
}

impl RouteResult {
    pub fn duration_ms(&self) -> u64 {
        (self.duration_secs * 1000.0).round() as u64
    }

    pub fn leg_duration_ms(&self, leg: usize) -> Option<u64> {
        self.leg_duration_secs
            .get(leg)
            .map(|secs| (secs * 1000.0).round() as u64)
    }
}

/// Which routing backend to use. Serializes into caller configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub enum RouteProviderKind {
    /// Great-circle estimation, zero external dependencies.
    #[default]
    Haversine,
    /// OSRM HTTP endpoint (e.g. `"http://localhost:5000"`).
    #[cfg(feature = "osrm")]
    Osrm { endpoint: String },
    /// Pre-computed route table loaded from a binary file at startup.
    #[cfg(feature = "precomputed")]
    Precomputed { path: String },
}

/// Trait for routing backends. Implementations must be `Send + Sync` so one
/// provider can serve evaluations of independent candidates.
///
/// Returns `None` when no route exists, the backend fails or times out, or
/// fewer than two points are given. Callers treat `None` as "this candidate
/// is infeasible", never as a fatal error.
pub trait RouteProvider: Send + Sync {
    fn route(&self, points: &[GeoPoint]) -> Option<RouteResult>;
}

/// Cache/table key: waypoints quantized to ~0.1 m so float noise from the
/// map layer does not fragment entries.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RouteKey(Vec<(i64, i64)>);

impl RouteKey {
    pub fn from_points(points: &[GeoPoint]) -> Self {
        Self(
            points
                .iter()
                .map(|p| ((p.lat * 1e6).round() as i64, (p.lng * 1e6).round() as i64))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Haversine provider (always available)
// ---------------------------------------------------------------------------

/// Average free-flow city speed used when no road network is available (km/h).
const FREE_FLOW_SPEED_KMH: f64 = 40.0;

/// Estimates every leg as a great circle driven at free-flow speed.
pub struct HaversineRouteProvider;

impl RouteProvider for HaversineRouteProvider {
    fn route(&self, points: &[GeoPoint]) -> Option<RouteResult> {
        if points.len() < 2 {
            return None;
        }
        let leg_distance_km: Vec<f64> = points
            .windows(2)
            .map(|pair| haversine_km(pair[0], pair[1]))
            .collect();
        let leg_duration_secs: Vec<f64> = leg_distance_km
            .iter()
            .map(|km| (km / FREE_FLOW_SPEED_KMH) * 3600.0)
            .collect();
        Some(RouteResult {
            distance_km: leg_distance_km.iter().sum(),
            duration_secs: leg_duration_secs.iter().sum(),
            path: String::new(),
            leg_duration_secs,
            leg_distance_km,
        })
    }
}

// ---------------------------------------------------------------------------
// OSRM provider (behind `osrm` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "osrm")]
pub mod osrm {
    use super::*;
    use reqwest::blocking::Client;
    use std::time::Duration;

    /// Routes via an OSRM HTTP endpoint.
    pub struct OsrmRouteProvider {
        client: Client,
        endpoint: String,
    }

    impl OsrmRouteProvider {
        pub fn new(endpoint: &str) -> Self {
            let client = Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("failed to build HTTP client");
            Self {
                client,
                endpoint: endpoint.trim_end_matches('/').to_string(),
            }
        }
    }

    /// Minimal OSRM JSON response structures.
    #[derive(Deserialize)]
    struct OsrmResponse {
        code: String,
        routes: Option<Vec<OsrmRoute>>,
    }

    #[derive(Deserialize)]
    struct OsrmRoute {
        distance: f64, // metres
        duration: f64, // seconds
        geometry: String,
        legs: Vec<OsrmLeg>,
    }

    #[derive(Deserialize)]
    struct OsrmLeg {
        distance: f64,
        duration: f64,
    }

    impl RouteProvider for OsrmRouteProvider {
        fn route(&self, points: &[GeoPoint]) -> Option<RouteResult> {
            if points.len() < 2 {
                return None;
            }

            let coords = points
                .iter()
                .map(|p| format!("{},{}", p.lng, p.lat))
                .collect::<Vec<_>>()
                .join(";");
            let url = format!(
                "{}/route/v1/driving/{}?overview=full&geometries=polyline&steps=false",
                self.endpoint, coords,
            );

            let resp: OsrmResponse = match self.client.get(&url).send() {
                Ok(r) => match r.json() {
                    Ok(j) => j,
                    Err(_) => return None,
                },
                Err(_) => return None,
            };

            if resp.code != "Ok" {
                return None;
            }

            let route = resp.routes?.into_iter().next()?;
            if route.legs.len() != points.len() - 1 {
                return None;
            }

            Some(RouteResult {
                distance_km: route.distance / 1000.0,
                duration_secs: route.duration,
                path: route.geometry,
                leg_duration_secs: route.legs.iter().map(|l| l.duration).collect(),
                leg_distance_km: route.legs.iter().map(|l| l.distance / 1000.0).collect(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Pre-computed provider (behind `precomputed` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "precomputed")]
pub mod precomputed {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    /// Pre-computed route table: waypoint-list key → RouteResult, loaded from disk.
    pub struct PrecomputedRouteProvider {
        table: HashMap<RouteKey, RouteResult>,
    }

    impl PrecomputedRouteProvider {
        /// Load from a bincode-serialized file.
        pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
            let data = fs::read(path)?;
            let table: HashMap<RouteKey, RouteResult> = bincode::deserialize(&data)?;
            Ok(Self { table })
        }

        /// Create from an in-memory table (useful for tests).
        pub fn from_table(table: HashMap<RouteKey, RouteResult>) -> Self {
            Self { table }
        }

        /// Serialize the table to a file.
        pub fn save_to_file(
            table: &HashMap<RouteKey, RouteResult>,
            path: &str,
        ) -> Result<(), Box<dyn std::error::Error>> {
            let data = bincode::serialize(table)?;
            fs::write(path, data)?;
            Ok(())
        }
    }

    impl RouteProvider for PrecomputedRouteProvider {
        fn route(&self, points: &[GeoPoint]) -> Option<RouteResult> {
            self.table.get(&RouteKey::from_points(points)).cloned()
        }
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// LRU-cached wrapper around any [`RouteProvider`].
///
/// Cache key is the quantized waypoint list (directional). On cache miss the
/// inner provider is queried; on inner failure the optional fallback
/// ([`HaversineRouteProvider`]) is tried before returning `None`.
pub struct CachedRouteProvider {
    inner: Box<dyn RouteProvider>,
    cache: Mutex<LruCache<RouteKey, RouteResult>>,
    fallback_to_haversine: bool,
}

impl CachedRouteProvider {
    /// Create a caching wrapper with the given capacity.
    ///
    /// If `fallback_to_haversine` is true, cache misses that also fail in the
    /// inner provider will be retried with [`HaversineRouteProvider`].
    pub fn new(inner: Box<dyn RouteProvider>, capacity: usize, fallback_to_haversine: bool) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("cache capacity must be > 0"),
            )),
            fallback_to_haversine,
        }
    }
}

impl RouteProvider for CachedRouteProvider {
    fn route(&self, points: &[GeoPoint]) -> Option<RouteResult> {
        let key = RouteKey::from_points(points);

        // Fast path: cache hit
        {
            let mut cache = self.cache.lock().ok()?;
            if let Some(cached) = cache.get(&key) {
                return Some(cached.clone());
            }
        }

        // Slow path: query inner provider
        let result = self.inner.route(points).or_else(|| {
            if self.fallback_to_haversine {
                HaversineRouteProvider.route(points)
            } else {
                None
            }
        });

        // Store in cache
        if let Some(ref route) = result {
            if let Ok(mut cache) = self.cache.lock() {
                cache.put(key, route.clone());
            }
        }

        result
    }
}

// ---------------------------------------------------------------------------
// Factory: build a provider from RouteProviderKind
// ---------------------------------------------------------------------------

/// Default route cache capacity (used by OSRM and precomputed providers).
#[cfg(any(feature = "osrm", feature = "precomputed"))]
const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 20_000;

/// Construct a boxed [`RouteProvider`] from a [`RouteProviderKind`] descriptor.
///
/// - `Haversine` is returned without caching (it's already cheap).
/// - `Osrm` and `Precomputed` providers are wrapped in a [`CachedRouteProvider`]
///   with haversine fallback on failure.
pub fn build_route_provider(kind: &RouteProviderKind) -> Box<dyn RouteProvider> {
    match kind {
        RouteProviderKind::Haversine => Box::new(HaversineRouteProvider),

        #[cfg(feature = "osrm")]
        RouteProviderKind::Osrm { endpoint } => {
            let inner = Box::new(osrm::OsrmRouteProvider::new(endpoint));
            Box::new(CachedRouteProvider::new(
                inner,
                DEFAULT_ROUTE_CACHE_CAPACITY,
                true,
            ))
        }

        #[cfg(feature = "precomputed")]
        RouteProviderKind::Precomputed { path } => {
            match precomputed::PrecomputedRouteProvider::from_file(path) {
                Ok(provider) => {
                    let inner = Box::new(provider);
                    Box::new(CachedRouteProvider::new(
                        inner,
                        DEFAULT_ROUTE_CACHE_CAPACITY,
                        true,
                    ))
                }
                Err(e) => {
                    eprintln!(
                        "WARNING: Failed to load pre-computed route table from '{}': {}. Falling back to Haversine.",
                        path, e
                    );
                    Box::new(HaversineRouteProvider)
                }
            }
        }
    }
}
