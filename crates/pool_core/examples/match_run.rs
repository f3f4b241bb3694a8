//! Run a stream of ride requests against a small fleet and print each decision.
//!
//! Run with: cargo run -p pool_core --example match_run

use pool_core::config::MatchingConfig;
use pool_core::diagnostics::DiagnosticLog;
use pool_core::fleet::SequentialStopIds;
use pool_core::matching::{MatchResult, MatchingEngine};
use pool_core::test_support::{random_requests, seeded_snapshot, FixedRouteProvider};

fn main() {
    const NUM_VEHICLES: usize = 5;
    const NUM_PLANNED_TRIPS: usize = 3;
    const NUM_REQUESTS: usize = 20;

    let snapshot = seeded_snapshot(123, NUM_VEHICLES, NUM_PLANNED_TRIPS);
    let config = MatchingConfig::default();
    let router = FixedRouteProvider::at_kmh(40.0);
    let engine = MatchingEngine::new(&router, &config);
    let mut ids = SequentialStopIds::starting_at(10_000);
    let mut diag = DiagnosticLog::new();

    println!(
        "--- Matching {} requests against {} vehicles / {} planned trips (seed 123) ---",
        NUM_REQUESTS, NUM_VEHICLES, NUM_PLANNED_TRIPS
    );

    let mut pooled = 0;
    let mut fresh = 0;
    let mut rejected = 0;
    for (i, request) in random_requests(7, NUM_REQUESTS).iter().enumerate() {
        let result = engine.find_match(request, &snapshot, &mut ids, &mut diag);
        match result {
            MatchResult::Pool {
                trip,
                vehicle,
                pickup_ms,
                dropoff_ms,
                ..
            } => {
                pooled += 1;
                println!(
                    "  {:>2}  pool     trip={:?} vehicle={:?} pickup={}s dropoff={}s",
                    i + 1,
                    trip,
                    vehicle,
                    pickup_ms / 1000,
                    dropoff_ms / 1000,
                );
            }
            MatchResult::NewTrip {
                vehicle,
                pickup_ms,
                dropoff_ms,
                ..
            } => {
                fresh += 1;
                println!(
                    "  {:>2}  new      vehicle={:?} pickup={}s dropoff={}s",
                    i + 1,
                    vehicle,
                    pickup_ms / 1000,
                    dropoff_ms / 1000,
                );
            }
            MatchResult::Rejected {
                reason,
                earliest_available_ms,
            } => {
                rejected += 1;
                match earliest_available_ms {
                    Some(ready) => println!(
                        "  {:>2}  rejected {} (earliest vehicle at {}s)",
                        i + 1,
                        reason,
                        ready / 1000
                    ),
                    None => println!("  {:>2}  rejected {}", i + 1, reason),
                }
            }
        }
    }

    println!("\nPooled: {pooled}  New trips: {fresh}  Rejected: {rejected}");
    println!("Diagnostic events recorded: {}", diag.events.len());
}
