pub mod config;
pub mod diagnostics;
pub mod fleet;
pub mod geo;
pub mod matching;
pub mod routing;

#[cfg(feature = "test-helpers")]
pub mod test_support;
