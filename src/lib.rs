#![cfg_attr(coverage, feature(coverage_attribute))]

pub mod configuration;
pub mod services;
// COVERAGE: disabled since the module only carries shared test fixtures
#[cfg_attr(coverage, coverage(off))]
pub mod testing;
