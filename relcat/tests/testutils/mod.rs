//! Test utilities for relcat integration tests
//!
//! - TestFixture: registry, tracker and collector over one store, with the
//!   reference catalog scenario preloaded on request
//! - FlakyStore: store wrapper that injects timeouts and interleaved commits

#![allow(dead_code)]

pub mod flaky_store;
pub mod test_fixture;
