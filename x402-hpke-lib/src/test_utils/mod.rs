//! Deterministic fixtures for envelope testing.
//!
//! Available with the `test-utils` feature or in test builds.

mod fixtures;

pub use fixtures::*;
