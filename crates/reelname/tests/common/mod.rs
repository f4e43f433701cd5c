//! Shared test utilities for reelname integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated test execution with a temp library, destination and database
//! - `FakeCatalog`, a scripted in-memory catalog
//! - Builder patterns for creating configs and scanner output programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{movie_result, tv_result, FakeCatalog, TestHarness};
