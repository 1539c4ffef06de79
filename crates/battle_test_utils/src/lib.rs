//! # Battle Test Utilities
//!
//! Shared testing utilities for the battle crates:
//! - Fleet and research fixtures
//! - Determinism harness
//! - Engine parity harness
//! - Balance statistics over many seeds
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod determinism;
pub mod fixtures;
pub mod parity;

/// Re-export proptest for convenience.
pub use proptest;
