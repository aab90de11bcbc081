//! # Scheduler Test Utilities
//!
//! Shared testing utilities for the scheduler crates:
//! - Resource state builders and canned fixtures
//! - Determinism test harness over a scripted economy
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
