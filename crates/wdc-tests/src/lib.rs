//! # wdc-tests
//!
//! Integration tests for the Worldcoin consensus rules.
//!
//! This crate provides:
//! - An arena-backed block tree implementing the chain read interface
//! - Header and auxpow test doubles
//! - Retargeting scenarios for every era
//! - Property-based tests for the codec, proof of work, retargeting and subsidy

pub mod generators;
pub mod harness;

#[cfg(test)]
mod auxpow_tests;

#[cfg(test)]
mod property_tests;



pub use generators::*;
pub use harness::*;
