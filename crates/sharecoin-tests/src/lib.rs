//! Scenario and property tests for the mining simulator.
//!
//! Everything runs against the in-memory `MockChain`; no node is needed.

pub mod helpers;
