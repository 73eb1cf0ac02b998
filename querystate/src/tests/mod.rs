//! Property-based tests for querystate
//!
//! These tests use proptest to check the codec and driver invariants
//! across arbitrary wire text and setter input.

#[cfg(test)]
pub mod codec_tests;

#[cfg(test)]
pub mod form_tests;
