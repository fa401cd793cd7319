//! Integration test suite for the TCSPC decay engine.
//!
//! Tests under `tests/` pin the engine against reference scenarios computed
//! independently of this code base, and check cross-method properties on
//! realistic instrument responses.

pub mod helpers;
