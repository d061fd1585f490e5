//! Utilities for reading inputs and writing results.

pub use vnfloop_utils::*;
