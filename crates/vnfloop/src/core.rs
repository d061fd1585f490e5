//! Core vnfloop data structures, traits, and routines. The most common entry point is
//! [driver::Driver], which drives a [Simulator] and a [Solver] for a number of steps.

pub use vnfloop_core::*;
