//! This crate contains implementations of the [`Solver`](vnfloop_core::Solver) trait. The types
//! here bridge the placement loop and its backend solvers.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

pub mod external;
pub mod greedy;

pub use crate::external::ExternalSolver;
pub use crate::greedy::GreedySolver;
