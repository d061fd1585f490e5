//! This crate contains implementations of the [`Simulator`](vnfloop_core::Simulator) trait.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

pub mod poisson;

pub use crate::poisson::{PoissonSim, SimConfig};
