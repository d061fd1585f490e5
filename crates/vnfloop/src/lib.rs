//! `vnfloop` places virtual network functions by running a placement solver and a traffic
//! simulator in a loop. The simulator reports the traffic it observed during one step; the loop
//! turns that traffic into solver sources, asks the solver for an embedding of the service chain,
//! and hands the resulting placement and forwarding schedule back to the simulator for the next
//! step. Steps without traffic keep the previous decision.

#![warn(unreachable_pub, missing_docs)]

pub mod core;
pub mod impls;
pub mod utils;
