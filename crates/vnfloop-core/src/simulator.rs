//! The interface to traffic simulators.

use crate::{
    chain::{ServiceChain, ServiceFunctions},
    network::Network,
    schedule::{Placement, Schedule},
    traffic::TrafficObservation,
};

/// An interface for traffic simulators.
///
/// A simulator is stateful: `init` is called once, then `apply` once per step, with the
/// placement and schedule that should govern that step.
pub trait Simulator {
    /// Initializes the simulator and returns its static state.
    fn init(&mut self, seed: u64) -> Result<InitState, SimulatorError>;

    /// Runs one step under `action` and returns the traffic observed during it.
    fn apply(&mut self, action: &Action) -> Result<ApplyState, SimulatorError>;
}

impl<S: Simulator + ?Sized> Simulator for &mut S {
    fn init(&mut self, seed: u64) -> Result<InitState, SimulatorError> {
        (**self).init(seed)
    }

    fn apply(&mut self, action: &Action) -> Result<ApplyState, SimulatorError> {
        (**self).apply(action)
    }
}

impl<S: Simulator + ?Sized> Simulator for Box<S> {
    fn init(&mut self, seed: u64) -> Result<InitState, SimulatorError> {
        (**self).init(seed)
    }

    fn apply(&mut self, action: &Action) -> Result<ApplyState, SimulatorError> {
        (**self).apply(action)
    }
}

/// The state reported by [`Simulator::init`].
#[derive(Debug, Clone)]
pub struct InitState {
    /// Service chains, in declaration order.
    pub chains: Vec<ServiceChain>,
    pub service_functions: ServiceFunctions,
    pub network: Network,
    pub network_stats: NetworkStats,
}

/// The decision governing one simulation step.
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct Action {
    pub placement: Placement,
    pub schedule: Schedule,
}

/// The state reported by [`Simulator::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyState {
    pub traffic: TrafficObservation,
    pub network_stats: NetworkStats,
}

/// Cumulative flow statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NetworkStats {
    pub total_flows: u64,
    pub successful_flows: u64,
    pub dropped_flows: u64,
    pub in_network_flows: u64,
    pub avg_end2end_delay: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("action references unknown node or function: {0}")]
    InvalidAction(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
