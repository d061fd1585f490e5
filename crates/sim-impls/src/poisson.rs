//! A flow-level simulator with Poisson arrivals.
//!
//! Each step is simulated independently: flows arrive at every ingress node, walk the first
//! service chain according to the current schedule, and either complete or are dropped. Node
//! capacity is consumed by the data rate of every flow a node processes during the step. A
//! dropped flow releases the capacity it reserved at earlier hops.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_distr::{Exp, Normal};
use rustc_hash::FxHashMap;
use vnfloop_core::{
    Action, ApplyState, InitState, Network, NetworkStats, NodeId, ServiceChain, ServiceFunctions,
    SfName, Simulator, SimulatorError, TrafficObservation,
};

/// Traffic parameters of the simulator.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SimConfig {
    /// Mean time between flow arrivals at one ingress node.
    pub inter_arrival_mean: f64,
    /// Whether arrivals are spaced exactly `inter_arrival_mean` apart.
    #[serde(default)]
    pub deterministic_arrival: bool,
    /// Mean flow data rate.
    pub flow_dr_mean: f64,
    /// Standard deviation of the flow data rate.
    #[serde(default)]
    pub flow_dr_stdev: f64,
    /// Mean flow size.
    pub flow_size: f64,
    /// Simulated time per step.
    pub run_duration: f64,
}

/// A Poisson traffic simulator.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct PoissonSim {
    network: Network,
    chains: Vec<ServiceChain>,
    service_functions: ServiceFunctions,
    config: SimConfig,
    #[builder(default, setter(skip))]
    state: Option<RunState>,
}

#[derive(Debug)]
struct RunState {
    rng: StdRng,
    arrival: Exp<f64>,
    data_rate: Normal<f64>,
    processing: FxHashMap<SfName, Normal<f64>>,
    delays: FxHashMap<NodeId, FxHashMap<NodeId, f64>>,
    stats: NetworkStats,
    delay_sum: f64,
}

impl PoissonSim {
    fn new_state(&self, seed: u64) -> anyhow::Result<RunState> {
        let c = &self.config;
        anyhow::ensure!(
            c.inter_arrival_mean > 0.0,
            "inter-arrival mean must be positive"
        );
        anyhow::ensure!(c.run_duration > 0.0, "run duration must be positive");
        anyhow::ensure!(
            c.flow_dr_mean > 0.0,
            "mean flow data rate must be positive"
        );
        let processing = self
            .service_functions
            .iter()
            .map(|(name, spec)| {
                let dist = Normal::new(spec.processing_delay_mean, spec.processing_delay_stdev)?;
                Ok::<_, anyhow::Error>((name.clone(), dist))
            })
            .collect::<anyhow::Result<_>>()?;
        Ok(RunState {
            rng: StdRng::seed_from_u64(seed),
            arrival: Exp::new(c.inter_arrival_mean.recip())?,
            data_rate: Normal::new(c.flow_dr_mean, c.flow_dr_stdev)?,
            processing,
            delays: FxHashMap::default(),
            stats: NetworkStats::default(),
            delay_sum: 0.0,
        })
    }
}

impl Simulator for PoissonSim {
    fn init(&mut self, seed: u64) -> Result<InitState, SimulatorError> {
        self.state = Some(self.new_state(seed)?);
        log::info!(
            "Simulating {} nodes, {} chains, seed {seed}",
            self.network.nr_nodes(),
            self.chains.len()
        );
        Ok(InitState {
            chains: self.chains.clone(),
            service_functions: self.service_functions.clone(),
            network: self.network.clone(),
            network_stats: NetworkStats::default(),
        })
    }

    fn apply(&mut self, action: &Action) -> Result<ApplyState, SimulatorError> {
        if let Some(node) = action.placement.keys().find(|&&n| !self.network.contains(n)) {
            return Err(SimulatorError::InvalidAction(format!("node {node}")));
        }
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("simulator applied before initialization"))?;
        let mut traffic = TrafficObservation::new();
        let Some(chain) = self.chains.first() else {
            return Ok(ApplyState {
                traffic,
                network_stats: state.stats,
            });
        };

        let mut load: FxHashMap<NodeId, f64> = FxHashMap::default();
        for ingress in self.network.ingress_nodes() {
            let mut t = 0.0;
            loop {
                t += if self.config.deterministic_arrival {
                    self.config.inter_arrival_mean
                } else {
                    state.arrival.sample(&mut state.rng)
                };
                if t >= self.config.run_duration {
                    break;
                }
                let rate = state.data_rate.sample(&mut state.rng).max(f64::EPSILON);
                state.stats.total_flows += 1;
                let walk = Walk {
                    network: &self.network,
                    chain,
                    action,
                    rate,
                };
                match walk.run(ingress, state, &mut traffic, &mut load) {
                    Some(delay) => {
                        state.stats.successful_flows += 1;
                        state.delay_sum += delay;
                    }
                    None => state.stats.dropped_flows += 1,
                }
            }
        }
        if state.stats.successful_flows > 0 {
            state.stats.avg_end2end_delay = state.delay_sum / state.stats.successful_flows as f64;
        }
        log::debug!(
            "Step done: {} flows, {} dropped so far",
            state.stats.total_flows,
            state.stats.dropped_flows
        );
        Ok(ApplyState {
            traffic,
            network_stats: state.stats,
        })
    }
}

// One flow traversing the chain.
struct Walk<'a> {
    network: &'a Network,
    chain: &'a ServiceChain,
    action: &'a Action,
    rate: f64,
}

impl Walk<'_> {
    // Returns the end-to-end delay, or `None` if the flow was dropped.
    fn run(
        &self,
        ingress: NodeId,
        state: &mut RunState,
        traffic: &mut TrafficObservation,
        load: &mut FxHashMap<NodeId, f64>,
    ) -> Option<f64> {
        let mut reserved = Vec::with_capacity(self.chain.functions.len());
        let delay = self.hops(ingress, state, traffic, load, &mut reserved);
        if delay.is_none() {
            for node in reserved {
                if let Some(used) = load.get_mut(&node) {
                    *used -= self.rate;
                }
            }
        }
        delay
    }

    fn hops(
        &self,
        ingress: NodeId,
        state: &mut RunState,
        traffic: &mut TrafficObservation,
        load: &mut FxHashMap<NodeId, f64>,
        reserved: &mut Vec<NodeId>,
    ) -> Option<f64> {
        let mut at = ingress;
        let mut delay = 0.0;
        for function in &self.chain.functions {
            traffic.add(at, &self.chain.name, function, self.rate);
            let row = self.action.schedule.row(at, &self.chain.name, function);
            // Fails on empty or all-zero rows
            let dist = WeightedIndex::new(row.iter().map(|e| e.prob)).ok()?;
            let dest = row[dist.sample(&mut state.rng)].dest;
            if !self.action.placement.hosts(dest, function) {
                return None;
            }
            let cap = self.network.node(dest)?.cap;
            let used = load.entry(dest).or_default();
            if *used + self.rate > cap {
                return None;
            }
            *used += self.rate;
            reserved.push(dest);
            let network = self.network;
            let path = *state
                .delays
                .entry(at)
                .or_insert_with(|| network.delays_from(at))
                .get(&dest)?;
            let processing = state
                .processing
                .get(function)
                .map_or(0.0, |d| d.sample(&mut state.rng).max(0.0));
            delay += path + processing;
            at = dest;
        }
        Some(delay)
    }
}
