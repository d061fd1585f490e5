//! This module turns traffic observations into solver sources. The solver expects its input
//! flows to run in parallel and compete for resources, so the synthesizer estimates how many
//! flows are in flight at each ingress node and emits that many flows of the mean data rate.

use derivative::Derivative;

use crate::{constants::SOURCE_VNF, network::NodeId, traffic::TrafficObservation};

/// How the number of synthetic flows per node is derived from an observed rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Derivative, serde::Serialize, serde::Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisPolicy {
    /// `floor(rate / mean_flow_rate)` flows.
    RateRatio,
    /// `ceil(rate * (processing_delay + flow_duration) / step_duration)` flows, i.e. the mean
    /// number of flows in the system over one step.
    #[derivative(Default)]
    Overlap,
}

/// Parameters of the source synthesizer.
///
/// The flow duration is taken as the mean flow size over the mean flow rate. With variable flow
/// sizes the overlap estimate is an approximation.
#[derive(Debug, Clone, Copy, PartialEq, typed_builder::TypedBuilder, serde::Serialize)]
pub struct SynthesisParams {
    /// The counting policy.
    #[builder(default)]
    pub policy: SynthesisPolicy,
    /// Data rate of every synthetic flow.
    pub mean_flow_rate: f64,
    /// Mean function processing delay.
    #[builder(default)]
    pub processing_delay: f64,
    /// Mean time a flow spends being transmitted.
    #[builder(default)]
    pub flow_duration: f64,
    /// Duration of one simulation step.
    #[builder(default = 1.0)]
    pub step_duration: f64,
}

impl SynthesisParams {
    /// Creates parameters with the flow duration derived from the mean flow size.
    pub fn from_flow_size(
        policy: SynthesisPolicy,
        mean_flow_rate: f64,
        flow_size: f64,
        processing_delay: f64,
        step_duration: f64,
    ) -> Self {
        Self {
            policy,
            mean_flow_rate,
            processing_delay,
            flow_duration: flow_size / mean_flow_rate,
            step_duration,
        }
    }

    /// Number of synthetic flows for an observed `rate`.
    pub fn flows_for(&self, rate: f64) -> usize {
        let n = match self.policy {
            SynthesisPolicy::RateRatio => (rate / self.mean_flow_rate).floor(),
            SynthesisPolicy::Overlap => {
                (rate * (self.processing_delay + self.flow_duration) / self.step_duration).ceil()
            }
        };
        if n.is_finite() && n > 0.0 {
            n as usize
        } else {
            0
        }
    }
}

/// A synthetic flow.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceFlow {
    pub id: String,
    pub data_rate: f64,
}

/// The flows entering the network at one node, all emitted by the synthetic source function.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Source {
    pub node: NodeId,
    pub vnf: String,
    pub flows: Vec<SourceFlow>,
}

impl Source {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            vnf: SOURCE_VNF.to_owned(),
            flows: Vec::new(),
        }
    }
}

/// All sources of one solver invocation.
pub type SourceSpec = Vec<Source>;

// Flow IDs are unique within one `SourceSpec`: `f1`, `f2`, ... across all nodes.
#[derive(Debug)]
struct FlowIds {
    next: usize,
}

impl FlowIds {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn flows(&mut self, n: usize, data_rate: f64) -> Vec<SourceFlow> {
        (0..n)
            .map(|_| {
                let id = format!("f{}", self.next);
                self.next += 1;
                SourceFlow { id, data_rate }
            })
            .collect()
    }
}

/// Synthesizes the sources for one solver invocation from a traffic observation.
///
/// A node contributes a source iff its observed rate for `first_function` is positive. The
/// returned flag is false iff no node contributed, in which case the spec is empty and must not
/// be handed to the solver.
pub fn synthesize(
    observation: &TrafficObservation,
    chain: &str,
    first_function: &str,
    ingress_nodes: &[NodeId],
    params: &SynthesisParams,
) -> (SourceSpec, bool) {
    let mut ids = FlowIds::new();
    let mut spec = SourceSpec::new();
    for &node in ingress_nodes {
        let rate = observation.rate(node, chain, first_function);
        if rate > 0.0 {
            let mut source = Source::new(node);
            source.flows = ids.flows(params.flows_for(rate), params.mean_flow_rate);
            spec.push(source);
        }
    }
    let exists = !spec.is_empty();
    (spec, exists)
}

/// The sources used before any traffic has been observed: one flow of the mean rate per ingress
/// node.
pub fn seed_sources(ingress_nodes: &[NodeId], mean_flow_rate: f64) -> SourceSpec {
    let mut ids = FlowIds::new();
    ingress_nodes
        .iter()
        .map(|&node| {
            let mut source = Source::new(node);
            source.flows = ids.flows(1, mean_flow_rate);
            source
        })
        .collect()
}
