//! A greedy baseline solver.

use rustc_hash::{FxHashMap, FxHashSet};
use vnfloop_core::{
    constants::SOURCE_VNF, FlowRoute, Network, NodeId, ResourceBounds, ServiceTemplate, Solver,
    SolverError, SolverResult, SourceSpec, Vnf, VnfAssignment, VnfKind,
};

/// Places flows one at a time, each function on the closest node with enough spare cpu.
///
/// For every hop, a node that already hosts the function is preferred over one that does not.
/// Distances are shortest-path delays from the node that processed the previous function; ties
/// are broken by canonical node order. A flow whose chain cannot be placed in full is skipped
/// and reserves nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedySolver;

impl GreedySolver {
    /// Creates a new greedy solver.
    pub fn new() -> Self {
        Self
    }
}

impl Solver for GreedySolver {
    fn place(
        &self,
        network: &Network,
        template: &ServiceTemplate,
        sources: &SourceSpec,
        bounds: ResourceBounds,
    ) -> Result<SolverResult, SolverError> {
        let functions = template
            .vnfs
            .iter()
            .filter(|v| v.kind == VnfKind::Normal)
            .collect::<Vec<_>>();
        let mut state = State::new(network, bounds);
        let mut result = SolverResult::default();

        for source in sources {
            if !network.contains(source.node) {
                return Err(SolverError::Other(anyhow::anyhow!(
                    "source at unknown node {}",
                    source.node
                )));
            }
            state.assign(&mut result, SOURCE_VNF, source.node);
            for flow in &source.flows {
                match state.route(&functions, source.node, flow.data_rate) {
                    Some(hops) => {
                        let mut prev = (source.node, source.vnf.as_str());
                        for (vnf, node, demand) in hops {
                            state.reserve(node, demand);
                            state.assign(&mut result, &vnf.name, node);
                            result.flows.push(FlowRoute {
                                flow_id: Some(flow.id.clone()),
                                src_node: prev.0,
                                dst_node: node,
                                src_vnf: Some(prev.1.to_owned()),
                                dest_vnf: vnf.name.clone(),
                            });
                            prev = (node, vnf.name.as_str());
                        }
                    }
                    None => log::warn!(
                        "Skipping flow {} from node {}: not enough cpu",
                        flow.id,
                        source.node
                    ),
                }
            }
        }
        Ok(result)
    }
}

#[derive(Debug)]
struct State<'a> {
    network: &'a Network,
    order: Vec<NodeId>,
    remaining: FxHashMap<NodeId, f64>,
    hosted: FxHashSet<(String, NodeId)>,
    delays: FxHashMap<NodeId, FxHashMap<NodeId, f64>>,
}

impl<'a> State<'a> {
    fn new(network: &'a Network, bounds: ResourceBounds) -> Self {
        let remaining = network
            .nodes()
            .map(|n| (n.id, n.cap.min(bounds.cpu)))
            .collect();
        Self {
            network,
            order: network.node_ids(),
            remaining,
            hosted: FxHashSet::default(),
            delays: FxHashMap::default(),
        }
    }

    // Returns the hops of one flow without reserving anything.
    fn route<'t>(
        &mut self,
        functions: &[&'t Vnf],
        start: NodeId,
        data_rate: f64,
    ) -> Option<Vec<(&'t Vnf, NodeId, f64)>> {
        let mut pending: FxHashMap<NodeId, f64> = FxHashMap::default();
        let mut hops: Vec<(&'t Vnf, NodeId, f64)> = Vec::with_capacity(functions.len());
        let mut at = start;
        for &vnf in functions {
            let demand = vnf.cpu_demand(data_rate);
            let candidates = self.candidates(at);
            let fits = |node: NodeId| {
                let used = pending.get(&node).copied().unwrap_or(0.0);
                self.remaining[&node] - used >= demand
            };
            let hosts = |node: NodeId| {
                self.hosted.contains(&(vnf.name.clone(), node))
                    || hops.iter().any(|(v, n, _)| v.name == vnf.name && *n == node)
            };
            let node = candidates
                .iter()
                .find(|&&n| hosts(n) && fits(n))
                .or_else(|| candidates.iter().find(|&&n| fits(n)))
                .copied()?;
            *pending.entry(node).or_default() += demand;
            hops.push((vnf, node, demand));
            at = node;
        }
        Some(hops)
    }

    // Reachable nodes from `from`, closest first, ties in canonical order.
    fn candidates(&mut self, from: NodeId) -> Vec<NodeId> {
        let network = self.network;
        let delays = self
            .delays
            .entry(from)
            .or_insert_with(|| network.delays_from(from));
        let mut nodes = self
            .order
            .iter()
            .filter_map(|n| delays.get(n).map(|&d| (*n, d)))
            .collect::<Vec<_>>();
        // Stable, so equal delays keep canonical order
        nodes.sort_by(|a, b| a.1.total_cmp(&b.1));
        nodes.into_iter().map(|(n, _)| n).collect()
    }

    fn reserve(&mut self, node: NodeId, demand: f64) {
        if let Some(cpu) = self.remaining.get_mut(&node) {
            *cpu -= demand;
        }
    }

    fn assign(&mut self, result: &mut SolverResult, name: &str, node: NodeId) {
        if self.hosted.insert((name.to_owned(), node)) {
            result.placement.push(VnfAssignment::new(name.to_owned(), node));
        }
    }
}
