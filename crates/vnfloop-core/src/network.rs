//! Physical network topologies. A [`Network`] is the validated form of a list of nodes and links;
//! its node declaration order is the canonical order used everywhere a per-node vector is built.

pub(crate) mod topology;
pub mod types;

use petgraph::algo::dijkstra;
use rustc_hash::FxHashMap;

pub use topology::TopologyError;
pub use types::*;

use self::topology::Topology;

#[derive(Debug, Clone)]
pub struct Network {
    topology: Topology,
    links: Vec<Link>,
}

impl Network {
    pub fn new(nodes: &[Node], links: &[Link]) -> Result<Self, TopologyError> {
        let topology = Topology::new(nodes, links)?;
        Ok(Self {
            topology,
            links: links.to_vec(),
        })
    }

    /// Node IDs in canonical order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(|n| n.id).collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.topology
            .idx_of(&id)
            .map(|&idx| &self.topology.graph[idx])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.topology.idx_of(&id).is_some()
    }

    /// Ingress node IDs in canonical order.
    pub fn ingress_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| n.is_ingress())
            .map(|n| n.id)
            .collect()
    }

    /// The single largest node capacity, or zero for an empty network.
    pub fn max_node_cap(&self) -> f64 {
        self.nodes().map(|n| n.cap).fold(0.0, f64::max)
    }

    /// Shortest-path delays from `src` to every reachable node, `src` included at zero.
    /// Returns an empty map if `src` is not in the network.
    pub fn delays_from(&self, src: NodeId) -> FxHashMap<NodeId, f64> {
        let Some(&start) = self.topology.idx_of(&src) else {
            return FxHashMap::default();
        };
        let g = &self.topology.graph;
        dijkstra(g, start, None, |e| e.weight().delay)
            .into_iter()
            .map(|(idx, delay)| (g[idx].id, delay))
            .collect()
    }

    delegate::delegate! {
        to self.topology.graph {
            #[call(node_weights)]
            pub fn nodes(&self) -> impl Iterator<Item = &Node>;

            #[call(node_count)]
            pub fn nr_nodes(&self) -> usize;
        }

        to self.links {
            #[call(iter)]
            pub fn links(&self) -> impl Iterator<Item = &Link>;
        }
    }
}
