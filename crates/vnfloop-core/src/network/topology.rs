use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::network::types::{Channel, Link, Node, NodeId};

#[derive(Debug, Clone)]
pub(crate) struct Topology {
    pub(crate) graph: DiGraph<Node, Channel>,
    pub(crate) id2idx: FxHashMap<NodeId, NodeIndex>,
}

impl Topology {
    /// Creates a network topology from a list of nodes and links. This function returns an error if
    /// the given specification fails to produce a valid topology. The checks are not exhaustive.
    ///
    /// Correctness properties:
    ///
    /// - Every node must have a unique ID.
    /// - Every node must have a non-negative capacity.
    /// - Every link must have distinct endpoints in `nodes`.
    /// - Every link must have a non-negative capacity and delay.
    /// - For any two nodes, there must be at most one link between them.
    pub(crate) fn new(nodes: &[Node], links: &[Link]) -> Result<Self, TopologyError> {
        let mut g = DiGraph::new();
        let mut id2idx = FxHashMap::default();
        for n in nodes.iter().cloned() {
            // CORRECTNESS: Every node must have a non-negative capacity.
            if n.cap < 0.0 || n.cap.is_nan() {
                return Err(TopologyError::InvalidNodeCap(n.id));
            }
            let id = n.id;
            let idx = g.add_node(n);
            if id2idx.insert(id, idx).is_some() {
                // CORRECTNESS: Every node must have a unique ID.
                return Err(TopologyError::DuplicateNodeId(id));
            }
        }
        for &Link { a, b, cap, delay } in links {
            // CORRECTNESS: Every link must have distinct endpoints in `nodes`.
            if a == b {
                return Err(TopologyError::NodeAdjacentSelf(a));
            }
            let ia = *id2idx.get(&a).ok_or(TopologyError::UndeclaredNode(a))?;
            let ib = *id2idx.get(&b).ok_or(TopologyError::UndeclaredNode(b))?;
            // CORRECTNESS: Every link must have a non-negative capacity and delay.
            if cap < 0.0 || cap.is_nan() || delay < 0.0 || delay.is_nan() {
                return Err(TopologyError::InvalidLink { n1: a, n2: b });
            }
            // CORRECTNESS: For any two nodes, there must be at most one link between them.
            if g.find_edge(ia, ib).is_some() {
                return Err(TopologyError::DuplicateLink { n1: a, n2: b });
            }
            // Channels are unidirectional
            g.add_edge(ia, ib, Channel::new(delay));
            g.add_edge(ib, ia, Channel::new(delay));
        }
        Ok(Self { graph: g, id2idx })
    }

    pub(crate) fn idx_of(&self, id: &NodeId) -> Option<&NodeIndex> {
        self.id2idx.get(id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Duplicate node ID {0}")]
    DuplicateNodeId(NodeId),

    #[error("Node {0} has a negative or undefined capacity")]
    InvalidNodeCap(NodeId),

    #[error("Node {0} is connected to itself")]
    NodeAdjacentSelf(NodeId),

    #[error("Node {0} is not declared")]
    UndeclaredNode(NodeId),

    #[error("Duplicate links between {n1} and {n2}")]
    DuplicateLink { n1: NodeId, n2: NodeId },

    #[error("Link between {n1} and {n2} has a negative or undefined capacity or delay")]
    InvalidLink { n1: NodeId, n2: NodeId },
}
