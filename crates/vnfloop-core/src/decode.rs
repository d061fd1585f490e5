//! Decoding of solver results into a [`Placement`] and a [`Schedule`].

use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::{
    chain::SfName,
    constants::SOURCE_VNF,
    network::NodeId,
    normalize::normalize,
    schedule::{Placement, Schedule},
    solver::SolverResult,
};

/// Decodes a solver result.
///
/// The placement covers every node in `nodes` and never contains the synthetic source. The
/// schedule has one row for every node in `nodes` and every function in `functions`; each row
/// lists the destinations in the order of `nodes`. The probability of a destination is the share
/// of routed flows from the row's node to that destination for the row's function. Rows with no
/// routed flows are all zero.
pub fn decode(
    result: &SolverResult,
    nodes: &[NodeId],
    chain: &str,
    functions: &[SfName],
) -> Result<(Placement, Schedule), DecodeError> {
    let known = |id: NodeId| nodes.contains(&id);

    let mut placement = Placement::empty(nodes);
    // The simulator has no notion of the synthetic source and rejects it.
    for vnf in result.placement.iter().filter(|v| v.name != SOURCE_VNF) {
        if !known(vnf.node) {
            return Err(DecodeError::UnknownNode(vnf.node));
        }
        placement.push(vnf.node, vnf.name.as_str());
    }

    // Number of flows forwarded from a source node to a destination node for a function
    let mut counts: FxHashMap<(NodeId, NodeId, &str), usize> = FxHashMap::default();
    for route in &result.flows {
        for node in [route.src_node, route.dst_node] {
            if !known(node) {
                return Err(DecodeError::UnknownNode(node));
            }
        }
        *counts
            .entry((route.src_node, route.dst_node, route.dest_vnf.as_str()))
            .or_default() += 1;
    }

    let mut schedule = Schedule::new();
    for (&src, function) in nodes.iter().cartesian_product(functions) {
        let row = nodes
            .iter()
            .map(|&dst| {
                counts
                    .get(&(src, dst, function.as_str()))
                    .copied()
                    .unwrap_or(0) as f64
            })
            .collect::<Vec<_>>();
        let probs = normalize(&row);
        schedule.push_row(src, chain, function, nodes.iter().copied().zip(probs));
    }
    Ok((placement, schedule))
}

/// Errors decoding a solver result. A result that fails to decode must not reach the simulator.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A required section of the result is absent.
    #[error("solver result is missing `{0}`")]
    MissingField(&'static str),

    /// The result references a node outside the network.
    #[error("solver result references unknown node {0}")]
    UnknownNode(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{FlowRoute, VnfAssignment};

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    fn functions(names: &[&str]) -> Vec<SfName> {
        names.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn even_split_between_two_nodes() {
        let nodes = [n(1), n(2)];
        let result = SolverResult {
            placement: vec![VnfAssignment::new("f".into(), n(1))],
            flows: vec![
                FlowRoute::new(n(1), n(1), "f"),
                FlowRoute::new(n(1), n(2), "f"),
            ],
        };
        let (_, schedule) = decode(&result, &nodes, "sfc", &functions(&["f"])).unwrap();
        assert_eq!(schedule.prob(n(1), "sfc", "f", n(1)), Some(0.5));
        assert_eq!(schedule.prob(n(1), "sfc", "f", n(2)), Some(0.5));
        // No flows leave n2 for f
        assert_eq!(schedule.prob(n(2), "sfc", "f", n(1)), Some(0.0));
        assert_eq!(schedule.prob(n(2), "sfc", "f", n(2)), Some(0.0));
    }

    #[test]
    fn rows_follow_canonical_node_order() {
        let nodes = [n(3), n(1), n(2)];
        let result = SolverResult {
            placement: Vec::new(),
            flows: vec![
                FlowRoute::new(n(3), n(2), "a"),
                FlowRoute::new(n(3), n(2), "a"),
                FlowRoute::new(n(3), n(3), "a"),
                FlowRoute::new(n(3), n(1), "a"),
            ],
        };
        let (_, schedule) = decode(&result, &nodes, "sfc", &functions(&["a"])).unwrap();
        let row = schedule
            .row(n(3), "sfc", "a")
            .iter()
            .map(|e| (e.dest, e.prob))
            .collect::<Vec<_>>();
        assert_eq!(row, vec![(n(3), 0.25), (n(1), 0.25), (n(2), 0.5)]);
    }

    #[test]
    fn schedule_is_total_and_normalized() {
        let nodes = [n(0), n(1), n(2)];
        let chain = functions(&["a", "b", "c"]);
        let result = SolverResult {
            placement: Vec::new(),
            flows: vec![
                FlowRoute::new(n(0), n(1), "a"),
                FlowRoute::new(n(1), n(1), "b"),
                FlowRoute::new(n(1), n(2), "c"),
                FlowRoute::new(n(0), n(0), "a"),
                FlowRoute::new(n(0), n(2), "a"),
            ],
        };
        let (_, schedule) = decode(&result, &nodes, "sfc", &chain).unwrap();
        assert_eq!(schedule.nr_rows(), 9);
        assert_eq!(schedule.entries().len(), 27);
        assert!(schedule.is_total(&nodes, "sfc", &chain));
        assert!(schedule.is_normalized(1e-9));
        assert!((schedule.row_sum(n(0), "sfc", "a") - 1.0).abs() < 1e-9);
        assert_eq!(schedule.row_sum(n(2), "sfc", "c"), 0.0);
    }

    #[test]
    fn synthetic_source_is_stripped() {
        let nodes = [n(0), n(1)];
        let result = SolverResult {
            placement: vec![
                VnfAssignment::new(SOURCE_VNF.into(), n(0)),
                VnfAssignment::new("a".into(), n(0)),
                VnfAssignment::new(SOURCE_VNF.into(), n(1)),
                VnfAssignment::new("b".into(), n(1)),
            ],
            flows: vec![FlowRoute::new(n(0), n(0), "a")],
        };
        let (placement, _) = decode(&result, &nodes, "sfc", &functions(&["a", "b"])).unwrap();
        assert!(!placement.contains_function(SOURCE_VNF));
        assert_eq!(placement.functions_at(n(0)), ["a"]);
        assert_eq!(placement.functions_at(n(1)), ["b"]);
    }

    #[test]
    fn placement_covers_all_nodes() {
        let nodes = [n(0), n(1), n(2)];
        let result = SolverResult {
            placement: vec![VnfAssignment::new("a".into(), n(1))],
            flows: Vec::new(),
        };
        let (placement, schedule) = decode(&result, &nodes, "sfc", &functions(&["a"])).unwrap();
        assert_eq!(placement.keys().copied().collect::<Vec<_>>(), nodes);
        assert!(placement.functions_at(n(0)).is_empty());
        assert!(schedule.entries().iter().all(|e| e.prob == 0.0));
    }

    #[test]
    fn unknown_node_fails() {
        let nodes = [n(0)];
        let result = SolverResult {
            placement: Vec::new(),
            flows: vec![FlowRoute::new(n(0), n(7), "a")],
        };
        assert!(matches!(
            decode(&result, &nodes, "sfc", &functions(&["a"])),
            Err(DecodeError::UnknownNode(id)) if id == n(7)
        ));

        let result = SolverResult {
            placement: vec![VnfAssignment::new("a".into(), n(9))],
            flows: Vec::new(),
        };
        assert!(matches!(
            decode(&result, &nodes, "sfc", &functions(&["a"])),
            Err(DecodeError::UnknownNode(..))
        ));
    }
}
