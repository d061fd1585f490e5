//! Placements and schedules, the two halves of the decision handed to the simulator.

use std::collections::BTreeMap;
use std::ops::Range;

use rustc_hash::FxHashMap;

use crate::chain::{SfName, SfcName};
use crate::network::NodeId;

/// The functions hosted by each node. Every node of the network has an entry, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Placement {
    inner: BTreeMap<NodeId, Vec<SfName>>,
}

impl Placement {
    /// Creates a placement where every node in `nodes` hosts nothing.
    pub fn empty(nodes: &[NodeId]) -> Self {
        Self {
            inner: nodes.iter().map(|&n| (n, Vec::new())).collect(),
        }
    }

    /// Adds `function` to the functions hosted by `node`.
    pub fn push(&mut self, node: NodeId, function: impl Into<SfName>) {
        self.inner.entry(node).or_default().push(function.into());
    }

    /// The functions hosted by `node`.
    pub fn functions_at(&self, node: NodeId) -> &[SfName] {
        self.inner.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns true if `node` hosts `function`.
    pub fn hosts(&self, node: NodeId, function: &str) -> bool {
        self.functions_at(node).iter().any(|f| f == function)
    }

    /// Returns true if any node hosts `function`.
    pub fn contains_function(&self, function: &str) -> bool {
        self.inner.values().flatten().any(|f| f == function)
    }

    delegate::delegate! {
        to self.inner {
            /// Iterates over the covered nodes.
            pub fn keys(&self) -> impl Iterator<Item = &NodeId>;

            #[call(len)]
            pub fn nr_nodes(&self) -> usize;
        }
    }
}

/// One cell of a [`Schedule`]: the probability that a flow at `src` requesting `function` of
/// `chain` is forwarded to `dest`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScheduleEntry {
    pub src: NodeId,
    pub chain: SfcName,
    pub function: SfName,
    pub dest: NodeId,
    pub prob: f64,
}

type RowKey = (NodeId, SfcName, SfName);

/// A probabilistic forwarding table.
///
/// Entries are grouped in rows, one per `(src, chain, function)`. Within a row the
/// probabilities sum to one, or are all zero when no flow was routed for that row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
    rows: FxHashMap<RowKey, Range<usize>>,
}

/// The nested form consumed by simulators: src -> chain -> function -> dest -> probability.
pub type NestedSchedule =
    BTreeMap<NodeId, BTreeMap<SfcName, BTreeMap<SfName, BTreeMap<NodeId, f64>>>>;

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row. `probs` pairs each destination with its probability.
    ///
    /// A row that was already present is replaced, entries included.
    pub fn push_row(
        &mut self,
        src: NodeId,
        chain: &str,
        function: &str,
        probs: impl IntoIterator<Item = (NodeId, f64)>,
    ) {
        if let Some(old) = self.rows.remove(&(src, chain.to_owned(), function.to_owned())) {
            let len = old.len();
            self.entries.drain(old.clone());
            for range in self.rows.values_mut() {
                if range.start >= old.end {
                    *range = range.start - len..range.end - len;
                }
            }
        }
        let start = self.entries.len();
        self.entries
            .extend(probs.into_iter().map(|(dest, prob)| ScheduleEntry {
                src,
                chain: chain.to_owned(),
                function: function.to_owned(),
                dest,
                prob,
            }));
        let end = self.entries.len();
        self.rows
            .insert((src, chain.to_owned(), function.to_owned()), start..end);
    }

    /// The entries of one row, in destination order.
    pub fn row(&self, src: NodeId, chain: &str, function: &str) -> &[ScheduleEntry] {
        self.rows
            .get(&(src, chain.to_owned(), function.to_owned()))
            .map(|range| &self.entries[range.clone()])
            .unwrap_or_default()
    }

    /// The probability of one cell, if the cell exists.
    pub fn prob(&self, src: NodeId, chain: &str, function: &str, dest: NodeId) -> Option<f64> {
        self.row(src, chain, function)
            .iter()
            .find(|e| e.dest == dest)
            .map(|e| e.prob)
    }

    /// The sum of one row's probabilities.
    pub fn row_sum(&self, src: NodeId, chain: &str, function: &str) -> f64 {
        self.row(src, chain, function).iter().map(|e| e.prob).sum()
    }

    /// Returns true if every row sums to one within `epsilon` or is entirely zero.
    pub fn is_normalized(&self, epsilon: f64) -> bool {
        self.rows.values().all(|range| {
            let row = &self.entries[range.clone()];
            let sum = row.iter().map(|e| e.prob).sum::<f64>();
            (sum - 1.0).abs() < epsilon || row.iter().all(|e| e.prob == 0.0)
        })
    }

    /// Returns true if a row exists for every `src` in `nodes` and every function in `functions`.
    pub fn is_total(&self, nodes: &[NodeId], chain: &str, functions: &[SfName]) -> bool {
        nodes.iter().all(|&src| {
            functions.iter().all(|f| {
                self.rows.contains_key(&(src, chain.to_owned(), f.to_owned()))
            })
        })
    }

    /// Renders the schedule into its nested form.
    pub fn to_nested(&self) -> NestedSchedule {
        let mut nested = NestedSchedule::new();
        for e in &self.entries {
            nested
                .entry(e.src)
                .or_default()
                .entry(e.chain.clone())
                .or_default()
                .entry(e.function.clone())
                .or_default()
                .insert(e.dest, e.prob);
        }
        nested
    }

    /// All entries, row by row.
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    delegate::delegate! {
        to self.rows {
            #[call(len)]
            pub fn nr_rows(&self) -> usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    #[test]
    fn placement_covers_empty_nodes() {
        let mut placement = Placement::empty(&[n(0), n(1), n(2)]);
        placement.push(n(1), "a");
        placement.push(n(1), "b");
        assert_eq!(placement.nr_nodes(), 3);
        assert!(placement.functions_at(n(0)).is_empty());
        assert_eq!(placement.functions_at(n(1)), ["a", "b"]);
        assert!(placement.hosts(n(1), "b"));
        assert!(!placement.hosts(n(2), "b"));
        assert!(placement.contains_function("a"));
        assert!(!placement.contains_function("c"));
    }

    #[test]
    fn rows_are_queryable() {
        let mut schedule = Schedule::new();
        schedule.push_row(n(0), "sfc", "a", [(n(0), 0.25), (n(1), 0.75)]);
        schedule.push_row(n(1), "sfc", "a", [(n(0), 0.0), (n(1), 0.0)]);
        assert_eq!(schedule.nr_rows(), 2);
        assert_eq!(schedule.row(n(0), "sfc", "a").len(), 2);
        assert_eq!(schedule.prob(n(0), "sfc", "a", n(1)), Some(0.75));
        assert_eq!(schedule.prob(n(0), "sfc", "b", n(1)), None);
        assert_eq!(schedule.row_sum(n(0), "sfc", "a"), 1.0);
        assert!(schedule.is_normalized(1e-9));
        assert!(schedule.is_total(&[n(0), n(1)], "sfc", &["a".to_owned()]));
        assert!(!schedule.is_total(&[n(0), n(1)], "sfc", &["a".to_owned(), "b".to_owned()]));
    }

    #[test]
    fn unnormalized_row_is_detected() {
        let mut schedule = Schedule::new();
        schedule.push_row(n(0), "sfc", "a", [(n(0), 0.5), (n(1), 0.4)]);
        assert!(!schedule.is_normalized(1e-9));
    }

    #[test]
    fn replaced_row_drops_its_old_entries() {
        let mut schedule = Schedule::new();
        schedule.push_row(n(0), "sfc", "a", [(n(0), 1.0), (n(1), 0.0)]);
        schedule.push_row(n(1), "sfc", "a", [(n(0), 0.5), (n(1), 0.5)]);
        schedule.push_row(n(0), "sfc", "a", [(n(0), 0.0), (n(1), 1.0)]);
        assert_eq!(schedule.nr_rows(), 2);
        assert_eq!(schedule.entries().len(), 4);
        assert_eq!(schedule.prob(n(0), "sfc", "a", n(1)), Some(1.0));
        assert_eq!(schedule.prob(n(1), "sfc", "a", n(0)), Some(0.5));
        let nested = schedule.to_nested();
        assert_eq!(nested[&n(0)]["sfc"]["a"][&n(0)], 0.0);
        assert!(schedule.is_normalized(1e-9));
    }

    #[test]
    fn nested_form() {
        let mut schedule = Schedule::new();
        schedule.push_row(n(0), "sfc", "a", [(n(0), 0.5), (n(1), 0.5)]);
        let nested = schedule.to_nested();
        assert_eq!(nested[&n(0)]["sfc"]["a"][&n(1)], 0.5);
        assert_eq!(nested[&n(0)]["sfc"]["a"].len(), 2);
    }
}
