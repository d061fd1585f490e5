//! Traffic observations reported by the simulator after each step.

use std::collections::BTreeMap;

use log::trace;

use crate::network::NodeId;

type ChainRates = BTreeMap<String, BTreeMap<String, f64>>;

/// Aggregate incoming data rate per node, chain and function.
///
/// Lookups of entries the simulator did not report read as zero.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TrafficObservation {
    inner: BTreeMap<NodeId, ChainRates>,
}

impl TrafficObservation {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rate for `function` of `chain` at `node`, or zero if unreported.
    pub fn rate(&self, node: NodeId, chain: &str, function: &str) -> f64 {
        let rate = self
            .inner
            .get(&node)
            .and_then(|chains| chains.get(chain))
            .and_then(|functions| functions.get(function))
            .copied();
        match rate {
            Some(rate) => rate,
            None => {
                trace!("no traffic reported for {node}/{chain}/{function}, using 0");
                0.0
            }
        }
    }

    /// Sets the rate for `function` of `chain` at `node`.
    pub fn insert(&mut self, node: NodeId, chain: &str, function: &str, rate: f64) {
        self.inner
            .entry(node)
            .or_default()
            .entry(chain.to_owned())
            .or_default()
            .insert(function.to_owned(), rate);
    }

    /// Adds `rate` to the rate for `function` of `chain` at `node`.
    pub fn add(&mut self, node: NodeId, chain: &str, function: &str, rate: f64) {
        *self
            .inner
            .entry(node)
            .or_default()
            .entry(chain.to_owned())
            .or_default()
            .entry(function.to_owned())
            .or_default() += rate;
    }
}
