//! This module defines the [`ServiceTemplate`] handed to the placement solver. A template is the
//! service chain written as a simple forward path, headed by the synthetic source function.
//!
//! Field names follow the record format of the external solver and must not change.

use std::collections::BTreeSet;

use crate::{
    chain::{ServiceChain, ServiceFunctions},
    constants::SOURCE_VNF,
};

/// A service template.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ServiceTemplate {
    /// The chain name.
    pub name: String,
    /// The synthetic source followed by the chain functions, in order.
    pub vnfs: Vec<Vnf>,
    /// One forward link per adjacent pair of `vnfs`.
    pub vlinks: Vec<VLink>,
}

impl ServiceTemplate {
    /// Builds the template for `chain`.
    ///
    /// Every chain function must have an entry in `functions`; its mean processing delay
    /// becomes the function's `vnf_delay`. Every link gets `max_delay` as its delay bound.
    pub fn build(
        chain: &ServiceChain,
        functions: &ServiceFunctions,
        max_delay: f64,
    ) -> Result<Self, TemplateError> {
        chain.validate(functions)?;
        let last = chain.functions.len() - 1;
        let vnfs = std::iter::once(Vnf::source())
            .chain(chain.functions.iter().enumerate().map(|(i, name)| {
                let delay = functions[name].processing_delay_mean;
                Vnf::normal(name, delay, i == last)
            }))
            .collect::<Vec<_>>();
        // The path is source -> f1 -> ... -> fN
        let vlinks = vnfs
            .windows(2)
            .map(|pair| VLink::forward(&pair[0].name, &pair[1].name, max_delay))
            .collect();
        Ok(Self {
            name: chain.name.clone(),
            vnfs,
            vlinks,
        })
    }

    /// Returns the function called `name`, if any.
    pub fn vnf(&self, name: &str) -> Option<&Vnf> {
        self.vnfs.iter().find(|v| v.name == name)
    }

    /// The set of function names, for order-insensitive comparison.
    pub fn vnf_names(&self) -> BTreeSet<&str> {
        self.vnfs.iter().map(|v| v.name.as_str()).collect()
    }

    /// The set of `(src, dest)` links, for order-insensitive comparison.
    pub fn links(&self) -> BTreeSet<(&str, &str)> {
        self.vlinks
            .iter()
            .map(|l| (l.src.as_str(), l.dest.as_str()))
            .collect()
    }
}

/// A function node of a [`ServiceTemplate`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vnf {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VnfKind,
    pub stateful: bool,
    pub inputs_fwd: usize,
    pub inputs_bwd: usize,
    pub outputs_fwd: usize,
    pub outputs_bwd: usize,
    /// Coefficients of the cpu demand as a linear function of the input data rate.
    pub cpu: Vec<f64>,
    /// Coefficients of the memory demand as a linear function of the input data rate.
    pub mem: Vec<f64>,
    pub vnf_delay: f64,
    /// Per forward output, coefficients of the output data rate.
    pub out_fwd: Vec<Vec<f64>>,
    pub out_bwd: Vec<Vec<f64>>,
}

impl Vnf {
    fn source() -> Self {
        Self {
            name: SOURCE_VNF.to_owned(),
            kind: VnfKind::Source,
            stateful: true,
            inputs_fwd: 0,
            inputs_bwd: 0,
            outputs_fwd: 1,
            outputs_bwd: 0,
            cpu: vec![0.0],
            mem: vec![0.0],
            vnf_delay: 0.0,
            out_fwd: Vec::new(),
            out_bwd: Vec::new(),
        }
    }

    // Memory is not modelled; every function costs one cpu unit per unit of data rate.
    fn normal(name: &str, vnf_delay: f64, terminal: bool) -> Self {
        let (outputs_fwd, out_fwd) = if terminal {
            (0, Vec::new())
        } else {
            (1, vec![vec![1.0, 0.0]])
        };
        Self {
            name: name.to_owned(),
            kind: VnfKind::Normal,
            stateful: false,
            inputs_fwd: 1,
            inputs_bwd: 0,
            outputs_fwd,
            outputs_bwd: 0,
            cpu: vec![1.0, 0.0],
            mem: vec![0.0, 0.0],
            vnf_delay,
            out_fwd,
            out_bwd: Vec::new(),
        }
    }

    /// Cpu demand for an input data rate.
    pub fn cpu_demand(&self, data_rate: f64) -> f64 {
        linear(&self.cpu, data_rate)
    }
}

fn linear(coeffs: &[f64], x: f64) -> f64 {
    match coeffs {
        [] => 0.0,
        [c] => *c,
        [slope, intercept, ..] => slope * x + intercept,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VnfKind {
    Source,
    Normal,
}

/// A directed link between two template functions.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VLink {
    pub direction: Direction,
    pub src: String,
    pub src_output: usize,
    pub dest: String,
    pub dest_input: usize,
    pub max_delay: f64,
}

impl VLink {
    fn forward(src: &str, dest: &str, max_delay: f64) -> Self {
        Self {
            direction: Direction::Forward,
            src: src.to_owned(),
            src_output: 0,
            dest: dest.to_owned(),
            dest_input: 0,
            max_delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

/// Errors building a [`ServiceTemplate`]. These are configuration errors and are raised before
/// any simulation step.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The chain has no functions.
    #[error("service chain {0} has no functions")]
    EmptyChain(String),

    /// A chain function has no parameters.
    #[error("service function {0} is missing from the service function list")]
    MissingFunction(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MAX_DELAY;
    use crate::testing;

    #[test]
    fn abc_template_is_a_simple_path() {
        let (chain, functions) = testing::abc_chain();
        let template = ServiceTemplate::build(&chain, &functions, DEFAULT_MAX_DELAY).unwrap();
        assert_eq!(template.name, "sfc_1");
        assert_eq!(template.vnfs.len(), 4);
        assert_eq!(template.vlinks.len(), 3);
        let path = template
            .vlinks
            .iter()
            .map(|l| (l.src.as_str(), l.dest.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(path, vec![(SOURCE_VNF, "a"), ("a", "b"), ("b", "c")]);
        assert!(template.vlinks.iter().all(|l| l.max_delay == 1000.0
            && l.direction == Direction::Forward
            && l.src_output == 0
            && l.dest_input == 0));
    }

    #[test]
    fn source_and_terminal_ports() {
        let (chain, functions) = testing::abc_chain();
        let template = ServiceTemplate::build(&chain, &functions, DEFAULT_MAX_DELAY).unwrap();
        let source = template.vnf(SOURCE_VNF).unwrap();
        assert_eq!(source.kind, VnfKind::Source);
        assert!(source.stateful);
        assert_eq!((source.inputs_fwd, source.outputs_fwd), (0, 1));
        assert_eq!(source.vnf_delay, 0.0);
        assert_eq!(source.cpu_demand(5.0), 0.0);

        let b = template.vnf("b").unwrap();
        assert_eq!((b.inputs_fwd, b.outputs_fwd), (1, 1));
        assert_eq!(b.out_fwd, vec![vec![1.0, 0.0]]);
        assert_eq!(b.vnf_delay, 2.0);
        assert_eq!(b.cpu_demand(5.0), 5.0);

        let c = template.vnf("c").unwrap();
        assert_eq!((c.inputs_fwd, c.outputs_fwd), (1, 0));
        assert!(c.out_fwd.is_empty());
        assert_eq!(c.vnf_delay, 3.0);
    }

    #[test]
    fn single_function_chain_is_terminal() {
        let (mut chain, functions) = testing::abc_chain();
        chain.functions.truncate(1);
        let template = ServiceTemplate::build(&chain, &functions, 50.0).unwrap();
        assert_eq!(template.vnfs.len(), 2);
        assert_eq!(template.vnfs[1].outputs_fwd, 0);
        assert_eq!(template.vlinks[0].max_delay, 50.0);
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let (chain, functions) = testing::abc_chain();
        let t1 = ServiceTemplate::build(&chain, &functions, DEFAULT_MAX_DELAY).unwrap();
        let t2 = ServiceTemplate::build(&chain, &functions, DEFAULT_MAX_DELAY).unwrap();
        assert_eq!(t1.vnf_names(), t2.vnf_names());
        assert_eq!(t1.links(), t2.links());
        assert_eq!(t1, t2);
    }

    #[test]
    fn missing_function_fails_before_building() {
        let (chain, mut functions) = testing::abc_chain();
        functions.remove("b");
        assert!(matches!(
            ServiceTemplate::build(&chain, &functions, DEFAULT_MAX_DELAY),
            Err(TemplateError::MissingFunction(f)) if f == "b"
        ));
    }

    #[test]
    fn serialized_field_names_match_solver_format() {
        let (chain, functions) = testing::abc_chain();
        let template = ServiceTemplate::build(&chain, &functions, DEFAULT_MAX_DELAY).unwrap();
        let value = serde_json::to_value(&template).unwrap();
        assert_eq!(value["vnfs"][0]["type"], "source");
        assert_eq!(value["vnfs"][1]["type"], "normal");
        assert_eq!(value["vlinks"][0]["direction"], "forward");
        let mut keys = value["vnfs"][1]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        keys.sort();
        insta::assert_snapshot!(keys.join(" "), @"cpu inputs_bwd inputs_fwd mem name out_bwd out_fwd outputs_bwd outputs_fwd stateful type vnf_delay");
    }
}
