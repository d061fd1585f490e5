//! The interface to placement solvers.

use crate::{
    decode::DecodeError,
    network::{Network, NodeId},
    source::SourceSpec,
    template::ServiceTemplate,
};

/// An interface for placement solvers.
///
/// A solver embeds a [`ServiceTemplate`] into a [`Network`] for the given sources, within the
/// given resource bounds. It must be deterministic given identical inputs.
pub trait Solver {
    /// Computes an embedding. Callers never pass an empty `sources`.
    fn place(
        &self,
        network: &Network,
        template: &ServiceTemplate,
        sources: &SourceSpec,
        bounds: ResourceBounds,
    ) -> Result<SolverResult, SolverError>;
}

impl<S: Solver + ?Sized> Solver for &S {
    fn place(
        &self,
        network: &Network,
        template: &ServiceTemplate,
        sources: &SourceSpec,
        bounds: ResourceBounds,
    ) -> Result<SolverResult, SolverError> {
        (**self).place(network, template, sources, bounds)
    }
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn place(
        &self,
        network: &Network,
        template: &ServiceTemplate,
        sources: &SourceSpec,
        bounds: ResourceBounds,
    ) -> Result<SolverResult, SolverError> {
        (**self).place(network, template, sources, bounds)
    }
}

/// Per-node and per-link resource bounds.
#[derive(Debug, Clone, Copy, PartialEq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct ResourceBounds {
    pub cpu: f64,
    pub mem: f64,
    pub link_rate: f64,
}

/// The output of a solver.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SolverResult {
    /// Function-to-node assignments, including the synthetic source.
    pub placement: Vec<VnfAssignment>,
    /// Realized flow routes.
    pub flows: Vec<FlowRoute>,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_new::new, serde::Serialize, serde::Deserialize)]
pub struct VnfAssignment {
    pub name: String,
    pub node: NodeId,
}

/// One hop of a routed flow: the flow leaves `src_node` towards `dst_node`, where `dest_vnf`
/// processes it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FlowRoute {
    #[serde(default)]
    pub flow_id: Option<String>,
    pub src_node: NodeId,
    pub dst_node: NodeId,
    #[serde(default)]
    pub src_vnf: Option<String>,
    pub dest_vnf: String,
}

impl FlowRoute {
    pub fn new(src_node: NodeId, dst_node: NodeId, dest_vnf: impl Into<String>) -> Self {
        Self {
            flow_id: None,
            src_node,
            dst_node,
            src_vnf: None,
            dest_vnf: dest_vnf.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("solver exited unsuccessfully ({0})")]
    Exit(String),

    #[error("malformed solver result")]
    Decode(#[from] DecodeError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
