//! This module defines the [`AdapterOpts`] configuration which describes how to run the
//! placement loop.

use crate::{
    constants::{DEFAULT_LINK_RATE, DEFAULT_MAX_DELAY},
    source::{SynthesisParams, SynthesisPolicy},
};

/// Placement loop options.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize)]
pub struct AdapterOpts {
    /// Number of simulation steps after seeding.
    #[builder(default = 10)]
    pub iterations: usize,
    /// Source synthesis policy.
    #[builder(default)]
    pub policy: SynthesisPolicy,
    /// Mean flow data rate.
    pub mean_flow_rate: f64,
    /// Mean flow size.
    #[builder(default)]
    pub flow_size: f64,
    /// Duration of one simulation step.
    #[builder(default = 1.0)]
    pub step_duration: f64,
    /// Link data-rate bound handed to the solver.
    #[builder(default = DEFAULT_LINK_RATE)]
    pub link_rate: f64,
    /// Per-link delay bound in the service template.
    #[builder(default = DEFAULT_MAX_DELAY)]
    pub max_delay: f64,
}

impl AdapterOpts {
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if !(self.mean_flow_rate > 0.0) {
            return Err("mean flow rate must be positive");
        }
        if !(self.step_duration > 0.0) {
            return Err("step duration must be positive");
        }
        if !(self.flow_size >= 0.0) {
            return Err("flow size must be non-negative");
        }
        Ok(())
    }

    pub(crate) fn synthesis_params(&self, processing_delay: f64) -> SynthesisParams {
        SynthesisParams::from_flow_size(
            self.policy,
            self.mean_flow_rate,
            self.flow_size,
            processing_delay,
            self.step_duration,
        )
    }
}
