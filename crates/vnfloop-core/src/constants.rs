//! Adapter constants. These are set to match what the external placement solver expects.

/// Name of the synthetic chain-head function. Only the solver ever sees it.
pub const SOURCE_VNF: &str = "vnf_source";

/// Default per-link delay ceiling in the service template. Large enough to be
/// effectively unconstrained.
pub const DEFAULT_MAX_DELAY: f64 = 1000.0;

/// Default link data-rate bound handed to the solver.
pub const DEFAULT_LINK_RATE: f64 = 1000.0;

/// Number of decimal places scheduling probabilities are rounded to.
pub const PROB_PRECISION: i32 = 10;
