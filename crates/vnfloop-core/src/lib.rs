#![warn(unreachable_pub, missing_debug_implementations)]

//! The core vnfloop library. This crate defines [the driver](driver::Driver) that alternates
//! between a traffic [simulator](Simulator) and a placement [solver](Solver), turning observed
//! traffic into solver sources and solver results into placements and forwarding schedules.

#[macro_use]
mod ident;

pub mod chain;
pub mod constants;
pub mod decode;
pub mod driver;
pub mod network;
pub mod normalize;
pub mod opts;
pub mod schedule;
pub mod simulator;
pub mod solver;
pub mod source;
pub mod template;
pub mod traffic;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{FunctionSpec, ServiceChain, ServiceFunctions, SfName, SfcName};
pub use decode::{decode, DecodeError};
pub use driver::{Driver, Error, Phase, RunOutput, StepOutcome};
pub use network::{Link, Network, Node, NodeId, NodeKind, TopologyError};
pub use opts::AdapterOpts;
pub use schedule::{NestedSchedule, Placement, Schedule, ScheduleEntry};
pub use simulator::{Action, ApplyState, InitState, NetworkStats, Simulator, SimulatorError};
pub use solver::{FlowRoute, ResourceBounds, Solver, SolverError, SolverResult, VnfAssignment};
pub use source::{Source, SourceFlow, SourceSpec, SynthesisParams, SynthesisPolicy};
pub use template::{Direction, ServiceTemplate, TemplateError, VLink, Vnf, VnfKind};
pub use traffic::TrafficObservation;
