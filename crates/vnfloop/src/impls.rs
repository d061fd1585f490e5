//! Implementations of the [Solver](crate::core::Solver) and
//! [Simulator](crate::core::Simulator) traits.

/// Solvers.
pub mod solver {
    pub use solver_frontend::{Error as FrontendError, SolverProcess};
    pub use solver_impls::*;
}

/// Simulators.
pub mod sim {
    pub use sim_impls::*;
}
