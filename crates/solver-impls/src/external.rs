//! A solver backed by an external program.

use std::cell::Cell;
use std::path::PathBuf;

use solver_frontend::SolverProcess;
use vnfloop_core::{
    Network, ResourceBounds, ServiceTemplate, Solver, SolverError, SolverResult, SourceSpec,
};

/// Runs an external solver program once per placement.
///
/// Every invocation gets its own subdirectory of `root_dir`, numbered from zero, holding the
/// records exchanged with the program.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct ExternalSolver {
    /// The solver executable.
    #[builder(setter(into))]
    program: PathBuf,
    /// Arguments passed before the input flags.
    #[builder(default)]
    args: Vec<String>,
    /// The directory in which to keep solver records.
    #[builder(setter(into))]
    root_dir: PathBuf,
    #[builder(default, setter(skip))]
    nr_calls: Cell<usize>,
}

impl ExternalSolver {
    /// The record directory of the next invocation.
    fn next_dir(&self) -> PathBuf {
        let n = self.nr_calls.get();
        self.nr_calls.set(n + 1);
        self.root_dir.join(format!("call_{n}"))
    }
}

impl Solver for ExternalSolver {
    fn place(
        &self,
        network: &Network,
        template: &ServiceTemplate,
        sources: &SourceSpec,
        bounds: ResourceBounds,
    ) -> Result<SolverResult, SolverError> {
        let process = SolverProcess::builder()
            .program(self.program.clone())
            .args(self.args.clone())
            .data_dir(self.next_dir())
            .network(network)
            .template(template)
            .sources(sources)
            .bounds(bounds)
            .build();
        process.run().map_err(|e| match e {
            solver_frontend::Error::Exit(status) => SolverError::Exit(status),
            solver_frontend::Error::Decode(e) => SolverError::Decode(e),
            solver_frontend::Error::Io(e) => SolverError::Io(e),
            e @ solver_frontend::Error::Yaml(..) => SolverError::Other(anyhow::Error::new(e)),
        })
    }
}
