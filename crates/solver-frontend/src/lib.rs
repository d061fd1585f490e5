//! An interface to an external placement solver.
//!
//! The solver is a separate program that reads its inputs from YAML files and writes its result
//! to another YAML file. This crate is tightly coupled to that file interface.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use vnfloop_core::{
    DecodeError, FlowRoute, Link, Network, Node, ResourceBounds, ServiceTemplate, SolverResult,
    SourceSpec, VnfAssignment,
};

const TOPOLOGY_FILE: &str = "topology.yaml";
const TEMPLATE_FILE: &str = "template.yaml";
const SOURCES_FILE: &str = "sources.yaml";
const RESULT_FILE: &str = "result.yaml";

/// One invocation of an external solver.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct SolverProcess<'a> {
    /// The solver executable.
    #[builder(setter(into))]
    pub program: PathBuf,
    /// Arguments passed before the input flags.
    #[builder(default)]
    pub args: Vec<String>,
    /// The directory in which to write solver inputs and the result.
    #[builder(setter(into))]
    pub data_dir: PathBuf,
    /// The physical network.
    pub network: &'a Network,
    /// The service template to embed.
    pub template: &'a ServiceTemplate,
    /// The flow sources.
    pub sources: &'a SourceSpec,
    /// Resource bounds.
    pub bounds: ResourceBounds,
}

impl SolverProcess<'_> {
    /// Runs the solver, returning its converted result.
    ///
    /// This routine can fail due to IO errors, a failing solver process, or a result that cannot
    /// be parsed.
    pub fn run(&self) -> Result<SolverResult, Error> {
        fs::create_dir_all(&self.data_dir)?;

        let topology = TopologyRecord {
            nodes: self.network.nodes().cloned().collect(),
            links: self.network.links().copied().collect(),
        };
        write_yaml(&self.data_dir.join(TOPOLOGY_FILE), &topology)?;
        write_yaml(&self.data_dir.join(TEMPLATE_FILE), self.template)?;
        write_yaml(&self.data_dir.join(SOURCES_FILE), self.sources)?;

        self.invoke()?;

        let s = fs::read_to_string(self.data_dir.join(RESULT_FILE))?;
        let doc: ResultDocument = serde_yaml::from_str(&s)?;
        let result = SolverResult::try_from(doc)?;
        Ok(result)
    }

    fn invoke(&self) -> Result<(), Error> {
        let args = self.command_args(&self.data_dir);
        log::debug!("Invoking {} {:?}", self.program.display(), args);
        let output = Command::new(&self.program).args(&args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!("Solver stderr: {}", stderr.trim_end());
            return Err(Error::Exit(output.status.to_string()));
        }
        Ok(())
    }

    fn command_args(&self, data_dir: &Path) -> Vec<OsString> {
        let mut args = self.args.iter().map(OsString::from).collect::<Vec<_>>();
        let mut flag = |name: &str, value: OsString| {
            args.push(format!("--{name}").into());
            args.push(value);
        };
        flag("network", data_dir.join(TOPOLOGY_FILE).into());
        flag("template", data_dir.join(TEMPLATE_FILE).into());
        flag("sources", data_dir.join(SOURCES_FILE).into());
        flag("cpu", self.bounds.cpu.to_string().into());
        flag("mem", self.bounds.mem.to_string().into());
        flag("dr", self.bounds.link_rate.to_string().into());
        flag("output", data_dir.join(RESULT_FILE).into());
        args
    }
}

fn write_yaml<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), Error> {
    let s = serde_yaml::to_string(value)?;
    fs::write(path, s)?;
    Ok(())
}

/// The error type for [SolverProcess::run].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The solver exited unsuccessfully.
    #[error("solver exited unsuccessfully ({0})")]
    Exit(String),

    /// Error reading or writing YAML records.
    #[error("failed to process YAML record")]
    Yaml(#[from] serde_yaml::Error),

    /// The result is missing a required section.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, serde::Serialize)]
struct TopologyRecord {
    nodes: Vec<Node>,
    links: Vec<Link>,
}

// Unknown fields in the result are ignored.
#[derive(Debug, serde::Deserialize)]
struct ResultDocument {
    placement: Option<PlacementSection>,
}

#[derive(Debug, serde::Deserialize)]
struct PlacementSection {
    vnfs: Option<Vec<VnfAssignment>>,
    flows: Option<Vec<FlowRoute>>,
}

impl TryFrom<ResultDocument> for SolverResult {
    type Error = DecodeError;

    fn try_from(doc: ResultDocument) -> Result<Self, Self::Error> {
        let placement = doc
            .placement
            .ok_or(DecodeError::MissingField("placement"))?;
        Ok(SolverResult {
            placement: placement
                .vnfs
                .ok_or(DecodeError::MissingField("placement.vnfs"))?,
            flows: placement
                .flows
                .ok_or(DecodeError::MissingField("placement.flows"))?,
        })
    }
}
