//! Utilities for interfacing with vnfloop: input file readers and the results directory.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use sim_impls::SimConfig;
use vnfloop_core::{
    FunctionSpec, Link, Network, NetworkStats, Node, RunOutput, ServiceChain, ServiceFunctions,
    SfName, SfcName,
};

/// Format of the timestamps in results directories and log file names.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Reads a [`Network`] from a file containing a [`TopologySpec`] in JSON or YAML format.
pub fn read_network(topology_spec: impl AsRef<Path>) -> Result<Network, Error> {
    let spec = read_topology_spec(topology_spec)?;
    Ok(Network::new(&spec.nodes, &spec.links)?)
}

/// Reads a [`TopologySpec`] from a file in JSON or YAML format.
pub fn read_topology_spec(path: impl AsRef<Path>) -> Result<TopologySpec, Error> {
    read_any(path)
}

/// Reads a [`ServicesSpec`] from a file in JSON or YAML format.
pub fn read_services(path: impl AsRef<Path>) -> Result<ServicesSpec, Error> {
    read_any(path)
}

/// Reads a [`SimConfig`] from a file in JSON or YAML format.
pub fn read_sim_config(path: impl AsRef<Path>) -> Result<SimConfig, Error> {
    read_any(path)
}

fn read_any<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, Error> {
    let path = path.as_ref();
    let value = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&fs::read_to_string(path)?)?,
        Some("yaml" | "yml") => serde_yaml::from_str(&fs::read_to_string(path)?)?,
        _ => return Err(Error::UnknownFileType(path.into())),
    };
    Ok(value)
}

/// A topology specification.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct TopologySpec {
    /// Nodes, in canonical order.
    pub nodes: Vec<Node>,
    /// Links.
    pub links: Vec<Link>,
}

/// A service specification: chains and the parameters of their functions.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ServicesSpec {
    /// Chains by name, in file order.
    pub sfc_list: IndexMap<SfcName, Vec<SfName>>,
    /// Function parameters by name.
    pub sf_list: BTreeMap<SfName, FunctionSpec>,
}

impl ServicesSpec {
    /// The chains, in file order.
    pub fn chains(&self) -> Vec<ServiceChain> {
        self.sfc_list
            .iter()
            .map(|(name, functions)| ServiceChain::new(name.clone(), functions.clone()))
            .collect()
    }

    /// The function parameters.
    pub fn service_functions(&self) -> ServiceFunctions {
        self.sf_list.clone()
    }
}

/// The current local time, formatted for file names.
pub fn timestamp() -> String {
    chrono::Local::now().format(DATETIME_FORMAT).to_string()
}

/// Returns `<root>/results/<network>/<services>/<config>/<datetime>_seed<seed>`, where the middle
/// components are the stems of the input files.
pub fn results_dir(
    root: impl AsRef<Path>,
    network: impl AsRef<Path>,
    services: impl AsRef<Path>,
    config: impl AsRef<Path>,
    datetime: &str,
    seed: u64,
) -> Result<PathBuf, Error> {
    let mut dir = root.as_ref().join("results");
    for input in [network.as_ref(), services.as_ref(), config.as_ref()] {
        dir.push(file_stem(input)?);
    }
    dir.push(format!("{datetime}_seed{seed}"));
    Ok(dir)
}

/// The file stem of `path`.
pub fn file_stem(path: &Path) -> Result<&str, Error> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::UnknownFileType(path.into()))
}

/// Creates `dir` and copies every file in `inputs` into it.
pub fn copy_input_files(dir: impl AsRef<Path>, inputs: &[&Path]) -> Result<(), Error> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    for &input in inputs {
        let name = input
            .file_name()
            .ok_or_else(|| Error::UnknownFileType(input.into()))?;
        fs::copy(input, dir.join(name))?;
    }
    Ok(())
}

/// Run parameters recorded alongside the results.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunInfo {
    /// Number of ingress nodes.
    pub num_ingress: usize,
    /// Name of the solver.
    pub algorithm: String,
    /// Random seed.
    pub seed: u64,
    /// Number of steps after seeding.
    pub iterations: usize,
}

/// Final statistics of a run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Metrics {
    /// Flow statistics reported by the simulator.
    #[serde(flatten)]
    pub network_stats: NetworkStats,
    /// Steps run after seeding.
    pub iterations: usize,
    /// Solver invocations.
    pub solver_calls: usize,
    /// Steps that kept the previous decision.
    pub skipped_iterations: usize,
}

impl From<&RunOutput> for Metrics {
    fn from(output: &RunOutput) -> Self {
        Self {
            network_stats: output.network_stats,
            iterations: output.iterations,
            solver_calls: output.solver_calls,
            skipped_iterations: output.skipped_iterations,
        }
    }
}

/// Writes `input.yaml`, `placement.yaml`, `schedule.yaml` and `metrics.yaml` into `dir`.
pub fn write_results(
    dir: impl AsRef<Path>,
    info: &RunInfo,
    output: &RunOutput,
) -> Result<(), Error> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    write_yaml(&dir.join("input.yaml"), info)?;
    write_yaml(&dir.join("placement.yaml"), &output.placement)?;
    write_yaml(&dir.join("schedule.yaml"), &output.schedule.to_nested())?;
    write_yaml(&dir.join("metrics.yaml"), &Metrics::from(output))?;
    log::info!("Saved results in {}", dir.display());
    Ok(())
}

fn write_yaml<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}

/// Error kinds for input files and results.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown file type.
    #[error("unknown file type: {0}")]
    UnknownFileType(PathBuf),

    /// Error serializing/deserializing JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Error serializing/deserializing YAML.
    #[error("YAML error")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error.
    #[error("IO error")]
    Io(#[from] std::io::Error),

    /// Error constructing a valid topology.
    #[error("invalid topology")]
    Topology(#[from] vnfloop_core::TopologyError),
}
