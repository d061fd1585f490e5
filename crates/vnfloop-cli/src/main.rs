use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;
use log::info;
use rand::Rng;
use vnfloop::{
    core::{driver::Driver, AdapterOpts, Solver, SynthesisPolicy},
    impls::{
        sim::PoissonSim,
        solver::{ExternalSolver, GreedySolver},
    },
    utils::{self, RunInfo},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of simulation steps after seeding
    #[arg(short, long, default_value_t = 10)]
    iterations: usize,

    /// Random seed (drawn from 1..=9999 if absent)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Network topology file (JSON or YAML)
    #[arg(short, long)]
    network: PathBuf,

    /// Service chain and function file (JSON or YAML)
    #[arg(short = 'f', long)]
    service_functions: PathBuf,

    /// Simulator configuration file (JSON or YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// How observed traffic is turned into solver flows
    #[arg(long, value_enum, default_value_t = Policy::Overlap)]
    policy: Policy,

    /// The placement solver
    #[arg(long, value_enum, default_value_t = SolverKind::Greedy)]
    solver: SolverKind,

    /// Executable of the external solver
    #[arg(long, required_if_eq("solver", "external"))]
    solver_program: Option<PathBuf>,

    /// Argument passed to the external solver before the input flags (repeatable)
    #[arg(long, allow_hyphen_values = true)]
    solver_arg: Vec<String>,

    /// Directory under which `results/` is created
    #[arg(long, default_value = ".")]
    results_root: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    RateRatio,
    Overlap,
}

impl From<Policy> for SynthesisPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::RateRatio => SynthesisPolicy::RateRatio,
            Policy::Overlap => SynthesisPolicy::Overlap,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SolverKind {
    Greedy,
    External,
}

impl SolverKind {
    fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Greedy => "greedy",
            SolverKind::External => "external",
        }
    }
}

fn init_log(network: &Path, datetime: &str, seed: u64) -> anyhow::Result<()> {
    fs::create_dir_all("logs")?;
    let name = network
        .file_name()
        .and_then(|s| s.to_str())
        .context("network path has no file name")?;
    let path = format!("logs/{name}_{datetime}_{seed}.log");
    let file = File::create(&path).with_context(|| format!("failed to create {path}"))?;

    let env = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
                record.level(),
                record.file().unwrap_or("<unnamed>"),
                record.line().unwrap_or(0),
                &record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let seed = args
        .seed
        .unwrap_or_else(|| rand::thread_rng().gen_range(1..=9999));
    let datetime = utils::timestamp();
    init_log(&args.network, &datetime, seed)?;

    let network = utils::read_network(&args.network)
        .with_context(|| format!("failed to read {}", args.network.display()))?;
    let services = utils::read_services(&args.service_functions)
        .with_context(|| format!("failed to read {}", args.service_functions.display()))?;
    let config = utils::read_sim_config(&args.config)
        .with_context(|| format!("failed to read {}", args.config.display()))?;
    let results_dir = utils::results_dir(
        &args.results_root,
        &args.network,
        &args.service_functions,
        &args.config,
        &datetime,
        seed,
    )?;

    let opts = AdapterOpts::builder()
        .iterations(args.iterations)
        .policy(args.policy.into())
        .mean_flow_rate(config.flow_dr_mean)
        .flow_size(config.flow_size)
        .step_duration(config.run_duration)
        .build();
    let simulator = PoissonSim::builder()
        .network(network)
        .chains(services.chains())
        .service_functions(services.service_functions())
        .config(config)
        .build();
    let solver: Box<dyn Solver> = match args.solver {
        SolverKind::Greedy => Box::new(GreedySolver::new()),
        SolverKind::External => Box::new(
            ExternalSolver::builder()
                .program(
                    args.solver_program
                        .clone()
                        .context("--solver-program is required for the external solver")?,
                )
                .args(args.solver_arg.clone())
                .root_dir(results_dir.join("solver"))
                .build(),
        ),
    };

    info!(
        "Running {} iterations with the {} solver, seed {seed}",
        args.iterations,
        args.solver.as_str()
    );
    let mut driver = Driver::new(simulator, solver, opts);
    driver.seed(seed).context("failed to seed the placement")?;
    let iterations = driver.opts().iterations;
    let bar = ProgressBar::new(iterations as u64);
    for i in 0..iterations {
        driver
            .step()
            .with_context(|| format!("iteration {} failed", i + 1))?;
        bar.inc(1);
    }
    bar.finish();
    let output = driver.finish()?;

    utils::copy_input_files(
        &results_dir,
        &[
            args.network.as_path(),
            args.service_functions.as_path(),
            args.config.as_path(),
        ],
    )?;
    let info = RunInfo {
        num_ingress: output.nr_ingress,
        algorithm: args.solver.as_str().to_owned(),
        seed,
        iterations: output.iterations,
    };
    utils::write_results(&results_dir, &info, &output)?;
    println!("Saved results in {}", results_dir.display());
    Ok(())
}
