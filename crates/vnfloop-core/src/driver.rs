//! The placement loop. A [`Driver`] seeds a placement from a synthetic uniform source, then feeds
//! the simulator's traffic back into the solver once per step.
//!
//! The driver moves through the phases `Uninitialized -> Seeded -> Steady -> Done`. Any error
//! moves it straight to `Done`; there is no partial result.

use log::{debug, info, warn};

use crate::{
    chain::ServiceChain,
    decode::{decode, DecodeError},
    network::{Network, NodeId},
    opts::AdapterOpts,
    schedule::{Placement, Schedule},
    simulator::{Action, NetworkStats, Simulator, SimulatorError},
    solver::{ResourceBounds, Solver, SolverError},
    source::{seed_sources, synthesize, SourceSpec, SynthesisParams},
    template::{ServiceTemplate, TemplateError},
};

/// The phase of a [`Driver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has happened yet.
    Uninitialized,
    /// The simulator is initialized and the seed decision is held.
    Seeded,
    /// At least one step has run.
    Steady,
    /// The run is over, either finished or aborted.
    Done,
}

/// What a step did with the held decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Traffic was observed and the solver produced a new decision.
    Replaced,
    /// No traffic was observed; the previous decision is kept and the solver was not called.
    Retained,
}

/// The final state of a run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub placement: Placement,
    pub schedule: Schedule,
    pub network_stats: NetworkStats,
    /// Steps run after seeding.
    pub iterations: usize,
    /// Solver invocations, the seed included.
    pub solver_calls: usize,
    /// Steps that kept the previous decision.
    pub skipped_iterations: usize,
    pub nr_ingress: usize,
}

// Everything fixed at seeding time.
#[derive(Debug)]
struct Context {
    network: Network,
    chain: ServiceChain,
    template: ServiceTemplate,
    nodes: Vec<NodeId>,
    ingress: Vec<NodeId>,
    bounds: ResourceBounds,
    params: SynthesisParams,
}

#[derive(Debug)]
struct Running {
    ctx: Context,
    held: Action,
    network_stats: NetworkStats,
    iteration: usize,
    solver_calls: usize,
    skipped: usize,
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Seeded(Box<Running>),
    Steady(Box<Running>),
    Done,
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Uninitialized => Phase::Uninitialized,
            State::Seeded(_) => Phase::Seeded,
            State::Steady(_) => Phase::Steady,
            State::Done => Phase::Done,
        }
    }
}

/// Drives a [`Simulator`] and a [`Solver`] in lockstep.
#[derive(Debug)]
pub struct Driver<S, P> {
    simulator: S,
    solver: P,
    opts: AdapterOpts,
    state: State,
}

impl<S, P> Driver<S, P>
where
    S: Simulator,
    P: Solver,
{
    pub fn new(simulator: S, solver: P, opts: AdapterOpts) -> Self {
        Self {
            simulator,
            solver,
            opts,
            state: State::Uninitialized,
        }
    }

    /// Seeds, runs `opts.iterations` steps, and finishes.
    pub fn run(mut self, seed: u64) -> Result<RunOutput, Error> {
        self.seed(seed)?;
        for _ in 0..self.opts.iterations {
            self.step()?;
        }
        self.finish()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The decision the next step will apply.
    pub fn current(&self) -> Option<&Action> {
        match &self.state {
            State::Seeded(r) | State::Steady(r) => Some(&r.held),
            State::Uninitialized | State::Done => None,
        }
    }

    /// The network reported by the simulator, once seeded.
    pub fn network(&self) -> Option<&Network> {
        match &self.state {
            State::Seeded(r) | State::Steady(r) => Some(&r.ctx.network),
            State::Uninitialized | State::Done => None,
        }
    }

    pub fn opts(&self) -> &AdapterOpts {
        &self.opts
    }

    /// Initializes the simulator and computes the first decision from one flow per ingress
    /// node. A network without ingress nodes is rejected before the solver runs.
    pub fn seed(&mut self, seed: u64) -> Result<(), Error> {
        let phase = self.phase();
        if phase != Phase::Uninitialized {
            return Err(Error::InvalidState { op: "seed", phase });
        }
        self.state = State::Done;
        self.opts.validate().map_err(Error::InvalidOpts)?;

        let init = self.simulator.init(seed)?;
        let mut chains = init.chains.into_iter();
        let chain = chains.next().ok_or(Error::NoChain)?;
        if chains.next().is_some() {
            warn!("Only the first service chain ({}) is placed", chain.name);
        }
        let template =
            ServiceTemplate::build(&chain, &init.service_functions, self.opts.max_delay)?;
        let processing_delay = chain.mean_processing_delay(&init.service_functions)?;
        let network = init.network;
        let ingress = network.ingress_nodes();
        if ingress.is_empty() {
            return Err(Error::NoIngress);
        }
        let nodes = network.node_ids();
        let cap = network.max_node_cap();
        let ctx = Context {
            bounds: ResourceBounds::new(cap, cap, self.opts.link_rate),
            params: self.opts.synthesis_params(processing_delay),
            network,
            chain,
            template,
            nodes,
            ingress,
        };
        info!(
            "Seeding chain {} over {} nodes ({} ingress)",
            ctx.chain.name,
            ctx.nodes.len(),
            ctx.ingress.len()
        );

        let sources = seed_sources(&ctx.ingress, self.opts.mean_flow_rate);
        let held = solve(&self.solver, &ctx, &sources)?;
        self.state = State::Seeded(Box::new(Running {
            ctx,
            held,
            network_stats: init.network_stats,
            iteration: 0,
            solver_calls: 1,
            skipped: 0,
        }));
        Ok(())
    }

    /// Applies the held decision for one step and updates it from the observed traffic.
    pub fn step(&mut self) -> Result<StepOutcome, Error> {
        let mut running = match std::mem::replace(&mut self.state, State::Done) {
            State::Seeded(r) | State::Steady(r) => r,
            other => {
                let phase = other.phase();
                self.state = other;
                return Err(Error::InvalidState { op: "step", phase });
            }
        };

        let applied = self.simulator.apply(&running.held)?;
        running.network_stats = applied.network_stats;
        running.iteration += 1;

        let ctx = &running.ctx;
        // CORRECTNESS: the chain was validated as non-empty at seeding time
        let first = ctx.chain.first().unwrap_or_default();
        let (sources, exists) = synthesize(
            &applied.traffic,
            &ctx.chain.name,
            first,
            &ctx.ingress,
            &ctx.params,
        );
        let outcome = if exists {
            debug!(
                "Iteration {}: {} flows from {} sources",
                running.iteration,
                sources.iter().map(|s| s.flows.len()).sum::<usize>(),
                sources.len()
            );
            running.held = solve(&self.solver, ctx, &sources)?;
            running.solver_calls += 1;
            StepOutcome::Replaced
        } else {
            debug!(
                "Iteration {}: no traffic, keeping previous decision",
                running.iteration
            );
            running.skipped += 1;
            StepOutcome::Retained
        };
        self.state = State::Steady(running);
        Ok(outcome)
    }

    /// Ends the run and returns the final decision and statistics.
    pub fn finish(&mut self) -> Result<RunOutput, Error> {
        let running = match std::mem::replace(&mut self.state, State::Done) {
            State::Seeded(r) | State::Steady(r) => r,
            other => {
                let phase = other.phase();
                self.state = other;
                return Err(Error::InvalidState { op: "finish", phase });
            }
        };
        let Running {
            ctx,
            held,
            network_stats,
            iteration,
            solver_calls,
            skipped,
        } = *running;
        info!(
            "Finished after {iteration} iterations ({solver_calls} solver calls, {skipped} skipped)"
        );
        Ok(RunOutput {
            placement: held.placement,
            schedule: held.schedule,
            network_stats,
            iterations: iteration,
            solver_calls,
            skipped_iterations: skipped,
            nr_ingress: ctx.ingress.len(),
        })
    }
}

fn solve<P: Solver>(solver: &P, ctx: &Context, sources: &SourceSpec) -> Result<Action, Error> {
    let result = solver.place(&ctx.network, &ctx.template, sources, ctx.bounds)?;
    let (placement, schedule) =
        decode(&result, &ctx.nodes, &ctx.chain.name, &ctx.chain.functions)?;
    Ok(Action::new(placement, schedule))
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid service configuration")]
    Configuration(#[from] TemplateError),

    #[error("invalid options: {0}")]
    InvalidOpts(&'static str),

    #[error("the simulator reported no service chain")]
    NoChain,

    #[error("the network has no ingress node")]
    NoIngress,

    #[error("simulator failed")]
    Simulator(#[from] SimulatorError),

    #[error("solver failed")]
    Solver(#[from] SolverError),

    #[error("failed to decode solver result")]
    Decode(#[from] DecodeError),

    #[error("cannot {op} while {phase:?}")]
    InvalidState { op: &'static str, phase: Phase },
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    use super::*;
    use crate::{
        chain::ServiceFunctions,
        constants::SOURCE_VNF,
        network::types::{Link, Node},
        simulator::{ApplyState, InitState},
        solver::{FlowRoute, SolverResult, VnfAssignment},
        testing,
        traffic::TrafficObservation,
    };

    // Replays scripted observations and records every action it is given.
    struct ScriptedSim {
        nodes: Vec<Node>,
        links: Vec<Link>,
        chains: Vec<ServiceChain>,
        functions: ServiceFunctions,
        script: VecDeque<TrafficObservation>,
        applied: Vec<Action>,
    }

    impl ScriptedSim {
        fn new(script: Vec<TrafficObservation>) -> Self {
            let (nodes, links) = testing::four_node_config();
            let (chain, functions) = testing::abc_chain();
            Self {
                nodes,
                links,
                chains: vec![chain],
                functions,
                script: script.into(),
                applied: Vec::new(),
            }
        }
    }

    impl Simulator for ScriptedSim {
        fn init(&mut self, _seed: u64) -> Result<InitState, SimulatorError> {
            Ok(InitState {
                chains: self.chains.clone(),
                service_functions: self.functions.clone(),
                network: Network::new(&self.nodes, &self.links).map_err(anyhow::Error::from)?,
                network_stats: NetworkStats::default(),
            })
        }

        fn apply(&mut self, action: &Action) -> Result<ApplyState, SimulatorError> {
            self.applied.push(action.clone());
            let traffic = self.script.pop_front().unwrap_or_default();
            let network_stats = NetworkStats {
                total_flows: self.applied.len() as u64,
                ..Default::default()
            };
            Ok(ApplyState {
                traffic,
                network_stats,
            })
        }
    }

    // Places the whole chain at each source node and keeps every flow there.
    #[derive(Default)]
    struct LocalSolver {
        calls: Cell<usize>,
        flows_seen: RefCell<Vec<usize>>,
        fail: bool,
    }

    impl Solver for LocalSolver {
        fn place(
            &self,
            _network: &Network,
            template: &ServiceTemplate,
            sources: &SourceSpec,
            _bounds: ResourceBounds,
        ) -> Result<SolverResult, SolverError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(SolverError::Exit("exit status: 1".into()));
            }
            self.flows_seen
                .borrow_mut()
                .push(sources.iter().map(|s| s.flows.len()).sum());
            let mut result = SolverResult::default();
            for source in sources {
                for vnf in &template.vnfs {
                    result
                        .placement
                        .push(VnfAssignment::new(vnf.name.clone(), source.node));
                }
                for _ in &source.flows {
                    for vnf in template.vnfs.iter().skip(1) {
                        let route = FlowRoute::new(source.node, source.node, vnf.name.as_str());
                        result.flows.push(route);
                    }
                }
            }
            Ok(result)
        }
    }

    fn opts() -> AdapterOpts {
        AdapterOpts::builder()
            .iterations(3)
            .mean_flow_rate(10.0)
            .flow_size(100.0)
            .step_duration(50.0)
            .build()
    }

    fn traffic_at(node: usize, rate: f64) -> TrafficObservation {
        let mut obs = TrafficObservation::new();
        obs.insert(NodeId::new(node), "sfc_1", "a", rate);
        obs
    }

    #[test]
    fn seeding_solves_once_for_every_ingress() -> anyhow::Result<()> {
        let solver = LocalSolver::default();
        let mut driver = Driver::new(ScriptedSim::new(Vec::new()), &solver, opts());
        assert_eq!(driver.phase(), Phase::Uninitialized);
        driver.seed(7)?;
        assert_eq!(driver.phase(), Phase::Seeded);
        assert_eq!(solver.calls.get(), 1);
        // One seed flow per ingress node
        assert_eq!(*solver.flows_seen.borrow(), vec![2]);

        let action = driver.current().unwrap();
        assert!(!action.placement.contains_function(SOURCE_VNF));
        assert_eq!(action.placement.nr_nodes(), 4);
        assert_eq!(
            action.placement.functions_at(NodeId::new(0)),
            ["a", "b", "c"]
        );
        assert_eq!(
            action.schedule.prob(NodeId::new(0), "sfc_1", "a", NodeId::new(0)),
            Some(1.0)
        );
        assert!(action.schedule.is_total(
            &driver.network().unwrap().node_ids(),
            "sfc_1",
            &["a".into(), "b".into(), "c".into()]
        ));
        Ok(())
    }

    #[test]
    fn idle_steps_keep_the_decision() -> anyhow::Result<()> {
        let solver = LocalSolver::default();
        let idle = vec![
            TrafficObservation::new(),
            traffic_at(0, 0.0),
            traffic_at(2, 0.0),
        ];
        let mut driver = Driver::new(ScriptedSim::new(idle), &solver, opts());
        driver.seed(0)?;
        let before = driver.current().cloned().unwrap();
        for _ in 0..3 {
            assert_eq!(driver.step()?, StepOutcome::Retained);
        }
        assert_eq!(driver.phase(), Phase::Steady);
        assert_eq!(driver.current(), Some(&before));
        assert_eq!(solver.calls.get(), 1);

        let output = driver.finish()?;
        assert_eq!(output.placement, before.placement);
        assert_eq!(output.schedule, before.schedule);
        assert_eq!(output.skipped_iterations, 3);
        assert_eq!(output.solver_calls, 1);
        Ok(())
    }

    #[test]
    fn traffic_replaces_the_decision() -> anyhow::Result<()> {
        let solver = LocalSolver::default();
        let sim = ScriptedSim::new(vec![traffic_at(1, 20.0)]);
        let mut driver = Driver::new(sim, &solver, opts());
        driver.seed(0)?;
        assert_eq!(driver.step()?, StepOutcome::Replaced);
        // Flow duration is 100 / 10 = 10 and the mean processing delay is 2, so
        // ceil(20 * 12 / 50) = 5 flows
        assert_eq!(*solver.flows_seen.borrow(), vec![2, 5]);
        let action = driver.current().unwrap();
        assert!(action.placement.functions_at(NodeId::new(0)).is_empty());
        assert_eq!(
            action.placement.functions_at(NodeId::new(1)),
            ["a", "b", "c"]
        );
        Ok(())
    }

    #[test]
    fn simulator_receives_held_decisions_in_order() -> anyhow::Result<()> {
        let solver = LocalSolver::default();
        let script = vec![traffic_at(1, 20.0), TrafficObservation::new()];
        let mut sim = ScriptedSim::new(script);
        let mut driver = Driver::new(&mut sim, &solver, opts());
        driver.seed(0)?;
        let seeded = driver.current().cloned().unwrap();
        driver.step()?;
        let replaced = driver.current().cloned().unwrap();
        driver.step()?;
        let output = driver.finish()?;
        assert_eq!(output.network_stats.total_flows, 2);
        drop(driver);
        assert_eq!(sim.applied, vec![seeded, replaced]);
        Ok(())
    }

    #[test]
    fn run_steps_the_configured_iterations() -> anyhow::Result<()> {
        let solver = LocalSolver::default();
        let script = vec![
            traffic_at(0, 10.0),
            TrafficObservation::new(),
            traffic_at(1, 10.0),
        ];
        let driver = Driver::new(ScriptedSim::new(script), &solver, opts());
        let output = driver.run(1)?;
        assert_eq!(output.iterations, 3);
        assert_eq!(output.solver_calls, 3);
        assert_eq!(output.skipped_iterations, 1);
        assert_eq!(output.nr_ingress, 2);
        Ok(())
    }

    #[test]
    fn solver_failure_aborts() {
        let solver = LocalSolver {
            fail: true,
            ..Default::default()
        };
        let mut driver = Driver::new(ScriptedSim::new(Vec::new()), &solver, opts());
        assert!(matches!(driver.seed(0), Err(Error::Solver(..))));
        assert_eq!(driver.phase(), Phase::Done);
        assert!(matches!(
            driver.step(),
            Err(Error::InvalidState { phase: Phase::Done, .. })
        ));
    }

    #[test]
    fn step_before_seed_is_rejected() {
        let solver = LocalSolver::default();
        let mut driver = Driver::new(ScriptedSim::new(Vec::new()), &solver, opts());
        assert!(matches!(
            driver.step(),
            Err(Error::InvalidState {
                op: "step",
                phase: Phase::Uninitialized
            })
        ));
        assert_eq!(driver.phase(), Phase::Uninitialized);
        assert!(driver.finish().is_err());
    }

    #[test]
    fn configuration_errors_surface_before_any_step() {
        let solver = LocalSolver::default();
        let mut sim = ScriptedSim::new(Vec::new());
        sim.functions.remove("c");
        let mut driver = Driver::new(&mut sim, &solver, opts());
        assert!(matches!(driver.seed(0), Err(Error::Configuration(..))));
        drop(driver);
        assert!(sim.applied.is_empty());
        assert_eq!(solver.calls.get(), 0);
    }

    #[test]
    fn missing_chain_is_an_error() {
        let solver = LocalSolver::default();
        let mut sim = ScriptedSim::new(Vec::new());
        sim.chains.clear();
        let mut driver = Driver::new(sim, &solver, opts());
        assert!(matches!(driver.seed(0), Err(Error::NoChain)));
    }

    #[test]
    fn network_without_ingress_is_rejected() {
        let solver = LocalSolver::default();
        let mut sim = ScriptedSim::new(Vec::new());
        sim.nodes = sim
            .nodes
            .iter()
            .map(|n| Node::new_normal(n.id, n.cap))
            .collect();
        let mut driver = Driver::new(&mut sim, &solver, opts());
        assert!(matches!(driver.seed(0), Err(Error::NoIngress)));
        assert_eq!(driver.phase(), Phase::Done);
        drop(driver);
        assert!(sim.applied.is_empty());
        assert_eq!(solver.calls.get(), 0);
    }

    #[test]
    fn invalid_opts_are_rejected() {
        let solver = LocalSolver::default();
        let opts = AdapterOpts::builder().mean_flow_rate(0.0).build();
        let mut driver = Driver::new(ScriptedSim::new(Vec::new()), &solver, opts);
        assert!(matches!(driver.seed(0), Err(Error::InvalidOpts(..))));
    }
}
