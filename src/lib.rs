//! # GVNS-EVRP
//!
//! A Rust implementation of a multi-objective General Variable Neighborhood
//! Search for the Electric Vehicle Routing Problem (EVRP) with multiple
//! charging technologies.
//!
//! The search minimizes total distance and total charging cost. It keeps a
//! bounded archive of mutually non-dominated feasible solutions and refines
//! it by repeatedly perturbing an archived solution and improving the result
//! with a chain of local search operators, until a fixed number of operator
//! calls has been spent.
//!
//! Instance parsing and the construction of the initial population are left
//! to the caller: [`GvnsAlgorithm::run`] takes an [`Instance`] and a list of
//! structurally valid starting solutions.

pub mod archive;
pub mod config;
pub mod instance;
pub mod local_search;
pub mod solution;
pub mod utils;

pub use crate::archive::Archive;
pub use crate::config::{Config, ConfigError};
pub use crate::instance::{Instance, InstanceError};
pub use crate::solution::{Objectives, Route, Solution};

use crate::local_search::OperatorChain;

use log::{debug, info, warn};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Shared count of operator calls. A call may only be issued after a
/// successful [`EvaluationBudget::try_consume`], so the limit is never exceeded.
#[derive(Debug)]
pub struct EvaluationBudget {
    used: AtomicUsize,
    limit: usize,
}

impl EvaluationBudget {
    pub fn new(limit: usize) -> Self {
        EvaluationBudget {
            used: AtomicUsize::new(0),
            limit,
        }
    }

    /// Reserve one operator call. Returns false once the limit is reached.
    pub fn try_consume(&self) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok()
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used())
    }

    pub fn is_exhausted(&self) -> bool {
        self.used() >= self.limit
    }
}

/// States of the search loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Improving the initial population and filling the archive
    Seeding,
    /// Drawing a random archive member
    Selecting,
    /// Shaking the selected solution
    Perturbing,
    /// Running the local search rounds on the shaken candidate
    LocalSearching,
    /// Merging the collected solutions into the archive
    ArchiveUpdating,
    Terminated,
}

/// Why the archive ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarvationCause {
    /// No initial solution survived seeding
    EmptyInitialArchive,
    /// The archive had no feasible member to select during the search
    ArchiveEmptied,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The evaluation budget was spent; the archive holds the result
    BudgetExhausted,
    /// The search had nothing to work on; the result is empty
    Starved(StarvationCause),
}

/// Outcome of [`GvnsAlgorithm::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub archive: Archive,
    pub status: RunStatus,
    /// Operator calls issued
    pub evaluations: usize,
    /// Completed outer iterations
    pub iterations: usize,
    pub run_time: Duration,
}

impl RunReport {
    /// The non-dominated solutions found.
    pub fn solutions(&self) -> &[Solution] {
        self.archive.solutions()
    }

    pub fn is_starved(&self) -> bool {
        matches!(self.status, RunStatus::Starved(_))
    }
}

/// Receives the archive after every completed outer iteration.
pub trait IterationObserver {
    fn on_iteration(&mut self, iteration: usize, archive: &Archive);
}

impl<F> IterationObserver for F
where
    F: FnMut(usize, &Archive),
{
    fn on_iteration(&mut self, iteration: usize, archive: &Archive) {
        self(iteration, archive)
    }
}

/// The main algorithm structure that orchestrates the search.
pub struct GvnsAlgorithm {
    pub instance: Instance,
    pub config: Config,
    local_search: OperatorChain,
    perturbation: OperatorChain,
    budget: EvaluationBudget,
    rng: ChaCha8Rng,
    archive: Archive,
    state: EngineState,
    status: Option<RunStatus>,
    /// Initial population waiting for seeding
    pending: Vec<Solution>,
    selected: Option<Solution>,
    candidate: Option<Solution>,
    collected: Vec<Solution>,
    /// Perturbation attempts on the selected solution
    attempts: usize,
    iterations: usize,
    observer: Option<Box<dyn IterationObserver>>,
}

impl GvnsAlgorithm {
    /// Create a new search for the given instance and configuration, using
    /// the default operator chains.
    pub fn new(instance: Instance, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(GvnsAlgorithm {
            local_search: OperatorChain::default_local_search(&config),
            perturbation: OperatorChain::default_perturbation(&config),
            budget: EvaluationBudget::new(config.max_evaluations),
            archive: Archive::with_tolerance(config.na, config.duplicate_tolerance),
            instance,
            config,
            rng,
            state: EngineState::Seeding,
            status: None,
            pending: Vec::new(),
            selected: None,
            candidate: None,
            collected: Vec::new(),
            attempts: 0,
            iterations: 0,
            observer: None,
        })
    }

    /// Replace the local search chain.
    pub fn with_local_search(mut self, chain: OperatorChain) -> Self {
        self.local_search = chain;
        self
    }

    /// Replace the perturbation chain.
    pub fn with_perturbation(mut self, chain: OperatorChain) -> Self {
        self.perturbation = chain;
        self
    }

    /// Install a hook called after every completed outer iteration.
    pub fn with_observer<O: IterationObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The run status, once terminated.
    pub fn status(&self) -> Option<RunStatus> {
        self.status
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn evaluations(&self) -> usize {
        self.budget.used()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Queue the initial population and rewind to `Seeding` with an empty
    /// archive and a fresh evaluation budget.
    pub fn load(&mut self, initial_population: Vec<Solution>) {
        self.pending = initial_population;
        self.archive = Archive::with_tolerance(self.config.na, self.config.duplicate_tolerance);
        self.budget = EvaluationBudget::new(self.config.max_evaluations);
        self.selected = None;
        self.candidate = None;
        self.collected.clear();
        self.attempts = 0;
        self.iterations = 0;
        self.state = EngineState::Seeding;
        self.status = None;
    }

    /// Run the algorithm on `initial_population` until the budget is spent
    /// or the archive starves.
    pub fn run(&mut self, initial_population: Vec<Solution>) -> RunReport {
        let start_time = Instant::now();
        info!(
            "Starting GVNS on {} ({} customers, {} initial solutions, budget {})",
            self.instance.name,
            self.instance.customer_count(),
            initial_population.len(),
            self.budget.limit()
        );

        self.load(initial_population);
        while self.step() != EngineState::Terminated {}

        let report = RunReport {
            archive: self.archive.clone(),
            status: self.status.unwrap_or(RunStatus::BudgetExhausted),
            evaluations: self.budget.used(),
            iterations: self.iterations,
            run_time: start_time.elapsed(),
        };

        info!(
            "GVNS finished: {:?}, {} solutions, {} evaluations, {} iterations",
            report.status,
            report.archive.len(),
            report.evaluations,
            report.iterations
        );

        report
    }

    /// Perform one state transition and return the new state.
    pub fn step(&mut self) -> EngineState {
        self.state = match self.state {
            EngineState::Seeding => self.seed(),
            EngineState::Selecting => self.select(),
            EngineState::Perturbing => self.perturb(),
            EngineState::LocalSearching => self.improve(),
            EngineState::ArchiveUpdating => self.update_archive(),
            EngineState::Terminated => EngineState::Terminated,
        };
        self.state
    }

    fn terminate(&mut self, status: RunStatus) -> EngineState {
        if let RunStatus::Starved(cause) = status {
            warn!("Search starved: {:?}", cause);
        }
        self.status = Some(status);
        self.selected = None;
        self.candidate = None;
        EngineState::Terminated
    }

    fn seed(&mut self) -> EngineState {
        let population = std::mem::take(&mut self.pending);
        let total = population.len();

        let mut seeds = Vec::with_capacity(total);
        for (i, mut solution) in population.into_iter().enumerate() {
            solution.evaluate(&self.instance);
            if solution.is_feasible {
                seeds.push(solution);
            } else {
                warn!(
                    "Initial solution {} is infeasible ({:?}), skipping",
                    i + 1,
                    solution.violation
                );
            }
        }

        let feasible = seeds.len();
        let chain = &self.local_search;
        let instance = &self.instance;
        let budget = &self.budget;
        let rounds = self.config.ns;

        let results: Vec<Solution> = if self.config.parallel_seeding {
            let rng_seeds: Vec<u64> = (0..seeds.len()).map(|_| self.rng.gen()).collect();
            seeds
                .into_par_iter()
                .zip(rng_seeds)
                .flat_map_iter(|(solution, seed)| {
                    if budget.is_exhausted() {
                        return Vec::new();
                    }
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    local_search_rounds(chain, instance, budget, rounds, &solution, &mut rng)
                })
                .collect()
        } else {
            let mut results = Vec::new();
            for (i, solution) in seeds.iter().enumerate() {
                if budget.is_exhausted() {
                    debug!(
                        "Budget exhausted during seeding, {} initial solutions left out",
                        feasible - i
                    );
                    break;
                }
                results.extend(local_search_rounds(
                    chain,
                    instance,
                    budget,
                    rounds,
                    solution,
                    &mut self.rng,
                ));
            }
            results
        };

        self.archive.update(results);
        info!(
            "Seeding done: {} of {} initial solutions feasible, archive holds {}",
            feasible,
            total,
            self.archive.len()
        );

        if self.archive.is_empty() {
            return self.terminate(RunStatus::Starved(StarvationCause::EmptyInitialArchive));
        }
        EngineState::Selecting
    }

    fn select(&mut self) -> EngineState {
        if self.budget.is_exhausted() {
            return self.terminate(RunStatus::BudgetExhausted);
        }
        if self.local_search.is_empty() && self.perturbation.is_empty() {
            // Nothing would ever consume the budget
            warn!("Both operator chains are empty, stopping after seeding");
            return self.terminate(RunStatus::BudgetExhausted);
        }

        let picked = self.archive.pick_random(&mut self.rng).cloned();
        match picked {
            Some(solution) => {
                self.selected = Some(solution);
                self.attempts = 0;
                EngineState::Perturbing
            }
            None => self.terminate(RunStatus::Starved(StarvationCause::ArchiveEmptied)),
        }
    }

    fn perturb(&mut self) -> EngineState {
        if self.budget.is_exhausted() {
            return self.terminate(RunStatus::BudgetExhausted);
        }
        let Some(selected) = self.selected.as_ref() else {
            return EngineState::Selecting;
        };

        let shaken = self
            .perturbation
            .perturb(selected, &self.instance, &self.budget, &mut self.rng);
        self.candidate = Some(shaken);
        EngineState::LocalSearching
    }

    fn improve(&mut self) -> EngineState {
        let Some(candidate) = self.candidate.take() else {
            return EngineState::Perturbing;
        };

        self.collected = local_search_rounds(
            &self.local_search,
            &self.instance,
            &self.budget,
            self.config.ns,
            &candidate,
            &mut self.rng,
        );
        EngineState::ArchiveUpdating
    }

    fn update_archive(&mut self) -> EngineState {
        let collected = std::mem::take(&mut self.collected);
        let offered = collected.len();
        let changed = self.archive.update(collected);
        self.attempts += 1;

        if changed {
            debug!(
                "Iteration {}: archive changed after {} attempts ({} offered, {} members)",
                self.iterations,
                self.attempts,
                offered,
                self.archive.len()
            );
        }

        if self.archive.is_empty() {
            return self.terminate(RunStatus::Starved(StarvationCause::ArchiveEmptied));
        }

        if changed || self.attempts >= self.config.ls_max_iter || self.budget.is_exhausted() {
            self.iterations += 1;
            if let Some(observer) = self.observer.as_mut() {
                observer.on_iteration(self.iterations, &self.archive);
            }
            return EngineState::Selecting;
        }

        EngineState::Perturbing
    }
}

/// Run `rounds` successive local search calls starting from `solution` and
/// collect every feasible intermediate result, plus the final one.
fn local_search_rounds(
    chain: &OperatorChain,
    instance: &Instance,
    budget: &EvaluationBudget,
    rounds: usize,
    solution: &Solution,
    rng: &mut dyn RngCore,
) -> Vec<Solution> {
    let mut results = Vec::new();
    let mut candidate = solution.clone();

    for _ in 0..rounds {
        if budget.is_exhausted() {
            break;
        }
        candidate = chain.improve(&candidate, instance, budget, rng);
        if candidate.is_feasible {
            results.push(candidate.clone());
        }
    }

    if candidate.is_feasible {
        results.push(candidate);
    }

    results
}
