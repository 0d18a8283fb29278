//! Configuration parameters for the GVNS algorithm.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when loading or validating a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} must be positive")]
    NotPositive(&'static str),

    #[error("{0} must not be negative")]
    Negative(&'static str),
}

/// How the Reinsertion operator picks the move to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Perform the move with the highest saving
    Best,
    /// Perform the first move found with a positive saving
    First,
}

/// How the Reinsertion operator refreshes removal savings after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavingsUpdate {
    /// Recompute the savings of every customer
    Full,
    /// Recompute only the routes touched by the move and drop the moved customer
    Incremental,
}

/// Settings of the Reinsertion neighborhood.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReinsertionConfig {
    /// Maximum number of moves per call
    pub iterations: usize,
    pub selection: Selection,
    pub savings_update: SavingsUpdate,
}

impl Default for ReinsertionConfig {
    fn default() -> Self {
        ReinsertionConfig {
            iterations: 10,
            selection: Selection::Best,
            savings_update: SavingsUpdate::Full,
        }
    }
}

/// Configuration settings for the GVNS algorithm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of local search rounds applied to each candidate (NS)
    pub ns: usize,
    /// Maximum number of solutions kept in the archive (NA)
    pub na: usize,
    /// Maximum number of perturbation attempts per selected solution
    pub ls_max_iter: usize,
    /// Maximum number of operator calls for the whole run
    pub max_evaluations: usize,
    /// Seed of the random number generator, drawn from entropy when absent
    pub seed: Option<u64>,
    /// Improve the initial population concurrently
    pub parallel_seeding: bool,
    /// Two archive entries are duplicates when both objectives differ by at most this
    pub duplicate_tolerance: f64,
    /// Passes per local search call and random moves per perturbation
    pub operator_max_iter: usize,
    /// Random segment reversals per 2-opt perturbation (MaxPert)
    pub perturbation_moves: usize,
    /// Routes moved to another depot per depot reassignment
    pub depot_reassignment_routes: usize,
    /// Minimum number of customers of a route before it may be split
    pub split_min_customers: usize,
    pub reinsertion: ReinsertionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ns: 5,
            na: 50,
            ls_max_iter: 10,
            max_evaluations: 10_000,
            seed: None,
            parallel_seeding: false,
            duplicate_tolerance: 0.0,
            operator_max_iter: 10,
            perturbation_moves: 3,
            depot_reassignment_routes: 2,
            split_min_customers: 4,
            reinsertion: ReinsertionConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Config::default()
    }

    /// Load a configuration from JSON. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ns == 0 {
            return Err(ConfigError::NotPositive("ns"));
        }
        if self.na == 0 {
            return Err(ConfigError::NotPositive("na"));
        }
        if self.ls_max_iter == 0 {
            return Err(ConfigError::NotPositive("ls_max_iter"));
        }
        if self.max_evaluations == 0 {
            return Err(ConfigError::NotPositive("max_evaluations"));
        }
        if self.duplicate_tolerance < 0.0 {
            return Err(ConfigError::Negative("duplicate_tolerance"));
        }
        Ok(())
    }

    /// Set the number of local search rounds per candidate.
    pub fn with_ns(mut self, ns: usize) -> Self {
        self.ns = ns;
        self
    }

    /// Set the archive size bound.
    pub fn with_na(mut self, na: usize) -> Self {
        self.na = na;
        self
    }

    /// Set the maximum number of perturbation attempts per selected solution.
    pub fn with_ls_max_iter(mut self, iterations: usize) -> Self {
        self.ls_max_iter = iterations;
        self
    }

    /// Set the evaluation budget.
    pub fn with_max_evaluations(mut self, evaluations: usize) -> Self {
        self.max_evaluations = evaluations;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable concurrent improvement of the initial population.
    pub fn with_parallel_seeding(mut self, parallel: bool) -> Self {
        self.parallel_seeding = parallel;
        self
    }

    /// Set the archive duplicate tolerance.
    pub fn with_duplicate_tolerance(mut self, tolerance: f64) -> Self {
        self.duplicate_tolerance = tolerance;
        self
    }

    /// Set the per-operator pass limit.
    pub fn with_operator_max_iter(mut self, iterations: usize) -> Self {
        self.operator_max_iter = iterations;
        self
    }

    /// Set the number of random 2-opt moves per perturbation.
    pub fn with_perturbation_moves(mut self, moves: usize) -> Self {
        self.perturbation_moves = moves;
        self
    }

    /// Set the number of routes reassigned per depot reassignment.
    pub fn with_depot_reassignment_routes(mut self, routes: usize) -> Self {
        self.depot_reassignment_routes = routes;
        self
    }

    /// Set the minimum route size for route splitting.
    pub fn with_split_min_customers(mut self, customers: usize) -> Self {
        self.split_min_customers = customers;
        self
    }

    /// Set the Reinsertion settings.
    pub fn with_reinsertion(mut self, reinsertion: ReinsertionConfig) -> Self {
        self.reinsertion = reinsertion;
        self
    }
}
