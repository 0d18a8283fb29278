//! Neighborhood operators for the GVNS algorithm.
//!
//! Every move family implements [`Operator`]: `improve` is a greedy descent
//! that only installs moves Pareto-dominating the current routes, `perturb`
//! applies random feasible moves to a copy without requiring improvement.

pub mod depot_reassignment;
pub mod eliminate_route;
pub mod exchange;
pub mod or_opt;
pub mod recharge_relocation;
pub mod reinsertion;
pub mod relocate;
pub mod route_split;
pub mod three_opt;
pub mod two_opt;
pub mod two_opt_star;
pub mod utils;

use crate::config::Config;
use crate::instance::Instance;
use crate::solution::{Objectives, Solution};
use crate::EvaluationBudget;
use log::trace;
use rand::RngCore;

pub use self::depot_reassignment::DepotReassignment;
pub use self::eliminate_route::EliminateRoute;
pub use self::exchange::Exchange;
pub use self::or_opt::OrOpt;
pub use self::recharge_relocation::RechargeRelocation;
pub use self::reinsertion::Reinsertion;
pub use self::relocate::Relocate;
pub use self::route_split::RouteSplit;
pub use self::three_opt::ThreeOpt;
pub use self::two_opt::TwoOpt;
pub use self::two_opt_star::TwoOptStar;

/// A neighborhood structure usable both for local search and for shaking.
pub trait Operator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Greedily improve `solution` in place. Returns whether it changed.
    fn improve(&self, solution: &mut Solution, instance: &Instance, rng: &mut dyn RngCore)
        -> bool;

    /// Produce a randomly modified, evaluated copy of `solution`.
    fn perturb(&self, solution: &Solution, instance: &Instance, rng: &mut dyn RngCore)
        -> Solution;
}

/// Rule deciding whether a candidate replaces the current routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// The candidate must Pareto-dominate the current routes (unless those are infeasible)
    Dominance,
    /// Any feasible candidate is taken
    Unconditional,
}

impl Acceptance {
    /// Decide on a feasible candidate.
    pub fn accepts(
        self,
        current: &Objectives,
        current_feasible: bool,
        candidate: &Objectives,
    ) -> bool {
        match self {
            Acceptance::Unconditional => true,
            Acceptance::Dominance => !current_feasible || candidate.dominates(current),
        }
    }
}

/// An ordered list of operators applied one after another.
pub struct OperatorChain {
    operators: Vec<Box<dyn Operator>>,
}

impl OperatorChain {
    pub fn new(operators: Vec<Box<dyn Operator>>) -> Self {
        OperatorChain { operators }
    }

    /// The local search chain used when none is configured.
    pub fn default_local_search(config: &Config) -> Self {
        let passes = config.operator_max_iter;
        OperatorChain::new(vec![
            Box::new(RechargeRelocation::new()),
            Box::new(TwoOpt::new(passes, config.perturbation_moves)),
            Box::new(Relocate::new(passes)),
            Box::new(Exchange::new(passes)),
            Box::new(OrOpt::new(passes, 3)),
            Box::new(TwoOptStar::new(passes)),
            Box::new(Reinsertion::new(config.reinsertion.clone())),
        ])
    }

    /// The perturbation chain used when none is configured.
    pub fn default_perturbation(config: &Config) -> Self {
        let passes = config.operator_max_iter;
        OperatorChain::new(vec![
            Box::new(TwoOpt::new(passes, config.perturbation_moves)),
            Box::new(Relocate::new(passes)),
            Box::new(RouteSplit::new(config.split_min_customers)),
            Box::new(EliminateRoute::new(1)),
            Box::new(DepotReassignment::new(config.depot_reassignment_routes)),
        ])
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.operators.iter().map(|op| op.name()).collect()
    }

    /// Run the operators in order on a copy of `solution`, stopping after the
    /// first one that yields a feasible improvement. Every operator call
    /// consumes one unit of `budget`; no call is made once it is exhausted.
    pub fn improve(
        &self,
        solution: &Solution,
        instance: &Instance,
        budget: &EvaluationBudget,
        rng: &mut dyn RngCore,
    ) -> Solution {
        let mut candidate = solution.clone();

        for operator in &self.operators {
            if !budget.try_consume() {
                break;
            }

            if operator.improve(&mut candidate, instance, rng) {
                candidate.evaluate(instance);
                if candidate.is_feasible {
                    trace!(
                        "{} improved to ({:.2}, {:.2})",
                        operator.name(),
                        candidate.total_distance,
                        candidate.total_cost
                    );
                    break;
                }
            }
        }

        candidate
    }

    /// Apply every operator's perturbation once in order, keeping each
    /// result that is feasible. Consumes one unit of `budget` per operator.
    pub fn perturb(
        &self,
        solution: &Solution,
        instance: &Instance,
        budget: &EvaluationBudget,
        rng: &mut dyn RngCore,
    ) -> Solution {
        let mut perturbed = solution.clone();

        for operator in &self.operators {
            if !budget.try_consume() {
                break;
            }

            let mut shaken = operator.perturb(&perturbed, instance, rng);
            shaken.evaluate(instance);
            if shaken.is_feasible {
                perturbed = shaken;
            }
        }

        perturbed
    }
}
