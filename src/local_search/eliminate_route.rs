//! Eliminate route: removes a route and spreads its customers over the others.

use crate::instance::Instance;
use crate::solution::{Objectives, Route, Solution};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::utils::{build_route, contribution, is_usable};
use super::Operator;

#[derive(Debug, Clone)]
pub struct EliminateRoute {
    /// Eliminations attempted per perturbation
    max_iter: usize,
}

impl EliminateRoute {
    pub fn new(max_iter: usize) -> Self {
        EliminateRoute { max_iter }
    }

    /// Remove route `r_idx` and insert its customers, in the given order,
    /// each at its cheapest feasible position. `None` if a customer has nowhere to go.
    pub fn eliminate(
        solution: &Solution,
        r_idx: usize,
        customers: &[usize],
        instance: &Instance,
    ) -> Option<Solution> {
        let mut result = solution.clone();
        result.routes.remove(r_idx);
        if result.routes.is_empty() {
            return None;
        }

        for &customer in customers {
            let (target, route) = cheapest_insertion(&result.routes, customer, instance)?;
            result.routes[target] = route;
        }

        result.evaluate(instance);
        result.is_feasible.then_some(result)
    }
}

/// Best (route index, new route) for inserting `customer` into one of `routes`.
fn cheapest_insertion(
    routes: &[Route],
    customer: usize,
    instance: &Instance,
) -> Option<(usize, Route)> {
    let mut best: Option<(f64, usize, Route)> = None;

    for (r_idx, route) in routes.iter().enumerate() {
        let before = contribution(route, instance);

        for pos in 1..route.nodes.len() {
            let mut nodes = route.nodes.clone();
            nodes.insert(pos, customer);
            let candidate = build_route(instance, nodes, &[route]);
            if !is_usable(&candidate, instance) {
                continue;
            }

            let increase = -candidate.objectives().gain_over(&before);
            if best.as_ref().map_or(true, |(cost, _, _)| increase < *cost) {
                best = Some((increase, r_idx, candidate));
            }
        }
    }

    best.map(|(_, r_idx, route)| (r_idx, route))
}

impl Operator for EliminateRoute {
    fn name(&self) -> &'static str {
        "eliminate-route"
    }

    /// Eliminate the first route whose removal yields a dominating solution.
    fn improve(
        &self,
        solution: &mut Solution,
        instance: &Instance,
        _rng: &mut dyn RngCore,
    ) -> bool {
        let current: Objectives = solution.objectives();

        for r_idx in 0..solution.routes.len() {
            let customers: Vec<usize> = solution.routes[r_idx].customers(instance).collect();
            if let Some(result) = EliminateRoute::eliminate(solution, r_idx, &customers, instance) {
                if !solution.is_feasible || result.objectives().dominates(&current) {
                    *solution = result;
                    return true;
                }
            }
        }

        false
    }

    fn perturb(&self, solution: &Solution, instance: &Instance, rng: &mut dyn RngCore) -> Solution {
        let mut shaken = solution.clone();

        for _ in 0..self.max_iter {
            if shaken.routes.len() < 2 {
                break;
            }
            let r_idx = rng.gen_range(0..shaken.routes.len());
            let mut customers: Vec<usize> = shaken.routes[r_idx].customers(instance).collect();
            customers.shuffle(rng);

            // Rolled back when a customer cannot be placed
            if let Some(result) = EliminateRoute::eliminate(&shaken, r_idx, &customers, instance) {
                shaken = result;
            }
        }

        shaken
    }
}
