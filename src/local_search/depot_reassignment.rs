//! Depot reassignment: binds routes to a different depot.

use crate::instance::Instance;
use crate::solution::{Route, Solution};
use rand::seq::SliceRandom;
use rand::RngCore;

use super::utils::{build_route, descend, is_usable, Move, Neighborhood};
use super::Operator;

/// Moves the start and end of `k` random routes to another depot. A route
/// keeps its depot when the reassignment would make it infeasible.
#[derive(Debug, Clone)]
pub struct DepotReassignment {
    k: usize,
}

impl DepotReassignment {
    pub fn new(k: usize) -> Self {
        DepotReassignment { k }
    }

    /// `route` served from `depot` instead of its own.
    fn rebind(route: &Route, depot: usize, instance: &Instance) -> Route {
        let mut nodes = route.nodes.clone();
        let last = nodes.len() - 1;
        nodes[0] = depot;
        nodes[last] = depot;
        build_route(instance, nodes, &[route])
    }
}

impl Neighborhood for DepotReassignment {
    fn explore(&self, solution: &Solution, instance: &Instance, visit: &mut dyn FnMut(Move)) {
        for (r_idx, route) in solution.routes.iter().enumerate() {
            let Some(current) = route.depot() else {
                continue;
            };
            for depot in instance.depots().filter(|d| d.id != current) {
                let candidate = DepotReassignment::rebind(route, depot.id, instance);
                visit(Move::new(vec![r_idx], vec![candidate]));
            }
        }
    }
}

impl Operator for DepotReassignment {
    fn name(&self) -> &'static str {
        "depot-reassignment"
    }

    fn improve(
        &self,
        solution: &mut Solution,
        instance: &Instance,
        _rng: &mut dyn RngCore,
    ) -> bool {
        let passes = solution.route_count();
        descend(self, solution, instance, passes)
    }

    fn perturb(&self, solution: &Solution, instance: &Instance, rng: &mut dyn RngCore) -> Solution {
        let mut shaken = solution.clone();
        let depots: Vec<usize> = instance.depots().map(|d| d.id).collect();
        if depots.len() < 2 || shaken.routes.is_empty() {
            return shaken;
        }

        let mut indices: Vec<usize> = (0..shaken.routes.len()).collect();
        indices.shuffle(rng);

        for r_idx in indices.into_iter().take(self.k) {
            let route = &shaken.routes[r_idx];
            let Some(current) = route.depot() else {
                continue;
            };
            let others: Vec<usize> = depots.iter().copied().filter(|&d| d != current).collect();
            let Some(&depot) = others.choose(rng) else {
                continue;
            };

            let candidate = DepotReassignment::rebind(route, depot, instance);
            if is_usable(&candidate, instance) {
                shaken.routes[r_idx] = candidate;
            }
        }

        shaken.evaluate(instance);
        shaken
    }
}
