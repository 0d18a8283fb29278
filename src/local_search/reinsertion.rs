//! Reinsertion neighborhood.
//!
//! Customers are ranked by the saving their removal produces, including the
//! charging cost of station visits that become unnecessary once the customer
//! is gone, and then moved to the cheapest feasible slot of another route.
//! Moving customers this way empties routes, removes recharges or just
//! shortens the plan.

use crate::config::{ReinsertionConfig, SavingsUpdate, Selection};
use crate::instance::Instance;
use crate::solution::{Route, Solution};
use rand::RngCore;
use std::cmp::Ordering;

use super::utils::{
    build_route, removal_saving, shake, strip_unneeded_stations, Move, Neighborhood,
};
use super::{Acceptance, Operator};

#[derive(Debug, Clone)]
pub struct Reinsertion {
    config: ReinsertionConfig,
}

impl Reinsertion {
    pub fn new(config: ReinsertionConfig) -> Self {
        Reinsertion { config }
    }

    /// `route` without the node at `pos`, with unnecessary station visits dropped.
    fn without(route: &Route, pos: usize, instance: &Instance) -> Route {
        let mut nodes = route.nodes.clone();
        nodes.remove(pos);
        let mut reduced = build_route(instance, nodes, &[route]);
        if reduced.is_feasible {
            strip_unneeded_stations(&mut reduced, instance);
        }
        reduced
    }

    /// Distance freed by removing the customer at `pos`, plus the charging
    /// cost saved by the station visits its removal makes unnecessary.
    fn customer_saving(route: &Route, pos: usize, instance: &Instance) -> f64 {
        let saving = removal_saving(route, pos, instance);
        let reduced = Reinsertion::without(route, pos, instance);

        let stops = reduced.charging_stops(instance);
        if reduced.is_feasible && stops < route.charging_stops(instance) {
            saving + (route.total_cost - reduced.total_cost).max(0.0)
        } else {
            saving
        }
    }

    fn savings(solution: &Solution, instance: &Instance) -> Vec<(usize, f64)> {
        solution
            .routes
            .iter()
            .flat_map(|route| {
                route
                    .customer_positions(instance)
                    .into_iter()
                    .map(move |pos| {
                        let saving = Reinsertion::customer_saving(route, pos, instance);
                        (route.nodes[pos], saving)
                    })
            })
            .collect()
    }

    /// Every reinsertion of `customer` into another route.
    fn moves_for(
        &self,
        solution: &Solution,
        instance: &Instance,
        customer: usize,
        visit: &mut dyn FnMut(Move),
    ) {
        let Some((src, pos)) = solution.find_customer(customer) else {
            return;
        };
        let source = &solution.routes[src];
        let reduced = Reinsertion::without(source, pos, instance);

        for (tgt, target) in solution.routes.iter().enumerate() {
            if tgt == src {
                continue;
            }
            for insert_pos in 1..target.nodes.len() {
                let mut nodes = target.nodes.clone();
                nodes.insert(insert_pos, customer);
                let candidate = build_route(instance, nodes, &[target]);
                visit(Move::new(vec![src, tgt], vec![reduced.clone(), candidate]));
            }
        }
    }

    /// The dominating reinsertion of `customer` with the highest gain.
    fn best_for(
        &self,
        solution: &Solution,
        instance: &Instance,
        customer: usize,
    ) -> Option<(f64, Move)> {
        let mut best: Option<(f64, Move)> = None;

        self.moves_for(solution, instance, customer, &mut |mv| {
            if !mv.is_feasible(solution, instance) {
                return;
            }
            let (current, current_feasible) = mv.previous(solution, instance);
            let candidate = mv.objectives(instance);
            if !Acceptance::Dominance.accepts(&current, current_feasible, &candidate) {
                return;
            }
            let gain = candidate.gain_over(&current);
            if best.as_ref().map_or(true, |(g, _)| gain > *g) {
                best = Some((gain, mv));
            }
        });

        best
    }
}

impl Neighborhood for Reinsertion {
    fn explore(&self, solution: &Solution, instance: &Instance, visit: &mut dyn FnMut(Move)) {
        for customer in solution.customers_served(instance) {
            self.moves_for(solution, instance, customer, visit);
        }
    }
}

impl Operator for Reinsertion {
    fn name(&self) -> &'static str {
        "reinsertion"
    }

    fn improve(
        &self,
        solution: &mut Solution,
        instance: &Instance,
        _rng: &mut dyn RngCore,
    ) -> bool {
        let mut improved = false;
        let mut savings = Reinsertion::savings(solution, instance);

        for iteration in 0..self.config.iterations {
            if iteration > 0 && self.config.savings_update == SavingsUpdate::Full {
                savings = Reinsertion::savings(solution, instance);
            }
            savings.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

            let chosen = {
                let current: &Solution = solution;
                let mut candidates = savings.iter().filter_map(|&(customer, _)| {
                    self.best_for(current, instance, customer)
                        .map(|(gain, mv)| (gain, customer, mv))
                });

                match self.config.selection {
                    Selection::First => candidates.next(),
                    Selection::Best => candidates
                        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal)),
                }
            };

            let Some((_, moved, mv)) = chosen else {
                break;
            };

            // Customers whose saving changes with the move
            let routes = &solution.routes;
            let affected: Vec<usize> = mv
                .replaced
                .iter()
                .flat_map(|&idx| routes[idx].customers(instance))
                .filter(|&c| c != moved)
                .collect();

            mv.apply(solution, instance);
            improved = true;

            if self.config.savings_update == SavingsUpdate::Incremental {
                savings.retain(|(c, _)| *c != moved && !affected.contains(c));
                for customer in affected {
                    if let Some((r, pos)) = solution.find_customer(customer) {
                        let saving =
                            Reinsertion::customer_saving(&solution.routes[r], pos, instance);
                        savings.push((customer, saving));
                    }
                }
            }
        }

        improved
    }

    fn perturb(&self, solution: &Solution, instance: &Instance, rng: &mut dyn RngCore) -> Solution {
        shake(self, solution, instance, rng, 1)
    }
}
