//! Route split: divides one route into two routes from the same depot.

use crate::instance::Instance;
use crate::solution::{Route, Solution};
use rand::RngCore;

use super::utils::{build_route, descend, shake, Move, Neighborhood};
use super::Operator;

#[derive(Debug, Clone)]
pub struct RouteSplit {
    /// Routes with fewer customers are only split when infeasible
    min_customers: usize,
}

impl RouteSplit {
    pub fn new(min_customers: usize) -> Self {
        RouteSplit {
            min_customers: min_customers.max(2),
        }
    }

    fn can_split(&self, route: &Route, instance: &Instance) -> bool {
        let customers = route.customers(instance).count();
        customers >= self.min_customers || (customers >= 2 && !route.is_feasible)
    }
}

impl Neighborhood for RouteSplit {
    fn explore(&self, solution: &Solution, instance: &Instance, visit: &mut dyn FnMut(Move)) {
        for (r_idx, route) in solution.routes.iter().enumerate() {
            if !self.can_split(route, instance) {
                continue;
            }
            let Some(depot) = route.depot() else {
                continue;
            };

            let positions = route.customer_positions(instance);
            // Each part keeps at least one customer
            for &cut in &positions[1..] {
                let head: Vec<usize> = route.nodes[..cut]
                    .iter()
                    .copied()
                    .chain(Some(depot))
                    .collect();
                let tail: Vec<usize> = Some(depot)
                    .into_iter()
                    .chain(route.nodes[cut..].iter().copied())
                    .collect();

                visit(Move::new(
                    vec![r_idx],
                    vec![
                        build_route(instance, head, &[route]),
                        build_route(instance, tail, &[route]),
                    ],
                ));
            }
        }
    }
}

impl Operator for RouteSplit {
    fn name(&self) -> &'static str {
        "route-split"
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
        shake(self, solution, instance, rng, 1)
    }
}
