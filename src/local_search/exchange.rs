//! Exchange neighborhood for local search.

use crate::instance::Instance;
use crate::solution::Solution;
use rand::RngCore;

use super::utils::{build_route, descend, shake, Move, Neighborhood};
use super::Operator;

/// Swaps the positions of two customers, in the same route or across two routes.
#[derive(Debug, Clone)]
pub struct Exchange {
    max_passes: usize,
}

impl Exchange {
    pub fn new(max_passes: usize) -> Self {
        Exchange { max_passes }
    }
}

impl Neighborhood for Exchange {
    fn explore(&self, solution: &Solution, instance: &Instance, visit: &mut dyn FnMut(Move)) {
        let routes = &solution.routes;

        for r1_idx in 0..routes.len() {
            let r1 = &routes[r1_idx];
            let positions1 = r1.customer_positions(instance);

            // Swap within the route
            for (k, &p) in positions1.iter().enumerate() {
                for &q in &positions1[k + 1..] {
                    let mut nodes = r1.nodes.clone();
                    nodes.swap(p, q);
                    visit(Move::new(
                        vec![r1_idx],
                        vec![build_route(instance, nodes, &[r1])],
                    ));
                }
            }

            // Swap with later routes
            for r2_idx in r1_idx + 1..routes.len() {
                let r2 = &routes[r2_idx];
                let positions2 = r2.customer_positions(instance);

                for &p in &positions1 {
                    for &q in &positions2 {
                        let mut nodes1 = r1.nodes.clone();
                        let mut nodes2 = r2.nodes.clone();
                        std::mem::swap(&mut nodes1[p], &mut nodes2[q]);

                        visit(Move::new(
                            vec![r1_idx, r2_idx],
                            vec![
                                build_route(instance, nodes1, &[r1]),
                                build_route(instance, nodes2, &[r2]),
                            ],
                        ));
                    }
                }
            }
        }
    }
}

impl Operator for Exchange {
    fn name(&self) -> &'static str {
        "exchange"
    }

    fn improve(
        &self,
        solution: &mut Solution,
        instance: &Instance,
        _rng: &mut dyn RngCore,
    ) -> bool {
        descend(self, solution, instance, self.max_passes)
    }

    fn perturb(&self, solution: &Solution, instance: &Instance, rng: &mut dyn RngCore) -> Solution {
        shake(self, solution, instance, rng, self.max_passes)
    }
}
