//! Relocate neighborhood for local search.

use crate::instance::Instance;
use crate::solution::Solution;
use rand::RngCore;

use super::utils::{build_route, descend, shake, Move, Neighborhood};
use super::Operator;

/// Moves a single customer to another position, in the same or another route.
#[derive(Debug, Clone)]
pub struct Relocate {
    max_passes: usize,
}

impl Relocate {
    pub fn new(max_passes: usize) -> Self {
        Relocate { max_passes }
    }
}

impl Neighborhood for Relocate {
    fn explore(&self, solution: &Solution, instance: &Instance, visit: &mut dyn FnMut(Move)) {
        for (r1_idx, r1) in solution.routes.iter().enumerate() {
            for pos in r1.customer_positions(instance) {
                let customer = r1.nodes[pos];
                let mut remaining = r1.nodes.clone();
                remaining.remove(pos);

                // Intra-route
                for target in 1..remaining.len() {
                    if target == pos {
                        continue;
                    }
                    let mut nodes = remaining.clone();
                    nodes.insert(target, customer);
                    visit(Move::new(
                        vec![r1_idx],
                        vec![build_route(instance, nodes, &[r1])],
                    ));
                }

                let source = build_route(instance, remaining, &[r1]);

                // Inter-route
                for (r2_idx, r2) in solution.routes.iter().enumerate() {
                    if r2_idx == r1_idx {
                        continue;
                    }
                    for target in 1..r2.nodes.len() {
                        let mut nodes = r2.nodes.clone();
                        nodes.insert(target, customer);
                        visit(Move::new(
                            vec![r1_idx, r2_idx],
                            vec![source.clone(), build_route(instance, nodes, &[r2])],
                        ));
                    }
                }
            }
        }
    }
}

impl Operator for Relocate {
    fn name(&self) -> &'static str {
        "relocate"
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
