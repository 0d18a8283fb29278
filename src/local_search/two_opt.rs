//! 2-Opt neighborhood for local search (intra-route).

use crate::instance::Instance;
use crate::solution::Solution;
use rand::RngCore;

use super::utils::{build_route, descend, shake, Move, Neighborhood};
use super::Operator;

/// Reverses a segment of a single route.
#[derive(Debug, Clone)]
pub struct TwoOpt {
    max_passes: usize,
    perturbation_moves: usize,
}

impl TwoOpt {
    pub fn new(max_passes: usize, perturbation_moves: usize) -> Self {
        TwoOpt {
            max_passes,
            perturbation_moves,
        }
    }
}

impl Neighborhood for TwoOpt {
    fn explore(&self, solution: &Solution, instance: &Instance, visit: &mut dyn FnMut(Move)) {
        for (r_idx, route) in solution.routes.iter().enumerate() {
            let n = route.nodes.len();
            if n < 4 {
                continue;
            }

            // Depots at both ends stay in place
            for i in 1..n - 2 {
                for j in i + 1..n - 1 {
                    let mut nodes = route.nodes.clone();
                    nodes[i..=j].reverse();
                    let candidate = build_route(instance, nodes, &[route]);
                    visit(Move::new(vec![r_idx], vec![candidate]));
                }
            }
        }
    }
}

impl Operator for TwoOpt {
    fn name(&self) -> &'static str {
        "2-opt"
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
        shake(self, solution, instance, rng, self.perturbation_moves)
    }
}
