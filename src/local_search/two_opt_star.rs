//! 2-Opt* neighborhood for local search (inter-route).

use crate::instance::Instance;
use crate::solution::{Route, Solution};
use rand::RngCore;

use super::utils::{build_route, descend, shake, Move, Neighborhood};
use super::Operator;

/// Exchanges the tails of two routes. Each route keeps its own depot.
#[derive(Debug, Clone)]
pub struct TwoOptStar {
    max_passes: usize,
}

impl TwoOptStar {
    pub fn new(max_passes: usize) -> Self {
        TwoOptStar { max_passes }
    }
}

/// `head` up to and including position `cut`, then the interior of `tail` after `tail_cut`,
/// closed at the depot of `head`.
fn splice(head: &Route, cut: usize, tail: &Route, tail_cut: usize) -> Vec<usize> {
    let end = tail.nodes.len() - 1;
    head.nodes[..=cut]
        .iter()
        .chain(&tail.nodes[tail_cut + 1..end])
        .chain(head.nodes.first())
        .copied()
        .collect()
}

impl Neighborhood for TwoOptStar {
    fn explore(&self, solution: &Solution, instance: &Instance, visit: &mut dyn FnMut(Move)) {
        let routes = &solution.routes;

        for r1 in 0..routes.len() {
            for r2 in r1 + 1..routes.len() {
                let (a, b) = (&routes[r1], &routes[r2]);
                if a.nodes.len() < 2 || b.nodes.len() < 2 {
                    continue;
                }
                let (last_a, last_b) = (a.nodes.len() - 2, b.nodes.len() - 2);

                for i in 0..=last_a {
                    for j in 0..=last_b {
                        // Cutting both routes after their last customer changes nothing
                        if i == last_a && j == last_b {
                            continue;
                        }

                        let new_a = build_route(instance, splice(a, i, b, j), &[a, b]);
                        let new_b = build_route(instance, splice(b, j, a, i), &[b, a]);
                        visit(Move::new(vec![r1, r2], vec![new_a, new_b]));
                    }
                }
            }
        }
    }
}

impl Operator for TwoOptStar {
    fn name(&self) -> &'static str {
        "2-opt*"
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
