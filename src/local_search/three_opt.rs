//! 3-Opt neighborhood for local search (intra-route).
//!
//! Two cuts inside a route isolate consecutive segments `B` and `C`; the
//! route is rebuilt from every non-identity combination of swapping the two
//! segments and reversing either of them. Plain segment reversals (the 2-opt
//! moves) are included as special cases.

use crate::instance::Instance;
use crate::solution::Solution;
use rand::RngCore;

use super::utils::{build_route, descend, shake, Move, Neighborhood};
use super::Operator;

/// `(swap, reverse_b, reverse_c)` for the seven reconnections.
const RECONNECTIONS: [(bool, bool, bool); 7] = [
    (false, false, true),
    (false, true, false),
    (false, true, true),
    (true, false, false),
    (true, true, false),
    (true, false, true),
    (true, true, true),
];

/// Reconnects three edges of a single route.
#[derive(Debug, Clone)]
pub struct ThreeOpt {
    max_passes: usize,
    perturbation_moves: usize,
}

impl ThreeOpt {
    pub fn new(max_passes: usize, perturbation_moves: usize) -> Self {
        ThreeOpt {
            max_passes,
            perturbation_moves,
        }
    }

    /// `nodes` with `B = nodes[i..j]` and `C = nodes[j..k]` reconnected.
    fn reconnect(
        nodes: &[usize],
        (i, j, k): (usize, usize, usize),
        (swap, reverse_b, reverse_c): (bool, bool, bool),
    ) -> Vec<usize> {
        let mut b = nodes[i..j].to_vec();
        let mut c = nodes[j..k].to_vec();
        if reverse_b {
            b.reverse();
        }
        if reverse_c {
            c.reverse();
        }
        if swap {
            std::mem::swap(&mut b, &mut c);
        }

        let mut result = Vec::with_capacity(nodes.len());
        result.extend_from_slice(&nodes[..i]);
        result.extend(b);
        result.extend(c);
        result.extend_from_slice(&nodes[k..]);
        result
    }
}

impl Neighborhood for ThreeOpt {
    fn explore(&self, solution: &Solution, instance: &Instance, visit: &mut dyn FnMut(Move)) {
        for (r_idx, route) in solution.routes.iter().enumerate() {
            let n = route.nodes.len();
            // At least three inner nodes
            if n < 5 {
                continue;
            }

            for i in 1..n - 2 {
                for j in i + 1..n - 1 {
                    for k in j + 1..n {
                        for &pattern in &RECONNECTIONS {
                            let nodes = ThreeOpt::reconnect(&route.nodes, (i, j, k), pattern);
                            if nodes == route.nodes {
                                continue;
                            }
                            let candidate = build_route(instance, nodes, &[route]);
                            visit(Move::new(vec![r_idx], vec![candidate]));
                        }
                    }
                }
            }
        }
    }
}

impl Operator for ThreeOpt {
    fn name(&self) -> &'static str {
        "3-opt"
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

