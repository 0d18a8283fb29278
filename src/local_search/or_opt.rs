//! Or-opt neighborhood: relocates short chains of consecutive customers.

use crate::instance::Instance;
use crate::solution::Solution;
use rand::RngCore;

use super::utils::{build_route, descend, shake, Move, Neighborhood};
use super::Operator;

#[derive(Debug, Clone)]
pub struct OrOpt {
    max_passes: usize,
    /// Longest chain moved at once
    max_segment: usize,
}

impl OrOpt {
    pub fn new(max_passes: usize, max_segment: usize) -> Self {
        OrOpt {
            max_passes,
            max_segment: max_segment.max(1),
        }
    }
}

impl Neighborhood for OrOpt {
    fn explore(&self, solution: &Solution, instance: &Instance, visit: &mut dyn FnMut(Move)) {
        for (r1_idx, r1) in solution.routes.iter().enumerate() {
            let interior = r1.nodes.len().saturating_sub(1);

            for start in 1..interior {
                for len in 1..=self.max_segment {
                    let end = start + len;
                    if end > interior {
                        break;
                    }
                    let segment = &r1.nodes[start..end];
                    if !segment.iter().all(|&id| instance.node(id).is_customer()) {
                        break;
                    }

                    let mut remaining = r1.nodes.clone();
                    remaining.drain(start..end);

                    for target in 1..remaining.len() {
                        if target == start {
                            continue;
                        }
                        let mut nodes = remaining.clone();
                        nodes.splice(target..target, segment.iter().copied());
                        visit(Move::new(
                            vec![r1_idx],
                            vec![build_route(instance, nodes, &[r1])],
                        ));
                    }

                    let source = build_route(instance, remaining, &[r1]);

                    for (r2_idx, r2) in solution.routes.iter().enumerate() {
                        if r2_idx == r1_idx {
                            continue;
                        }
                        for target in 1..r2.nodes.len() {
                            let mut nodes = r2.nodes.clone();
                            nodes.splice(target..target, segment.iter().copied());
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
}

impl Operator for OrOpt {
    fn name(&self) -> &'static str {
        "or-opt"
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
