//! Recharge Relocation: places a single recharge stop optimally in a route.
//!
//! The customer sequence of the route is kept. When driving it without any
//! station exceeds the vehicle range, every station reachable inside the
//! interval of positions where one recharge can complete the route is tried
//! with each technology it offers, charging only the energy the rest of the
//! route needs. The cheapest feasible option wins, shorter routes breaking ties.
//! When the customer sequence fits in the range, station visits are removed
//! instead, provided the route stays feasible.

use crate::instance::Instance;
use crate::solution::{ChargingDecision, Route, Solution, FEASIBILITY_EPSILON};
use log::trace;
use rand::RngCore;
use std::cmp::Ordering;

use super::utils::build_route;
use super::{Acceptance, Operator};

#[derive(Debug, Clone, Default)]
pub struct RechargeRelocation;

impl RechargeRelocation {
    pub fn new() -> Self {
        RechargeRelocation
    }

    /// Best replacement of `route`, if one is accepted.
    pub fn relocate(route: &Route, instance: &Instance, acceptance: Acceptance) -> Option<Route> {
        let nodes: Vec<usize> = route
            .nodes
            .iter()
            .copied()
            .filter(|&id| !instance.node(id).is_station())
            .collect();
        if nodes.len() < 3 {
            return None;
        }

        // Depot charging decisions survive, station visits are rebuilt
        let stripped = build_route(instance, nodes, &[route]);
        let legs: Vec<f64> = stripped
            .nodes
            .windows(2)
            .map(|w| instance.distance(w[0], w[1]))
            .collect();
        let length: f64 = legs.iter().sum();

        let candidate = if length <= instance.vehicle.max_range() + FEASIBILITY_EPSILON {
            stripped
        } else {
            RechargeRelocation::single_recharge(&stripped, &legs, instance)?
        };

        if !candidate.is_feasible
            || (candidate.nodes == route.nodes && candidate.charging == route.charging)
        {
            return None;
        }

        acceptance
            .accepts(&route.objectives(), route.is_feasible, &candidate.objectives())
            .then_some(candidate)
    }

    /// Cheapest feasible route obtained by inserting one station into `stripped`.
    fn single_recharge(stripped: &Route, legs: &[f64], instance: &Instance) -> Option<Route> {
        let range = instance.vehicle.max_range() + FEASIBILITY_EPSILON;
        let nodes = &stripped.nodes;
        let n = nodes.len();

        let mut prefix = vec![0.0; n];
        for k in 1..n {
            prefix[k] = prefix[k - 1] + legs[k - 1];
        }
        let mut suffix = vec![0.0; n];
        for k in (0..n - 1).rev() {
            suffix[k] = suffix[k + 1] + legs[k];
        }

        // First node from which the depot is reachable, last node reachable from it
        let a = (0..n).find(|&k| suffix[k] <= range)?;
        let b = (0..n).rev().find(|&k| prefix[k] <= range)?;
        let (lo, hi) = (a.saturating_sub(1), b.min(n - 2));
        if lo > hi {
            return None;
        }

        let battery = instance.vehicle.battery_capacity;
        let mut best: Option<Route> = None;

        for i in lo..=hi {
            let (from, to) = (nodes[i], nodes[i + 1]);

            for station in instance.stations() {
                let before = prefix[i] + instance.distance(from, station.id);
                let after = instance.distance(station.id, to) + suffix[i + 1];
                if before > range || after > range {
                    continue;
                }

                let arrival = (battery - instance.energy_for(before)).max(0.0);
                let charge = (instance.energy_for(after) - arrival).max(0.0);

                for technology in station
                    .technologies
                    .iter()
                    .filter_map(|&id| instance.technology(id))
                {
                    let mut path = nodes.clone();
                    path.insert(i + 1, station.id);
                    let mut charging = stripped.charging.clone();
                    charging.insert(station.id, ChargingDecision::new(technology.id, charge));

                    let mut candidate = Route::with_charging(path, charging);
                    candidate.evaluate(instance);
                    if !candidate.is_feasible {
                        continue;
                    }

                    if best.as_ref().map_or(true, |current| is_cheaper(&candidate, current)) {
                        best = Some(candidate);
                    }
                }
            }
        }

        best
    }

    fn apply(&self, solution: &mut Solution, instance: &Instance, acceptance: Acceptance) -> bool {
        let mut changed = false;

        for (idx, route) in solution.routes.iter_mut().enumerate() {
            if let Some(relocated) = RechargeRelocation::relocate(route, instance, acceptance) {
                trace!(
                    "route {}: recharge cost {:.2} -> {:.2}",
                    idx,
                    route.total_cost,
                    relocated.total_cost
                );
                *route = relocated;
                changed = true;
            }
        }

        if changed {
            solution.evaluate(instance);
        }
        changed
    }
}

fn is_cheaper(candidate: &Route, current: &Route) -> bool {
    match candidate.total_cost.partial_cmp(&current.total_cost) {
        Some(Ordering::Less) => true,
        Some(Ordering::Equal) => candidate.total_distance < current.total_distance,
        _ => false,
    }
}

impl Operator for RechargeRelocation {
    fn name(&self) -> &'static str {
        "recharge-relocation"
    }

    fn improve(
        &self,
        solution: &mut Solution,
        instance: &Instance,
        _rng: &mut dyn RngCore,
    ) -> bool {
        self.apply(solution, instance, Acceptance::Dominance)
    }

    fn perturb(
        &self,
        solution: &Solution,
        instance: &Instance,
        _rng: &mut dyn RngCore,
    ) -> Solution {
        let mut shaken = solution.clone();
        self.apply(&mut shaken, instance, Acceptance::Unconditional);
        shaken
    }
}
