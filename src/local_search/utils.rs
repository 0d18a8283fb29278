//! Utility functions for local search operations.

use crate::instance::Instance;
use crate::solution::{Objectives, Route, Solution};
use rand::{Rng, RngCore};
use std::collections::BTreeMap;

use super::Acceptance;

/// Build and evaluate a route visiting `nodes`. Charging decisions for the
/// stations and depots it visits are taken from the first source route
/// recording one.
pub fn build_route(instance: &Instance, nodes: Vec<usize>, sources: &[&Route]) -> Route {
    let mut charging = BTreeMap::new();

    for &id in &nodes {
        if instance.node(id).is_customer() || charging.contains_key(&id) {
            continue;
        }
        if let Some(decision) = sources.iter().find_map(|route| route.charging.get(&id)) {
            charging.insert(id, *decision);
        }
    }

    let mut route = Route::with_charging(nodes, charging);
    route.evaluate(instance);
    route
}

/// Objectives a route adds to its solution. Routes without customers are
/// dropped from the solution and add nothing.
pub fn contribution(route: &Route, instance: &Instance) -> Objectives {
    if route.has_customers(instance) {
        route.objectives()
    } else {
        Objectives::default()
    }
}

/// Whether a route can stay in a feasible solution.
pub fn is_usable(route: &Route, instance: &Instance) -> bool {
    route.is_feasible || !route.has_customers(instance)
}

/// Calculate the distance change when inserting `node` between positions
/// `pos - 1` and `pos` of a route.
pub fn insertion_delta(route: &Route, node: usize, pos: usize, instance: &Instance) -> f64 {
    let prev = route.nodes[pos - 1];
    let next = route.nodes[pos];
    instance.distance(prev, node) + instance.distance(node, next) - instance.distance(prev, next)
}

/// Calculate the distance saved when removing the node at `pos`.
pub fn removal_saving(route: &Route, pos: usize, instance: &Instance) -> f64 {
    let prev = route.nodes[pos - 1];
    let curr = route.nodes[pos];
    let next = route.nodes[pos + 1];
    instance.distance(prev, curr) + instance.distance(curr, next) - instance.distance(prev, next)
}

/// Drop station visits that are not needed any more, one at a time, as long
/// as the route stays feasible and gets cheaper. Returns whether a stop was removed.
pub fn strip_unneeded_stations(route: &mut Route, instance: &Instance) -> bool {
    let mut removed = false;
    let mut pos = 1;

    while pos + 1 < route.nodes.len() {
        if !instance.node(route.nodes[pos]).is_station() {
            pos += 1;
            continue;
        }

        let mut nodes = route.nodes.clone();
        nodes.remove(pos);
        let candidate = build_route(instance, nodes, &[&*route]);

        if candidate.is_feasible && candidate.total_cost <= route.total_cost {
            *route = candidate;
            removed = true;
        } else {
            pos += 1;
        }
    }

    removed
}

/// A candidate modification: the routes at `replaced` are swapped for `routes`.
/// The two lists correspond position by position; surplus indices are
/// removed and surplus routes appended.
#[derive(Debug, Clone)]
pub struct Move {
    pub replaced: Vec<usize>,
    pub routes: Vec<Route>,
}

impl Move {
    pub fn new(replaced: Vec<usize>, routes: Vec<Route>) -> Self {
        Move { replaced, routes }
    }

    /// Whether every resulting route can stay in a feasible solution.
    pub fn is_feasible(&self, solution: &Solution, instance: &Instance) -> bool {
        self.routes.iter().all(|r| is_usable(r, instance)) && self.fits_fleet(solution, instance)
    }

    fn fits_fleet(&self, solution: &Solution, instance: &Instance) -> bool {
        let kept = solution.routes.len() - self.replaced.len();
        let added = self
            .routes
            .iter()
            .filter(|r| r.has_customers(instance))
            .count();
        kept + added <= instance.num_vehicles
    }

    /// Objectives of the replaced routes.
    pub fn previous(&self, solution: &Solution, instance: &Instance) -> (Objectives, bool) {
        self.replaced.iter().fold(
            (Objectives::default(), true),
            |(objectives, feasible), &idx| {
                let route = &solution.routes[idx];
                (
                    objectives + contribution(route, instance),
                    feasible && is_usable(route, instance),
                )
            },
        )
    }

    /// Objectives of the new routes.
    pub fn objectives(&self, instance: &Instance) -> Objectives {
        self.routes
            .iter()
            .fold(Objectives::default(), |acc, r| acc + contribution(r, instance))
    }

    /// Install the move, drop routes without customers and re-evaluate.
    pub fn apply(self, solution: &mut Solution, instance: &Instance) {
        let assigned = self.replaced.len().min(self.routes.len());
        let mut surplus: Vec<usize> = self.replaced[assigned..].to_vec();
        let mut routes = self.routes.into_iter();

        for &idx in &self.replaced[..assigned] {
            if let Some(route) = routes.next() {
                solution.routes[idx] = route;
            }
        }

        surplus.sort_unstable_by(|a, b| b.cmp(a));
        for idx in surplus {
            solution.routes.remove(idx);
        }
        solution.routes.extend(routes);

        solution.remove_empty_routes(instance);
        solution.evaluate(instance);
    }
}

/// A neighborhood whose moves can be enumerated.
pub trait Neighborhood {
    /// Call `visit` with every evaluated candidate move of `solution`.
    fn explore(&self, solution: &Solution, instance: &Instance, visit: &mut dyn FnMut(Move));
}

/// The feasible move with the largest gain that `acceptance` allows.
pub fn best_move<N: Neighborhood + ?Sized>(
    neighborhood: &N,
    solution: &Solution,
    instance: &Instance,
    acceptance: Acceptance,
) -> Option<Move> {
    let mut best: Option<(f64, Move)> = None;

    neighborhood.explore(solution, instance, &mut |mv| {
        if !mv.is_feasible(solution, instance) {
            return;
        }
        let (current, current_feasible) = mv.previous(solution, instance);
        let candidate = mv.objectives(instance);
        if !acceptance.accepts(&current, current_feasible, &candidate) {
            return;
        }
        let gain = candidate.gain_over(&current);
        if best.as_ref().map_or(true, |(g, _)| gain > *g) {
            best = Some((gain, mv));
        }
    });

    best.map(|(_, mv)| mv)
}

/// A feasible move drawn uniformly at random (reservoir sampling).
pub fn random_move<N: Neighborhood + ?Sized>(
    neighborhood: &N,
    solution: &Solution,
    instance: &Instance,
    rng: &mut dyn RngCore,
) -> Option<Move> {
    let mut chosen = None;
    let mut seen = 0usize;

    neighborhood.explore(solution, instance, &mut |mv| {
        if !mv.is_feasible(solution, instance) {
            return;
        }
        seen += 1;
        if rng.gen_range(0..seen) == 0 {
            chosen = Some(mv);
        }
    });

    chosen
}

/// Apply dominating best moves until none is left or `max_passes` is reached.
pub fn descend<N: Neighborhood + ?Sized>(
    neighborhood: &N,
    solution: &mut Solution,
    instance: &Instance,
    max_passes: usize,
) -> bool {
    let mut improved = false;

    for _ in 0..max_passes {
        match best_move(neighborhood, solution, instance, Acceptance::Dominance) {
            Some(mv) => {
                mv.apply(solution, instance);
                improved = true;
            }
            None => break,
        }
    }

    improved
}

/// Apply up to `moves` random feasible moves to a copy of `solution`.
pub fn shake<N: Neighborhood + ?Sized>(
    neighborhood: &N,
    solution: &Solution,
    instance: &Instance,
    rng: &mut dyn RngCore,
    moves: usize,
) -> Solution {
    let mut shaken = solution.clone();

    for _ in 0..moves {
        match random_move(neighborhood, &shaken, instance, rng) {
            Some(mv) => mv.apply(&mut shaken, instance),
            None => break,
        }
    }

    shaken.evaluate(instance);
    shaken
}
