//! Solution representation and feasibility evaluation for the EVRP.

use crate::instance::Instance;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;

/// Slack used when comparing accumulated floating point quantities against limits.
pub const FEASIBILITY_EPSILON: f64 = 1e-9;

/// The two objectives minimized by the search.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Objectives {
    pub distance: f64,
    pub cost: f64,
}

impl Objectives {
    pub fn new(distance: f64, cost: f64) -> Self {
        Objectives { distance, cost }
    }

    /// Pareto dominance: no worse in both objectives and strictly better in one.
    pub fn dominates(&self, other: &Objectives) -> bool {
        self.distance <= other.distance
            && self.cost <= other.cost
            && (self.distance < other.distance || self.cost < other.cost)
    }

    /// Combined decrease of both objectives relative to `previous`.
    pub fn gain_over(&self, previous: &Objectives) -> f64 {
        (previous.distance - self.distance) + (previous.cost - self.cost)
    }
}

impl Add for Objectives {
    type Output = Objectives;

    fn add(self, rhs: Objectives) -> Objectives {
        Objectives::new(self.distance + rhs.distance, self.cost + rhs.cost)
    }
}

/// A charging decision taken at a station or depot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargingDecision {
    pub technology: usize,
    pub energy: f64,
}

impl ChargingDecision {
    pub fn new(technology: usize, energy: f64) -> Self {
        ChargingDecision { technology, energy }
    }
}

/// The first constraint a route was found to violate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RouteInfeasibility {
    /// The route does not start and end at the same depot, or references unknown nodes
    Structure,
    /// Not enough energy left to reach the node at `position`
    Battery { position: usize },
    /// Payload exceeded when serving the node at `position`
    Capacity { position: usize },
    /// The recorded technology is not offered at the station
    TechnologyUnavailable { station: usize, technology: usize },
    /// The recorded technology does not exist in the catalog
    UnknownTechnology { technology: usize },
    /// Total elapsed time exceeds the maximum route duration
    Duration,
}

/// The first constraint a solution was found to violate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SolutionInfeasibility {
    TooManyVehicles { used: usize, available: usize },
    Route { index: usize, cause: RouteInfeasibility },
    CustomerCoverage { missing: usize, duplicated: usize },
}

/// State of the vehicle right after visiting a node (and charging there, if planned).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteStep {
    pub position: usize,
    pub node: usize,
    pub battery: f64,
    pub load: f64,
    pub time: f64,
}

#[derive(Default)]
struct Totals {
    distance: f64,
    cost: f64,
    time: f64,
    load: f64,
}

/// Represents a route in an EVRP solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Visited node ids, starting and ending at the depot
    pub nodes: Vec<usize>,
    /// Charging decisions keyed by station (or depot) id
    pub charging: BTreeMap<usize, ChargingDecision>,
    /// The total load of the route
    pub load: f64,
    pub total_distance: f64,
    pub total_cost: f64,
    pub total_time: f64,
    pub is_feasible: bool,
    /// Why the last evaluation rejected the route
    pub violation: Option<RouteInfeasibility>,
}

impl Route {
    /// Create a route that leaves the depot and returns immediately.
    pub fn new(depot: usize) -> Self {
        Route::from_nodes(vec![depot, depot])
    }

    /// Create an unevaluated route visiting `nodes` without charging decisions.
    pub fn from_nodes(nodes: Vec<usize>) -> Self {
        Route::with_charging(nodes, BTreeMap::new())
    }

    /// Create an unevaluated route with the given charging decisions.
    pub fn with_charging(nodes: Vec<usize>, charging: BTreeMap<usize, ChargingDecision>) -> Self {
        Route {
            nodes,
            charging,
            load: 0.0,
            total_distance: 0.0,
            total_cost: 0.0,
            total_time: 0.0,
            is_feasible: false,
            violation: None,
        }
    }

    /// The depot this route is bound to.
    pub fn depot(&self) -> Option<usize> {
        self.nodes.first().copied()
    }

    pub fn objectives(&self) -> Objectives {
        Objectives::new(self.total_distance, self.total_cost)
    }

    /// Customer ids in visiting order.
    pub fn customers<'a>(&'a self, instance: &'a Instance) -> impl Iterator<Item = usize> + 'a {
        self.nodes
            .iter()
            .copied()
            .filter(move |&id| instance.node(id).is_customer())
    }

    /// Positions in `nodes` holding customers.
    pub fn customer_positions(&self, instance: &Instance) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, &id)| instance.node(id).is_customer())
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn has_customers(&self, instance: &Instance) -> bool {
        self.customers(instance).next().is_some()
    }

    /// Number of charging events planned along the route.
    pub fn charging_stops(&self, instance: &Instance) -> usize {
        self.nodes
            .iter()
            .skip(1)
            .filter(|&&id| !instance.node(id).is_customer() && self.charging.contains_key(&id))
            .count()
    }

    /// Drop charging decisions for nodes the route no longer visits.
    pub fn prune_charging(&mut self) {
        let nodes = &self.nodes;
        self.charging.retain(|id, _| nodes.contains(id));
    }

    /// Recompute the cached metrics and the feasibility flag.
    pub fn evaluate(&mut self, instance: &Instance) {
        let (totals, outcome) = self.walk(instance, |_| {});
        self.total_distance = totals.distance;
        self.total_cost = totals.cost;
        self.total_time = totals.time;
        self.load = totals.load;
        self.is_feasible = outcome.is_ok();
        self.violation = outcome.err();
    }

    /// Simulate the route node by node, returning the state after each visited node.
    /// The simulation stops at the first violated constraint.
    pub fn replay(&self, instance: &Instance) -> Vec<RouteStep> {
        let mut steps = Vec::with_capacity(self.nodes.len());
        let (_, _outcome) = self.walk(instance, |step| steps.push(step));
        steps
    }

    fn walk(
        &self,
        instance: &Instance,
        mut visit: impl FnMut(RouteStep),
    ) -> (Totals, Result<(), RouteInfeasibility>) {
        let mut totals = Totals::default();

        if !self.is_well_formed(instance) {
            return (totals, Err(RouteInfeasibility::Structure));
        }

        let vehicle = &instance.vehicle;
        let mut battery = vehicle.battery_capacity;
        let mut prev = self.nodes[0];

        visit(RouteStep {
            position: 0,
            node: prev,
            battery,
            load: 0.0,
            time: 0.0,
        });

        for (position, &id) in self.nodes.iter().enumerate().skip(1) {
            let node = instance.node(id);
            let distance = instance.distance(prev, id);
            let energy = instance.energy_for(distance);

            if energy > battery + FEASIBILITY_EPSILON {
                return (totals, Err(RouteInfeasibility::Battery { position }));
            }

            battery = (battery - energy).max(0.0);
            totals.time += instance.travel_time(prev, id);
            totals.distance += distance;

            if node.is_customer() {
                totals.load += node.demand();
                totals.time += node.service_time();

                if totals.load > vehicle.capacity + FEASIBILITY_EPSILON {
                    return (totals, Err(RouteInfeasibility::Capacity { position }));
                }
            } else if let Some(decision) = self.charging.get(&id) {
                let Some(technology) = instance.technology(decision.technology) else {
                    return (
                        totals,
                        Err(RouteInfeasibility::UnknownTechnology {
                            technology: decision.technology,
                        }),
                    );
                };

                if !node.offers(technology.id) {
                    return (
                        totals,
                        Err(RouteInfeasibility::TechnologyUnavailable {
                            station: id,
                            technology: technology.id,
                        }),
                    );
                }

                totals.time += instance.charging_fixed_time + decision.energy / technology.power;
                battery = (battery + decision.energy).min(vehicle.battery_capacity);
                totals.cost += decision.energy * technology.cost_per_energy
                    + instance.battery_depreciation_cost;
            }

            visit(RouteStep {
                position,
                node: id,
                battery,
                load: totals.load,
                time: totals.time,
            });
            prev = id;
        }

        if totals.time > instance.max_route_duration + FEASIBILITY_EPSILON {
            return (totals, Err(RouteInfeasibility::Duration));
        }

        (totals, Ok(()))
    }

    fn is_well_formed(&self, instance: &Instance) -> bool {
        let (Some(&first), Some(&last)) = (self.nodes.first(), self.nodes.last()) else {
            return false;
        };

        self.nodes.len() >= 2
            && self.nodes.iter().all(|&id| id < instance.nodes.len())
            && first == last
            && instance.node(first).is_depot()
    }
}

/// Represents a complete solution to an EVRP instance.
#[derive(Clone, Serialize, Deserialize)]
pub struct Solution {
    pub routes: Vec<Route>,
    pub total_distance: f64,
    pub total_cost: f64,
    pub total_time: f64,
    pub num_vehicles_used: usize,
    pub is_feasible: bool,
    /// Why the last evaluation rejected the solution
    pub violation: Option<SolutionInfeasibility>,
}

impl Default for Solution {
    fn default() -> Self {
        Solution::new()
    }
}

impl Solution {
    /// Create a new, empty solution.
    pub fn new() -> Self {
        Solution::from_routes(Vec::new())
    }

    /// Create an unevaluated solution from routes.
    pub fn from_routes(routes: Vec<Route>) -> Self {
        Solution {
            routes,
            total_distance: 0.0,
            total_cost: 0.0,
            total_time: 0.0,
            num_vehicles_used: 0,
            is_feasible: false,
            violation: None,
        }
    }

    pub fn objectives(&self) -> Objectives {
        Objectives::new(self.total_distance, self.total_cost)
    }

    /// Two-objective Pareto dominance on (total distance, total cost).
    pub fn dominates(&self, other: &Solution) -> bool {
        self.objectives().dominates(&other.objectives())
    }

    /// Evaluate every route and the fleet-wide constraints.
    pub fn evaluate(&mut self, instance: &Instance) {
        self.total_distance = 0.0;
        self.total_cost = 0.0;
        self.total_time = 0.0;
        self.num_vehicles_used = self.routes.len();
        self.violation = None;

        if self.num_vehicles_used > instance.num_vehicles {
            self.violation = Some(SolutionInfeasibility::TooManyVehicles {
                used: self.num_vehicles_used,
                available: instance.num_vehicles,
            });
        }

        for (index, route) in self.routes.iter_mut().enumerate() {
            route.evaluate(instance);
            self.total_distance += route.total_distance;
            self.total_cost += route.total_cost;
            self.total_time += route.total_time;

            if self.violation.is_none() {
                if let Some(cause) = route.violation {
                    self.violation = Some(SolutionInfeasibility::Route { index, cause });
                }
            }
        }

        if self.violation.is_none() {
            let (missing, duplicated) = self.coverage(instance);
            if missing > 0 || duplicated > 0 {
                self.violation = Some(SolutionInfeasibility::CustomerCoverage {
                    missing,
                    duplicated,
                });
            }
        }

        self.is_feasible = self.violation.is_none();
    }

    /// Count unserved customers and surplus visits.
    fn coverage(&self, instance: &Instance) -> (usize, usize) {
        let mut visits = vec![0usize; instance.nodes.len()];

        for route in &self.routes {
            for &id in &route.nodes {
                if id < visits.len() && instance.node(id).is_customer() {
                    visits[id] += 1;
                }
            }
        }

        instance
            .customers()
            .fold((0, 0), |(missing, duplicated), customer| {
                match visits[customer.id] {
                    0 => (missing + 1, duplicated),
                    1 => (missing, duplicated),
                    n => (missing, duplicated + n - 1),
                }
            })
    }

    /// Locate a customer as (route index, position in route).
    pub fn find_customer(&self, customer: usize) -> Option<(usize, usize)> {
        self.routes.iter().enumerate().find_map(|(r, route)| {
            route
                .nodes
                .iter()
                .position(|&id| id == customer)
                .map(|pos| (r, pos))
        })
    }

    /// All served customer ids, route by route.
    pub fn customers_served(&self, instance: &Instance) -> Vec<usize> {
        self.routes
            .iter()
            .flat_map(|route| route.customers(instance))
            .collect()
    }

    /// Remove routes that no longer serve any customer.
    pub fn remove_empty_routes(&mut self, instance: &Instance) {
        self.routes.retain(|route| route.has_customers(instance));
    }

    /// Get the number of routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Solution:")?;
        writeln!(f, "  Distance: {:.2}", self.total_distance)?;
        writeln!(f, "  Cost: {:.2}", self.total_cost)?;
        writeln!(f, "  Vehicles: {}", self.num_vehicles_used)?;
        writeln!(f, "  Feasible: {}", self.is_feasible)?;
        writeln!(f, "  Routes: {}", self.routes.len())?;

        for (i, route) in self.routes.iter().enumerate() {
            writeln!(
                f,
                "  Route {}: {:?} (Load: {:.2}, Distance: {:.2}, Cost: {:.2}, Time: {:.2})",
                i, route.nodes, route.load, route.total_distance, route.total_cost, route.total_time
            )?;
        }

        Ok(())
    }
}
