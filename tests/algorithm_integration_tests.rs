//! Integration tests for the full GVNS algorithm.

use gvns_evrp::archive::Archive;
use gvns_evrp::config::{Config, ConfigError};
use gvns_evrp::instance::{Instance, InstanceLimits, Node, Technology, Vehicle};
use gvns_evrp::local_search::{Operator, OperatorChain, Relocate, TwoOpt};
use gvns_evrp::solution::{ChargingDecision, Route, Solution};
use gvns_evrp::{EngineState, GvnsAlgorithm, RunStatus, StarvationCause};
use rand::RngCore;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Creates a moderate size instance: two depots, ten customers on a grid
/// between them and one station above the grid.
fn create_moderate_instance() -> Instance {
    let mut nodes = vec![
        Node::depot(0, 0.0, 0.0, vec![0]),
        Node::depot(1, 60.0, 0.0, vec![0]),
    ];

    let mut id = 2;
    for i in 0..5 {
        for j in 0..2 {
            let x = i as f64 * 10.0 + 10.0;
            let y = j as f64 * 10.0 + 10.0;
            nodes.push(Node::customer(id, x, y, 1.0, 1.0));
            id += 1;
        }
    }
    nodes.push(Node::station(id, 30.0, 30.0, vec![0, 1]));

    Instance::with_euclidean_matrices(
        "ModerateInstance".to_string(),
        nodes,
        Vehicle::new(5.0, 100.0, 1.0),
        vec![Technology::new(0, 10.0, 0.3), Technology::new(1, 25.0, 0.7)],
        InstanceLimits {
            num_vehicles: 10,
            max_route_duration: 500.0,
            charging_fixed_time: 2.0,
            battery_depreciation_cost: 1.5,
        },
        1.0,
    )
    .unwrap()
}

/// One out-and-back route per customer from its nearest depot.
fn create_initial_population(instance: &Instance) -> Vec<Solution> {
    let routes: Vec<Route> = instance
        .customers()
        .map(|c| {
            let depot = instance.nearest_depot(c.id).unwrap();
            Route::from_nodes(vec![depot, c.id, depot])
        })
        .collect();

    // A second starting point with the routes in reverse order
    let mut reversed = routes.clone();
    reversed.reverse();

    vec![Solution::from_routes(routes), Solution::from_routes(reversed)]
}

/// An operator that leaves every solution unchanged.
struct Idle;

impl Operator for Idle {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn improve(&self, _: &mut Solution, _: &Instance, _: &mut dyn RngCore) -> bool {
        false
    }

    fn perturb(&self, solution: &Solution, _: &Instance, _: &mut dyn RngCore) -> Solution {
        solution.clone()
    }
}

/// Two customers beside a depot with a station between them. Returns the
/// instance and two mutually non-dominated solutions: out-and-back routes
/// without charging, and a single shorter route through the station.
fn create_tradeoff_instance() -> (Instance, Solution, Solution) {
    let nodes = vec![
        Node::depot(0, 0.0, 0.0, vec![0]),
        Node::customer(1, 10.0, 0.0, 1.0, 0.0),
        Node::customer(2, 10.0, 10.0, 1.0, 0.0),
        Node::station(3, 10.0, 5.0, vec![0]),
    ];
    let instance = Instance::with_euclidean_matrices(
        "TradeoffInstance".to_string(),
        nodes,
        Vehicle::new(5.0, 100.0, 1.0),
        vec![Technology::new(0, 10.0, 0.5)],
        InstanceLimits {
            num_vehicles: 2,
            max_route_duration: 200.0,
            charging_fixed_time: 1.0,
            battery_depreciation_cost: 2.0,
        },
        1.0,
    )
    .unwrap();

    let long = Solution::from_routes(vec![
        Route::from_nodes(vec![0, 1, 0]),
        Route::from_nodes(vec![0, 2, 0]),
    ]);

    let mut charging = BTreeMap::new();
    charging.insert(3, ChargingDecision::new(0, 0.0));
    let short = Solution::from_routes(vec![Route::with_charging(vec![0, 1, 3, 2, 0], charging)]);

    (instance, long, short)
}

fn idle_engine(instance: &Instance, budget: usize) -> GvnsAlgorithm {
    let config = Config::new()
        .with_seed(6)
        .with_max_evaluations(budget)
        .with_ns(1);
    GvnsAlgorithm::new(instance.clone(), config)
        .unwrap()
        .with_local_search(OperatorChain::new(vec![Box::new(Idle)]))
        .with_perturbation(OperatorChain::new(vec![Box::new(Idle)]))
}

fn sorted_objectives(solutions: &[Solution]) -> Vec<(f64, f64)> {
    let mut values: Vec<(f64, f64)> = solutions
        .iter()
        .map(|s| (s.total_distance, s.total_cost))
        .collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    values
}

fn assert_valid_front(solutions: &[Solution], instance: &Instance) {
    let expected: Vec<usize> = instance.customers().map(|c| c.id).collect();

    for (i, a) in solutions.iter().enumerate() {
        assert!(a.is_feasible);

        let mut served = a.customers_served(instance);
        served.sort_unstable();
        assert_eq!(served, expected);

        for (j, b) in solutions.iter().enumerate() {
            if i != j {
                assert!(!a.dominates(b));
            }
        }
    }
}

#[test]
fn test_algorithm_short_run() {
    let instance = create_moderate_instance();
    let config = Config::new()
        .with_seed(42)
        .with_max_evaluations(300)
        .with_na(10)
        .with_ns(2)
        .with_ls_max_iter(3);

    let mut algorithm = GvnsAlgorithm::new(instance.clone(), config).unwrap();
    let report = algorithm.run(create_initial_population(&instance));

    assert_eq!(report.status, RunStatus::BudgetExhausted);
    assert!(!report.is_starved());
    assert!(!report.solutions().is_empty());
    assert!(report.solutions().len() <= 10);
    assert_valid_front(report.solutions(), &instance);
    assert_eq!(algorithm.state(), EngineState::Terminated);
}

#[test]
fn test_budget_is_never_exceeded() {
    let instance = create_moderate_instance();

    for budget in [1, 7, 50] {
        let config = Config::new().with_seed(3).with_max_evaluations(budget);
        let mut algorithm = GvnsAlgorithm::new(instance.clone(), config).unwrap();
        let report = algorithm.run(create_initial_population(&instance));

        // The loop only stops early on starvation
        assert_eq!(report.evaluations, budget);
        assert_eq!(report.status, RunStatus::BudgetExhausted);
    }
}

#[test]
fn test_search_never_loses_the_shortest_start() {
    let instance = create_moderate_instance();
    let population = create_initial_population(&instance);

    let initial_distance = population
        .iter()
        .map(|s| {
            let mut s = s.clone();
            s.evaluate(&instance);
            s.total_distance
        })
        .fold(f64::INFINITY, f64::min);

    let config = Config::new().with_seed(5).with_max_evaluations(400);
    let mut algorithm = GvnsAlgorithm::new(instance.clone(), config).unwrap();
    let report = algorithm.run(population);

    let best = report
        .solutions()
        .iter()
        .map(|s| s.total_distance)
        .fold(f64::INFINITY, f64::min);
    assert!(best <= initial_distance + 1e-9);
}

#[test]
fn test_seeding_stops_when_budget_runs_out() {
    let (instance, long, short) = create_tradeoff_instance();

    let mut evaluated = vec![long.clone(), short.clone()];
    for solution in evaluated.iter_mut() {
        solution.evaluate(&instance);
        assert!(solution.is_feasible);
    }
    assert!(!evaluated[0].dominates(&evaluated[1]));
    assert!(!evaluated[1].dominates(&evaluated[0]));

    // The only unit goes to the first seed; the second one never enters the archive
    let mut algorithm = idle_engine(&instance, 1);
    algorithm.load(vec![long.clone(), short.clone()]);
    assert_eq!(algorithm.step(), EngineState::Selecting);
    assert_eq!(algorithm.evaluations(), 1);
    assert_eq!(algorithm.archive().len(), 1);
    assert_eq!(
        algorithm.archive().solutions()[0].objectives(),
        evaluated[0].objectives()
    );

    // With room for both seeds the front holds both trade-offs
    let mut algorithm = idle_engine(&instance, 2);
    algorithm.load(vec![long, short]);
    algorithm.step();
    assert_eq!(algorithm.evaluations(), 2);
    assert_eq!(algorithm.archive().len(), 2);
}

#[test]
fn test_starvation_on_infeasible_population() {
    let instance = create_moderate_instance();

    // Customer coverage is incomplete
    let partial = Solution::from_routes(vec![Route::from_nodes(vec![0, 2, 0])]);

    let config = Config::new().with_seed(1).with_max_evaluations(100);
    let mut algorithm = GvnsAlgorithm::new(instance, config).unwrap();
    let report = algorithm.run(vec![partial]);

    assert_eq!(
        report.status,
        RunStatus::Starved(StarvationCause::EmptyInitialArchive)
    );
    assert!(report.is_starved());
    assert!(report.solutions().is_empty());
    assert_eq!(report.evaluations, 0);
    assert_eq!(report.iterations, 0);
}

#[test]
fn test_starvation_on_empty_population() {
    let instance = create_moderate_instance();
    let config = Config::new().with_seed(1);
    let mut algorithm = GvnsAlgorithm::new(instance, config).unwrap();
    let report = algorithm.run(Vec::new());

    assert_eq!(
        report.status,
        RunStatus::Starved(StarvationCause::EmptyInitialArchive)
    );
    assert!(report.archive.is_empty());
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let instance = create_moderate_instance();
    let config = Config::new().with_seed(99).with_max_evaluations(250);

    let mut first = GvnsAlgorithm::new(instance.clone(), config.clone()).unwrap();
    let mut second = GvnsAlgorithm::new(instance.clone(), config).unwrap();

    let a = first.run(create_initial_population(&instance));
    let b = second.run(create_initial_population(&instance));

    assert_eq!(a.iterations, b.iterations);
    assert_eq!(
        sorted_objectives(a.solutions()),
        sorted_objectives(b.solutions())
    );
}

#[test]
fn test_parallel_seeding() {
    let instance = create_moderate_instance();
    let config = Config::new()
        .with_seed(8)
        .with_max_evaluations(200)
        .with_parallel_seeding(true);

    let mut algorithm = GvnsAlgorithm::new(instance.clone(), config).unwrap();
    let report = algorithm.run(create_initial_population(&instance));

    assert!(report.evaluations <= 200);
    assert!(!report.solutions().is_empty());
    assert_valid_front(report.solutions(), &instance);
}

#[test]
fn test_observer_sees_every_iteration() {
    let instance = create_moderate_instance();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&seen);

    let config = Config::new()
        .with_seed(17)
        .with_max_evaluations(300)
        .with_na(5);
    let mut algorithm = GvnsAlgorithm::new(instance.clone(), config)
        .unwrap()
        .with_observer(move |iteration: usize, archive: &Archive| {
            assert!(archive.len() <= 5);
            recorder.borrow_mut().push(iteration);
        });

    let report = algorithm.run(create_initial_population(&instance));

    let seen = seen.borrow();
    assert_eq!(seen.len(), report.iterations);
    assert!(seen.iter().copied().eq(1..=report.iterations));
}

#[test]
fn test_step_walks_through_states() {
    let instance = create_moderate_instance();
    let config = Config::new()
        .with_seed(4)
        .with_max_evaluations(1_000)
        .with_ls_max_iter(1);

    let mut algorithm = GvnsAlgorithm::new(instance.clone(), config).unwrap();
    algorithm.load(create_initial_population(&instance));
    assert_eq!(algorithm.state(), EngineState::Seeding);

    assert_eq!(algorithm.step(), EngineState::Selecting);
    assert!(!algorithm.archive().is_empty());

    assert_eq!(algorithm.step(), EngineState::Perturbing);
    assert_eq!(algorithm.step(), EngineState::LocalSearching);
    assert_eq!(algorithm.step(), EngineState::ArchiveUpdating);

    // A single attempt per selection always ends the iteration
    assert_eq!(algorithm.step(), EngineState::Selecting);
    assert_eq!(algorithm.iterations(), 1);
    assert!(algorithm.status().is_none());
    assert!(algorithm.evaluations() <= 1_000);
}

#[test]
fn test_second_run_starts_from_scratch() {
    let instance = create_moderate_instance();
    let config = Config::new().with_seed(12).with_max_evaluations(150);
    let mut algorithm = GvnsAlgorithm::new(instance.clone(), config).unwrap();

    let first = algorithm.run(create_initial_population(&instance));
    assert_eq!(first.evaluations, 150);
    assert!(first.iterations > 0);

    // Nothing from the first run may leak into the second
    let partial = Solution::from_routes(vec![Route::from_nodes(vec![0, 2, 0])]);
    let second = algorithm.run(vec![partial]);
    assert_eq!(
        second.status,
        RunStatus::Starved(StarvationCause::EmptyInitialArchive)
    );
    assert!(second.solutions().is_empty());
    assert_eq!(second.evaluations, 0);
    assert_eq!(second.iterations, 0);

    let third = algorithm.run(create_initial_population(&instance));
    assert_eq!(third.status, RunStatus::BudgetExhausted);
    assert_eq!(third.evaluations, 150);
    assert!(third.iterations > 0);
    assert_valid_front(third.solutions(), &instance);
}

#[test]
fn test_custom_operator_chains() {
    let instance = create_moderate_instance();
    let config = Config::new().with_seed(21).with_max_evaluations(120);

    let mut algorithm = GvnsAlgorithm::new(instance.clone(), config)
        .unwrap()
        .with_local_search(OperatorChain::new(vec![Box::new(Relocate::new(5))]))
        .with_perturbation(OperatorChain::new(vec![Box::new(TwoOpt::new(5, 2))]));

    let report = algorithm.run(create_initial_population(&instance));

    assert_eq!(report.evaluations, 120);
    assert_valid_front(report.solutions(), &instance);
}

#[test]
fn test_empty_chains_stop_after_seeding() {
    let instance = create_moderate_instance();
    let config = Config::new().with_seed(2);

    let mut algorithm = GvnsAlgorithm::new(instance.clone(), config)
        .unwrap()
        .with_local_search(OperatorChain::new(Vec::new()))
        .with_perturbation(OperatorChain::new(Vec::new()));

    let report = algorithm.run(create_initial_population(&instance));

    assert_eq!(report.evaluations, 0);
    assert_eq!(report.iterations, 0);
    assert!(!report.solutions().is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let instance = create_moderate_instance();

    let result = GvnsAlgorithm::new(instance.clone(), Config::new().with_na(0));
    assert!(matches!(result, Err(ConfigError::NotPositive("na"))));

    let result = GvnsAlgorithm::new(instance, Config::new().with_duplicate_tolerance(-1.0));
    assert!(matches!(
        result,
        Err(ConfigError::Negative("duplicate_tolerance"))
    ));
}

#[test]
fn test_config_from_json() {
    let config = Config::from_json(r#"{"ns": 3, "na": 20, "seed": 7}"#).unwrap();
    assert_eq!(config.ns, 3);
    assert_eq!(config.na, 20);
    assert_eq!(config.seed, Some(7));
    // Missing fields keep their defaults
    assert_eq!(config.max_evaluations, Config::default().max_evaluations);

    assert!(matches!(
        Config::from_json(r#"{"ls_max_iter": 0}"#),
        Err(ConfigError::NotPositive("ls_max_iter"))
    ));
    assert!(matches!(
        Config::from_json("not json"),
        Err(ConfigError::Parse(_))
    ));
}
