//! Integration tests for operator chains working under an evaluation budget.

use gvns_evrp::config::Config;
use gvns_evrp::instance::{Instance, InstanceLimits, Node, Technology, Vehicle};
use gvns_evrp::local_search::{Exchange, OperatorChain, Relocate, TwoOpt};
use gvns_evrp::solution::{Route, Solution};
use gvns_evrp::EvaluationBudget;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Creates a grid instance: a central depot, 24 customers and two stations.
fn create_complex_instance() -> Instance {
    let mut nodes = vec![Node::depot(0, 50.0, 50.0, vec![0])];

    let mut id = 1;
    for x in 0..5 {
        for y in 0..5 {
            // Skip the center where the depot is
            if x == 2 && y == 2 {
                continue;
            }
            let demand = 1.0 + (x + y) as f64 * 0.1;
            nodes.push(Node::customer(
                id,
                x as f64 * 20.0 + 10.0,
                y as f64 * 20.0 + 10.0,
                demand,
                1.0,
            ));
            id += 1;
        }
    }
    nodes.push(Node::station(id, 20.0, 50.0, vec![0, 1]));
    nodes.push(Node::station(id + 1, 80.0, 50.0, vec![1]));

    Instance::with_euclidean_matrices(
        "ComplexInstance".to_string(),
        nodes,
        Vehicle::new(10.0, 400.0, 1.0),
        vec![Technology::new(0, 10.0, 0.2), Technology::new(1, 40.0, 0.6)],
        InstanceLimits {
            num_vehicles: 24,
            max_route_duration: 1000.0,
            charging_fixed_time: 3.0,
            battery_depreciation_cost: 1.0,
        },
        1.0,
    )
    .unwrap()
}

/// Groups shuffled customers into routes of three.
fn create_random_solution(instance: &Instance, seed: u64) -> Solution {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut customers: Vec<usize> = instance.customers().map(|c| c.id).collect();
    customers.shuffle(&mut rng);

    let routes = customers
        .chunks(3)
        .map(|chunk| {
            let mut nodes = vec![0];
            nodes.extend_from_slice(chunk);
            nodes.push(0);
            Route::from_nodes(nodes)
        })
        .collect();

    let mut solution = Solution::from_routes(routes);
    solution.evaluate(instance);
    solution
}

#[test]
fn test_random_solution_is_feasible() {
    let instance = create_complex_instance();
    let solution = create_random_solution(&instance, 1);

    assert!(solution.is_feasible, "{:?}", solution.violation);
    assert_eq!(solution.route_count(), 8);
}

#[test]
fn test_default_chains() {
    let config = Config::default();

    let local_search = OperatorChain::default_local_search(&config);
    assert_eq!(
        local_search.names(),
        vec![
            "recharge-relocation",
            "2-opt",
            "relocate",
            "exchange",
            "or-opt",
            "2-opt*",
            "reinsertion"
        ]
    );

    let perturbation = OperatorChain::default_perturbation(&config);
    assert_eq!(perturbation.len(), 5);
    assert!(perturbation.names().contains(&"depot-reassignment"));
}

#[test]
fn test_chain_improves_random_solutions() {
    let instance = create_complex_instance();
    let chain = OperatorChain::default_local_search(&Config::default());

    for seed in 0..3 {
        let initial = create_random_solution(&instance, seed);
        let budget = EvaluationBudget::new(1_000);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut current = initial.clone();
        for _ in 0..5 {
            current = chain.improve(&current, &instance, &budget, &mut rng);
            assert!(current.is_feasible);
        }

        assert!(!initial.dominates(&current));
        assert!(current.total_distance <= initial.total_distance + 1e-9);
    }
}

#[test]
fn test_chain_respects_budget() {
    let instance = create_complex_instance();
    let solution = create_random_solution(&instance, 4);
    let mut rng = ChaCha8Rng::seed_from_u64(4);

    let chain = OperatorChain::new(vec![
        Box::new(TwoOpt::new(5, 2)),
        Box::new(Relocate::new(5)),
        Box::new(Exchange::new(5)),
    ]);

    // The first call may stop early after an improving operator
    let budget = EvaluationBudget::new(2);
    chain.improve(&solution, &instance, &budget, &mut rng);
    assert!(budget.used() >= 1 && budget.used() <= 2);

    let budget = EvaluationBudget::new(2);
    let perturbed = chain.perturb(&solution, &instance, &budget, &mut rng);
    assert_eq!(budget.used(), 2);
    assert!(budget.is_exhausted());
    assert!(perturbed.is_feasible);
}

#[test]
fn test_exhausted_budget_returns_copy() {
    let instance = create_complex_instance();
    let solution = create_random_solution(&instance, 9);
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let chain = OperatorChain::default_local_search(&Config::default());

    let budget = EvaluationBudget::new(1);
    assert!(budget.try_consume());
    assert!(!budget.try_consume());
    assert_eq!(budget.remaining(), 0);

    let improved = chain.improve(&solution, &instance, &budget, &mut rng);
    assert_eq!(improved.objectives(), solution.objectives());
    assert_eq!(budget.used(), 1);
}

#[test]
fn test_perturbation_keeps_coverage() {
    let instance = create_complex_instance();
    let chain = OperatorChain::default_perturbation(&Config::default());
    let expected: Vec<usize> = instance.customers().map(|c| c.id).collect();

    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let mut current = create_random_solution(&instance, 12);
    let budget = EvaluationBudget::new(100);

    for _ in 0..10 {
        current = chain.perturb(&current, &instance, &budget, &mut rng);
        assert!(current.is_feasible);

        let mut served = current.customers_served(&instance);
        served.sort_unstable();
        assert_eq!(served, expected);
    }
    assert_eq!(budget.used(), 50);
}
