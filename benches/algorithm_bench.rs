//! Benchmarks for the GVNS-EVRP algorithm.

#[cfg(feature = "bench")]
extern crate criterion;

#[cfg(feature = "bench")]
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gvns_evrp::config::Config;
use gvns_evrp::instance::{Instance, InstanceLimits, Node, Technology, Vehicle};
use gvns_evrp::local_search::OperatorChain;
use gvns_evrp::solution::{Route, Solution};
use gvns_evrp::{EvaluationBudget, GvnsAlgorithm};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Create a benchmark instance of specified size.
fn create_benchmark_instance(size: usize) -> Instance {
    let mut nodes = vec![
        Node::depot(0, 0.0, 0.0, vec![0]),
        Node::depot(1, 100.0, 100.0, vec![0]),
    ];

    // Customers in a grid arrangement
    let grid_size = (size as f64).sqrt().ceil() as usize;
    for i in 0..size {
        let row = i / grid_size;
        let col = i % grid_size;
        let x = col as f64 * 100.0 / grid_size as f64;
        let y = row as f64 * 100.0 / grid_size as f64;
        nodes.push(Node::customer(i + 2, x, y, 1.0, 1.0));
    }
    nodes.push(Node::station(size + 2, 50.0, 50.0, vec![0, 1]));

    Instance::with_euclidean_matrices(
        format!("BenchInstance_{}", size),
        nodes,
        Vehicle::new(10.0, 250.0, 1.0),
        vec![Technology::new(0, 10.0, 0.3), Technology::new(1, 40.0, 0.7)],
        InstanceLimits {
            num_vehicles: size,
            max_route_duration: 1_000.0,
            charging_fixed_time: 2.0,
            battery_depreciation_cost: 1.0,
        },
        1.0,
    )
    .unwrap()
}

fn create_initial_solution(instance: &Instance) -> Solution {
    let routes = instance
        .customers()
        .map(|c| {
            let depot = instance.nearest_depot(c.id).unwrap();
            Route::from_nodes(vec![depot, c.id, depot])
        })
        .collect();

    let mut solution = Solution::from_routes(routes);
    solution.evaluate(instance);
    solution
}

#[cfg(feature = "bench")]
fn benchmark_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");

    for size in [50, 100, 200].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let instance = create_benchmark_instance(size);
            let solution = create_initial_solution(&instance);

            b.iter(|| {
                let mut solution = solution.clone();
                solution.evaluate(&instance);
            });
        });
    }

    group.finish();
}

#[cfg(feature = "bench")]
fn benchmark_local_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_search");

    for size in [50, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let instance = create_benchmark_instance(size);
            let solution = create_initial_solution(&instance);
            let chain = OperatorChain::default_local_search(&Config::default());
            let mut rng = ChaCha8Rng::seed_from_u64(1);

            b.iter(|| {
                let budget = EvaluationBudget::new(chain.len());
                chain.improve(&solution, &instance, &budget, &mut rng)
            });
        });
    }

    group.finish();
}

#[cfg(feature = "bench")]
fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for size in [50, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let instance = create_benchmark_instance(size);
            let config = Config::new().with_seed(7).with_max_evaluations(500);

            b.iter(|| {
                let mut algorithm = GvnsAlgorithm::new(instance.clone(), config.clone()).unwrap();
                algorithm.run(vec![create_initial_solution(&instance)])
            });
        });
    }

    group.finish();
}

#[cfg(feature = "bench")]
criterion_group!(
    benches,
    benchmark_evaluation,
    benchmark_local_search,
    benchmark_search
);

#[cfg(feature = "bench")]
criterion_main!(benches);
