//! Basic example of using the GVNS-EVRP library on a random instance.

use clap::Parser;
use gvns_evrp::instance::{Instance, InstanceLimits, Node, Technology, Vehicle};
use gvns_evrp::solution::{Route, Solution};
use gvns_evrp::utils::{front_table, solution_summary, RunStatistics};
use gvns_evrp::{Archive, Config, GvnsAlgorithm};
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of customers of the generated instance
    #[arg(short, long, default_value_t = 30)]
    customers: usize,

    /// Number of depots of the generated instance
    #[arg(long, default_value_t = 2)]
    depots: usize,

    /// Number of charging stations of the generated instance
    #[arg(long, default_value_t = 4)]
    stations: usize,

    /// Seed for both the instance generator and the search
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// JSON configuration file; command line values override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of operator calls
    #[arg(short, long)]
    evaluations: Option<usize>,

    /// Local search rounds per candidate
    #[arg(long)]
    ns: Option<usize>,

    /// Archive size
    #[arg(long)]
    na: Option<usize>,

    /// Improve the initial population concurrently
    #[arg(short, long)]
    parallel: bool,

    /// Print every route of the shortest solution
    #[arg(short, long)]
    verbose: bool,
}

fn random_instance(args: &Args) -> Result<Instance, Box<dyn std::error::Error>> {
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut nodes = Vec::new();
    let mut id = 0;

    for _ in 0..args.depots.max(1) {
        let (x, y) = (rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        nodes.push(Node::depot(id, x, y, vec![0]));
        id += 1;
    }
    for _ in 0..args.customers {
        let (x, y) = (rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        nodes.push(Node::customer(id, x, y, rng.gen_range(1.0..4.0), 2.0));
        id += 1;
    }
    for s in 0..args.stations {
        // Every other station also offers the fast technology
        let technologies = if s % 2 == 0 { vec![0, 1] } else { vec![0] };
        let (x, y) = (rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
        nodes.push(Node::station(id, x, y, technologies));
        id += 1;
    }

    let instance = Instance::with_euclidean_matrices(
        format!("random-{}-{}", args.customers, args.seed),
        nodes,
        Vehicle::new(20.0, 300.0, 1.0),
        vec![Technology::new(0, 10.0, 0.25), Technology::new(1, 50.0, 0.6)],
        InstanceLimits {
            num_vehicles: args.customers.max(1),
            max_route_duration: 1_000.0,
            charging_fixed_time: 5.0,
            battery_depreciation_cost: 2.0,
        },
        1.0,
    )?;
    Ok(instance)
}

/// One out-and-back route per customer from its nearest depot.
fn initial_population(instance: &Instance) -> Vec<Solution> {
    let routes = instance
        .customers()
        .filter_map(|c| {
            let depot = instance.nearest_depot(c.id)?;
            Some(Route::from_nodes(vec![depot, c.id, depot]))
        })
        .collect();
    vec![Solution::from_routes(routes)]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_json(&std::fs::read_to_string(path)?)?,
        None => Config::new(),
    };
    config = config.with_seed(args.seed).with_parallel_seeding(args.parallel);
    if let Some(evaluations) = args.evaluations {
        config = config.with_max_evaluations(evaluations);
    }
    if let Some(ns) = args.ns {
        config = config.with_ns(ns);
    }
    if let Some(na) = args.na {
        config = config.with_na(na);
    }

    let instance = random_instance(&args)?;
    info!(
        "Generated {} with {} customers",
        instance.name,
        instance.customer_count()
    );

    let mut algorithm = GvnsAlgorithm::new(instance.clone(), config)?.with_observer(
        |iteration: usize, archive: &Archive| {
            if iteration % 100 == 0 {
                info!(
                    "Iteration {}: {} solutions in the archive",
                    iteration,
                    archive.len()
                );
            }
        },
    );

    let report = algorithm.run(initial_population(&instance));

    println!("{}", RunStatistics::from_report(&report).format());
    println!();
    print!("{}", front_table(report.solutions()));

    if args.verbose {
        let shortest = report
            .solutions()
            .iter()
            .min_by(|a, b| a.total_distance.total_cmp(&b.total_distance));
        if let Some(solution) = shortest {
            println!();
            print!("{}", solution_summary(solution, &instance));
        }
    }

    Ok(())
}
