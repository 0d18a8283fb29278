//! Utility functions and structures for reporting on a GVNS run.

use std::fmt;
use std::time::Duration;

use crate::instance::Instance;
use crate::solution::Solution;
use crate::RunReport;

/// Format a duration as hours, minutes, and seconds.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}h {:02}m {:02}s", hours, minutes, seconds)
}

/// Route-by-route description of a solution, rendered through `Display`.
pub struct SolutionSummary<'a> {
    solution: &'a Solution,
    instance: &'a Instance,
}

impl<'a> SolutionSummary<'a> {
    pub fn new(solution: &'a Solution, instance: &'a Instance) -> Self {
        SolutionSummary { solution, instance }
    }
}

impl fmt::Display for SolutionSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (solution, instance) = (self.solution, self.instance);

        writeln!(f, "EVRP Solution for instance: {}", instance.name)?;
        writeln!(f, "Total Distance: {:.2}", solution.total_distance)?;
        writeln!(f, "Total Cost: {:.2}", solution.total_cost)?;
        writeln!(f, "Is Feasible: {}", solution.is_feasible)?;
        writeln!(f, "Number of Routes: {}", solution.routes.len())?;

        for (i, route) in solution.routes.iter().enumerate() {
            writeln!(f)?;
            write!(f, "Route #{}: ", i + 1)?;
            for (pos, &id) in route.nodes.iter().enumerate() {
                if pos > 0 {
                    write!(f, " -> ")?;
                }
                match route.charging.get(&id) {
                    Some(decision) if !instance.node(id).is_customer() => {
                        write!(f, "{}[t{}:{:.1}]", id, decision.technology, decision.energy)?
                    }
                    _ => write!(f, "{}", id)?,
                }
            }
            writeln!(f)?;

            writeln!(
                f,
                "  Distance: {:.2}  Cost: {:.2}  Time: {:.2} / {:.2}",
                route.total_distance,
                route.total_cost,
                route.total_time,
                instance.max_route_duration
            )?;
            writeln!(
                f,
                "  Load: {:.2} / {:.2}  Charging stops: {}",
                route.load,
                instance.vehicle.capacity,
                route.charging_stops(instance)
            )?;
        }

        Ok(())
    }
}

/// Describe a solution route by route.
pub fn solution_summary(solution: &Solution, instance: &Instance) -> String {
    SolutionSummary::new(solution, instance).to_string()
}

/// Statistics about a finished search.
pub struct RunStatistics {
    pub iterations: usize,
    pub evaluations: usize,
    pub runtime: Duration,
    pub front_size: usize,
    pub min_distance: Option<f64>,
    pub min_cost: Option<f64>,
    pub status: String,
}

impl RunStatistics {
    pub fn from_report(report: &RunReport) -> Self {
        let solutions = report.solutions();
        let min_of = |f: fn(&Solution) -> f64| solutions.iter().map(f).reduce(f64::min);

        RunStatistics {
            iterations: report.iterations,
            evaluations: report.evaluations,
            runtime: report.run_time,
            front_size: solutions.len(),
            min_distance: min_of(|s| s.total_distance),
            min_cost: min_of(|s| s.total_cost),
            status: format!("{:?}", report.status),
        }
    }

    /// Format the statistics as a string.
    pub fn format(&self) -> String {
        let show = |value: Option<f64>| {
            value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
        };

        format!(
            "Search Statistics:
- Status: {}
- Iterations: {}
- Evaluations: {}
- Runtime: {}
- Front Size: {}
- Best Distance: {}
- Best Cost: {}",
            self.status,
            self.iterations,
            self.evaluations,
            format_duration(self.runtime),
            self.front_size,
            show(self.min_distance),
            show(self.min_cost)
        )
    }
}

/// The objective vectors of a front sorted by distance, one per line.
pub struct FrontTable<'a>(pub &'a [Solution]);

impl fmt::Display for FrontTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows: Vec<&Solution> = self.0.iter().collect();
        rows.sort_by(|a, b| a.total_distance.total_cmp(&b.total_distance));

        writeln!(f, "distance\tcost\tvehicles")?;
        for solution in rows {
            writeln!(
                f,
                "{:.2}\t{:.2}\t{}",
                solution.total_distance, solution.total_cost, solution.num_vehicles_used
            )?;
        }
        Ok(())
    }
}

pub fn front_table(solutions: &[Solution]) -> String {
    FrontTable(solutions).to_string()
}
