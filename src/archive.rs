//! Bounded archive of mutually non-dominated feasible solutions.

use crate::solution::Solution;
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

/// Whether no feasible member of `archive` dominates `solution`.
pub fn is_non_dominated(solution: &Solution, archive: &[Solution]) -> bool {
    !archive
        .iter()
        .any(|member| member.is_feasible && member.dominates(solution))
}

/// Maintains the set of non-dominated solutions found by the search.
#[derive(Debug, Clone)]
pub struct Archive {
    members: Vec<Solution>,
    /// Maximum number of members (NA)
    capacity: usize,
    /// Objective tolerance below which two solutions count as duplicates
    duplicate_tolerance: f64,
}

impl Archive {
    /// Create an empty archive bounded by `capacity`.
    pub fn new(capacity: usize) -> Self {
        Archive::with_tolerance(capacity, 0.0)
    }

    /// Create an empty archive with an explicit duplicate tolerance.
    pub fn with_tolerance(capacity: usize, duplicate_tolerance: f64) -> Self {
        Archive {
            members: Vec::with_capacity(capacity),
            capacity,
            duplicate_tolerance,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.members
    }

    pub fn into_solutions(self) -> Vec<Solution> {
        self.members
    }

    /// Whether no member of the archive dominates `solution`.
    pub fn is_non_dominated(&self, solution: &Solution) -> bool {
        is_non_dominated(solution, &self.members)
    }

    /// Pick a feasible member uniformly at random.
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Solution> {
        let feasible: Vec<&Solution> = self.members.iter().filter(|s| s.is_feasible).collect();
        feasible.choose(rng).copied()
    }

    fn is_duplicate(&self, a: &Solution, b: &Solution) -> bool {
        (a.total_distance - b.total_distance).abs() <= self.duplicate_tolerance
            && (a.total_cost - b.total_cost).abs() <= self.duplicate_tolerance
    }

    /// Merge new solutions into the archive.
    ///
    /// Infeasible candidates and duplicates of existing members are dropped,
    /// dominated members are removed and, if more than `capacity` members
    /// remain, the archive keeps the first ones ordered by
    /// (distance, vehicles, cost). Returns whether the membership changed.
    pub fn update<I>(&mut self, new_solutions: I) -> bool
    where
        I: IntoIterator<Item = Solution>,
    {
        let before = self.fingerprint();

        let mut pool: Vec<Solution> = std::mem::take(&mut self.members)
            .into_iter()
            .filter(|s| s.is_feasible)
            .collect();

        for candidate in new_solutions {
            if !candidate.is_feasible {
                continue;
            }
            if pool.iter().any(|member| self.is_duplicate(member, &candidate)) {
                continue;
            }
            pool.push(candidate);
        }

        let mut non_dominated: Vec<Solution> = pool
            .iter()
            .filter(|s| is_non_dominated(s, &pool))
            .cloned()
            .collect();

        if non_dominated.len() > self.capacity {
            non_dominated.sort_by(|a, b| {
                a.total_distance
                    .partial_cmp(&b.total_distance)
                    .unwrap_or(Ordering::Equal)
                    .then(a.num_vehicles_used.cmp(&b.num_vehicles_used))
                    .then(
                        a.total_cost
                            .partial_cmp(&b.total_cost)
                            .unwrap_or(Ordering::Equal),
                    )
            });
            non_dominated.truncate(self.capacity);
        }

        self.members = non_dominated;

        before != self.fingerprint()
    }

    /// Sorted objective vectors of the members, used to detect membership changes.
    fn fingerprint(&self) -> Vec<(u64, u64)> {
        self.members
            .iter()
            .map(|s| (s.total_distance.to_bits(), s.total_cost.to_bits()))
            .sorted_unstable()
            .collect()
    }
}
