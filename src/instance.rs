//! Problem definition and data structures for the EVRP.

use serde::{Deserialize, Serialize};
use std::f64;
use thiserror::Error;

/// Errors raised while assembling an [`Instance`].
#[derive(Debug, Error, PartialEq)]
pub enum InstanceError {
    #[error("node at index {index} has id {id}; node ids must match their index")]
    NodeIdMismatch { index: usize, id: usize },

    #[error("{matrix} matrix must be {expected}x{expected}")]
    MatrixShape { matrix: &'static str, expected: usize },

    #[error("instance has no depot")]
    NoDepot,

    #[error("node {node} offers unknown technology {technology}")]
    UnknownTechnology { node: usize, technology: usize },

    #[error("technology at index {index} has id {id}; technology ids must match their index")]
    TechnologyIdMismatch { index: usize, id: usize },

    #[error("invalid technology {id}: {reason}")]
    InvalidTechnology { id: usize, reason: &'static str },

    #[error("invalid vehicle parameter: {0}")]
    InvalidVehicle(&'static str),
}

/// The role a node plays in the network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Depot,
    Customer { demand: f64, service_time: f64 },
    Station,
}

/// Represents a node (depot, customer or recharge station) in the EVRP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub kind: NodeKind,
    /// Ids of the charging technologies offered here (always empty for customers)
    pub technologies: Vec<usize>,
}

impl Node {
    /// Create a depot offering the given technologies.
    pub fn depot(id: usize, x: f64, y: f64, technologies: Vec<usize>) -> Self {
        Node {
            id,
            x,
            y,
            kind: NodeKind::Depot,
            technologies,
        }
    }

    /// Create a customer.
    pub fn customer(id: usize, x: f64, y: f64, demand: f64, service_time: f64) -> Self {
        Node {
            id,
            x,
            y,
            kind: NodeKind::Customer {
                demand,
                service_time,
            },
            technologies: Vec::new(),
        }
    }

    /// Create a recharge station offering the given technologies.
    pub fn station(id: usize, x: f64, y: f64, technologies: Vec<usize>) -> Self {
        Node {
            id,
            x,
            y,
            kind: NodeKind::Station,
            technologies,
        }
    }

    pub fn is_depot(&self) -> bool {
        matches!(self.kind, NodeKind::Depot)
    }

    pub fn is_customer(&self) -> bool {
        matches!(self.kind, NodeKind::Customer { .. })
    }

    pub fn is_station(&self) -> bool {
        matches!(self.kind, NodeKind::Station)
    }

    /// Demand of the node, zero for anything but customers.
    pub fn demand(&self) -> f64 {
        match self.kind {
            NodeKind::Customer { demand, .. } => demand,
            _ => 0.0,
        }
    }

    /// Service time of the node, zero for anything but customers.
    pub fn service_time(&self) -> f64 {
        match self.kind {
            NodeKind::Customer { service_time, .. } => service_time,
            _ => 0.0,
        }
    }

    /// Whether a vehicle can charge here with the given technology.
    pub fn offers(&self, technology: usize) -> bool {
        self.technologies.contains(&technology)
    }

    /// Calculate the Euclidean distance between two nodes.
    pub fn distance(&self, other: &Node) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A charging technology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technology {
    pub id: usize,
    /// Energy delivered per time unit
    pub power: f64,
    /// Price per energy unit
    pub cost_per_energy: f64,
}

impl Technology {
    pub fn new(id: usize, power: f64, cost_per_energy: f64) -> Self {
        Technology {
            id,
            power,
            cost_per_energy,
        }
    }
}

/// The (homogeneous) vehicle type of the fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    /// Payload capacity
    pub capacity: f64,
    /// Battery capacity in energy units
    pub battery_capacity: f64,
    /// Energy consumed per distance unit
    pub consumption_rate: f64,
}

impl Vehicle {
    pub fn new(capacity: f64, battery_capacity: f64, consumption_rate: f64) -> Self {
        Vehicle {
            capacity,
            battery_capacity,
            consumption_rate,
        }
    }

    /// Distance that can be covered on a full battery.
    pub fn max_range(&self) -> f64 {
        self.battery_capacity / self.consumption_rate
    }
}

/// Scalar limits and fees of an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceLimits {
    pub num_vehicles: usize,
    pub max_route_duration: f64,
    /// Fixed setup time paid on every charging event
    pub charging_fixed_time: f64,
    /// Fixed cost paid on every charging event
    pub battery_depreciation_cost: f64,
}

/// Represents an EVRP instance. Read-only for the whole search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub nodes: Vec<Node>,
    pub distance_matrix: Vec<Vec<f64>>,
    pub time_matrix: Vec<Vec<f64>>,
    pub vehicle: Vehicle,
    pub technologies: Vec<Technology>,
    pub num_vehicles: usize,
    pub max_route_duration: f64,
    pub charging_fixed_time: f64,
    pub battery_depreciation_cost: f64,
}

impl Instance {
    /// Create a new instance from precomputed matrices.
    pub fn new(
        name: String,
        nodes: Vec<Node>,
        distance_matrix: Vec<Vec<f64>>,
        time_matrix: Vec<Vec<f64>>,
        vehicle: Vehicle,
        technologies: Vec<Technology>,
        limits: InstanceLimits,
    ) -> Result<Self, InstanceError> {
        let instance = Instance {
            name,
            nodes,
            distance_matrix,
            time_matrix,
            vehicle,
            technologies,
            num_vehicles: limits.num_vehicles,
            max_route_duration: limits.max_route_duration,
            charging_fixed_time: limits.charging_fixed_time,
            battery_depreciation_cost: limits.battery_depreciation_cost,
        };
        instance.validate()?;
        Ok(instance)
    }

    /// Create an instance whose distances are Euclidean and whose travel
    /// times are distance divided by `speed`.
    pub fn with_euclidean_matrices(
        name: String,
        nodes: Vec<Node>,
        vehicle: Vehicle,
        technologies: Vec<Technology>,
        limits: InstanceLimits,
        speed: f64,
    ) -> Result<Self, InstanceError> {
        let distance_matrix = Self::compute_distance_matrix(&nodes);
        let time_matrix = distance_matrix
            .iter()
            .map(|row| row.iter().map(|d| d / speed).collect())
            .collect();

        Instance::new(
            name,
            nodes,
            distance_matrix,
            time_matrix,
            vehicle,
            technologies,
            limits,
        )
    }

    fn validate(&self) -> Result<(), InstanceError> {
        let n = self.nodes.len();

        for (index, node) in self.nodes.iter().enumerate() {
            if node.id != index {
                return Err(InstanceError::NodeIdMismatch { index, id: node.id });
            }
            if let Some(&technology) = node
                .technologies
                .iter()
                .find(|&&t| t >= self.technologies.len())
            {
                return Err(InstanceError::UnknownTechnology {
                    node: node.id,
                    technology,
                });
            }
        }

        for (index, technology) in self.technologies.iter().enumerate() {
            if technology.id != index {
                return Err(InstanceError::TechnologyIdMismatch {
                    index,
                    id: technology.id,
                });
            }
            if technology.power <= 0.0 {
                return Err(InstanceError::InvalidTechnology {
                    id: technology.id,
                    reason: "power must be positive",
                });
            }
            if technology.cost_per_energy < 0.0 {
                return Err(InstanceError::InvalidTechnology {
                    id: technology.id,
                    reason: "cost per energy must not be negative",
                });
            }
        }

        if self.distance_matrix.len() != n || self.distance_matrix.iter().any(|r| r.len() != n) {
            return Err(InstanceError::MatrixShape {
                matrix: "distance",
                expected: n,
            });
        }
        if self.time_matrix.len() != n || self.time_matrix.iter().any(|r| r.len() != n) {
            return Err(InstanceError::MatrixShape {
                matrix: "time",
                expected: n,
            });
        }

        if !self.nodes.iter().any(Node::is_depot) {
            return Err(InstanceError::NoDepot);
        }

        if self.vehicle.battery_capacity <= 0.0 {
            return Err(InstanceError::InvalidVehicle("battery capacity must be positive"));
        }
        if self.vehicle.consumption_rate <= 0.0 {
            return Err(InstanceError::InvalidVehicle("consumption rate must be positive"));
        }
        if self.vehicle.capacity <= 0.0 {
            return Err(InstanceError::InvalidVehicle("capacity must be positive"));
        }

        Ok(())
    }

    /// Generate the full Euclidean distance matrix for all nodes.
    fn compute_distance_matrix(nodes: &[Node]) -> Vec<Vec<f64>> {
        let n = nodes.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    matrix[i][j] = nodes[i].distance(&nodes[j]);
                }
            }
        }

        matrix
    }

    /// Distance between two node ids.
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distance_matrix[from][to]
    }

    /// Travel time between two node ids.
    pub fn travel_time(&self, from: usize, to: usize) -> f64 {
        self.time_matrix[from][to]
    }

    /// Energy needed to drive `distance`.
    pub fn energy_for(&self, distance: f64) -> f64 {
        distance * self.vehicle.consumption_rate
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn technology(&self, id: usize) -> Option<&Technology> {
        self.technologies.get(id)
    }

    pub fn customers(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|n| n.is_customer())
    }

    pub fn stations(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|n| n.is_station())
    }

    pub fn depots(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(|n| n.is_depot())
    }

    /// Get the number of customers.
    pub fn customer_count(&self) -> usize {
        self.customers().count()
    }

    /// The depot closest to a node.
    pub fn nearest_depot(&self, node: usize) -> Option<usize> {
        self.depots()
            .map(|d| d.id)
            .min_by(|&a, &b| self.distance(node, a).total_cmp(&self.distance(node, b)))
    }
}
