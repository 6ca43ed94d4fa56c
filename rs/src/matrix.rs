//! Pairwise employee matrices built in batch
//!
//! Both matrices store each unordered pair once, keyed by the smaller
//! identifier first, so `get(a, b) == get(b, a)` holds by construction.
//! On disk they are square tables keyed by employee ID on both axes.

use crate::constants::{EARTH_RADIUS_KM, SENTINEL_DISTANCE_KM};
use crate::models::{Employee, EmployeeId, GeoPoint, Meeting};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Square table layout used for persistence
pub type SquareTable<V> = BTreeMap<EmployeeId, BTreeMap<EmployeeId, V>>;

/// Unordered pair storage shared by both matrices
#[derive(Debug, Clone, Default, PartialEq)]
struct PairCells<V> {
    /// Every employee on the matrix axes
    axis: BTreeSet<EmployeeId>,

    /// Cells keyed by (smaller id, larger id)
    cells: HashMap<EmployeeId, HashMap<EmployeeId, V>>,
}

impl<V: Copy + PartialEq + std::fmt::Debug> PairCells<V> {
    fn ordered<'a>(a: &'a EmployeeId, b: &'a EmployeeId) -> (&'a EmployeeId, &'a EmployeeId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn get(&self, a: &EmployeeId, b: &EmployeeId) -> Option<V> {
        if a == b {
            return None;
        }
        let (low, high) = Self::ordered(a, b);
        self.cells.get(low).and_then(|row| row.get(high)).copied()
    }

    fn cell_mut(&mut self, a: &EmployeeId, b: &EmployeeId, empty: V) -> &mut V {
        let (low, high) = Self::ordered(a, b);
        self.cells
            .entry(low.clone())
            .or_default()
            .entry(high.clone())
            .or_insert(empty)
    }

    fn to_square(&self, empty: V, diagonal: V) -> SquareTable<V> {
        self.axis
            .iter()
            .map(|row| {
                let columns = self
                    .axis
                    .iter()
                    .map(|column| {
                        let value = if row == column {
                            diagonal
                        } else {
                            self.get(row, column).unwrap_or(empty)
                        };
                        (column.clone(), value)
                    })
                    .collect();
                (row.clone(), columns)
            })
            .collect()
    }

    /// Fold a square table back into pair cells, skipping empty values
    ///
    /// Disagreeing mirror cells keep the first value read.
    fn from_square(table: SquareTable<V>, is_empty: impl Fn(V) -> bool) -> Self {
        let mut pairs = Self {
            axis: BTreeSet::new(),
            cells: HashMap::new(),
        };
        for (row, columns) in table {
            for (column, value) in columns {
                pairs.axis.insert(column.clone());
                if row == column || is_empty(value) {
                    continue;
                }
                match pairs.get(&row, &column) {
                    Some(existing) if existing != value => {
                        tracing::warn!(
                            "Asymmetric cell ({}, {}): keeping {:?}, ignoring {:?}",
                            row,
                            column,
                            existing,
                            value
                        );
                    }
                    Some(_) => {}
                    None => *pairs.cell_mut(&row, &column, value) = value,
                }
            }
            pairs.axis.insert(row);
        }
        pairs
    }
}

/// Great-circle distance in kilometers between two points in decimal degrees
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Distance between two employees, or `None` when it cannot be known
///
/// Same-campus pairs are 0 regardless of coordinates.
pub fn employee_distance_km(a: &Employee, b: &Employee) -> Option<f64> {
    if a.shares_campus_with(b) {
        return Some(0.0);
    }
    Some(haversine_km(a.location()?, b.location()?))
}

/// Symmetric employee-to-employee distance in kilometers
///
/// Unknown pairs, self pairs and employees missing from the matrix read as
/// [`SENTINEL_DISTANCE_KM`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SquareTable<f64>", into = "SquareTable<f64>")]
pub struct DistanceMatrix {
    pairs: PairCells<f64>,
}

impl DistanceMatrix {
    /// Compute distances for every unordered pair of employees
    pub fn build(employees: &[Employee]) -> Self {
        tracing::info!("Building distance matrix for {} employees", employees.len());
        let start = std::time::Instant::now();

        let mut pairs = PairCells::default();
        let mut unknown = 0usize;

        for (i, a) in employees.iter().enumerate() {
            pairs.axis.insert(a.id.clone());
            for b in &employees[i + 1..] {
                if a.id == b.id {
                    continue;
                }
                match employee_distance_km(a, b) {
                    Some(distance) => {
                        *pairs.cell_mut(&a.id, &b.id, SENTINEL_DISTANCE_KM) = distance;
                    }
                    None => unknown += 1,
                }
            }
        }

        tracing::info!(
            "Distance matrix built in {:?} ({} pairs with unknown location)",
            start.elapsed(),
            unknown
        );
        Self { pairs }
    }

    /// Distance between two employees in kilometers
    pub fn get(&self, a: &EmployeeId, b: &EmployeeId) -> f64 {
        self.pairs.get(a, b).unwrap_or(SENTINEL_DISTANCE_KM)
    }

    pub fn len(&self) -> usize {
        self.pairs.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.axis.is_empty()
    }
}

impl From<SquareTable<f64>> for DistanceMatrix {
    fn from(table: SquareTable<f64>) -> Self {
        Self {
            // Only the sentinel itself means unknown; real distances reach ~20015 km
            pairs: PairCells::from_square(table, |distance| {
                !distance.is_finite() || distance == SENTINEL_DISTANCE_KM
            }),
        }
    }
}

impl From<DistanceMatrix> for SquareTable<f64> {
    fn from(matrix: DistanceMatrix) -> Self {
        matrix
            .pairs
            .to_square(SENTINEL_DISTANCE_KM, SENTINEL_DISTANCE_KM)
    }
}

/// Symmetric count of meetings each pair of employees shared
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SquareTable<u32>", into = "SquareTable<u32>")]
pub struct CollaborationMatrix {
    pairs: PairCells<u32>,
}

impl CollaborationMatrix {
    /// Count shared meetings over every employee appearing in any roster
    ///
    /// Repeated invitations within one roster count once.
    pub fn build(meetings: &[Meeting]) -> Self {
        tracing::info!("Building collaboration matrix from {} meetings", meetings.len());
        let start = std::time::Instant::now();

        let mut pairs = PairCells::default();
        for meeting in meetings {
            let roster: BTreeSet<&EmployeeId> = meeting.roster.iter().collect();
            pairs.axis.extend(roster.iter().map(|id| (*id).clone()));

            let roster: Vec<&EmployeeId> = roster.into_iter().collect();
            for (i, a) in roster.iter().enumerate() {
                for b in &roster[i + 1..] {
                    *pairs.cell_mut(a, b, 0) += 1;
                }
            }
        }

        tracing::info!(
            "Collaboration matrix built in {:?} ({} employees)",
            start.elapsed(),
            pairs.axis.len()
        );
        Self { pairs }
    }

    /// Number of meetings both employees were invited to
    pub fn get(&self, a: &EmployeeId, b: &EmployeeId) -> u32 {
        self.pairs.get(a, b).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.pairs.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.axis.is_empty()
    }
}

impl From<SquareTable<u32>> for CollaborationMatrix {
    fn from(table: SquareTable<u32>) -> Self {
        Self {
            pairs: PairCells::from_square(table, |count| count == 0),
        }
    }
}

impl From<CollaborationMatrix> for SquareTable<u32> {
    fn from(matrix: CollaborationMatrix) -> Self {
        matrix.pairs.to_square(0, 0)
    }
}
