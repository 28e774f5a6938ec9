//! Grid-based spatial index over atom positions.
//!
//! The organizer only knows the positions it was told about. The entity
//! store re-buckets single atoms as they move and rebuilds the whole grid
//! when the global transform changes, at the next flush.

use super::models::ids::AtomId;
use nalgebra::Point3;
use slotmap::SecondaryMap;
use std::collections::HashMap;

type Cell = (i32, i32, i32);

/// Uniform grid of cubic buckets holding atom ids and their positions.
#[derive(Debug, Clone)]
pub struct SpatialOrganizer {
    cell_size: f64,
    /// Inverse cell size for fast coordinate-to-cell conversion.
    inv_cell_size: f64,
    cells: HashMap<Cell, Vec<(AtomId, Point3<f64>)>>,
    located: SecondaryMap<AtomId, Cell>,
}

impl SpatialOrganizer {
    /// Creates an empty organizer with the given bucket edge length.
    ///
    /// # Panics
    ///
    /// Panics if `cell_size` is not a positive finite number. Configuration
    /// validation rejects such values before they reach the store.
    pub fn new(cell_size: f64) -> Self {
        assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "Cell size must be positive"
        );
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            located: SecondaryMap::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.located.len()
    }

    pub fn is_empty(&self) -> bool {
        self.located.is_empty()
    }

    fn cell_coords(&self, pos: &Point3<f64>) -> Cell {
        (
            (pos.x * self.inv_cell_size).floor() as i32,
            (pos.y * self.inv_cell_size).floor() as i32,
            (pos.z * self.inv_cell_size).floor() as i32,
        )
    }

    /// Inserts an atom, replacing any previous entry for the same id.
    pub fn insert(&mut self, id: AtomId, pos: Point3<f64>) {
        self.remove(id);
        let cell = self.cell_coords(&pos);
        self.cells.entry(cell).or_default().push((id, pos));
        self.located.insert(id, cell);
    }

    pub fn remove(&mut self, id: AtomId) -> bool {
        let Some(cell) = self.located.remove(id) else {
            return false;
        };
        if let Some(bucket) = self.cells.get_mut(&cell) {
            bucket.retain(|(atom, _)| *atom != id);
            if bucket.is_empty() {
                self.cells.remove(&cell);
            }
        }
        true
    }

    /// Moves an already indexed atom to a new position.
    pub fn update(&mut self, id: AtomId, pos: Point3<f64>) {
        self.insert(id, pos);
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.located.clear();
    }

    /// Replaces the whole content of the index.
    pub fn rebuild(&mut self, atoms: impl IntoIterator<Item = (AtomId, Point3<f64>)>) {
        self.clear();
        for (id, pos) in atoms {
            let cell = self.cell_coords(&pos);
            self.cells.entry(cell).or_default().push((id, pos));
            self.located.insert(id, cell);
        }
    }

    /// Returns all atoms whose squared distance to `point` is at most
    /// `radius²`. The order of the result is unspecified.
    pub fn find_within(&self, point: &Point3<f64>, radius: f64) -> Vec<AtomId> {
        if !(radius >= 0.0) || self.cells.is_empty() {
            return Vec::new();
        }
        let radius_sq = radius * radius;
        let lo = self.cell_coords(&(point - nalgebra::Vector3::repeat(radius)));
        let hi = self.cell_coords(&(point + nalgebra::Vector3::repeat(radius)));

        let span = |a: i32, b: i32| (i64::from(b) - i64::from(a) + 1) as u128;
        let cells_in_range = span(lo.0, hi.0) * span(lo.1, hi.1) * span(lo.2, hi.2);

        let mut results = Vec::new();
        let mut collect = |bucket: &Vec<(AtomId, Point3<f64>)>| {
            for (id, pos) in bucket {
                if (pos - point).norm_squared() <= radius_sq {
                    results.push(*id);
                }
            }
        };

        if cells_in_range > self.cells.len() as u128 {
            for (cell, bucket) in &self.cells {
                let inside = (lo.0..=hi.0).contains(&cell.0)
                    && (lo.1..=hi.1).contains(&cell.1)
                    && (lo.2..=hi.2).contains(&cell.2);
                if inside {
                    collect(bucket);
                }
            }
        } else {
            for x in lo.0..=hi.0 {
                for y in lo.1..=hi.1 {
                    for z in lo.2..=hi.2 {
                        if let Some(bucket) = self.cells.get(&(x, y, z)) {
                            collect(bucket);
                        }
                    }
                }
            }
        }
        results
    }
}
