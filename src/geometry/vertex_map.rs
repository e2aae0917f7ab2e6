// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Position welding through a spatial hash

use ahash::AHashMap;
use nalgebra::Point3;

/// Assigns one id to every group of positions closer than the tolerance.
///
/// Cells are as wide as the tolerance, so a lookup only needs the 27 cells
/// around the query. When several stored positions match, the oldest id
/// wins, which keeps the result independent of hash iteration order.
#[derive(Debug, Clone)]
pub struct VertexMap {
    tolerance: f64,
    inv_cell: f64,
    positions: Vec<Point3<f64>>,
    cells: AHashMap<[i64; 3], Vec<usize>>,
}

impl VertexMap {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            inv_cell: 1.0 / tolerance,
            positions: Vec::new(),
            cells: AHashMap::new(),
        }
    }

    pub fn with_capacity(tolerance: f64, capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            cells: AHashMap::with_capacity(capacity),
            ..Self::new(tolerance)
        }
    }

    fn cell_of(&self, point: &Point3<f64>) -> [i64; 3] {
        [
            (point.x * self.inv_cell).floor() as i64,
            (point.y * self.inv_cell).floor() as i64,
            (point.z * self.inv_cell).floor() as i64,
        ]
    }

    /// Id of a stored position within tolerance of `point`
    pub fn find(&self, point: &Point3<f64>) -> Option<usize> {
        let cell = self.cell_of(point);
        let tolerance_sq = self.tolerance * self.tolerance;
        let mut best: Option<usize> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = [cell[0] + dx, cell[1] + dy, cell[2] + dz];
                    let Some(ids) = self.cells.get(&key) else {
                        continue;
                    };
                    for &id in ids {
                        if (self.positions[id] - point).norm_squared() <= tolerance_sq
                            && best.map_or(true, |b| id < b)
                        {
                            best = Some(id);
                        }
                    }
                }
            }
        }

        best
    }

    /// Existing id for `point`, or a new one
    pub fn insert(&mut self, point: Point3<f64>) -> usize {
        if let Some(id) = self.find(&point) {
            return id;
        }
        let id = self.positions.len();
        let cell = self.cell_of(&point);
        self.positions.push(point);
        self.cells.entry(cell).or_default().push(id);
        id
    }

    /// Representative position of `id` (the first one inserted)
    pub fn position(&self, id: usize) -> Point3<f64> {
        self.positions[id]
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welds_close_points() {
        let mut map = VertexMap::new(1e-6);
        let a = map.insert(Point3::new(1.0, 2.0, 3.0));
        let b = map.insert(Point3::new(1.0 + 4e-7, 2.0, 3.0 - 4e-7));
        let c = map.insert(Point3::new(1.0 + 5e-6, 2.0, 3.0));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(map.len(), 2);
        assert_eq!(map.position(a), Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_welds_across_cell_boundary() {
        let mut map = VertexMap::new(1e-3);
        let a = map.insert(Point3::new(0.0009999, 0.0, 0.0));
        let b = map.insert(Point3::new(0.0010001, 0.0, 0.0));
        assert_eq!(a, b);
        assert_eq!(map.find(&Point3::new(-0.5, 0.0, 0.0)), None);
    }
}
