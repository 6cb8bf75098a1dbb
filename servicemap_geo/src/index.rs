// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform-grid broad phase over feature bounds.
//!
//! Features are bucketed into fixed-size cells (in degrees). A point query
//! touches exactly one cell plus the short list of features too large to
//! bucket, and returns candidate slots for the precise test.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::bounds::{LngLat, LngLatBounds};

/// Features spanning more cells than this go to the oversized list.
const MAX_CELLS_PER_ENTRY: i64 = 256;

/// Default cell size in degrees, roughly a postal-code footprint.
pub const DEFAULT_CELL_SIZE: f64 = 0.05;

/// Broad-phase index from positions to feature slots.
#[derive(Clone, Debug)]
pub struct FeatureIndex {
    cell_size: f64,
    cells: HashMap<(i32, i32), SmallVec<[usize; 8]>>,
    oversized: Vec<usize>,
    bounds: Vec<Option<LngLatBounds>>,
}

impl Default for FeatureIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl FeatureIndex {
    /// Create an empty index with the given cell size in degrees.
    pub fn new(cell_size: f64) -> Self {
        debug_assert!(cell_size > 0.0, "cell_size must be strictly positive");
        Self {
            cell_size,
            cells: HashMap::new(),
            oversized: Vec::new(),
            bounds: Vec::new(),
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Grid cell indices are intentionally i32; out-of-range values are saturated."
    )]
    fn cell_coord(&self, value: f64) -> i32 {
        (value / self.cell_size).floor() as i32
    }

    /// Insert a slot with its bounds. Empty bounds are ignored.
    pub fn insert(&mut self, slot: usize, bounds: LngLatBounds) {
        if bounds.is_empty() {
            return;
        }
        if self.bounds.len() <= slot {
            self.bounds.resize(slot + 1, None);
        }
        self.bounds[slot] = Some(bounds);

        let (x0, x1) = (self.cell_coord(bounds.min_lng), self.cell_coord(bounds.max_lng));
        let (y0, y1) = (self.cell_coord(bounds.min_lat), self.cell_coord(bounds.max_lat));
        let span = (i64::from(x1) - i64::from(x0) + 1)
            .saturating_mul(i64::from(y1) - i64::from(y0) + 1);
        if span > MAX_CELLS_PER_ENTRY {
            self.oversized.push(slot);
            return;
        }
        for ix in x0..=x1 {
            for iy in y0..=y1 {
                self.cells.entry((ix, iy)).or_default().push(slot);
            }
        }
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.oversized.clear();
        self.bounds.clear();
    }

    /// Number of indexed slots.
    pub fn len(&self) -> usize {
        self.bounds.iter().filter(|b| b.is_some()).count()
    }

    /// True when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit slots whose bounds contain the point. Order is unspecified.
    pub fn visit_point<F: FnMut(usize)>(&self, p: LngLat, mut f: F) {
        let key = (self.cell_coord(p.lng), self.cell_coord(p.lat));
        let bucket = self.cells.get(&key).map(|c| c.as_slice()).unwrap_or(&[]);
        for &slot in bucket.iter().chain(self.oversized.iter()) {
            if let Some(Some(b)) = self.bounds.get(slot)
                && b.contains(p)
            {
                f(slot);
            }
        }
    }

    /// Slots whose bounds contain the point, in ascending order.
    pub fn query_point(&self, p: LngLat) -> Vec<usize> {
        let mut out = Vec::new();
        self.visit_point(p, |slot| out.push(slot));
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_queries_hit_overlapping_entries() {
        let mut idx = FeatureIndex::new(1.0);
        idx.insert(0, LngLatBounds::new(0.0, 0.0, 2.0, 2.0));
        idx.insert(1, LngLatBounds::new(1.5, 1.5, 3.0, 3.0));
        idx.insert(2, LngLatBounds::new(10.0, 10.0, 11.0, 11.0));
        assert_eq!(idx.query_point(LngLat::new(1.7, 1.7)), vec![0, 1]);
        assert_eq!(idx.query_point(LngLat::new(0.5, 0.5)), vec![0]);
        assert!(idx.query_point(LngLat::new(5.0, 5.0)).is_empty());
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn negative_coordinates_floor_correctly() {
        let mut idx = FeatureIndex::new(0.5);
        idx.insert(0, LngLatBounds::new(-93.4, 44.8, -93.2, 45.0));
        assert_eq!(idx.query_point(LngLat::new(-93.3, 44.9)), vec![0]);
        assert!(idx.query_point(LngLat::new(-93.1, 44.9)).is_empty());
    }

    #[test]
    fn huge_entries_go_to_the_oversized_list() {
        let mut idx = FeatureIndex::new(0.01);
        idx.insert(0, LngLatBounds::new(-125.0, 24.0, -66.0, 49.0));
        assert_eq!(idx.query_point(LngLat::new(-98.0, 39.0)), vec![0]);
        assert!(idx.cells.is_empty());
    }

    #[test]
    fn extreme_finite_bounds_do_not_overflow() {
        let mut idx = FeatureIndex::default();
        idx.insert(0, LngLatBounds::new(-1e300, -1e300, 1e300, 1e300));
        idx.insert(1, LngLatBounds::new(f64::MIN, 0.0, f64::MAX, 0.01));
        assert!(idx.cells.is_empty(), "both entries are oversized");
        assert_eq!(idx.query_point(LngLat::new(0.0, 0.005)), vec![0, 1]);
        assert_eq!(idx.query_point(LngLat::new(1e299, 1e299)), vec![0]);
    }

    #[test]
    fn empty_bounds_are_ignored_and_clear_resets() {
        let mut idx = FeatureIndex::default();
        idx.insert(0, LngLatBounds::empty());
        assert!(idx.is_empty());
        idx.insert(1, LngLatBounds::new(0.0, 0.0, 0.01, 0.01));
        assert!(!idx.is_empty());
        idx.clear();
        assert!(idx.query_point(LngLat::new(0.005, 0.005)).is_empty());
    }
}
