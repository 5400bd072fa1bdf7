//! Uniform-grid spatial index over static obstacles
//!
//! The plane is cut into square cells (128 units by default). An obstacle is
//! filed under every cell its box touches, so a query only visits the cells
//! under the query box. Obstacles never move, so the grid is maintained
//! incrementally: insert on room load, clear on unload.
//!
//! Candidates are a superset of true overlaps; callers run the exact test.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;

/// Handle to an obstacle owned by the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObstacleId(pub u32);

/// A static blocking box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub bounds: Aabb,
}

type CellKey = (i32, i32);

/// Grid of obstacle buckets
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: FxHashMap<CellKey, Vec<ObstacleId>>,
    obstacles: FxHashMap<ObstacleId, Obstacle>,
}

impl SpatialIndex {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size >= 1.0 {
            cell_size
        } else {
            128.0
        };
        Self {
            cell_size,
            cells: FxHashMap::default(),
            obstacles: FxHashMap::default(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of obstacles indexed
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Number of non-empty cells (for diagnostics)
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(&id)
    }

    /// File an obstacle under every cell its box overlaps.
    /// Re-inserting an existing id replaces the old entry.
    pub fn insert(&mut self, obstacle: Obstacle) {
        if self.obstacles.contains_key(&obstacle.id) {
            self.remove(obstacle.id);
        }
        let ((x0, y0), (x1, y1)) = self.cell_range(&obstacle.bounds);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                self.cells.entry((cx, cy)).or_default().push(obstacle.id);
            }
        }
        self.obstacles.insert(obstacle.id, obstacle);
    }

    /// Remove an obstacle, dropping buckets that become empty
    pub fn remove(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let obstacle = self.obstacles.remove(&id)?;
        let ((x0, y0), (x1, y1)) = self.cell_range(&obstacle.bounds);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(bucket) = self.cells.get_mut(&(cx, cy)) {
                    bucket.retain(|&o| o != id);
                    if bucket.is_empty() {
                        self.cells.remove(&(cx, cy));
                    }
                }
            }
        }
        Some(obstacle)
    }

    /// Drop everything (room unload)
    pub fn clear(&mut self) {
        self.cells.clear();
        self.obstacles.clear();
    }

    /// De-duplicated candidates from every cell `area` touches, written to `buf`
    /// in id order. `buf` is cleared first.
    pub fn query_near_into(&self, area: &Aabb, buf: &mut Vec<ObstacleId>) {
        buf.clear();
        if self.obstacles.is_empty() {
            return;
        }
        let ((x0, y0), (x1, y1)) = self.cell_range(area);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(bucket) = self.cells.get(&(cx, cy)) {
                    buf.extend_from_slice(bucket);
                }
            }
        }
        buf.sort_unstable();
        buf.dedup();
    }

    /// Allocating form of [`query_near_into`](Self::query_near_into)
    pub fn query_near(&self, area: &Aabb) -> Vec<ObstacleId> {
        let mut buf = Vec::new();
        self.query_near_into(area, &mut buf);
        buf
    }

    /// Candidate obstacles near `area`, resolved to their boxes
    pub fn candidates<'a>(&'a self, area: &Aabb) -> impl Iterator<Item = &'a Obstacle> + use<'a> {
        self.query_near(area)
            .into_iter()
            .filter_map(move |id| self.obstacles.get(&id))
    }

    fn cell_of(&self, v: f32) -> i32 {
        let c = (v / self.cell_size).floor();
        if c.is_finite() {
            c.clamp(i32::MIN as f32, i32::MAX as f32) as i32
        } else {
            0
        }
    }

    fn cell_range(&self, area: &Aabb) -> (CellKey, CellKey) {
        let x0 = self.cell_of(area.x);
        let y0 = self.cell_of(area.y);
        let x1 = self.cell_of(area.right()).max(x0);
        let y1 = self.cell_of(area.bottom()).max(y0);
        ((x0, y0), (x1, y1))
    }
}
