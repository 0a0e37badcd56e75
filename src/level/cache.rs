//! Grid-indexed spatial accelerator over linedefs and lights.

use glam::{Vec2, Vec3};
use smallvec::SmallVec;

use crate::geom::{Aabb, LightId, LinedefId};
use crate::level::lights::Light;
use crate::level::Level;

/// Hard cap on lights registered in a single cell.
pub const MAX_LIGHTS_PER_CELL: usize = 16;

/// Default cell edge length, in world units, used when a caller doesn't
/// pick one explicitly (roughly one sector's width in a typical level).
pub const DEFAULT_CELL_SIZE: f32 = 256.0;

#[derive(Clone, Default)]
pub struct Cell {
    pub linedefs: SmallVec<[LinedefId; 8]>,
    pub lights: SmallVec<[LightId; MAX_LIGHTS_PER_CELL]>,
}

/// A regular grid over the level bounds. Built once after authoring
/// finishes; rebuilt wholesale if geometry changes (lights re-register
/// incrementally through [`Level::update_lights`] instead).
pub struct MapCache {
    origin: Vec2,
    cell_size: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl MapCache {
    pub fn empty() -> Self {
        Self {
            origin: Vec2::ZERO,
            cell_size: DEFAULT_CELL_SIZE,
            cols: 0,
            rows: 0,
            cells: Vec::new(),
        }
    }

    /// Scans every linedef and every light in `level` into the cells
    /// their footprint touches.
    pub fn build(level: &Level, cell_size: f32) -> Self {
        let bounds = level.bounds;
        let origin = bounds.min;
        let cols = (((bounds.max.x - bounds.min.x) / cell_size).ceil().max(1.0)) as usize;
        let rows = (((bounds.max.y - bounds.min.y) / cell_size).ceil().max(1.0)) as usize;

        let mut cache = Self {
            origin,
            cell_size,
            cols,
            rows,
            cells: vec![Cell::default(); cols * rows],
        };

        for (i, ld) in level.linedefs().iter().enumerate() {
            let id = LinedefId(i as u32);
            for cell_idx in cache.cells_touching(&ld.aabb) {
                cache.cells[cell_idx].linedefs.push(id);
            }
        }

        for (i, light) in level.lights().iter().enumerate() {
            cache.process_light(LightId(i as u32), *light);
        }

        cache
    }

    #[inline]
    fn col_row(&self, p: Vec2) -> Option<(usize, usize)> {
        if self.cols == 0 || self.rows == 0 {
            return None;
        }
        let rel = p - self.origin;
        if rel.x < 0.0 || rel.y < 0.0 {
            return None;
        }
        let col = (rel.x / self.cell_size) as usize;
        let row = (rel.y / self.cell_size) as usize;
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some((col, row))
    }

    /// O(1) cell lookup for a world point.
    pub fn cell_at(&self, p: Vec2) -> Option<&Cell> {
        let (col, row) = self.col_row(p)?;
        self.cells.get(row * self.cols + col)
    }

    fn cells_touching(&self, aabb: &Aabb) -> impl Iterator<Item = usize> + '_ {
        let (c0, r0) = self.col_row(aabb.min).unwrap_or((0, 0));
        let (c1, r1) = self
            .col_row(aabb.max)
            .unwrap_or((self.cols.saturating_sub(1), self.rows.saturating_sub(1)));
        let cols = self.cols;
        (r0..=r1).flat_map(move |r| (c0..=c1).map(move |c| r * cols + c))
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut()
    }

    /// Re-registers `light` into every cell its disc overlaps,
    /// replacing any previous registration.
    pub fn process_light(&mut self, light_id: LightId, light: Light) {
        if self.cols == 0 {
            return;
        }
        let disc = Aabb::of_points(
            light.pos.truncate() - Vec2::splat(light.radius),
            light.pos.truncate() + Vec2::splat(light.radius),
        );
        for idx in self.cells_touching(&disc) {
            let cell = &mut self.cells[idx];
            if cell.lights.contains(&light_id) {
                continue;
            }
            if cell.lights.len() >= MAX_LIGHTS_PER_CELL {
                log::warn!("cache cell light list full, dropping light {:?}", light_id);
                continue;
            }
            cell.lights.push(light_id);
        }
    }

    /// Tests the 3-D segment `a`→`b` against the linedef set, walking
    /// the 2-D cells the segment's bounding box touches. Returns
    /// `true` if something blocks line-of-sight between the two points.
    pub fn intersect_3d(&self, level: &Level, a: Vec3, b: Vec3) -> bool {
        let aabb = Aabb::of_points(a.truncate(), b.truncate());
        let mut tested: SmallVec<[LinedefId; 16]> = SmallVec::new();

        for idx in self.cells_touching(&aabb) {
            for &ld_id in &self.cells[idx].linedefs {
                if tested.contains(&ld_id) {
                    continue;
                }
                tested.push(ld_id);

                if Self::segment_blocks(level, ld_id, a, b) {
                    return true;
                }
            }
        }
        false
    }

    fn segment_blocks(level: &Level, ld_id: LinedefId, a: Vec3, b: Vec3) -> bool {
        let ld = level.linedef(ld_id);
        let v0 = level.vertex(ld.v0).pos;
        let v1 = level.vertex(ld.v1).pos;

        let Some((t, u)) = segment_intersection_2d(a.truncate(), b.truncate(), v0, v1) else {
            return false;
        };
        if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
            return false;
        }

        if !ld.is_portal() {
            return true; // solid wall blocks at every height
        }
        let height = a.z + (b.z - a.z) * t;
        !(ld.max_floor_height as f32..=ld.min_ceiling_height as f32).contains(&height)
    }
}

/// Standard 2-D segment intersection; returns `(t, u)` parametric
/// positions along `(p0, p1)` and `(q0, q1)` respectively.
fn segment_intersection_2d(p0: Vec2, p1: Vec2, q0: Vec2, q1: Vec2) -> Option<(f32, f32)> {
    let r = p1 - p0;
    let s = q1 - q0;
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() < f32::EPSILON {
        return None;
    }
    let qp = q0 - p0;
    let t = (qp.x * s.y - qp.y * s.x) / denom;
    let u = (qp.x * r.y - qp.y * r.x) / denom;
    Some((t, u))
}
