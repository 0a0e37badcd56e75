//! Point lights and their attachment to walls/cells.

use glam::Vec3;

pub use crate::geom::LightId;
use crate::level::Level;

/// Hard cap on lights per level.
pub const MAX_LIGHTS_PER_LEVEL: usize = 64;

/// A point light: position, radius, and cached squared/reciprocal
/// values so the shader never takes a square root per pixel.
#[derive(Clone, Copy, Debug)]
pub struct Light {
    pub pos: Vec3,
    pub radius: f32,
    pub radius_sq: f32,
    pub inv_radius_sq: f32,
    pub strength: f32,
}

impl Light {
    pub fn new(pos: Vec3, radius: f32, strength: f32) -> Self {
        let radius = radius.max(f32::EPSILON);
        Self {
            pos,
            radius,
            radius_sq: radius * radius,
            inv_radius_sq: 1.0 / (radius * radius),
            strength: strength.clamp(0.0, 4.0),
        }
    }
}

impl Level {
    /// Recomputes every segment's and every cache cell's light list
    /// from scratch. Called automatically by `add_light`/
    /// `move_light`; expose it directly if you mutate lights in bulk.
    pub fn update_lights(&mut self) {
        for ld in &mut self.linedefs {
            for side in &mut ld.sides {
                for seg in &mut side.segments {
                    seg.lights.clear();
                }
            }
        }
        for cell in self.cache.cells_mut() {
            cell.lights.clear();
        }

        let light_ids: Vec<LightId> = (0..self.lights.len() as u32).map(LightId).collect();
        for light_id in light_ids {
            self.attach_light_to_segments(light_id);
            self.cache.process_light(light_id, self.lights[light_id.index()]);
        }
    }

    fn attach_light_to_segments(&mut self, light_id: LightId) {
        let light = self.lights[light_id.index()];
        let dynamic = self.dynamic_shadows;

        let sector_ids: Vec<crate::geom::SectorId> =
            (0..self.sectors.len() as u32).map(crate::geom::SectorId).collect();

        for sector_id in sector_ids {
            let linedef_ids = self.sectors[sector_id.index()].linedefs.clone();
            for linedef_id in linedef_ids {
                let Some(side_index) = self.linedef(linedef_id).side_for_sector(sector_id) else {
                    continue;
                };

                let ld = self.linedef(linedef_id);
                let v0 = self.vertex(ld.v0).pos;
                let normal = ld.sides[side_index].normal;
                let to_light = light.pos.truncate() - v0;
                if to_light.dot(normal) <= 0.0 {
                    continue; // light is behind this side
                }

                let sector = self.sector(sector_id);
                let (floor_h, ceiling_h) = (sector.floor_height as f32, sector.ceiling_height as f32);
                let segment_count = self.linedef(linedef_id).sides[side_index].segments.len();
                let v0_pos = self.vertex(self.linedef(linedef_id).v0).pos;
                let v1_pos = self.vertex(self.linedef(linedef_id).v1).pos;

                for seg_idx in 0..segment_count {
                    let t0 = seg_idx as f32 / segment_count as f32;
                    let t1 = (seg_idx + 1) as f32 / segment_count as f32;
                    let p0 = v0_pos.lerp(v1_pos, t0);
                    let p1 = v0_pos.lerp(v1_pos, t1);

                    let visible = if dynamic {
                        // Deferred to per-pixel rendering; here we only
                        // gate on 2-D proximity.
                        let mid = (p0 + p1) * 0.5;
                        mid.distance_squared(light.pos.truncate()) <= light.radius_sq
                    } else {
                        let corners = [
                            p0.extend(floor_h),
                            p0.extend(ceiling_h),
                            p1.extend(floor_h),
                            p1.extend(ceiling_h),
                        ];
                        corners
                            .iter()
                            .any(|&c| !self.cache.intersect_3d(self, c, light.pos))
                    };

                    if visible {
                        self.linedefs[linedef_id.index()].sides[side_index].segments[seg_idx]
                            .attach(light_id);
                    }
                }
            }
        }
    }
}
