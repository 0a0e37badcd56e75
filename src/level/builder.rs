//! Level authoring state machine.
//!
//! An explicit open-sector stack owned by the [`Level`] itself stands
//! in for a module-level "current sector" global, so two `Level`s being
//! authored on different threads never interfere.
//!
//! Tagged-NaN vertex sentinels become an explicit [`VertexSpec`]
//! variant instead.

use glam::Vec2;

use crate::error::GeometryError;
use crate::geom::{SectorId, SideFlags, TextureId};
use crate::level::Level;

/// One vertex slot in a [`LineDto`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VertexSpec {
    /// An explicit world-space position.
    At(Vec2),
    /// Reuse the previous line's `v1`.
    AppendPrev,
    /// Close back to the first vertex of this batch. Only valid in the
    /// `v1` slot.
    FinishLoop,
}

/// One line in an `update_sector_lines` batch.
#[derive(Clone, Copy, Debug)]
pub struct LineDto {
    pub v0: VertexSpec,
    pub v1: VertexSpec,
    pub tex_top: Option<TextureId>,
    pub tex_middle: Option<TextureId>,
    pub tex_bottom: Option<TextureId>,
    pub flags: SideFlags,
}

impl LineDto {
    pub fn new(
        v0: Vec2,
        v1: Vec2,
        tex_top: Option<TextureId>,
        tex_middle: Option<TextureId>,
        tex_bottom: Option<TextureId>,
        flags: SideFlags,
    ) -> Self {
        Self {
            v0: VertexSpec::At(v0),
            v1: VertexSpec::At(v1),
            tex_top,
            tex_middle,
            tex_bottom,
            flags,
        }
    }

    /// Continues from the previous line's `v1`.
    pub fn append(
        v1: Vec2,
        tex_top: Option<TextureId>,
        tex_middle: Option<TextureId>,
        tex_bottom: Option<TextureId>,
        flags: SideFlags,
    ) -> Self {
        Self {
            v0: VertexSpec::AppendPrev,
            v1: VertexSpec::At(v1),
            tex_top,
            tex_middle,
            tex_bottom,
            flags,
        }
    }

    /// Continues from the previous line's `v1` and closes the loop back
    /// to the batch's first vertex.
    pub fn finish(
        tex_top: Option<TextureId>,
        tex_middle: Option<TextureId>,
        tex_bottom: Option<TextureId>,
        flags: SideFlags,
    ) -> Self {
        Self {
            v0: VertexSpec::AppendPrev,
            v1: VertexSpec::FinishLoop,
            tex_top,
            tex_middle,
            tex_bottom,
            flags,
        }
    }
}

impl Level {
    /// Opens a new sector and pushes it onto the builder stack; it
    /// becomes the implicit target of subsequent `update_sector_lines`
    /// calls that don't name a sector explicitly.
    pub fn begin_sector(
        &mut self,
        floor_height: i32,
        ceiling_height: i32,
        brightness: f32,
        floor_tex: Option<TextureId>,
        ceiling_tex: Option<TextureId>,
    ) -> SectorId {
        let id = SectorId(self.sectors.len() as u32);
        self.sectors.push(crate::geom::Sector {
            linedefs: Vec::new(),
            floor_height,
            ceiling_height,
            floor_tex,
            ceiling_tex,
            brightness: brightness.clamp(0.0, 4.0),
        });
        self.open_sectors.push(id);
        id
    }

    /// Pops the open-sector stack.
    pub fn end_sector(&mut self) {
        self.open_sectors.pop();
    }

    /// Appends a batch of lines to `sector` (or the innermost open
    /// sector if `None`), deduplicating vertices, finding-or-creating
    /// linedefs, and configuring the calling sector's side.
    pub fn update_sector_lines(
        &mut self,
        sector: Option<SectorId>,
        lines: &[LineDto],
    ) -> Result<(), GeometryError> {
        let sector = match sector.or_else(|| self.open_sectors.last().copied()) {
            Some(s) => s,
            None => return Err(GeometryError::NoOpenSector),
        };

        let resolved = Self::resolve_batch(lines)?;
        let resolved = Self::normalize_winding(resolved);

        let mut linedef_ids = Vec::with_capacity(resolved.len());
        for (i, (p0, p1)) in resolved.iter().enumerate() {
            let dto = &lines[i];
            let v0 = self.get_or_insert_vertex(*p0);
            let v1 = self.get_or_insert_vertex(*p1);
            let (linedef_id, created) = self.find_or_create_linedef(v0, v1)?;
            let side_index = if created { 0 } else { 1 };

            {
                let ld = &mut self.linedefs[linedef_id.index()];
                let side = &mut ld.sides[side_index];
                side.sector = Some(sector);
                side.tex_top = dto.tex_top;
                side.tex_middle = dto.tex_middle;
                side.tex_bottom = dto.tex_bottom;
                side.flags = dto.flags;
                let segment_count = ld.segment_count();
                ld.sides[side_index].segments =
                    vec![crate::geom::Segment::default(); segment_count];

                let dir = ld.direction;
                let outward = Vec2::new(dir.y, -dir.x).normalize_or_zero();
                ld.sides[0].normal = outward;
                ld.sides[1].normal = -outward;

                // Transparency/double-sidedness is a property of the
                // opening, not of one side's author — propagate those
                // two bits onto the other side, on request.
                let shared = dto.flags
                    & (SideFlags::TRANSPARENT_MIDDLE | SideFlags::DOUBLE_SIDED);
                if !shared.is_empty() {
                    let other = 1 - side_index;
                    ld.sides[other].flags |= shared;
                }
            }

            self.refresh_one_linedef_limits(linedef_id);
            linedef_ids.push(linedef_id);
        }

        self.sectors[sector.index()].linedefs.extend(linedef_ids);
        Ok(())
    }

    /// First pass: turns sentinel-laden DTOs into concrete positions.
    fn resolve_batch(lines: &[LineDto]) -> Result<Vec<(Vec2, Vec2)>, GeometryError> {
        let mut out = Vec::with_capacity(lines.len());
        let mut prev_v1: Option<Vec2> = None;
        let mut batch_first_v0: Option<Vec2> = None;

        for dto in lines {
            let v0 = match dto.v0 {
                VertexSpec::At(p) => p,
                VertexSpec::AppendPrev => prev_v1.ok_or(GeometryError::DanglingAppend)?,
                VertexSpec::FinishLoop => return Err(GeometryError::DanglingAppend),
            };
            let v1 = match dto.v1 {
                VertexSpec::At(p) => p,
                VertexSpec::AppendPrev => return Err(GeometryError::DanglingAppend),
                VertexSpec::FinishLoop => batch_first_v0.ok_or(GeometryError::EmptyBatch)?,
            };
            if batch_first_v0.is_none() {
                batch_first_v0 = Some(v0);
            }
            prev_v1 = Some(v1);
            out.push((v0, v1));
        }
        Ok(out)
    }

    /// If the resolved batch is a closed loop wound counter-clockwise,
    /// flip it so side 0 always refers to the calling sector.
    fn normalize_winding(resolved: Vec<(Vec2, Vec2)>) -> Vec<(Vec2, Vec2)> {
        if resolved.is_empty() {
            return resolved;
        }
        let closed = resolved
            .first()
            .unwrap()
            .0
            .distance_squared(resolved.last().unwrap().1)
            <= crate::geom::VERTEX_MERGE_TOLERANCE * crate::geom::VERTEX_MERGE_TOLERANCE;
        if !closed {
            return resolved;
        }

        let signed_area: f32 = resolved
            .iter()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f32>()
            * 0.5;

        // Convention: clockwise (negative signed area, y-up screen/world
        // axes) for the calling sector's own loop.
        if signed_area > 0.0 {
            resolved.into_iter().rev().map(|(a, b)| (b, a)).collect()
        } else {
            resolved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(cw: bool) -> [LineDto; 4] {
        let (p0, p1, p2, p3) = if cw {
            (Vec2::new(0.0, 0.0), Vec2::new(400.0, 0.0), Vec2::new(400.0, 400.0), Vec2::new(0.0, 400.0))
        } else {
            (Vec2::new(0.0, 0.0), Vec2::new(0.0, 400.0), Vec2::new(400.0, 400.0), Vec2::new(400.0, 0.0))
        };
        [
            LineDto::new(p0, p1, None, Some(1), None, SideFlags::empty()),
            LineDto::append(p2, None, Some(1), None, SideFlags::empty()),
            LineDto::append(p3, None, Some(1), None, SideFlags::empty()),
            LineDto::finish(None, Some(1), None, SideFlags::empty()),
        ]
    }

    #[test]
    fn inserting_nearby_points_reuses_the_same_vertex() {
        let mut level = Level::new();
        let a = level.get_or_insert_vertex(Vec2::new(10.0, 10.0));
        let b = level.get_or_insert_vertex(Vec2::new(10.5, 10.0));
        assert_eq!(a, b);
        assert_eq!(level.vertex_count(), 1);
    }

    #[test]
    fn shared_edge_between_two_sectors_is_one_linedef_with_both_sides_configured() {
        let mut level = Level::new();
        let outer = level.begin_sector(0, 144, 1.0, Some(1), Some(1));
        level
            .update_sector_lines(Some(outer), &square(true))
            .unwrap();
        level.end_sector();

        let v0 = level.get_or_insert_vertex(Vec2::new(0.0, 0.0));
        let v1 = level.get_or_insert_vertex(Vec2::new(400.0, 0.0));
        let shared = level.find_linedef(v0, v1).unwrap();

        let inner = level.begin_sector(32, 128, 1.0, Some(1), Some(1));
        level
            .update_sector_lines(
                Some(inner),
                &[LineDto::new(Vec2::new(400.0, 0.0), Vec2::new(0.0, 0.0), None, Some(1), None, SideFlags::empty())],
            )
            .unwrap();
        level.end_sector();

        let ld = level.linedef(shared);
        assert!(ld.sides[0].is_configured() && ld.sides[1].is_configured());
        assert_eq!(ld.sides[0].sector, Some(outer));
        assert_eq!(ld.sides[1].sector, Some(inner));
    }

    #[test]
    fn clockwise_and_counter_clockwise_authoring_assign_the_same_side() {
        let mut cw = Level::new();
        let s_cw = cw.begin_sector(0, 144, 1.0, Some(1), Some(1));
        cw.update_sector_lines(Some(s_cw), &square(true)).unwrap();
        cw.end_sector();

        let mut ccw = Level::new();
        let s_ccw = ccw.begin_sector(0, 144, 1.0, Some(1), Some(1));
        ccw.update_sector_lines(Some(s_ccw), &square(false)).unwrap();
        ccw.end_sector();

        for ld in cw.linedefs() {
            assert_eq!(ld.sides[0].sector, Some(s_cw));
        }
        for ld in ccw.linedefs() {
            assert_eq!(ld.sides[0].sector, Some(s_ccw));
        }
    }

    #[test]
    fn height_mutation_refreshes_linedef_limits_on_both_sides() {
        let mut level = Level::new();
        let outer = level.begin_sector(0, 144, 1.0, Some(1), Some(1));
        level.update_sector_lines(Some(outer), &square(true)).unwrap();
        level.end_sector();

        let v0 = level.get_or_insert_vertex(Vec2::new(0.0, 0.0));
        let v1 = level.get_or_insert_vertex(Vec2::new(400.0, 0.0));
        let shared = level.find_linedef(v0, v1).unwrap();

        let inner = level.begin_sector(32, 128, 1.0, Some(1), Some(1));
        level
            .update_sector_lines(
                Some(inner),
                &[LineDto::new(Vec2::new(400.0, 0.0), Vec2::new(0.0, 0.0), None, Some(1), None, SideFlags::empty())],
            )
            .unwrap();
        level.end_sector();

        level.set_sector_heights(inner, 16, 100);
        let ld = level.linedef(shared);
        assert_eq!(ld.max_floor_height, 16);
        assert_eq!(ld.min_ceiling_height, 100);
    }

    #[test]
    fn closing_a_sector_to_zero_headroom_makes_it_behave_as_a_solid() {
        let mut level = Level::new();
        let outer = level.begin_sector(0, 144, 1.0, Some(1), Some(1));
        level.update_sector_lines(Some(outer), &square(true)).unwrap();
        level.end_sector();

        let inner = level.begin_sector(0, 0, 1.0, Some(1), Some(1));
        level
            .update_sector_lines(
                Some(inner),
                &[LineDto::new(Vec2::new(400.0, 0.0), Vec2::new(0.0, 0.0), None, Some(1), None, SideFlags::empty())],
            )
            .unwrap();
        level.end_sector();

        assert!(level.sector(inner).is_closed());
        assert!(!level.sector(inner).has_headroom());
    }

    #[test]
    fn moving_a_light_out_of_a_cells_reach_removes_it_after_update() {
        let mut level = Level::new();
        let outer = level.begin_sector(0, 144, 1.0, Some(1), Some(1));
        level.update_sector_lines(Some(outer), &square(true)).unwrap();
        level.end_sector();
        level.build_cache(64.0);

        let light = level
            .add_light(glam::Vec3::new(20.0, 20.0, 64.0), 32.0, 2.0)
            .unwrap();
        let near_cell = level.cache.cell_at(Vec2::new(20.0, 20.0)).unwrap();
        assert!(near_cell.lights.contains(&light));

        level.move_light(light, glam::Vec3::new(380.0, 380.0, 64.0));
        let old_cell = level.cache.cell_at(Vec2::new(20.0, 20.0)).unwrap();
        assert!(!old_cell.lights.contains(&light));
    }
}
