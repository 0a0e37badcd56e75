use bitflags::bitflags;
use glam::Vec2;
use smallvec::SmallVec;

use crate::geom::aabb::Aabb;
use crate::geom::handles::{LightId, SectorId, VertexId};

/// Opaque handle into whatever texture atlas the host maintains. The
/// renderer never decodes pixels itself — it only carries ids through
/// to the sampler capability.
pub type TextureId = u32;

/// Length, in world units, of one linedef segment. Segments are the
/// granularity dynamic lights attach to.
pub const SEGMENT_LENGTH: f32 = 128.0;

/// Hard cap on lights attached to a single segment.
pub const MAX_LIGHTS_PER_SURFACE: usize = 4;

bitflags! {
    /// Per-side behaviour flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SideFlags: u8 {
        /// The middle texture is masked; does not fully occlude.
        const TRANSPARENT_MIDDLE = 0b0000_0001;
        /// The transparent middle texture paints from both sides.
        const DOUBLE_SIDED       = 0b0000_0010;
        /// Vertical texture anchor pins to the top edge.
        const PIN_TOP            = 0b0000_0100;
        /// Vertical texture anchor pins to the bottom edge.
        const PIN_BOTTOM         = 0b0000_1000;
        /// This side reflects; ray recursion triggers on contact.
        const MIRROR             = 0b0001_0000;
        /// Non-occluding decorative linedef (e.g. billboard).
        const STATIC_DETAIL      = 0b0010_0000;
    }
}

/// A uniform ~128-unit piece of a linedef side; the unit of dynamic
/// light attachment.
#[derive(Clone, Debug, Default)]
pub struct Segment {
    pub lights: SmallVec<[LightId; MAX_LIGHTS_PER_SURFACE]>,
}

impl Segment {
    /// Attaches `light`, ignoring duplicates and silently dropping the
    /// light if the segment is already at `MAX_LIGHTS_PER_SURFACE`.
    pub fn attach(&mut self, light: LightId) {
        if self.lights.contains(&light) {
            return;
        }
        if self.lights.len() >= MAX_LIGHTS_PER_SURFACE {
            log::warn!("segment light list full, dropping light {:?}", light);
            return;
        }
        self.lights.push(light);
    }
}

/// One face of a linedef. Side 1 is absent (`sector: None`) for a
/// world-edge wall.
#[derive(Clone, Debug, Default)]
pub struct Side {
    pub sector: Option<SectorId>,
    pub tex_top: Option<TextureId>,
    pub tex_middle: Option<TextureId>,
    pub tex_bottom: Option<TextureId>,
    pub flags: SideFlags,
    /// Outward-facing unit normal, recomputed whenever the owning
    /// linedef's direction is known.
    pub normal: Vec2,
    pub segments: Vec<Segment>,
}

impl Side {
    pub fn is_configured(&self) -> bool {
        self.sector.is_some()
    }
}

/// An undirected segment between two vertices with up to two sides. A
/// linedef is a **portal** iff both sides have a sector; otherwise it's
/// a solid wall.
#[derive(Clone, Debug)]
pub struct Linedef {
    pub v0: VertexId,
    pub v1: VertexId,
    pub sides: [Side; 2],
    /// `v1.pos - v0.pos`, precomputed.
    pub direction: Vec2,
    pub length: f32,
    pub aabb: Aabb,
    /// `max(side0.sector.floor_height, side1.sector.floor_height)`.
    pub max_floor_height: i32,
    /// `min(side0.sector.ceiling_height, side1.sector.ceiling_height)`.
    pub min_ceiling_height: i32,
}

impl Linedef {
    pub fn is_portal(&self) -> bool {
        self.sides[0].sector.is_some() && self.sides[1].sector.is_some()
    }

    /// Which side index belongs to `sector`, if either does.
    pub fn side_for_sector(&self, sector: SectorId) -> Option<usize> {
        if self.sides[0].sector == Some(sector) {
            Some(0)
        } else if self.sides[1].sector == Some(sector) {
            Some(1)
        } else {
            None
        }
    }

    pub fn segment_count(&self) -> usize {
        (self.length / SEGMENT_LENGTH).ceil().max(1.0) as usize
    }
}
