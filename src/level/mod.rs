//! The level: owns every primitive, builds the portal graph implicitly
//! through shared linedef sides, and hosts lights.
//!
//! Geometry and cache are built once and are immutable thereafter except
//! for two mutation paths: sector height edits (which must be followed
//! by [`Level::refresh_linedef_limits`]) and light moves (which must be
//! followed by [`Level::update_lights`]).

pub mod builder;
pub mod cache;
pub mod lights;

use std::collections::HashMap;

use glam::Vec2;

use crate::error::GeometryError;
use crate::geom::{
    Aabb, LightId, Linedef, LinedefId, Sector, SectorId, Side, TextureId, Vertex, VertexId,
};
use crate::level::cache::MapCache;
use crate::level::lights::{Light, MAX_LIGHTS_PER_LEVEL};

/// Owns every geometric primitive, the portal connectivity implied by
/// shared linedef sides, the dynamic lights, and the spatial cache that
/// accelerates queries against both.
pub struct Level {
    vertices: Vec<Vertex>,
    linedefs: Vec<Linedef>,
    sectors: Vec<Sector>,
    lights: Vec<Light>,

    /// Unordered-vertex-pair → linedef, for O(1) `find_linedef`/reuse
    /// during authoring.
    linedef_index: HashMap<(u32, u32), LinedefId>,

    /// Explicit open-sector stack for the builder state machine, in
    /// place of a module-level "current sector" global.
    open_sectors: Vec<SectorId>,

    pub cache: MapCache,
    pub bounds: Aabb,

    /// Level-wide brightness offset folded into every shading kernel.
    pub global_brightness: f32,

    /// Gates `update_lights`'s attachment test. Per-pixel occlusion
    /// itself is a render concern (`render::Config`); whether a light
    /// is even a candidate for a segment is decided here at attach
    /// time.
    pub dynamic_shadows: bool,

    /// The level-wide sky texture sampled for any sector whose
    /// `ceiling_tex` is `None`.
    pub sky_texture: Option<TextureId>,
}

impl Level {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            linedefs: Vec::new(),
            sectors: Vec::new(),
            lights: Vec::new(),
            linedef_index: HashMap::new(),
            open_sectors: Vec::new(),
            cache: MapCache::empty(),
            bounds: Aabb::empty(),
            global_brightness: 0.0,
            dynamic_shadows: false,
            sky_texture: None,
        }
    }

    pub fn sky_texture(&self) -> Option<TextureId> {
        self.sky_texture
    }

    /*──────────────────────────── accessors ───────────────────────────*/

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    pub fn linedef(&self, id: LinedefId) -> &Linedef {
        &self.linedefs[id.index()]
    }

    pub fn sector(&self, id: SectorId) -> &Sector {
        &self.sectors[id.index()]
    }

    pub fn light(&self, id: LightId) -> &Light {
        &self.lights[id.index()]
    }

    pub fn linedefs(&self) -> &[Linedef] {
        &self.linedefs
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /*────────────────────────── vertex dedup ──────────────────────────*/

    /// Inserts `p`, reusing an existing vertex within
    /// [`crate::geom::VERTEX_MERGE_TOLERANCE`] world units.
    pub fn get_or_insert_vertex(&mut self, p: Vec2) -> VertexId {
        for (i, v) in self.vertices.iter().enumerate() {
            if v.matches(p) {
                return VertexId(i as u32);
            }
        }
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex { pos: p });
        self.bounds.extend(p);
        id
    }

    /*───────────────────────── linedef lookup ─────────────────────────*/

    fn linedef_key(a: VertexId, b: VertexId) -> (u32, u32) {
        if a.0 <= b.0 {
            (a.0, b.0)
        } else {
            (b.0, a.0)
        }
    }

    /// Unordered endpoint lookup.
    pub fn find_linedef(&self, v0: VertexId, v1: VertexId) -> Option<LinedefId> {
        self.linedef_index
            .get(&Self::linedef_key(v0, v1))
            .copied()
    }

    /// Finds-or-creates the linedef between `v0` and `v1`, returning
    /// whether it was freshly created alongside its id.
    pub(crate) fn find_or_create_linedef(
        &mut self,
        v0: VertexId,
        v1: VertexId,
    ) -> Result<(LinedefId, bool), GeometryError> {
        if v0 == v1 {
            return Err(GeometryError::DegenerateLinedef);
        }
        let key = Self::linedef_key(v0, v1);
        if let Some(&id) = self.linedef_index.get(&key) {
            return Ok((id, false));
        }

        let p0 = self.vertex(v0).pos;
        let p1 = self.vertex(v1).pos;
        let direction = p1 - p0;
        let length = direction.length();
        let id = LinedefId(self.linedefs.len() as u32);
        self.linedefs.push(Linedef {
            v0,
            v1,
            sides: [Side::default(), Side::default()],
            direction,
            length,
            aabb: Aabb::of_points(p0, p1),
            max_floor_height: i32::MIN,
            min_ceiling_height: i32::MAX,
        });
        self.linedef_index.insert(key, id);
        Ok((id, true))
    }

    /// Sets a linedef's middle texture on the given side.
    pub fn set_middle_texture(&mut self, linedef: LinedefId, side: usize, tex: TextureId) {
        self.linedefs[linedef.index()].sides[side].tex_middle = Some(tex);
    }

    /*──────────────────────── height mutation ─────────────────────────*/

    /// Mutates a sector's floor/ceiling height and refreshes the
    /// `max_floor_height`/`min_ceiling_height` cache on every linedef
    /// bounding it.
    pub fn set_sector_heights(&mut self, sector: SectorId, floor: i32, ceiling: i32) {
        {
            let s = &mut self.sectors[sector.index()];
            s.floor_height = floor;
            s.ceiling_height = ceiling;
        }
        self.refresh_linedef_limits(sector);
    }

    /// Recomputes `max_floor_height`/`min_ceiling_height` for every
    /// linedef bounding `sector`, reading both adjacent sectors'
    /// current heights.
    pub fn refresh_linedef_limits(&mut self, sector: SectorId) {
        let linedef_ids = self.sectors[sector.index()].linedefs.clone();
        for id in linedef_ids {
            self.refresh_one_linedef_limits(id);
        }
    }

    fn refresh_one_linedef_limits(&mut self, id: LinedefId) {
        let ld = &self.linedefs[id.index()];
        let mut max_floor = i32::MIN;
        let mut min_ceiling = i32::MAX;
        for side in &ld.sides {
            if let Some(sec) = side.sector {
                let sec = &self.sectors[sec.index()];
                max_floor = max_floor.max(sec.floor_height);
                min_ceiling = min_ceiling.min(sec.ceiling_height);
            }
        }
        let ld = &mut self.linedefs[id.index()];
        ld.max_floor_height = max_floor;
        ld.min_ceiling_height = min_ceiling;
    }

    /*──────────────────────────── lights ───────────────────────────────*/

    /// Adds a point light, bounded to `MAX_LIGHTS_PER_LEVEL`. Returns
    /// `None` on overflow rather than erroring — the level is
    /// malformed, not the call.
    pub fn add_light(&mut self, pos: glam::Vec3, radius: f32, strength: f32) -> Option<LightId> {
        if self.lights.len() >= MAX_LIGHTS_PER_LEVEL {
            log::warn!("level already has {MAX_LIGHTS_PER_LEVEL} lights, dropping new light");
            return None;
        }
        let id = LightId(self.lights.len() as u32);
        self.lights.push(Light::new(pos, radius, strength));
        self.update_lights();
        Some(id)
    }

    /// Moves an existing light and re-attaches it, rewriting its
    /// segment/cell attachments via `update_lights`.
    pub fn move_light(&mut self, light: LightId, pos: glam::Vec3) {
        self.lights[light.index()].pos = pos;
        self.update_lights();
    }

    /// Rebuilds the map cache from the level's current linedefs and
    /// lights. Must be called once after authoring finishes and before
    /// the first `draw`.
    pub fn build_cache(&mut self, cell_size: f32) {
        self.cache = MapCache::build(self, cell_size);
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::new()
    }
}
