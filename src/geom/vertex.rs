use glam::Vec2;

/// Two vertices within this distance are considered the same point. The
/// level deduplicates on insert using this tolerance.
pub const VERTEX_MERGE_TOLERANCE: f32 = 1.0;
const VERTEX_MERGE_TOLERANCE_SQ: f32 = VERTEX_MERGE_TOLERANCE * VERTEX_MERGE_TOLERANCE;

/// A 2-D point with identity, owned by the level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub pos: Vec2,
}

impl Vertex {
    #[inline]
    pub fn matches(&self, p: Vec2) -> bool {
        self.pos.distance_squared(p) <= VERTEX_MERGE_TOLERANCE_SQ
    }
}
