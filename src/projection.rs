//! Per-frame screen-space constants shared by the tracer (which needs
//! `cz_local`/`fz_local` per intersection) and the column renderer
//! (which needs the same `unit_size`/`half_h` to paint floors, ceilings
//! and sub-wall slices).

use crate::camera::Camera;

/// Derived once per `draw()` call, not per column.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    pub half_w: f32,
    /// Half the buffer height, already offset by the camera's pitch so
    /// no per-intersection pitch arithmetic is needed.
    pub half_h: f32,
    /// `half_w / fov`: world-unit-to-pixel scale at unit planar distance.
    pub unit_size: f32,
}

impl Projection {
    pub fn new(camera: &Camera, width: usize, height: usize) -> Self {
        let half_w = width as f32 * 0.5;
        let raw_half_h = height as f32 * 0.5;
        let pitch_offset = (camera.pitch * raw_half_h).floor();
        Self {
            half_w,
            half_h: raw_half_h + pitch_offset,
            unit_size: half_w / camera.fov,
        }
    }
}
