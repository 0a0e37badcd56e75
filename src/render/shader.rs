//! Shading kernels and distance dimming.

use glam::Vec3;
use smallvec::SmallVec;

use crate::config::{Config, LightSteps, PixelFormat};
use crate::geom::{LightId, Sector, MAX_LIGHTS_PER_SURFACE};
use crate::level::cache::MAX_LIGHTS_PER_CELL;
use crate::level::Level;

const VERTICAL_FADE_DIST: f32 = 2.5;

/// Rounds `v` down to a dimming-step band and subtracts `steps` bands
/// (stepped mode), or subtracts `falloff` directly (continuous mode);
/// both clamp at zero.
fn dim(v: f32, config: &Config, steps: u32, falloff: f32) -> f32 {
    match config.light_steps {
        LightSteps::Stepped(n) if n > 0 => {
            let inv_n = 1.0 / n as f32;
            let quantized = (v * n as f32).floor() * inv_n;
            (quantized - steps as f32 * inv_n).max(0.0)
        }
        _ => (v - falloff).max(0.0),
    }
}

/// Unlit surfaces: just the sector base plus the level-wide offset,
/// dimmed by distance.
pub fn basic_brightness(level: &Level, sector: &Sector, config: &Config, steps: u32, falloff: f32) -> f32 {
    dim(sector.brightness + level.global_brightness, config, steps, falloff)
}

/// Walls: sector base, raised to the brightest contributing light,
/// without the vertical-proximity fade floors/ceilings get.
pub fn vertical_surface_light(
    level: &Level,
    sector: &Sector,
    pos: Vec3,
    lights: &SmallVec<[LightId; MAX_LIGHTS_PER_SURFACE]>,
    dynamic_shadows: bool,
    config: &Config,
    steps: u32,
    falloff: f32,
) -> f32 {
    let mut v = sector.brightness;
    for &id in lights {
        let lt = level.light(id);
        let dsq = pos.distance_squared(lt.pos);
        if dsq > lt.radius_sq {
            continue;
        }
        let contribution = lt.strength * (1.0 - dsq * lt.inv_radius_sq);
        if !dynamic_shadows || !level.cache.intersect_3d(level, pos, lt.pos) {
            v = v.max(contribution);
        }
    }
    dim(v, config, steps, falloff)
}

/// Floors/ceilings: like [`vertical_surface_light`], but a light also
/// fades out as the surface moves away from the light's height.
pub fn horizontal_surface_light(
    level: &Level,
    sector: &Sector,
    pos: Vec3,
    is_floor: bool,
    lights: &SmallVec<[LightId; MAX_LIGHTS_PER_CELL]>,
    dynamic_shadows: bool,
    config: &Config,
    steps: u32,
    falloff: f32,
) -> f32 {
    let mut v = sector.brightness;
    for &id in lights {
        let lt = level.light(id);
        let dz = if is_floor {
            lt.pos.z - sector.floor_height as f32
        } else {
            sector.ceiling_height as f32 - lt.pos.z
        };
        if dz < 0.0 {
            continue;
        }
        let dsq = pos.distance_squared(lt.pos);
        if dsq > lt.radius_sq {
            continue;
        }
        let contribution = lt.strength * (dz / VERTICAL_FADE_DIST).min(1.0) * (1.0 - dsq * lt.inv_radius_sq);
        if !dynamic_shadows || !level.cache.intersect_3d(level, pos, lt.pos) {
            v = v.max(contribution);
        }
    }
    dim(v, config, steps, falloff)
}

/// Packs a texel and a brightness scalar into the configured pixel
/// format: `ARGB(255, min(255, r·L), min(255, g·L), min(255, b·L))`.
#[inline]
pub fn pack_pixel(r: u8, g: u8, b: u8, light: f32, format: PixelFormat) -> u32 {
    let r = ((r as f32 * light).min(255.0)) as u32;
    let g = ((g as f32 * light).min(255.0)) as u32;
    let b = ((b as f32 * light).min(255.0)) as u32;
    match format {
        PixelFormat::Argb8888 => 0xFF00_0000 | (r << 16) | (g << 8) | b,
        PixelFormat::Abgr8888 => 0xFF00_0000 | (b << 16) | (g << 8) | r,
    }
}
