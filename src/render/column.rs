//! Column renderer: consumes one column's intersection list and paints
//! it into that column's pixel buffer.
//!
//! Each screen column is rendered into its own contiguous `Vec<u32>`
//! rather than a row-major stride, so columns are genuinely disjoint
//! `&mut` slices a safe `rayon` fan-out can hand out without unsafe
//! pointer arithmetic (see `render::Renderer` for the transpose back
//! into the host-visible row-major frame buffer).

use glam::Vec3;
use smallvec::SmallVec;

use crate::camera::Camera;
use crate::config::{Config, LightSteps};
use crate::geom::{Sector, SideFlags, TextureId};
use crate::level::Level;
use crate::projection::Projection;
use crate::render::sampler::TextureSampler;
use crate::render::shader::{basic_brightness, horizontal_surface_light, pack_pixel, vertical_surface_light};
use crate::trace::{trace_column, HitKind, Intersection, DIMMING_DISTANCE, MAX_LINE_HITS_PER_COLUMN};

/// Per-pixel step/falloff pair for floor and ceiling plane casts, which
/// (unlike a wall hit) need a fresh distance-to-steps conversion every
/// row rather than the one `Intersection` carries.
fn plane_dimming(config: &Config, distance: f32) -> (u32, f32) {
    match config.light_steps {
        LightSteps::Stepped(n) if n > 0 => ((distance * n as f32 / DIMMING_DISTANCE) as u32, 0.0),
        _ => (0, distance / DIMMING_DISTANCE),
    }
}

struct DeferredOverpaint {
    hit: Intersection,
    top: f32,
    bottom: f32,
}

/// Renders screen column `x` into `out` (length `height`). `out` is
/// pre-filled with opaque black by the caller so an exhausted
/// intersection list or a fully-collapsed draw region needs no extra
/// work.
#[allow(clippy::too_many_arguments)]
pub fn render_column(
    level: &Level,
    camera: &Camera,
    proj: &Projection,
    config: &Config,
    sampler: &dyn TextureSampler,
    depth_table: &[f32],
    x: usize,
    width: usize,
    height: usize,
    out: &mut [u32],
) {
    let hits = trace_column(level, camera, proj, config, x, width);

    let mut top_limit = 0.0f32;
    let mut bottom_limit = height as f32;
    let mut overpaints: SmallVec<[DeferredOverpaint; MAX_LINE_HITS_PER_COLUMN]> = SmallVec::new();

    let mut idx = 0;
    while idx < hits.len() {
        let hit = hits[idx];
        let has_next = idx + 1 < hits.len();

        match hit.kind {
            HitKind::Full => {
                draw_full_wall(level, camera.z, proj, config, sampler, depth_table, &hit, top_limit, bottom_limit, out);
                break;
            }
            HitKind::Mirror => {
                let (new_top, new_bottom) = draw_mirror_backdrop(level, camera.z, proj, config, sampler, depth_table, &hit, top_limit, bottom_limit, out);
                overpaints.push(DeferredOverpaint { hit, top: new_top, bottom: new_bottom });
                top_limit = new_top;
                bottom_limit = new_bottom;
                if (top_limit as i32) == (bottom_limit as i32) {
                    break;
                }
            }
            HitKind::Portal => {
                if !has_next {
                    draw_full_wall(level, camera.z, proj, config, sampler, depth_table, &hit, top_limit, bottom_limit, out);
                    break;
                }
                let (new_top, new_bottom, finished) =
                    draw_segmented_wall(level, camera.z, proj, config, sampler, depth_table, &hit, top_limit, bottom_limit, out);
                let ld = level.linedef(hit.linedef);
                if ld.sides[hit.side as usize].tex_middle.is_some() {
                    overpaints.push(DeferredOverpaint { hit, top: new_top, bottom: new_bottom });
                }
                top_limit = new_top;
                bottom_limit = new_bottom;
                if finished {
                    break;
                }
            }
        }
        idx += 1;
    }

    // Transparent middle textures overpaint back-to-front: the deepest
    // mirror bounce was drawn first above, so unwind in reverse.
    for overpaint in overpaints.iter().rev() {
        let ld = level.linedef(overpaint.hit.linedef);
        let side = &ld.sides[overpaint.hit.side as usize];
        if let Some(tex) = side.tex_middle {
            let texture_start_y = overpaint.top - proj.half_h - overpaint.hit.vz_scaled;
            draw_wall_segment(
                level,
                config,
                sampler,
                &overpaint.hit,
                side,
                ld,
                tex,
                overpaint.top,
                overpaint.bottom,
                texture_start_y,
                proj,
                out,
            );
        }
    }
}

fn draw_full_wall(
    level: &Level,
    eye_z: f32,
    proj: &Projection,
    config: &Config,
    sampler: &dyn TextureSampler,
    depth_table: &[f32],
    hit: &Intersection,
    top_limit: f32,
    bottom_limit: f32,
    out: &mut [u32],
) {
    let ld = level.linedef(hit.linedef);
    let side = &ld.sides[hit.side as usize];
    let front = level.sector(hit.front);

    let sy = hit.cz_local.max(top_limit).ceil();
    let ey = hit.fz_local.clamp(top_limit, bottom_limit);

    if let Some(tex) = side.tex_middle {
        let texture_start_y = sy - proj.half_h - hit.vz_scaled;
        draw_wall_segment(level, config, sampler, hit, side, ld, tex, sy, ey, texture_start_y, proj, out);
    }

    draw_ceiling_or_sky(level, eye_z, proj, config, sampler, depth_table, hit, front, top_limit, sy.min(bottom_limit), out);
    draw_floor_segment(level, eye_z, proj, config, sampler, depth_table, hit, front, ey, bottom_limit, out);
}

/// Returns `(new_top_limit, new_bottom_limit, finished)`.
#[allow(clippy::too_many_arguments)]
fn draw_segmented_wall(
    level: &Level,
    eye_z: f32,
    proj: &Projection,
    config: &Config,
    sampler: &dyn TextureSampler,
    depth_table: &[f32],
    hit: &Intersection,
    top_limit: f32,
    bottom_limit: f32,
    out: &mut [u32],
) -> (f32, f32, bool) {
    let ld = level.linedef(hit.linedef);
    let side = &ld.sides[hit.side as usize];
    let front = level.sector(hit.front);
    let back_id = hit.back.expect("segmented wall always has a back sector");
    let back = level.sector(back_id);

    let top_h = (front.ceiling_height - back.ceiling_height) as f32 * hit.depth_scale;
    let bottom_h = (back.floor_height - front.floor_height) as f32 * hit.depth_scale;

    let ts_y = hit.cz_local.clamp(top_limit, bottom_limit).ceil();
    let te_y = (hit.cz_local + top_h).clamp(top_limit, bottom_limit).ceil();
    let be_y = hit.fz_local.clamp(top_limit, bottom_limit);
    let bs_y = (hit.fz_local - bottom_h).clamp(top_limit, bottom_limit);

    let back_has_sky = back.is_sky_ceiling();

    let mut new_top = top_limit;
    let mut new_bottom = bottom_limit;

    if !back_has_sky {
        if top_h > 0.0 {
            if let Some(tex) = side.tex_top {
                let texture_start_y = if side.flags.contains(SideFlags::PIN_BOTTOM) {
                    ts_y - top_h - proj.half_h - hit.vz_scaled
                } else {
                    ts_y - proj.half_h - hit.vz_scaled
                };
                draw_wall_segment(level, config, sampler, hit, side, ld, tex, ts_y, te_y, texture_start_y, proj, out);
            }
            new_top = te_y;
        } else {
            new_top = ts_y;
        }
    }

    if bottom_h > 0.0 {
        if let Some(tex) = side.tex_bottom {
            let texture_start_y = if side.flags.contains(SideFlags::PIN_BOTTOM) {
                bs_y + bottom_h - proj.half_h - hit.vz_scaled
            } else {
                bs_y - proj.half_h - hit.vz_scaled
            };
            draw_wall_segment(level, config, sampler, hit, side, ld, tex, bs_y, be_y, texture_start_y, proj, out);
        }
        new_bottom = bs_y;
    } else {
        new_bottom = be_y;
    }

    if !front.is_sky_ceiling() {
        draw_ceiling_segment(level, eye_z, proj, config, sampler, depth_table, hit, front, top_limit, ts_y, out);
        if back_has_sky {
            new_top = ts_y;
        }
    } else {
        draw_sky_segment(proj, sampler, hit, top_limit.max(top_limit), ts_y.max(top_limit), out, level.sky_texture());
    }

    draw_floor_segment(level, eye_z, proj, config, sampler, depth_table, hit, front, be_y, bottom_limit, out);

    let collapsed = new_top as i32 == new_bottom as i32 || back.is_closed();
    (new_top, new_bottom, collapsed)
}

fn draw_mirror_backdrop(
    level: &Level,
    eye_z: f32,
    proj: &Projection,
    config: &Config,
    sampler: &dyn TextureSampler,
    depth_table: &[f32],
    hit: &Intersection,
    top_limit: f32,
    bottom_limit: f32,
    out: &mut [u32],
) -> (f32, f32) {
    let front = level.sector(hit.front);
    let sy = hit.cz_local.max(top_limit).ceil();
    let ey = hit.fz_local.clamp(top_limit, bottom_limit);

    draw_ceiling_or_sky(level, eye_z, proj, config, sampler, depth_table, hit, front, top_limit, sy.min(bottom_limit), out);
    draw_floor_segment(level, eye_z, proj, config, sampler, depth_table, hit, front, ey, bottom_limit, out);

    (sy, ey)
}

fn draw_ceiling_or_sky(
    level: &Level,
    eye_z: f32,
    proj: &Projection,
    config: &Config,
    sampler: &dyn TextureSampler,
    depth_table: &[f32],
    hit: &Intersection,
    front: &Sector,
    from: f32,
    to: f32,
    out: &mut [u32],
) {
    if front.is_sky_ceiling() {
        draw_sky_segment(proj, sampler, hit, from, to, out, level.sky_texture());
    } else {
        draw_ceiling_segment(level, eye_z, proj, config, sampler, depth_table, hit, front, from, to, out);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_wall_segment(
    level: &Level,
    config: &Config,
    sampler: &dyn TextureSampler,
    hit: &Intersection,
    side: &crate::geom::Side,
    ld: &crate::geom::Linedef,
    texture: TextureId,
    from: f32,
    to: f32,
    texture_start_y: f32,
    proj: &Projection,
    out: &mut [u32],
) {
    let (from, to) = (from.max(0.0) as usize, to.max(0.0) as usize);
    if from >= to || to > out.len() {
        return;
    }

    let texture_step = hit.planar_distance / proj.unit_size;
    let texture_x = hit.u * ld.length;
    let segment_count = ld.segment_count();
    let segment_idx = (((segment_count.saturating_sub(1)) as f32 * hit.u).floor() as usize).min(segment_count.saturating_sub(1));
    let seg_lights = &side.segments[segment_idx].lights;

    let base_light = seg_lights
        .is_empty()
        .then(|| basic_brightness(level, level.sector(hit.front), config, hit.distance_steps, hit.light_falloff));

    let mut texture_y = texture_start_y * texture_step;
    for y in from..to {
        let texel = sampler.sample_scaled(texture, texture_x, texture_y, 1 + hit.distance_steps);
        if texel.is_visible() {
            let light = base_light.unwrap_or_else(|| {
                let pos = Vec3::new(hit.point.x, hit.point.y, -texture_y);
                vertical_surface_light(
                    level,
                    level.sector(hit.front),
                    pos,
                    seg_lights,
                    config.dynamic_shadows,
                    config,
                    hit.distance_steps,
                    hit.light_falloff,
                )
            });
            out[y] = pack_pixel(texel.r, texel.g, texel.b, light, config.pixel_format);
        }
        texture_y += texture_step;
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_floor_segment(
    level: &Level,
    eye_z: f32,
    proj: &Projection,
    config: &Config,
    sampler: &dyn TextureSampler,
    depth_table: &[f32],
    hit: &Intersection,
    front: &Sector,
    from: f32,
    to: f32,
    out: &mut [u32],
) {
    let Some(tex) = front.floor_tex else { return };
    if eye_z < front.floor_height as f32 {
        return;
    }
    let (from, to) = (from.max(0.0) as usize, to.max(0.0) as usize);
    if from >= to || to > out.len() {
        return;
    }

    let distance_from_view = (eye_z - front.floor_height as f32) * proj.unit_size;
    let half_h = proj.half_h as usize;

    for y in from..to {
        let row_delta = y.saturating_sub(half_h);
        let depth = depth_table.get(row_delta).copied().unwrap_or(0.0);
        let distance = distance_from_view * depth;
        let weight = (distance * hit.point_distance_inv).min(1.0);
        let wx = weight * hit.point.x + (1.0 - weight) * hit.origin.x;
        let wy = weight * hit.point.y + (1.0 - weight) * hit.origin.y;

        let world_pos = glam::Vec2::new(wx, wy);
        let cell = level.cache.cell_at(world_pos);
        let lights = cell.map(|c| &c.lights);

        let (steps, falloff) = plane_dimming(config, distance);
        let texel = sampler.sample_scaled(tex, wx, wy, 1 + steps);

        let light = match lights {
            Some(l) if !l.is_empty() => horizontal_surface_light(
                level,
                front,
                Vec3::new(wx, wy, front.floor_height as f32),
                true,
                l,
                config.dynamic_shadows,
                config,
                steps,
                falloff,
            ),
            _ => basic_brightness(level, front, config, steps, falloff),
        };

        out[y] = pack_pixel(texel.r, texel.g, texel.b, light, config.pixel_format);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_ceiling_segment(
    level: &Level,
    eye_z: f32,
    proj: &Projection,
    config: &Config,
    sampler: &dyn TextureSampler,
    depth_table: &[f32],
    hit: &Intersection,
    front: &Sector,
    from: f32,
    to: f32,
    out: &mut [u32],
) {
    let Some(tex) = front.ceiling_tex else { return };
    if eye_z > front.ceiling_height as f32 {
        return;
    }
    let (from, to) = (from.max(0.0) as usize, to.max(0.0) as usize);
    if from >= to || to > out.len() {
        return;
    }

    let distance_from_view = (front.ceiling_height as f32 - eye_z) * proj.unit_size;
    let half_h = proj.half_h as usize;

    for y in from..to {
        let row_delta = half_h.saturating_sub(y + 1);
        let depth = depth_table.get(row_delta).copied().unwrap_or(0.0);
        let distance = distance_from_view * depth;
        let weight = (distance * hit.point_distance_inv).min(1.0);
        let wx = weight * hit.point.x + (1.0 - weight) * hit.origin.x;
        let wy = weight * hit.point.y + (1.0 - weight) * hit.origin.y;

        let world_pos = glam::Vec2::new(wx, wy);
        let cell = level.cache.cell_at(world_pos);
        let lights = cell.map(|c| &c.lights);

        let (steps, falloff) = plane_dimming(config, distance);
        let texel = sampler.sample_scaled(tex, wx, wy, 1 + steps);

        let light = match lights {
            Some(l) if !l.is_empty() => horizontal_surface_light(
                level,
                front,
                Vec3::new(wx, wy, front.ceiling_height as f32),
                false,
                l,
                config.dynamic_shadows,
                config,
                steps,
                falloff,
            ),
            _ => basic_brightness(level, front, config, steps, falloff),
        };

        out[y] = pack_pixel(texel.r, texel.g, texel.b, light, config.pixel_format);
    }
}

fn draw_sky_segment(
    proj: &Projection,
    sampler: &dyn TextureSampler,
    hit: &Intersection,
    from: f32,
    to: f32,
    out: &mut [u32],
    sky_texture: Option<TextureId>,
) {
    let Some(tex) = sky_texture else { return };
    let (from, to) = (from.max(0.0) as usize, to.max(0.0) as usize);
    if from >= to || to > out.len() {
        return;
    }

    let mut angle = hit.dir_norm.x.atan2(hit.dir_norm.y).to_degrees();
    if angle < 0.0 {
        angle += 360.0;
    }
    let sky_x = angle / 360.0;
    let h = out.len() as f32;
    let pitch_offset = proj.half_h - (out.len() as f32 * 0.5);

    for y in from..to {
        let sky_y = (0.5 + (y as f32 - pitch_offset) / h).min(1.0);
        let texel = sampler.sample_normalized(tex, sky_x, sky_y, 1);
        out[y] = 0xFF00_0000 | ((texel.r as u32) << 16) | ((texel.g as u32) << 8) | texel.b as u32;
    }
}
