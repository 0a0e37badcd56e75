//! Portal-walking ray tracer with mirror reflection.
//!
//! `trace_column` is the single per-column entry point: pure in its
//! inputs (level, camera, projection, config), no heap traffic on the
//! hot path — the intersection list and sector history both live
//! in fixed-capacity `SmallVec`s sized to the column budgets.

use glam::Vec2;
use smallvec::SmallVec;

use crate::camera::Camera;
use crate::config::{Config, LightSteps};
use crate::geom::{LinedefId, SectorId, SideFlags};
use crate::level::Level;
use crate::projection::Projection;

/// How far a ray travels before it's considered to have left the level.
pub const DRAW_DISTANCE: f32 = 16384.0;

/// Distance over which continuous-mode brightness falls to zero
/// (`original_source/src/renderer.c`'s `DIMMING_DISTANCE`).
pub const DIMMING_DISTANCE: f32 = 4096.0;

/// Hard cap on distinct sectors visited while tracing one column.
pub const MAX_SECTOR_HISTORY: usize = 64;

/// Hard cap on intersections recorded for one column.
pub const MAX_LINE_HITS_PER_COLUMN: usize = 48;

/// Hard cap on mirror-to-mirror bounces within a single column. It
/// exists because the "same front sector" a mirror bounce re-enters has
/// already been marked visited in that bounce's own sector-history set
/// (cleared before each bounce, see [`trace_column`]), so the other
/// budgets alone wouldn't bound a ray stuck ping-ponging between two
/// facing mirrors.
pub(crate) const MAX_MIRROR_BOUNCES: usize = 8;

/// What role an intersection plays in the ordered list the renderer
/// consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitKind {
    /// A portal crossing; the list continues past it.
    Portal,
    /// The terminating full wall.
    Full,
    /// A terminating wall that also reflects; the list continues with
    /// the reflected ray's own intersections.
    Mirror,
}

/// One recorded ray/linedef hit, carrying everything the column
/// renderer and shader need without re-deriving it.
#[derive(Clone, Copy, Debug)]
pub struct Intersection {
    pub kind: HitKind,
    /// This hit's ray's origin (`Ray::start`, not the camera position —
    /// differs from it past a mirror bounce). Used by the column
    /// renderer's floor/ceiling plane-cast blend.
    pub origin: Vec2,
    /// This hit's ray's unit direction. Used for the sky's azimuth
    /// mapping.
    pub dir_norm: Vec2,
    pub point: Vec2,
    pub planar_distance: f32,
    /// Local parameter along this hit's own ray segment, in `[0, 1]`
    /// (pre-`accum`); kept so mirror recursion can fold it into the next
    /// segment's `accum` without re-deriving it from `planar_distance`.
    ray_det: f32,
    pub point_distance_inv: f32,
    pub depth_scale: f32,
    pub vz_scaled: f32,
    pub cz_local: f32,
    pub fz_local: f32,
    /// Texture u-coordinate (the linedef-local intersection parameter).
    pub u: f32,
    pub linedef: LinedefId,
    pub front: SectorId,
    pub back: Option<SectorId>,
    pub side: u8,
    /// `floor(point_distance / (DIMMING_DISTANCE / N))`, valid when
    /// `Config::light_steps` is `Stepped(N)`.
    pub distance_steps: u32,
    /// `point_distance / DIMMING_DISTANCE`, valid when
    /// `Config::light_steps` is `Continuous`.
    pub light_falloff: f32,
}

/// The per-column working set: a seed position/direction plus the
/// accumulated determinant carried across mirror segments.
#[derive(Clone, Copy, Debug)]
struct Ray {
    perspective_origin: Vec2,
    start: Vec2,
    unit_dir: Vec2,
    /// `unit_dir * DRAW_DISTANCE`; scaling it up front means the
    /// line-vs-line solve's ray parameter lands directly in `[0, 1]` as
    /// a fraction of `DRAW_DISTANCE`, matching `planar_distance = (accum
    /// + ray_det) · DRAW_DISTANCE` literally.
    dir: Vec2,
    view_dir: Vec2,
    /// `1 / (view_dir · unit_dir)`, for perspective correction. Reflection
    /// is an isometry, so this is invariant across mirror bounces and is
    /// computed once at seed time.
    theta_inv: f32,
    accum: f32,
}

impl Ray {
    fn seed(origin: Vec2, unit_dir: Vec2, view_dir: Vec2) -> Self {
        let denom = view_dir.dot(unit_dir);
        Self {
            perspective_origin: origin,
            start: origin,
            unit_dir,
            dir: unit_dir * DRAW_DISTANCE,
            view_dir,
            theta_inv: 1.0 / denom.max(1e-4),
            accum: 0.0,
        }
    }

    fn reflected(&self, normal: Vec2, hit: Vec2, ray_det: f32) -> Self {
        let n = normal.normalize_or_zero();
        let new_unit_dir = reflect_vec(self.unit_dir, n);
        Self {
            perspective_origin: reflect_point(self.perspective_origin, hit, n),
            start: hit,
            unit_dir: new_unit_dir,
            dir: new_unit_dir * DRAW_DISTANCE,
            view_dir: reflect_vec(self.view_dir, n),
            theta_inv: self.theta_inv,
            accum: self.accum + ray_det,
        }
    }
}

fn reflect_vec(v: Vec2, n: Vec2) -> Vec2 {
    v - n * (2.0 * v.dot(n))
}

fn reflect_point(p: Vec2, plane_point: Vec2, n: Vec2) -> Vec2 {
    p - n * (2.0 * (p - plane_point).dot(n))
}

/// Two-parametric-line solve: `line_v0 + u·line_dir == ray_start +
/// t·ray_dir`. Returns `(t, u)`, i.e. `(ray_det, line_det)`.
fn intersect_ray_linedef(ray_start: Vec2, ray_dir: Vec2, line_v0: Vec2, line_dir: Vec2) -> Option<(f32, f32)> {
    let denom = line_dir.x * ray_dir.y - line_dir.y * ray_dir.x;
    if denom.abs() < f32::EPSILON {
        return None;
    }
    let diff = ray_start - line_v0;
    let line_det = (diff.x * ray_dir.y - diff.y * ray_dir.x) / denom;
    let ray_det = (diff.x * line_dir.y - diff.y * line_dir.x) / denom;
    Some((ray_det, line_det))
}

type HitList = SmallVec<[Intersection; MAX_LINE_HITS_PER_COLUMN]>;

struct TraceContext {
    hits: HitList,
    history: SmallVec<[SectorId; MAX_SECTOR_HISTORY]>,
}

impl TraceContext {
    fn new() -> Self {
        Self {
            hits: SmallVec::new(),
            history: SmallVec::new(),
        }
    }

    fn insert_sorted(&mut self, hit: Intersection) {
        if self.hits.len() >= MAX_LINE_HITS_PER_COLUMN {
            return;
        }
        let pos = self
            .hits
            .partition_point(|h| h.planar_distance <= hit.planar_distance);
        self.hits.insert(pos, hit);
    }
}

struct TraceParams<'a> {
    level: &'a Level,
    proj: &'a Projection,
    eye_z: f32,
    step_distance_inv: f32,
}

/// Traces a single screen column, returning its ordered intersection
/// list. Returns an empty list if the camera has no cached containing
/// sector (call [`Camera::refresh_sector`] first).
pub fn trace_column(level: &Level, camera: &Camera, proj: &Projection, config: &Config, x: usize, width: usize) -> HitList {
    let Some(start_sector) = camera.sector() else {
        return SmallVec::new();
    };

    let unit_dir = camera.ray_dir(x, width);
    let mut ray = Ray::seed(camera.pos, unit_dir, camera.dir);

    let step_distance_inv = match config.light_steps {
        LightSteps::Continuous => 0.0,
        LightSteps::Stepped(0) => 0.0,
        LightSteps::Stepped(n) => n as f32 / DIMMING_DISTANCE,
    };
    let params = TraceParams {
        level,
        proj,
        eye_z: camera.z,
        step_distance_inv,
    };

    let mut ctx = TraceContext::new();
    let mut sector = start_sector;
    let mut bounces = 0usize;

    loop {
        // Each mirror bounce is a fresh walk from the viewer's
        // perspective: re-entering the mirrored room must not be
        // immediately rejected as an already-visited sector. The three
        // named budgets (draw distance, intersection count) plus the
        // dedicated bounce cap below still bound the loop.
        ctx.history.clear();
        let Some(mut full) = find_sector_intersections(&params, sector, &ray, &mut ctx) else {
            break;
        };

        let ld = params.level.linedef(full.linedef);
        let near_side = &ld.sides[full.side as usize];
        let can_bounce = near_side.flags.contains(SideFlags::MIRROR)
            && bounces < MAX_MIRROR_BOUNCES
            && ctx.hits.len() < MAX_LINE_HITS_PER_COLUMN;

        if can_bounce {
            full.kind = HitKind::Mirror;
            let normal = near_side.normal;
            let hit_point = full.point;
            let ray_det = full.ray_det;
            ctx.insert_sorted(full);
            ray = ray.reflected(normal, hit_point, ray_det);
            sector = full.front;
            bounces += 1;
        } else {
            full.kind = HitKind::Full;
            ctx.insert_sorted(full);
            break;
        }
    }

    ctx.hits
}

/// Recursive portal walk. Returns the closest terminating
/// full wall found anywhere in this sub-tree, if any; portal crossings
/// are inserted into `ctx.hits` directly as they're found.
fn find_sector_intersections(params: &TraceParams, sector: SectorId, ray: &Ray, ctx: &mut TraceContext) -> Option<Intersection> {
    if ctx.history.len() >= MAX_SECTOR_HISTORY || ctx.history.contains(&sector) {
        return None;
    }
    ctx.history.push(sector);

    let level = params.level;
    let mut full_wall: Option<Intersection> = None;

    for &ld_id in &level.sector(sector).linedefs {
        if ctx.hits.len() >= MAX_LINE_HITS_PER_COLUMN {
            break;
        }

        let ld = level.linedef(ld_id);
        let Some(side_index) = ld.side_for_sector(sector) else {
            continue;
        };
        let side = &ld.sides[side_index];
        let v0 = level.vertex(ld.v0).pos;

        if side.normal != Vec2::ZERO {
            // `side.normal` points outward from the sector that owns
            // this side; the viewer must be on the interior (non-outward)
            // side to see its face.
            let behind = (ray.start - v0).dot(side.normal) > 0.0;
            if behind && !side.flags.contains(SideFlags::STATIC_DETAIL) {
                continue;
            }
        }

        let Some((ray_det, line_det)) = intersect_ray_linedef(ray.start, ray.dir, v0, ld.direction) else {
            continue;
        };
        if ray_det <= 0.0 || !(0.0..=1.0).contains(&line_det) {
            continue;
        }

        let planar_distance = (ray.accum + ray_det) * DRAW_DISTANCE;
        if planar_distance > DRAW_DISTANCE {
            break;
        }

        let point = v0 + ld.direction * line_det;
        let point_distance = (planar_distance * ray.theta_inv).max(1.0);
        let depth_scale = params.proj.unit_size / planar_distance.max(1.0);

        let sector_ref = level.sector(sector);
        let cz_scaled = sector_ref.ceiling_height as f32 * depth_scale;
        let fz_scaled = sector_ref.floor_height as f32 * depth_scale;
        let vz_scaled = params.eye_z * depth_scale;

        let back = ld.sides[1 - side_index].sector;

        let intersection = Intersection {
            kind: HitKind::Portal,
            origin: ray.start,
            dir_norm: ray.unit_dir,
            point,
            planar_distance,
            ray_det,
            point_distance_inv: 1.0 / point_distance,
            depth_scale,
            vz_scaled,
            cz_local: params.proj.half_h - cz_scaled + vz_scaled,
            fz_local: params.proj.half_h - fz_scaled + vz_scaled,
            u: line_det,
            linedef: ld_id,
            front: sector,
            back,
            side: side_index as u8,
            distance_steps: (point_distance * params.step_distance_inv) as u32,
            light_falloff: point_distance / DIMMING_DISTANCE,
        };

        let portal_with_headroom = back.is_some_and(|b| level.sector(b).has_headroom());

        if portal_with_headroom {
            if full_wall.is_none_or(|f| intersection.planar_distance < f.planar_distance) {
                let back_sector = back.unwrap();
                ctx.insert_sorted(intersection);
                if let Some(deeper) = find_sector_intersections(params, back_sector, ray, ctx) {
                    full_wall = Some(deeper);
                }
            }
            // Else a closer full wall was already found elsewhere in
            // this sector's walk, regardless of traversal order: this
            // portal is occluded, drop it.
        } else if full_wall.is_none_or(|f| intersection.planar_distance < f.planar_distance) {
            full_wall = Some(intersection);
        }
    }

    full_wall
}
