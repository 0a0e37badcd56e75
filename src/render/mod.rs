//! Frame rendering entry point.
//!
//! `Renderer` owns everything that's sized to the output buffer: the
//! per-column work buffers, and the depth lookup table floor/ceiling
//! plane casting shares across rows. Geometry, lights and the camera
//! all live outside it and are borrowed for the duration of `draw`.

pub mod column;
pub mod sampler;
pub mod shader;

use rayon::prelude::*;

use crate::camera::Camera;
use crate::config::Config;
use crate::level::Level;
use crate::projection::Projection;
use crate::render::sampler::TextureSampler;

/// Owns the output-sized state a frame needs: one contiguous `Vec<u32>`
/// per screen column (so `rayon`'s column fan-out hands out genuinely
/// disjoint `&mut` slices, with no unsafe stride arithmetic over a
/// shared row-major buffer) plus the depth lookup table floor/ceiling
/// casting shares across every column and row.
pub struct Renderer {
    width: usize,
    height: usize,
    columns: Vec<Vec<u32>>,
    depth_table: Vec<f32>,
    frame: Vec<u32>,
}

impl Renderer {
    /// Allocates every output-sized buffer for a `width × height` frame.
    pub fn init(width: usize, height: usize) -> Self {
        let mut renderer = Self {
            width: 0,
            height: 0,
            columns: Vec::new(),
            depth_table: Vec::new(),
            frame: Vec::new(),
        };
        renderer.resize(width, height);
        renderer
    }

    /// Reallocates every output-sized buffer.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.columns = vec![vec![0; height]; width];
        self.depth_table = (0..height).map(|i| 1.0 / (i as f32 + 1.0)).collect();
        self.frame = vec![0; width * height];
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Releases the output-sized buffers; the `Renderer` itself is
    /// dropped the ordinary way once this returns, this just lets a
    /// host reclaim memory ahead of that.
    pub fn destroy(&mut self) {
        self.columns = Vec::new();
        self.depth_table = Vec::new();
        self.frame = Vec::new();
        self.width = 0;
        self.height = 0;
    }

    /// Renders one frame from `camera`'s current position and returns
    /// the row-major `ARGB8888`/`ABGR8888` frame buffer.
    ///
    /// Columns render independently into their own buffer, writing to
    /// disjoint slices of the frame buffer; `config.parallel_rendering`
    /// picks `rayon`'s thread pool over a sequential fallback that
    /// produces the bit-identical frame.
    pub fn draw(&mut self, level: &Level, camera: &Camera, config: &Config, sampler: &dyn TextureSampler) -> &[u32] {
        let proj = Projection::new(camera, self.width, self.height);
        let width = self.width;
        let height = self.height;
        let depth_table = &self.depth_table;

        let render_one = |x: usize, out: &mut Vec<u32>| {
            for px in out.iter_mut() {
                *px = 0xFF00_0000;
            }
            column::render_column(level, camera, &proj, config, sampler, depth_table, x, width, height, out);
        };

        if config.parallel_rendering {
            self.columns.par_iter_mut().enumerate().for_each(|(x, out)| render_one(x, out));
        } else {
            for (x, out) in self.columns.iter_mut().enumerate() {
                render_one(x, out);
            }
        }

        for (x, column) in self.columns.iter().enumerate() {
            for (y, &pixel) in column.iter().enumerate() {
                self.frame[y * width + x] = pixel;
            }
        }

        &self.frame
    }
}
