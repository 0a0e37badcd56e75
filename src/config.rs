//! Runtime rendering configuration.
//!
//! These are modeled as one plain record rather than compile-time
//! feature switches, so a host can pick them at `Renderer::init` time
//! without recompiling.

/// How distance dimming quantizes brightness.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightSteps {
    /// `brightness - distance / DIMMING_DISTANCE`, no banding.
    Continuous,
    /// `N` quantization bands spread over `DIMMING_DISTANCE`.
    Stepped(u32),
}

impl Default for LightSteps {
    fn default() -> Self {
        LightSteps::Continuous
    }
}

/// Output pixel layout. Defaults to ARGB8888 unless the host indicates
/// ABGR8888.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PixelFormat {
    #[default]
    Argb8888,
    Abgr8888,
}

/// Runtime switches that used to be compile-time flags.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Split column work across a `rayon` thread pool.
    pub parallel_rendering: bool,
    /// Distance-dimming mode for the shader.
    pub light_steps: LightSteps,
    /// Static (attach-once via LOS) vs per-pixel dynamic shadow tests.
    pub dynamic_shadows: bool,
    /// Advisory only, like `simd_pixel_lighting`: accepted for interface
    /// parity, but the tracer always walks each sector's full linedef
    /// list — there is no precomputed visible-subset path to switch to.
    pub prerender_vischeck: bool,
    /// Advisory only: the scalar shading path is always correct and is
    /// what runs either way.
    pub simd_pixel_lighting: bool,
    pub pixel_format: PixelFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallel_rendering: true,
            light_steps: LightSteps::Continuous,
            dynamic_shadows: false,
            prerender_vischeck: false,
            simd_pixel_lighting: false,
            pixel_format: PixelFormat::Argb8888,
        }
    }
}
