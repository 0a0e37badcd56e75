//! Sector-portal raycasting renderer core.
//!
//! Given a [`level::Level`] built once and a per-frame [`camera::Camera`],
//! [`render::Renderer::draw`] produces a full-color frame buffer by
//! casting one ray per screen column ([`trace`]), walking the portal
//! graph with mirror reflection, and shading walls/floors/ceilings/sky
//! ([`render`], [`render::shader`]) against a host-supplied
//! [`render::sampler::TextureSampler`].
//!
//! Windowing, input handling, the frame loop, and texture decoding are
//! the host's job; this crate only turns geometry + a camera pose into
//! pixels.

pub mod camera;
pub mod config;
pub mod error;
pub mod geom;
pub mod level;
pub mod projection;
pub mod render;
pub mod trace;

pub use camera::Camera;
pub use config::{Config, LightSteps, PixelFormat};
pub use level::Level;
pub use render::sampler::{Texel, TextureSampler};
pub use render::Renderer;
