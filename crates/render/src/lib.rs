//! # Double Cart-Pole Rendering
//!
//! Software rasterization of [`physics::SceneSnapshot`]s into 800×800 RGB
//! frames, and the surfaces that consume them: an in-memory buffer, a
//! directory of PNG files, or (with the `window` feature) a `minifb` window.

pub mod canvas;
pub mod renderer;
pub mod scene;
pub mod surface;
#[cfg(feature = "window")]
pub mod window;

pub use canvas::{Canvas, Color};
pub use renderer::{Renderer, HEIGHT, WIDTH};
pub use surface::{FrameDirectory, Offscreen, RenderMode, Surface};
