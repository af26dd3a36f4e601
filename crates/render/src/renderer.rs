use std::path::Path;

use anyhow::Result;
use image::RgbImage;
use physics::SceneSnapshot;
use tracing::warn;

use crate::canvas::Canvas;
use crate::scene;
use crate::surface::{self, RenderMode, Surface};

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 800;

/// Draws snapshots and hands the frames to a [`Surface`].
pub struct Renderer {
    canvas: Canvas,
    surface: Option<Box<dyn Surface>>,
}

impl Renderer {
    #[must_use]
    pub fn with_surface(surface: Box<dyn Surface>) -> Self {
        Self { canvas: Canvas::new(WIDTH, HEIGHT), surface: Some(surface) }
    }

    /// # Errors
    ///
    /// Fails when the surface for `mode` cannot be opened.
    pub fn open(mode: RenderMode, frame_dir: &Path) -> Result<Self> {
        Ok(Self::with_surface(surface::open(mode, frame_dir, WIDTH, HEIGHT)?))
    }

    /// Draws `scene` and presents it. Returns `false` when the surface was
    /// closed, either by the user or by [`Renderer::close`].
    ///
    /// # Errors
    ///
    /// Propagates surface failures.
    pub fn render(&mut self, snapshot: &SceneSnapshot, force: f32, force_scale: f32) -> Result<bool> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(false);
        };
        scene::draw(&mut self.canvas, snapshot, force, force_scale);
        let open = surface.present(self.canvas.image()).map_err(|e| {
            warn!(error = %e, "failed to present frame");
            e
        })?;
        Ok(open)
    }

    /// The most recently drawn frame.
    #[must_use]
    pub fn frame(&self) -> &RgbImage {
        self.canvas.image()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.surface.is_some()
    }

    pub fn close(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            surface.close();
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.close();
    }
}
