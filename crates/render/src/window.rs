use anyhow::{Context, Result};
use image::RgbImage;
use minifb::{Key, Window, WindowOptions};
use tracing::debug;

use crate::surface::Surface;

pub const TITLE: &str = "Double Cartpole Environment";

/// A `minifb` window paced at 60 fps.
pub struct WindowSurface {
    window: Option<Window>,
    buffer: Vec<u32>,
}

impl WindowSurface {
    /// # Errors
    ///
    /// Fails when no window can be created (for example without a display).
    pub fn open(width: u32, height: u32) -> Result<Self> {
        let mut window = Window::new(TITLE, width as usize, height as usize, WindowOptions::default())
            .context("failed to create window")?;
        window.set_target_fps(60);
        debug!(width, height, "window opened");
        Ok(Self { window: Some(window), buffer: Vec::new() })
    }
}

impl Surface for WindowSurface {
    fn present(&mut self, frame: &RgbImage) -> Result<bool> {
        let Some(window) = self.window.as_mut() else {
            return Ok(false);
        };
        if !window.is_open() || window.is_key_down(Key::Escape) {
            return Ok(false);
        }
        self.buffer.clear();
        self.buffer.extend(frame.pixels().map(|p| {
            (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2])
        }));
        window
            .update_with_buffer(&self.buffer, frame.width() as usize, frame.height() as usize)
            .context("failed to update window")?;
        Ok(true)
    }

    fn close(&mut self) {
        if self.window.take().is_some() {
            debug!("window closed");
        }
    }
}
