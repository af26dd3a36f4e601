use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where rendered frames end up.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// On-screen window, needs the `window` feature.
    #[default]
    Human,
    /// PNG files in a directory.
    Frames,
    /// Last frame kept in memory.
    RgbArray,
}

impl std::str::FromStr for RenderMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "human" => Ok(Self::Human),
            "frames" => Ok(Self::Frames),
            "rgb_array" => Ok(Self::RgbArray),
            other => anyhow::bail!("unknown render mode `{other}`"),
        }
    }
}

/// A sink for finished frames.
pub trait Surface {
    /// Shows or stores `frame`. Returns `false` once the user asked to stop.
    fn present(&mut self, frame: &RgbImage) -> Result<bool>;

    /// Releases the surface. Calling it again is a no-op.
    fn close(&mut self) {}
}

/// Keeps the most recent frame in memory.
#[derive(Default)]
pub struct Offscreen {
    last: Option<RgbImage>,
}

impl Offscreen {
    #[must_use]
    pub fn last_frame(&self) -> Option<&RgbImage> {
        self.last.as_ref()
    }
}

impl Surface for Offscreen {
    fn present(&mut self, frame: &RgbImage) -> Result<bool> {
        self.last = Some(frame.clone());
        Ok(true)
    }

    fn close(&mut self) {
        self.last = None;
    }
}

/// Writes numbered PNG files into a fresh timestamped directory.
pub struct FrameDirectory {
    path: PathBuf,
    next: usize,
}

impl FrameDirectory {
    /// Creates `root/<YYYYmmdd-HHMMSS>` (suffixed if it already exists).
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created.
    pub fn create(root: &Path) -> Result<Self> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut path = root.join(&stamp);
        let mut n = 1;
        while path.exists() {
            path = root.join(format!("{stamp}-{n}"));
            n += 1;
        }
        std::fs::create_dir_all(&path)
            .with_context(|| format!("failed to create frame directory {}", path.display()))?;
        debug!(path = %path.display(), "frame directory created");
        Ok(Self { path, next: 0 })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn frames_written(&self) -> usize {
        self.next
    }
}

impl Surface for FrameDirectory {
    fn present(&mut self, frame: &RgbImage) -> Result<bool> {
        let file = self.path.join(format!("frame_{:06}.png", self.next));
        frame
            .save(&file)
            .with_context(|| format!("failed to write {}", file.display()))?;
        self.next += 1;
        Ok(true)
    }
}

/// Opens the surface for `mode`. `frame_dir` is only used by
/// [`RenderMode::Frames`].
///
/// # Errors
///
/// Fails when the surface cannot be created, including a
/// [`RenderMode::Human`] request in a build without the `window` feature.
pub fn open(mode: RenderMode, frame_dir: &Path, width: u32, height: u32) -> Result<Box<dyn Surface>> {
    match mode {
        RenderMode::RgbArray => Ok(Box::<Offscreen>::default()),
        RenderMode::Frames => Ok(Box::new(FrameDirectory::create(frame_dir)?)),
        RenderMode::Human => open_window(width, height),
    }
}

#[cfg(feature = "window")]
fn open_window(width: u32, height: u32) -> Result<Box<dyn Surface>> {
    Ok(Box::new(crate::window::WindowSurface::open(width, height)?))
}

#[cfg(not(feature = "window"))]
fn open_window(_width: u32, _height: u32) -> Result<Box<dyn Surface>> {
    anyhow::bail!("window unavailable: built without the `window` feature")
}
