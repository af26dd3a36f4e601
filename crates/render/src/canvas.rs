//! Raster canvas with a y-up world frame.
//!
//! World coordinates map 1:1 to pixels; only the y axis is flipped so that
//! the physics frame (y up) ends up the right way round on screen.

use glam::Vec2;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

pub type Color = Rgb<u8>;

pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbImage::new(width, height) }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// World (y up) to screen (y down).
    #[must_use]
    pub fn to_screen(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x, self.height() as f32 - p.y)
    }

    pub fn clear(&mut self, color: Color) {
        for px in self.image.pixels_mut() {
            *px = color;
        }
    }

    /// Draws a world-space line. Widths above one pixel are filled quads.
    pub fn line(&mut self, a: Vec2, b: Vec2, width: f32, color: Color) {
        let (a, b) = (self.to_screen(a), self.to_screen(b));
        let along = b - a;
        if width <= 1.0 || along.length_squared() < 1e-6 {
            draw_line_segment_mut(&mut self.image, (a.x, a.y), (b.x, b.y), color);
            return;
        }
        let n = along.perp().normalize() * (width * 0.5);
        self.fill_screen_polygon(&[a + n, b + n, b - n, a - n], color);
    }

    pub fn circle(&mut self, center: Vec2, radius: f32, color: Color) {
        let c = self.to_screen(center);
        draw_filled_circle_mut(
            &mut self.image,
            (c.x.round() as i32, c.y.round() as i32),
            radius.round() as i32,
            color,
        );
    }

    /// Fills a world-space polygon.
    pub fn polygon(&mut self, points: &[Vec2], color: Color) {
        let screen: Vec<Vec2> = points.iter().map(|p| self.to_screen(*p)).collect();
        self.fill_screen_polygon(&screen, color);
    }

    fn fill_screen_polygon(&mut self, points: &[Vec2], color: Color) {
        let mut poly: Vec<Point<i32>> = points
            .iter()
            .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
            .collect();
        poly.dedup();
        // imageproc rejects explicitly closed polygons
        while poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        match poly.len() {
            0 => {}
            1 | 2 => {
                let (a, b) = (poly[0], poly[poly.len() - 1]);
                draw_line_segment_mut(
                    &mut self.image,
                    (a.x as f32, a.y as f32),
                    (b.x as f32, b.y as f32),
                    color,
                );
            }
            _ => draw_polygon_mut(&mut self.image, &poly, color),
        }
    }
}
