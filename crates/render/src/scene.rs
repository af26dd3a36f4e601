//! Draws a [`SceneSnapshot`] onto a [`Canvas`].

use std::f32::consts::PI;

use glam::Vec2;
use image::Rgb;
use physics::{Outline, Part, SceneSnapshot};

use crate::canvas::{Canvas, Color};

pub const BACKGROUND: Color = Rgb([243, 243, 243]);
pub const TARGET: Color = Rgb([149, 165, 166]);
pub const LIMIT: Color = Rgb([255, 26, 26]);
pub const TRACK: Color = Rgb([127, 127, 127]);
pub const CART: Color = Rgb([33, 93, 191]);
pub const POLE_1: Color = Rgb([66, 135, 245]);
pub const POLE_2: Color = Rgb([119, 169, 248]);
pub const GAUGE: Color = Rgb([179, 179, 179]);
pub const FORCE: Color = Rgb([255, 0, 0]);

/// Horizontal position the cart is rewarded for staying near.
pub const TARGET_X: f32 = 400.0;

const LIMIT_ANGLES: [f32; 2] = [7.0 * PI / 18.0, 11.0 * PI / 18.0];
const LIMIT_OVERHANG: f32 = 25.0;
const JOINT_RADIUS: f32 = 5.0;
const THICK: f32 = 4.0;
// pixels per newton
const GAUGE_SCALE: f32 = 1.0 / 12.0;
// one pixel above the track in screen space
const GAUGE_Y: f32 = 401.0;

fn v(p: physics::Vec2) -> Vec2 {
    Vec2::new(p.x, p.y)
}

fn part_color(part: Part) -> Color {
    match part {
        Part::Track => TRACK,
        Part::Cart => CART,
        Part::Pole1 => POLE_1,
        Part::Pole2 => POLE_2,
    }
}

fn limit_lines(canvas: &mut Canvas, origin: Vec2, length: f32) {
    for angle in LIMIT_ANGLES {
        let end = origin + Vec2::from_angle(angle) * (length + LIMIT_OVERHANG);
        canvas.line(origin, end, THICK, LIMIT);
    }
}

/// Paints one full frame: background, target line, angle limits, bodies,
/// joint dots and the force gauge, in that order.
pub fn draw(canvas: &mut Canvas, scene: &SceneSnapshot, force: f32, force_scale: f32) {
    let height = canvas.height() as f32;
    let cart = v(scene.cart);
    let pivot = v(scene.pivot);

    canvas.clear(BACKGROUND);
    canvas.line(Vec2::new(TARGET_X, 0.0), Vec2::new(TARGET_X, height), 1.0, TARGET);

    limit_lines(canvas, cart, scene.pole_lengths[0]);
    limit_lines(canvas, pivot, scene.pole_lengths[1]);

    for shape in &scene.shapes {
        let color = part_color(shape.part);
        match &shape.outline {
            Outline::Polygon(points) => {
                let points: Vec<Vec2> = points.iter().map(|p| v(*p)).collect();
                canvas.polygon(&points, color);
            }
            Outline::Segment { a, b, radius } => {
                canvas.line(v(*a), v(*b), (radius * 2.0).max(1.0), color);
            }
        }
    }

    canvas.circle(cart, JOINT_RADIUS, CART);
    canvas.circle(pivot, JOINT_RADIUS, POLE_1);

    let reach = GAUGE_SCALE * force_scale;
    canvas.line(
        Vec2::new(cart.x - reach, GAUGE_Y),
        Vec2::new(cart.x + reach, GAUGE_Y),
        THICK,
        GAUGE,
    );
    if force != 0.0 {
        canvas.line(
            Vec2::new(cart.x, GAUGE_Y),
            Vec2::new(cart.x + GAUGE_SCALE * force, GAUGE_Y),
            THICK,
            FORCE,
        );
    }
}
