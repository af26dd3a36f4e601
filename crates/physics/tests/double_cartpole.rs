//! Tests for the double cart-pole assembly built on the rapier world

use physics::{
    DoubleCartPole, DoubleCartPoleConfig, Outline, Part, PhysicsError, PoleConfig, Vec2, World,
};
use std::f32::consts::FRAC_PI_2;

fn upright() -> DoubleCartPole {
    DoubleCartPole::with_angles(DoubleCartPoleConfig::default(), FRAC_PI_2, FRAC_PI_2)
        .expect("default config is valid")
}

fn close(a: Vec2, b: Vec2, tol: f32) -> bool {
    (a - b).length() <= tol
}

#[test]
fn test_pole_geometry_from_endpoints() {
    println!("\n=== Testing Pole Geometry ===");

    let alpha = 1.4_f32;
    let cp = DoubleCartPole::with_angles(DoubleCartPoleConfig::default(), alpha, FRAC_PI_2)
        .unwrap();
    let state = cp.state().unwrap();

    let base = Vec2::new(400.0, 400.0);
    let expected_center = base + Vec2::from_angle(alpha) * 80.0;
    assert!(close(state.pole_1.position, expected_center, 1e-3));
    assert!((state.pole_1.angle - alpha).abs() < 1e-5);
    assert!((cp.pole_1.length - 160.0).abs() < 1e-3);

    // Pole 1 is pinned to the cart centre, pole 2 to pole 1's tip.
    let pole_1_base = cp.world.local_to_world(cp.pole_1.body, cp.pole_1.base()).unwrap();
    assert!(close(pole_1_base, base, 1e-3));
    let pole_2_base = cp.world.local_to_world(cp.pole_2.body, cp.pole_2.base()).unwrap();
    assert!(close(pole_2_base, cp.pivot_point().unwrap(), 1e-3));

    println!("✓ Poles are placed from their endpoints");
}

#[test]
fn test_assembly_counts() {
    let cp = upright();
    // track, cart, two poles
    assert_eq!(cp.world.body_count(), 4);
    // two grooves, two pivots
    assert_eq!(cp.world.joint_count(), 4);
}

#[test]
fn test_cart_stays_on_track() {
    println!("\n=== Testing Groove Constraint ===");

    let mut cp = upright();
    for _ in 0..30 {
        cp.apply_force(1200.0).unwrap();
        cp.update_velocities().unwrap();
        cp.step();
    }
    let cart = cp.state().unwrap().cart;
    println!("cart after 0.5s of push: {:?}", cart);
    assert!(cart.position.x > 400.0, "cart should move right, x={}", cart.position.x);
    assert!((cart.position.y - 400.0).abs() < 5.0, "cart left the track, y={}", cart.position.y);
    assert!(cart.angle.abs() < 0.05, "cart should not rotate, angle={}", cart.angle);

    println!("✓ Cart slides horizontally only");
}

#[test]
fn test_force_is_cleared_after_step() {
    let config = DoubleCartPoleConfig { gravity: Vec2::ZERO, ..Default::default() };
    let mut cp = DoubleCartPole::with_angles(config, FRAC_PI_2, FRAC_PI_2).unwrap();
    let momentum = |cp: &DoubleCartPole| {
        let s = cp.state().unwrap();
        s.cart.velocity.x + s.pole_1.velocity.x + s.pole_2.velocity.x
    };

    cp.apply_force(1200.0).unwrap();
    cp.step();
    let p1 = momentum(&cp);
    assert!(p1 > 0.0);

    // No external force on the second step: horizontal momentum is conserved.
    cp.step();
    let p2 = momentum(&cp);
    assert!((p2 - p1).abs() < 0.05 * p1, "force leaked into the next step: {p1} -> {p2}");
}

#[test]
fn test_update_velocity_damps_and_applies_force() {
    let config = DoubleCartPoleConfig { gravity: Vec2::ZERO, ..Default::default() };
    let mut cp = DoubleCartPole::with_angles(config, FRAC_PI_2, FRAC_PI_2).unwrap();

    let mut cart = cp.state().unwrap().cart;
    cart.velocity = Vec2::new(100.0, 0.0);
    cp.world.set_body_state(cp.cart.body, cart).unwrap();

    cp.world.update_velocity(cp.cart.body, 0.5).unwrap();
    let v = cp.state().unwrap().cart.velocity.x;
    assert!((v - 50.0).abs() < 1e-3, "v={v}");

    cp.apply_force(60.0).unwrap();
    cp.world.update_velocity(cp.cart.body, 1.0).unwrap();
    let v = cp.state().unwrap().cart.velocity.x;
    // 60 N on 1 kg for 1/60 s
    assert!((v - 51.0).abs() < 1e-3, "v={v}");
}

#[test]
fn test_tilted_poles_fall_without_control() {
    println!("\n=== Testing Free Fall of Tilted Poles ===");

    let alpha = FRAC_PI_2 - 0.17;
    let mut cp = DoubleCartPole::with_angles(DoubleCartPoleConfig::default(), alpha, alpha).unwrap();
    for _ in 0..30 {
        cp.update_velocities().unwrap();
        cp.step();
    }
    let state = cp.state().unwrap();
    println!("pole 1 angle after 0.5s: {}", state.pole_1.angle);
    assert!(state.pole_1.angle.is_finite() && state.pole_2.angle.is_finite());
    assert!((state.pole_1.angle - alpha).abs() > 0.05 || (state.pole_2.angle - alpha).abs() > 0.05);

    // Joints must hold while falling.
    let pole_1_base = cp.world.local_to_world(cp.pole_1.body, cp.pole_1.base()).unwrap();
    assert!(close(pole_1_base, state.cart.position, 2.0));

    println!("✓ Poles fall under gravity");
}

#[test]
fn test_random_angles_stay_in_range() {
    let mut rng = fastrand::Rng::with_seed(3);
    let config = DoubleCartPoleConfig::default();
    let (lo, hi) = config.initial_angle_range;
    for _ in 0..20 {
        let cp = DoubleCartPole::new(config.clone(), &mut rng).unwrap();
        let state = cp.state().unwrap();
        assert!(state.pole_1.angle >= lo - 1e-5 && state.pole_1.angle <= hi + 1e-5);
        assert!(state.pole_2.angle >= lo - 1e-5 && state.pole_2.angle <= hi + 1e-5);
    }
}

#[test]
fn test_snapshot_outlines() {
    let cp = upright();
    let snap = cp.snapshot().unwrap();
    assert_eq!(snap.shapes.len(), 4);
    assert!(close(snap.cart, Vec2::new(400.0, 400.0), 1e-3));
    assert!(close(snap.pivot, Vec2::new(400.0, 560.0), 1e-2));

    let cart = snap.shapes.iter().find(|s| s.part == Part::Cart).unwrap();
    match &cart.outline {
        Outline::Polygon(points) => {
            assert_eq!(points.len(), 4);
            assert!(close(points[0], Vec2::new(360.0, 380.0), 1e-3));
            assert!(close(points[2], Vec2::new(440.0, 420.0), 1e-3));
        }
        other => panic!("cart should be a box, got {other:?}"),
    }
    let track = snap.shapes.iter().find(|s| s.part == Part::Track).unwrap();
    assert!(matches!(track.outline, Outline::Segment { .. }));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let config = DoubleCartPoleConfig { cart_mass: 0.0, ..Default::default() };
    let err = DoubleCartPole::with_angles(config, FRAC_PI_2, FRAC_PI_2).err();
    assert!(matches!(err, Some(PhysicsError::InvalidArgument { name: "mass", .. })));

    let config = DoubleCartPoleConfig {
        pole_2: PoleConfig { length: 0.0, thickness: 15.0, mass: 1.0 },
        ..Default::default()
    };
    let err = DoubleCartPole::with_angles(config, FRAC_PI_2, FRAC_PI_2).err();
    assert!(matches!(err, Some(PhysicsError::InvalidArgument { .. })));

    assert!(World::new(Vec2::ZERO, 0.0, 1.0).is_err());
}

#[test]
fn test_foreign_handle_is_unknown() {
    let cp = upright();
    let empty = World::new(Vec2::ZERO, 1.0 / 60.0, 1.0).unwrap();
    assert_eq!(
        empty.body_state(cp.pole_2.body),
        Err(PhysicsError::UnknownBody(cp.pole_2.body.index()))
    );
}
