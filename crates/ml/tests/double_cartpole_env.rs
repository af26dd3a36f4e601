use std::f32::consts::FRAC_PI_2;

use ml::shaping::{self, PENALTY};
use ml::{DoubleCartpoleConfig, DoubleCartpoleEnv, Env, EnvError, Termination};
use physics::{DoubleCartPoleConfig, Vec2};
use render::RenderMode;

fn seeded(n_steps: usize, seed: u64) -> DoubleCartpoleEnv {
    DoubleCartpoleEnv::new(DoubleCartpoleConfig { n_steps, seed: Some(seed), ..Default::default() })
        .expect("environment")
}

/// Both poles start at `angle` (from +x) with the cart at `cart_x`.
fn placed(n_steps: usize, angle: f32, cart_x: f32) -> DoubleCartpoleEnv {
    let physics = DoubleCartPoleConfig {
        cart_position: Vec2::new(cart_x, 400.0),
        initial_angle_range: (angle, angle),
        ..Default::default()
    };
    let config = DoubleCartpoleConfig { n_steps, ..Default::default() };
    DoubleCartpoleEnv::with_physics(config, physics).expect("environment")
}

#[test]
fn test_observation_stays_bounded() {
    println!("\n=== Testing Observation Bounds ===");

    let mut env = seeded(400, 7);
    let space = env.observation_space();
    let rng = fastrand::Rng::with_seed(99);

    for episode in 0..3 {
        let obs = env.reset().expect("reset");
        assert_eq!(obs.len(), 6);
        assert!(space.contains(&obs), "reset obs {obs:?}");
        let mut steps = 0;
        loop {
            let action = [rng.f32() * 4.0 - 2.0];
            let (obs, reward, done, _) = env.step(&action).expect("step");
            assert!(space.contains(&obs), "obs {obs:?} out of bounds");
            assert!(reward == PENALTY || (1.0..=1.5).contains(&reward), "reward {reward}");
            steps += 1;
            if done {
                break;
            }
        }
        println!("✓ episode {episode}: {steps} steps, every observation in [-1, 1]");
    }
}

#[test]
fn test_upright_reward_and_observation() {
    println!("\n=== Testing Upright Start ===");

    let mut env = placed(1000, FRAC_PI_2, 400.0);
    let obs = env.reset().expect("reset");
    for (i, v) in obs.iter().enumerate() {
        assert!(v.abs() < 1e-3, "obs[{i}] = {v}");
    }

    let (obs, reward, done, info) = env.step(&[0.0]).expect("step");
    assert!(!done);
    assert!((reward - 1.5).abs() < 1e-3, "reward {reward}");
    assert!(obs[1].abs() < 0.05 && obs[2].abs() < 0.05);
    assert_eq!(info.get("time_step").and_then(|v| v.as_u64()), Some(1));
    assert!(info.get("termination").is_none());
    println!("✓ balanced, centred cart earns 1.5");
}

#[test]
fn test_imbalance_penalty_is_sticky() {
    println!("\n=== Testing Imbalance Termination ===");

    // 0.6 rad right of upright is well past the 20 degree limit.
    let mut env = placed(1000, FRAC_PI_2 - 0.6, 400.0);
    env.reset().expect("reset");

    let (obs, reward, done, info) = env.step(&[0.0]).expect("step");
    assert_eq!(obs[1], 1.0);
    assert_eq!(reward, PENALTY);
    assert!(done);
    assert_eq!(info.get("termination").and_then(|v| v.as_str()), Some("imbalance"));
    println!("✓ reward -50 and done once the pole angle saturates");

    let (_, _, done, _) = env.step(&[0.0]).expect("step");
    assert!(done, "done must stay set until reset");
    assert_eq!(env.termination(), Some(Termination::Imbalance));

    env.reset().expect("reset");
    assert!(!env.is_done());
    assert_eq!(env.time_step(), 0);
    assert_eq!(env.termination(), None);
    println!("✓ reset clears the episode");
}

#[test]
fn test_wall_penalty() {
    println!("\n=== Testing Wall Termination ===");

    let mut env = placed(1000, FRAC_PI_2, 770.0);
    env.reset().expect("reset");
    let (obs, reward, done, info) = env.step(&[0.0]).expect("step");
    assert_eq!(obs[5], 1.0);
    assert_eq!(reward, PENALTY);
    assert!(done);
    assert_eq!(info.get("termination").and_then(|v| v.as_str()), Some("wall"));
    println!("✓ cart past x = 760 ends the episode with -50");

    let mut env = placed(1000, FRAC_PI_2, 30.0);
    env.reset().expect("reset");
    let (obs, reward, _, _) = env.step(&[0.0]).expect("step");
    assert_eq!(obs[5], -1.0);
    assert_eq!(reward, PENALTY);
    println!("✓ cart before x = 40 ends the episode with -50");
}

#[test]
fn test_time_limit_is_exact() {
    println!("\n=== Testing Time Limit ===");

    let n_steps = 12;
    let mut env = placed(n_steps, FRAC_PI_2, 400.0);
    env.reset().expect("reset");
    for t in 1..=n_steps {
        let (_, reward, done, info) = env.step(&[0.0]).expect("step");
        assert!(reward > 0.0, "no penalty expected at step {t}");
        assert_eq!(done, t == n_steps, "done at step {t}");
        if done {
            assert_eq!(info.get("termination").and_then(|v| v.as_str()), Some("time_limit"));
        }
    }
    println!("✓ done exactly at step {n_steps}");
}

#[test]
fn test_force_moves_the_cart() {
    println!("\n=== Testing Control Force ===");

    let mut env = placed(1000, FRAC_PI_2, 400.0);
    env.reset().expect("reset");
    let (obs, _, _, _) = env.step(&[1.0]).expect("step");
    assert_eq!(env.force(), shaping::FORCE_SCALE);
    assert!(obs[0] > 0.0, "cart velocity {}", obs[0]);

    let mut env = placed(1000, FRAC_PI_2, 400.0);
    env.reset().expect("reset");
    let (obs, _, _, _) = env.step(&[-1.0]).expect("step");
    assert!(obs[0] < 0.0, "cart velocity {}", obs[0]);
    println!("✓ positive action pushes toward +x, negative toward -x");
}

#[test]
fn test_action_shape_is_checked() {
    let mut env = seeded(10, 1);
    env.reset().expect("reset");
    assert!(matches!(
        env.step(&[]),
        Err(EnvError::ActionShape { expected: 1, got: 0 })
    ));
    assert!(matches!(
        env.step(&[0.0, 0.0]),
        Err(EnvError::ActionShape { expected: 1, got: 2 })
    ));
    assert_eq!(env.time_step(), 0);
}

#[test]
fn test_seed_reproduces_initial_state() {
    println!("\n=== Testing Seeding ===");

    let mut a = seeded(10, 42);
    let mut b = seeded(10, 42);
    assert_eq!(a.reset().expect("reset"), b.reset().expect("reset"));

    a.seed(3);
    b.seed(3);
    assert_eq!(a.reset().expect("reset"), b.reset().expect("reset"));
    println!("✓ equal seeds give equal starts");
}

#[test]
fn test_render_without_surface() {
    let mut env = seeded(10, 1);
    assert!(env.renderer().is_none());
    assert!(env.render().expect("render"));
    env.close().expect("close");
    env.close().expect("close twice");
}

#[test]
fn test_render_surface_survives_reset() {
    println!("\n=== Testing Rendering Surface ===");

    let config = DoubleCartpoleConfig {
        render_sim: true,
        render_mode: RenderMode::RgbArray,
        seed: Some(5),
        ..Default::default()
    };
    let mut env = DoubleCartpoleEnv::new(config).expect("environment");
    env.reset().expect("reset");
    env.step(&[0.5]).expect("step");
    assert!(env.render().expect("render"));

    env.reset().expect("reset");
    assert!(env.render().expect("render after reset"));
    let frame = env.renderer().expect("renderer").frame();
    assert_eq!((frame.width(), frame.height()), (800, 800));
    println!("✓ frame rendered before and after reset");

    env.close().expect("close");
    env.close().expect("close twice");
    assert!(!env.render().expect("render after close"));
    println!("✓ closed surface reports false");
}

#[test]
fn test_frames_mode_writes_png() {
    let root = std::env::temp_dir().join(format!("ml-frames-{}", std::process::id()));
    let config = DoubleCartpoleConfig {
        render_sim: true,
        render_mode: RenderMode::Frames,
        frame_dir: root.clone(),
        seed: Some(2),
        ..Default::default()
    };
    let mut env = DoubleCartpoleEnv::new(config).expect("environment");
    env.reset().expect("reset");
    for _ in 0..2 {
        env.step(&[0.0]).expect("step");
        env.render().expect("render");
    }
    env.close().expect("close");

    let pngs = std::fs::read_dir(&root)
        .expect("frame root")
        .filter_map(Result::ok)
        .flat_map(|dir| std::fs::read_dir(dir.path()).into_iter().flatten())
        .filter_map(Result::ok)
        .filter(|f| f.path().extension().is_some_and(|e| e == "png"))
        .count();
    assert_eq!(pngs, 2);
    let _ = std::fs::remove_dir_all(&root);
}
