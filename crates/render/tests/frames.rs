use std::f32::consts::FRAC_PI_2;
use std::path::PathBuf;

use physics::{DoubleCartPole, DoubleCartPoleConfig, SceneSnapshot};
use render::{scene, FrameDirectory, Offscreen, RenderMode, Renderer, HEIGHT, WIDTH};

fn upright_snapshot() -> SceneSnapshot {
    DoubleCartPole::with_angles(DoubleCartPoleConfig::default(), FRAC_PI_2, FRAC_PI_2)
        .and_then(|cp| cp.snapshot())
        .expect("upright assembly")
}

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("render-{name}-{}", std::process::id()))
}

#[test]
fn test_frame_layout() {
    println!("\n=== Testing Frame Layout ===");

    let mut renderer = Renderer::with_surface(Box::<Offscreen>::default());
    let open = renderer.render(&upright_snapshot(), 0.0, 1200.0).expect("render");
    assert!(open);

    let frame = renderer.frame();
    assert_eq!((frame.width(), frame.height()), (WIDTH, HEIGHT));
    println!("✓ frame is {}x{}", frame.width(), frame.height());

    // Above the poles and their limit lines only the target line is drawn.
    assert_eq!(*frame.get_pixel(400, 10), scene::TARGET);
    assert_eq!(*frame.get_pixel(10, 10), scene::BACKGROUND);
    println!("✓ target line at x = 400");

    // Screen y = 800 - world y; the cart joint dot sits at world (400, 400)
    // and the force gauge is painted over it along screen rows 397..=401.
    assert_eq!(*frame.get_pixel(400, 404), scene::CART);
    assert_eq!(*frame.get_pixel(400, 399), scene::GAUGE);
    // Pole 1 body halfway up, just off the target line.
    assert_eq!(*frame.get_pixel(403, 320), scene::POLE_1);
    assert_eq!(*frame.get_pixel(403, 160), scene::POLE_2);
    println!("✓ bodies drawn with y flipped");
}

#[test]
fn test_force_gauge() {
    println!("\n=== Testing Force Gauge ===");

    let snapshot = upright_snapshot();
    let mut renderer = Renderer::with_surface(Box::<Offscreen>::default());

    renderer.render(&snapshot, 0.0, 1200.0).expect("render");
    // The gauge spans 100 px either side of the cart; the cart box ends at 440.
    assert_eq!(*renderer.frame().get_pixel(480, 399), scene::GAUGE);

    renderer.render(&snapshot, 1200.0, 1200.0).expect("render");
    assert_eq!(*renderer.frame().get_pixel(480, 399), scene::FORCE);
    assert_eq!(*renderer.frame().get_pixel(320, 399), scene::GAUGE);
    println!("✓ force bar drawn over the gauge toward +x");
}

#[test]
fn test_frames_written_to_directory() {
    println!("\n=== Testing Frame Directory ===");

    let root = scratch_dir("frames");
    let dir = FrameDirectory::create(&root).expect("frame directory");
    let path = dir.path().to_path_buf();
    assert!(path.starts_with(&root));

    let snapshot = upright_snapshot();
    let mut renderer = Renderer::with_surface(Box::new(dir));
    for _ in 0..3 {
        assert!(renderer.render(&snapshot, 600.0, 1200.0).expect("render"));
    }

    for i in 0..3 {
        let file = path.join(format!("frame_{i:06}.png"));
        let img = image::open(&file).expect("png readable").to_rgb8();
        assert_eq!((img.width(), img.height()), (WIDTH, HEIGHT));
        assert_eq!(*img.get_pixel(400, 10), scene::TARGET);
    }
    println!("✓ 3 frames written to {}", path.display());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn test_close_is_idempotent() {
    println!("\n=== Testing Close ===");

    let mut renderer = Renderer::open(RenderMode::RgbArray, &scratch_dir("unused")).expect("open");
    assert!(renderer.is_open());
    renderer.close();
    renderer.close();
    assert!(!renderer.is_open());
    assert!(!renderer.render(&upright_snapshot(), 0.0, 1200.0).expect("render"));
    println!("✓ closed renderer reports false");
}

#[test]
fn test_render_mode_names() {
    assert_eq!("rgb_array".parse::<RenderMode>().ok(), Some(RenderMode::RgbArray));
    assert_eq!("frames".parse::<RenderMode>().ok(), Some(RenderMode::Frames));
    assert!("vga".parse::<RenderMode>().is_err());
    assert_eq!(RenderMode::default(), RenderMode::Human);
}

#[cfg(not(feature = "window"))]
#[test]
fn test_human_mode_needs_window_feature() {
    let err = Renderer::open(RenderMode::Human, &scratch_dir("unused")).err().expect("no window");
    assert!(err.to_string().contains("window unavailable"));
}
