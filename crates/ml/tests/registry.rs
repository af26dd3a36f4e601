use ml::registry::{double_cartpole_config, EnvSpec};
use ml::{make, DoubleCartpoleConfig, Env, EnvError, Registry, DOUBLE_CARTPOLE_ID};
use serde_json::{json, Value};

#[test]
fn test_builtin_registration() {
    println!("\n=== Testing Built-in Registry ===");

    let registry = Registry::default();
    assert_eq!(registry.ids().collect::<Vec<_>>(), vec![DOUBLE_CARTPOLE_ID]);

    let EnvSpec { id, default_kwargs, .. } = registry.spec(DOUBLE_CARTPOLE_ID).expect("builtin");
    assert_eq!(id, "double-cartpole-custom-v0");
    assert_eq!(default_kwargs.get("render_sim"), Some(&json!(false)));
    assert_eq!(default_kwargs.get("n_steps"), Some(&json!(1000)));
    println!("✓ {id} registered with render_sim = false, n_steps = 1000");
}

#[test]
fn test_make_with_defaults() {
    let mut env = make(DOUBLE_CARTPOLE_ID, Value::Null).expect("make");
    assert_eq!(env.obs_size(), 6);
    assert_eq!(env.action_size(), 1);
    assert_eq!(env.action_space().low, vec![-1.0]);
    assert_eq!(env.action_space().high, vec![1.0]);
    assert_eq!(env.reset().expect("reset").len(), 6);
}

#[test]
fn test_kwargs_override_defaults() {
    println!("\n=== Testing Keyword Overrides ===");

    let mut env = make(DOUBLE_CARTPOLE_ID, json!({ "n_steps": 3, "seed": 4 })).expect("make");
    env.reset().expect("reset");
    let dones: Vec<bool> = (0..3).map(|_| env.step(&[0.0]).expect("step").2).collect();
    assert_eq!(dones, vec![false, false, true]);
    println!("✓ n_steps = 3 ends the episode on the third step");

    let config = double_cartpole_config(json!({ "render_mode": "frames", "frame_dir": "out" }))
        .expect("config");
    assert_eq!(config.n_steps, DoubleCartpoleConfig::default().n_steps);
    assert_eq!(config.frame_dir, std::path::PathBuf::from("out"));
}

#[test]
fn test_make_errors() {
    println!("\n=== Testing Registry Errors ===");

    assert!(matches!(
        make("cartpole-v1", Value::Null),
        Err(EnvError::UnknownEnvironment(id)) if id == "cartpole-v1"
    ));
    assert!(matches!(
        make(DOUBLE_CARTPOLE_ID, json!({ "n_stepz": 10 })),
        Err(EnvError::Config(_))
    ));
    assert!(matches!(
        make(DOUBLE_CARTPOLE_ID, json!({ "n_steps": "many" })),
        Err(EnvError::Config(_))
    ));
    assert!(matches!(
        make(DOUBLE_CARTPOLE_ID, json!([1, 2])),
        Err(EnvError::Config(_))
    ));
    println!("✓ unknown ids and malformed options are rejected");
}

fn short_episode(kwargs: Value) -> Result<Box<dyn Env>, EnvError> {
    let mut config = double_cartpole_config(kwargs)?;
    config.n_steps = config.n_steps.min(5);
    Ok(Box::new(ml::DoubleCartpoleEnv::new(config)?))
}

#[test]
fn test_register_custom_id() {
    let mut registry = Registry::default();
    registry
        .register("double-cartpole-short-v0", short_episode, json!({ "seed": 1 }))
        .expect("register");
    assert!(matches!(
        registry.register(DOUBLE_CARTPOLE_ID, short_episode, Value::Null),
        Err(EnvError::DuplicateId(_))
    ));

    let mut env = registry.make("double-cartpole-short-v0", Value::Null).expect("make");
    env.reset().expect("reset");
    let steps = (1..=10).find(|_| env.step(&[0.0]).expect("step").2);
    assert_eq!(steps, Some(5));

    assert!(Registry::empty().make(DOUBLE_CARTPOLE_ID, Value::Null).is_err());
}
