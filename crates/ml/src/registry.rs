use std::collections::BTreeMap;

use serde::de::Error as _;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::double_cartpole::{DoubleCartpoleConfig, DoubleCartpoleEnv};
use crate::env::Env;
use crate::error::EnvError;

pub const DOUBLE_CARTPOLE_ID: &str = "double-cartpole-custom-v0";

/// Builds an environment from merged keyword options.
pub type EntryPoint = fn(Value) -> Result<Box<dyn Env>, EnvError>;

pub struct EnvSpec {
    pub id: String,
    pub entry_point: EntryPoint,
    pub default_kwargs: Map<String, Value>,
}

/// Environment ids and how to construct them.
pub struct Registry {
    specs: BTreeMap<String, EnvSpec>,
}

impl Registry {
    /// A registry with no ids at all.
    #[must_use]
    pub fn empty() -> Self {
        Self { specs: BTreeMap::new() }
    }

    /// # Errors
    ///
    /// [`EnvError::DuplicateId`] if `id` is taken, [`EnvError::Config`] if
    /// `default_kwargs` is neither an object nor null.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        entry_point: EntryPoint,
        default_kwargs: Value,
    ) -> Result<(), EnvError> {
        let id = id.into();
        if self.specs.contains_key(&id) {
            return Err(EnvError::DuplicateId(id));
        }
        let default_kwargs = into_object(default_kwargs)?;
        debug!(id = %id, "environment registered");
        self.specs.insert(id.clone(), EnvSpec { id, entry_point, default_kwargs });
        Ok(())
    }

    #[must_use]
    pub fn spec(&self, id: &str) -> Option<&EnvSpec> {
        self.specs.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Constructs `id` with `kwargs` merged over its defaults. `kwargs` may be
    /// `null` to take the defaults as they are.
    ///
    /// # Errors
    ///
    /// [`EnvError::UnknownEnvironment`] for unregistered ids,
    /// [`EnvError::Config`] for malformed options, or whatever the entry
    /// point reports.
    pub fn make(&self, id: &str, kwargs: Value) -> Result<Box<dyn Env>, EnvError> {
        let spec = self
            .specs
            .get(id)
            .ok_or_else(|| EnvError::UnknownEnvironment(id.to_owned()))?;
        let mut merged = spec.default_kwargs.clone();
        merged.extend(into_object(kwargs)?);
        debug!(id, kwargs = %serde_json::Value::Object(merged.clone()), "making environment");
        (spec.entry_point)(Value::Object(merged))
    }
}

impl Default for Registry {
    /// The built-in environments.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.specs.insert(
            DOUBLE_CARTPOLE_ID.to_owned(),
            EnvSpec {
                id: DOUBLE_CARTPOLE_ID.to_owned(),
                entry_point: double_cartpole_entry,
                default_kwargs: Map::from_iter([
                    ("render_sim".to_owned(), json!(false)),
                    ("n_steps".to_owned(), json!(1000)),
                ]),
            },
        );
        registry
    }
}

/// [`Registry::make`] on the built-in registry.
///
/// # Errors
///
/// See [`Registry::make`].
pub fn make(id: &str, kwargs: Value) -> Result<Box<dyn Env>, EnvError> {
    Registry::default().make(id, kwargs)
}

/// Parses double cart-pole keyword options without building anything.
///
/// # Errors
///
/// [`EnvError::Config`] for unknown keys or ill-typed values.
pub fn double_cartpole_config(kwargs: Value) -> Result<DoubleCartpoleConfig, EnvError> {
    Ok(serde_json::from_value(Value::Object(into_object(kwargs)?))?)
}

fn double_cartpole_entry(kwargs: Value) -> Result<Box<dyn Env>, EnvError> {
    Ok(Box::new(DoubleCartpoleEnv::new(double_cartpole_config(kwargs)?)?))
}

fn into_object(value: Value) -> Result<Map<String, Value>, EnvError> {
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(EnvError::Config(serde_json::Error::custom(format!(
            "keyword options must be a JSON object, got {other}"
        )))),
    }
}
