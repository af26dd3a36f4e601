use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("unknown body handle {0}")]
    UnknownBody(usize),
    #[error("invalid argument `{name}`: {value}")]
    InvalidArgument { name: &'static str, value: f32 },
}

/// Rejects values the engine would silently turn into NaN state.
pub(crate) fn ensure_positive(name: &'static str, value: f32) -> Result<f32, PhysicsError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidArgument { name, value })
    }
}

pub(crate) fn ensure_finite(name: &'static str, value: f32) -> Result<f32, PhysicsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PhysicsError::InvalidArgument { name, value })
    }
}
