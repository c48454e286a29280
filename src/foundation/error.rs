/// Convenience result type used outside the protocol operations.
pub type RcResult<T> = Result<T, RenderControlError>;

/// Error taxonomy for configuration, backend construction, decoding and replay.
///
/// Protocol operations never return this type: they report failures through the
/// sentinel values the guest expects (`0` handles, `-1`, negative lengths).
#[derive(thiserror::Error, Debug)]
pub enum RenderControlError {
    /// Invalid feature flags or other configuration input.
    #[error("config error: {0}")]
    Config(String),

    /// A backend could not be constructed from the given options.
    #[error("backend error: {0}")]
    Backend(String),

    /// A request could not be decoded (unknown opcode, malformed arguments).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A replay script failed to load or run.
    #[error("replay error: {0}")]
    Replay(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RenderControlError {
    /// Build a [`RenderControlError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`RenderControlError::Backend`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Build a [`RenderControlError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`RenderControlError::Replay`] value.
    pub fn replay(msg: impl Into<String>) -> Self {
        Self::Replay(msg.into())
    }

    /// Build a [`RenderControlError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
