use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::foundation::error::{RenderControlError, RcResult};

/// Feature switches consumed by the render control layer.
///
/// Both default to disabled, which is what older guests expect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Serialize color-buffer commits through the Ordering Gate.
    pub gralloc_sync: bool,
    /// Advertise the pipe checksum protocol through `GL_EXTENSIONS`.
    pub gl_pipe_checksum: bool,
}

impl FeatureFlags {
    /// Every feature on.
    pub fn all_enabled() -> Self {
        Self {
            gralloc_sync: true,
            gl_pipe_checksum: true,
        }
    }

    /// Load flags from a JSON file. Missing keys fall back to defaults.
    pub fn from_path(path: impl AsRef<Path>) -> RcResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            RenderControlError::config(format!("open feature flags '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Parse flags from JSON.
    pub fn from_reader(r: impl Read) -> RcResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| RenderControlError::serde(format!("parse feature flags: {e}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
