use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::backend::graphics::GraphicsBackend;

/// Injection point for the graphics backend.
///
/// A dispatcher may be built before the backend exists, and the backend may
/// be torn down while workers are still running, so every operation takes a
/// fresh snapshot with [`BackendSlot::get`] and treats `None` as the neutral
/// failure case.
#[derive(Default)]
pub struct BackendSlot {
    inner: RwLock<Option<Arc<dyn GraphicsBackend>>>,
}

impl BackendSlot {
    /// Slot with no backend installed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Slot holding `backend`.
    pub fn with_backend(backend: Arc<dyn GraphicsBackend>) -> Self {
        Self {
            inner: RwLock::new(Some(backend)),
        }
    }

    /// Snapshot of the installed backend.
    pub fn get(&self) -> Option<Arc<dyn GraphicsBackend>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a backend is installed.
    pub fn is_installed(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Install `backend`, returning the one it replaces.
    pub fn install(&self, backend: Arc<dyn GraphicsBackend>) -> Option<Arc<dyn GraphicsBackend>> {
        debug!("graphics backend installed");
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(backend)
    }

    /// Remove the backend, returning it.
    pub fn teardown(&self) -> Option<Arc<dyn GraphicsBackend>> {
        debug!("graphics backend torn down");
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl std::fmt::Debug for BackendSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSlot")
            .field("installed", &self.is_installed())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/slot.rs"]
mod tests;
