use crate::{
    backend::graphics::ContextKind,
    checksum::calculator::ChecksumCalculator,
    foundation::handle::{Handle, WorkerId},
    sync::gate::GateHold,
};

/// The context a worker last bound successfully.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentContext {
    /// Bound context.
    pub context: Handle,
    /// Family of the bound context.
    pub kind: ContextKind,
    /// Draw surface.
    pub draw: Handle,
    /// Read surface.
    pub read: Handle,
}

/// Context and 1x1 pbuffer the host created for a worker that queried GL
/// strings without a context of its own. Owned by that worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrivialContext {
    /// GLES2 context.
    pub context: Handle,
    /// 1x1 pbuffer used as both draw and read surface.
    pub surface: Handle,
}

/// State owned by one host worker thread (one guest rendering thread).
///
/// Passed by `&mut` into every render control operation. Nothing in here is
/// shared, so none of it is locked.
#[derive(Debug)]
pub struct RenderThreadInfo {
    worker: WorkerId,
    current: Option<CurrentContext>,
    checksum: ChecksumCalculator,
    trivial: Option<TrivialContext>,
    // Gate hold taken by ColorBufferCacheFlush, released by UpdateColorBuffer.
    gate_hold: Option<GateHold>,
}

impl Default for RenderThreadInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderThreadInfo {
    /// Fresh worker state with a newly allocated [`WorkerId`].
    pub fn new() -> Self {
        Self {
            worker: WorkerId::next(),
            current: None,
            checksum: ChecksumCalculator::new(),
            trivial: None,
            gate_hold: None,
        }
    }

    /// Identity of this worker.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// The context this worker has bound, if any.
    pub fn current_context(&self) -> Option<&CurrentContext> {
        self.current.as_ref()
    }

    pub(crate) fn set_current(&mut self, current: Option<CurrentContext>) {
        self.current = current;
    }

    /// The host-created context this worker owns, if any.
    pub fn trivial_context(&self) -> Option<TrivialContext> {
        self.trivial
    }

    pub(crate) fn set_trivial_context(&mut self, trivial: TrivialContext) {
        self.trivial = Some(trivial);
    }

    pub(crate) fn take_trivial_context(&mut self) -> Option<TrivialContext> {
        self.trivial.take()
    }

    /// Checksum protocol state of this worker.
    pub fn checksum(&self) -> &ChecksumCalculator {
        &self.checksum
    }

    /// Mutable checksum protocol state of this worker.
    pub fn checksum_mut(&mut self) -> &mut ChecksumCalculator {
        &mut self.checksum
    }

    /// Whether a cache flush on this worker is waiting for its commit.
    pub fn holds_gate(&self) -> bool {
        self.gate_hold.is_some()
    }

    /// Keep `hold` until the matching commit. Returns `false` (and drops the
    /// new hold) if this worker already holds the gate.
    pub(crate) fn park_gate_hold(&mut self, hold: GateHold) -> bool {
        if self.gate_hold.is_some() {
            return false;
        }
        self.gate_hold = Some(hold);
        true
    }

    pub(crate) fn take_gate_hold(&mut self) -> Option<GateHold> {
        self.gate_hold.take()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/thread/info.rs"]
mod tests;
