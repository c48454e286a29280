use std::sync::atomic::{AtomicU32, Ordering};

/// Opaque 32-bit identifier for a backend resource.
///
/// Handles are allocated by the graphics backend only; this crate passes them
/// through without interpreting the value. `Handle(0)` means "no resource".
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Handle(pub u32);

impl Handle {
    /// The reserved "no resource" / failure handle.
    pub const NONE: Handle = Handle(0);

    /// Whether this is [`Handle::NONE`].
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Whether this names a resource.
    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl From<u32> for Handle {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

static NEXT_WORKER_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a host worker thread serving one guest rendering thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u32);

impl WorkerId {
    /// Allocate a process-unique worker id.
    pub fn next() -> Self {
        Self(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Sub-rectangle of a color buffer, in pixels. Signed like the GL arguments it
/// is decoded from; backends reject negative or out-of-range rectangles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl PixelRect {
    /// Rectangle at `(x, y)` of `width` x `height`.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns `(x, y, w, h)` as unsigned values if the rectangle lies fully
    /// inside a `bounds_w` x `bounds_h` area.
    pub fn clamp_to(self, bounds_w: u32, bounds_h: u32) -> Option<(u32, u32, u32, u32)> {
        let x = u32::try_from(self.x).ok()?;
        let y = u32::try_from(self.y).ok()?;
        let w = u32::try_from(self.width).ok()?;
        let h = u32::try_from(self.height).ok()?;
        if x.checked_add(w)? > bounds_w || y.checked_add(h)? > bounds_h {
            return None;
        }
        Some((x, y, w, h))
    }

    /// Pixel count, `0` for negative sizes.
    pub fn pixel_count(self) -> usize {
        let w = usize::try_from(self.width).unwrap_or(0);
        let h = usize::try_from(self.height).unwrap_or(0);
        w.saturating_mul(h)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/handle.rs"]
mod tests;
