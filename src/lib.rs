//! Host-side render control for GPU pass-through virtualization.
//!
//! A guest running EGL/GLES cannot own host GPU objects. It names them with
//! opaque 32-bit handles and asks the host to create, bind, update and
//! present them through the render control operations published in
//! [`RcOp`]. This crate implements that operation set on top of a pluggable
//! [`GraphicsBackend`].
//!
//! # Layout
//!
//! - [`RenderControl`] / [`RenderControlDispatcher`]: the operation set. Each
//!   call takes the calling worker's [`RenderThreadInfo`] where the result
//!   depends on it.
//! - [`OrderingGate`]: FIFO gate that keeps color-buffer commits in the order
//!   guest threads locked their buffers.
//! - [`ChecksumCalculator`]: per-worker pipe checksum state.
//! - [`SoftwareBackend`]: in-memory backend used by tests and the replay tool.
//! - [`Request`] / [`execute`] / [`ReplayScript`]: typed request decoding and
//!   scripted replay.
//!
//! Operations never panic and never return `Result`: failures are reported
//! with the sentinels the guest protocol defines. [`RenderControlError`] is
//! used only for configuration, decoding and replay.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod backend {
    pub mod configs;
    pub mod graphics;
    pub mod slot;
    pub mod software;
}
mod checksum {
    pub mod calculator;
}
mod control {
    pub mod decoder;
    pub mod dispatcher;
    pub mod wire;
}
mod foundation {
    pub mod config;
    pub mod error;
    pub mod handle;
}
mod protocol {
    pub mod enums;
    pub mod opcodes;
}
mod replay {
    pub mod script;
}
mod sync {
    pub mod gate;
}
mod thread {
    pub mod info;
}

pub use backend::configs::{CONFIG_ATTRIBUTES, ConfigTable, FbConfig};
pub use backend::graphics::{ContextKind, EglVersion, GraphicsBackend};
pub use backend::slot::BackendSlot;
pub use backend::software::{ColorBufferStats, SoftwareBackend, SoftwareBackendOpts};
pub use checksum::calculator::{ChecksumCalculator, MAX_CHECKSUM_VERSION, MAX_VERSION_STRING};
pub use control::decoder::{MAX_REPLY_BYTES, Request, Response, execute};
pub use control::dispatcher::{
    ConfigPackInfo, RENDERER_VERSION, RenderControl, RenderControlDispatcher,
};
pub use control::wire::{
    read_string_reply, string_reply_len, write_string_reply, write_words_reply,
};
pub use foundation::config::FeatureFlags;
pub use foundation::error::{RcResult, RenderControlError};
pub use foundation::handle::{Handle, PixelRect, WorkerId};
pub use protocol::opcodes::{OP_BASE, RcOp};
pub use replay::script::{
    ReplayReport, ReplayScript, ReplyRecord, WorkerScript, WorkerTranscript,
};
pub use sync::gate::{GateHold, OrderingGate};
pub use thread::info::{CurrentContext, RenderThreadInfo, TrivialContext};

/// GL/EGL enumerants and framebuffer parameter selectors used as arguments.
pub use protocol::enums;
