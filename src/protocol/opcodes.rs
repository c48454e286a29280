use crate::foundation::error::{RenderControlError, RcResult};

/// First opcode of the render control protocol.
pub const OP_BASE: u32 = 10000;

/// The published, ordered render control operation table.
///
/// Discriminants are offsets from [`OP_BASE`]. New operations are appended;
/// existing entries never move or change meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u32)]
pub enum RcOp {
    /// Implementation version.
    GetRendererVersion = 0,
    /// Host EGL version.
    GetEglVersion,
    /// `eglQueryString`.
    QueryEglString,
    /// `glGetString` for the worker's context.
    GetGlString,
    /// Config count and attribute count.
    GetNumConfigs,
    /// Packed config table.
    GetConfigs,
    /// Configs matching an attribute list.
    ChooseConfig,
    /// One framebuffer parameter.
    GetFbParam,
    /// Create a rendering context.
    CreateContext,
    /// Destroy a rendering context.
    DestroyContext,
    /// Create a window surface.
    CreateWindowSurface,
    /// Destroy a window surface.
    DestroyWindowSurface,
    /// Create a color buffer.
    CreateColorBuffer,
    /// Take a color buffer reference, no status.
    OpenColorBuffer,
    /// Drop a color buffer reference.
    CloseColorBuffer,
    /// Attach a color buffer to a surface.
    SetWindowColorBuffer,
    /// Resolve a surface into its color buffer.
    FlushWindowColorBuffer,
    /// Bind or unbind the worker's context.
    MakeCurrent,
    /// Present a color buffer.
    FbPost,
    /// Set the swap interval (ignored).
    FbSetSwapInterval,
    /// Bind a color buffer as a texture.
    BindTexture,
    /// Bind a color buffer as a renderbuffer.
    BindRenderbuffer,
    /// Lock phase of a gralloc buffer write.
    ColorBufferCacheFlush,
    /// Read back color buffer pixels.
    ReadColorBuffer,
    /// Commit phase of a gralloc buffer write.
    UpdateColorBuffer,
    /// Take a color buffer reference with status.
    OpenColorBuffer2,
    /// Create an EGL image.
    CreateClientImage,
    /// Destroy an EGL image.
    DestroyClientImage,
    /// Select the pipe checksum protocol.
    SelectChecksumCalculator,
}

impl RcOp {
    /// All operations in opcode order.
    pub const ALL: [RcOp; 29] = [
        RcOp::GetRendererVersion,
        RcOp::GetEglVersion,
        RcOp::QueryEglString,
        RcOp::GetGlString,
        RcOp::GetNumConfigs,
        RcOp::GetConfigs,
        RcOp::ChooseConfig,
        RcOp::GetFbParam,
        RcOp::CreateContext,
        RcOp::DestroyContext,
        RcOp::CreateWindowSurface,
        RcOp::DestroyWindowSurface,
        RcOp::CreateColorBuffer,
        RcOp::OpenColorBuffer,
        RcOp::CloseColorBuffer,
        RcOp::SetWindowColorBuffer,
        RcOp::FlushWindowColorBuffer,
        RcOp::MakeCurrent,
        RcOp::FbPost,
        RcOp::FbSetSwapInterval,
        RcOp::BindTexture,
        RcOp::BindRenderbuffer,
        RcOp::ColorBufferCacheFlush,
        RcOp::ReadColorBuffer,
        RcOp::UpdateColorBuffer,
        RcOp::OpenColorBuffer2,
        RcOp::CreateClientImage,
        RcOp::DestroyClientImage,
        RcOp::SelectChecksumCalculator,
    ];

    /// Wire opcode.
    pub fn opcode(self) -> u32 {
        OP_BASE + self as u32
    }

    /// Operation for a wire opcode. Unknown opcodes are protocol errors.
    pub fn from_opcode(opcode: u32) -> RcResult<Self> {
        opcode
            .checked_sub(OP_BASE)
            .and_then(|idx| Self::ALL.get(idx as usize).copied())
            .ok_or_else(|| {
                RenderControlError::protocol(format!("unknown render control opcode {opcode}"))
            })
    }

    /// Wire name, as published to guest encoders.
    pub fn name(self) -> &'static str {
        match self {
            RcOp::GetRendererVersion => "rcGetRendererVersion",
            RcOp::GetEglVersion => "rcGetEGLVersion",
            RcOp::QueryEglString => "rcQueryEGLString",
            RcOp::GetGlString => "rcGetGLString",
            RcOp::GetNumConfigs => "rcGetNumConfigs",
            RcOp::GetConfigs => "rcGetConfigs",
            RcOp::ChooseConfig => "rcChooseConfig",
            RcOp::GetFbParam => "rcGetFBParam",
            RcOp::CreateContext => "rcCreateContext",
            RcOp::DestroyContext => "rcDestroyContext",
            RcOp::CreateWindowSurface => "rcCreateWindowSurface",
            RcOp::DestroyWindowSurface => "rcDestroyWindowSurface",
            RcOp::CreateColorBuffer => "rcCreateColorBuffer",
            RcOp::OpenColorBuffer => "rcOpenColorBuffer",
            RcOp::CloseColorBuffer => "rcCloseColorBuffer",
            RcOp::SetWindowColorBuffer => "rcSetWindowColorBuffer",
            RcOp::FlushWindowColorBuffer => "rcFlushWindowColorBuffer",
            RcOp::MakeCurrent => "rcMakeCurrent",
            RcOp::FbPost => "rcFBPost",
            RcOp::FbSetSwapInterval => "rcFBSetSwapInterval",
            RcOp::BindTexture => "rcBindTexture",
            RcOp::BindRenderbuffer => "rcBindRenderbuffer",
            RcOp::ColorBufferCacheFlush => "rcColorBufferCacheFlush",
            RcOp::ReadColorBuffer => "rcReadColorBuffer",
            RcOp::UpdateColorBuffer => "rcUpdateColorBuffer",
            RcOp::OpenColorBuffer2 => "rcOpenColorBuffer2",
            RcOp::CreateClientImage => "rcCreateClientImage",
            RcOp::DestroyClientImage => "rcDestroyClientImage",
            RcOp::SelectChecksumCalculator => "rcSelectChecksumCalculator",
        }
    }

    /// Operations that take part in the color-buffer commit ordering.
    pub fn is_ordering_critical(self) -> bool {
        matches!(
            self,
            RcOp::FlushWindowColorBuffer | RcOp::ColorBufferCacheFlush | RcOp::UpdateColorBuffer
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/protocol/opcodes.rs"]
mod tests;
