//! Typed requests and replies for the render control operation table.
//!
//! A [`Request`] carries exactly the arguments the guest encoder sends for one
//! opcode; output buffers are described by their capacity only. [`execute`]
//! allocates the reply buffer, runs the operation and packs the result into a
//! [`Response`].

use tracing::warn;

use crate::{
    control::{dispatcher::RenderControl, wire::read_string_reply},
    foundation::{
        error::{RenderControlError, RcResult},
        handle::{Handle, PixelRect},
    },
    protocol::{enums::bytes_per_pixel, opcodes::RcOp},
    thread::info::RenderThreadInfo,
};

/// Largest reply buffer a single request may ask the host to allocate.
pub const MAX_REPLY_BYTES: usize = 16 << 20;

/// One decoded render control request.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// [`RcOp::GetRendererVersion`].
    GetRendererVersion,
    /// [`RcOp::GetEglVersion`].
    GetEglVersion,
    /// [`RcOp::QueryEglString`].
    QueryEglString {
        /// EGL string selector.
        name: u32,
        /// Reply buffer size in bytes.
        capacity: u32,
    },
    /// [`RcOp::GetGlString`].
    GetGlString {
        /// GL string selector.
        name: u32,
        /// Reply buffer size in bytes.
        capacity: u32,
    },
    /// [`RcOp::GetNumConfigs`].
    GetNumConfigs,
    /// [`RcOp::GetConfigs`].
    GetConfigs {
        /// Reply buffer size in 32-bit words.
        capacity: u32,
    },
    /// [`RcOp::ChooseConfig`].
    ChooseConfig {
        /// `EGL_NONE`-terminated attribute list.
        attribs: Vec<i32>,
        /// Reply buffer size in config handles.
        capacity: u32,
    },
    /// [`RcOp::GetFbParam`].
    GetFbParam {
        /// Parameter selector.
        param: i32,
    },
    /// [`RcOp::CreateContext`].
    CreateContext {
        /// Config handle.
        config: Handle,
        /// Context to share objects with, if any.
        #[serde(default)]
        share: Handle,
        /// Requested GL major version.
        gl_version: u32,
    },
    /// [`RcOp::DestroyContext`].
    DestroyContext {
        /// Context to destroy.
        context: Handle,
    },
    /// [`RcOp::CreateWindowSurface`].
    CreateWindowSurface {
        /// Config handle.
        config: Handle,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// [`RcOp::DestroyWindowSurface`].
    DestroyWindowSurface {
        /// Surface to destroy.
        surface: Handle,
    },
    /// [`RcOp::CreateColorBuffer`].
    CreateColorBuffer {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// GL internal format.
        internal_format: u32,
    },
    /// [`RcOp::OpenColorBuffer`].
    OpenColorBuffer {
        /// Target color buffer.
        color_buffer: Handle,
    },
    /// [`RcOp::CloseColorBuffer`].
    CloseColorBuffer {
        /// Target color buffer.
        color_buffer: Handle,
    },
    /// [`RcOp::SetWindowColorBuffer`].
    SetWindowColorBuffer {
        /// Window surface.
        surface: Handle,
        /// Color buffer to attach.
        color_buffer: Handle,
    },
    /// [`RcOp::FlushWindowColorBuffer`].
    FlushWindowColorBuffer {
        /// Window surface.
        surface: Handle,
    },
    /// [`RcOp::MakeCurrent`].
    MakeCurrent {
        /// Context to bind, `0` to unbind.
        context: Handle,
        /// Draw surface.
        draw: Handle,
        /// Read surface.
        read: Handle,
    },
    /// [`RcOp::FbPost`].
    FbPost {
        /// Color buffer to present.
        color_buffer: Handle,
    },
    /// [`RcOp::FbSetSwapInterval`].
    FbSetSwapInterval {
        /// Requested interval.
        interval: i32,
    },
    /// [`RcOp::BindTexture`].
    BindTexture {
        /// Target color buffer.
        color_buffer: Handle,
    },
    /// [`RcOp::BindRenderbuffer`].
    BindRenderbuffer {
        /// Target color buffer.
        color_buffer: Handle,
    },
    /// [`RcOp::ColorBufferCacheFlush`].
    ColorBufferCacheFlush {
        /// Target color buffer.
        color_buffer: Handle,
        /// Guest post count, unused.
        #[serde(default)]
        post_count: i32,
        /// Whether the lock is for reading, unused.
        #[serde(default)]
        for_read: bool,
    },
    /// [`RcOp::ReadColorBuffer`].
    ReadColorBuffer {
        /// Source color buffer.
        color_buffer: Handle,
        /// Region to read.
        rect: PixelRect,
        /// Pixel format of the reply.
        format: u32,
        /// Pixel type of the reply.
        ty: u32,
    },
    /// [`RcOp::UpdateColorBuffer`].
    UpdateColorBuffer {
        /// Target color buffer.
        color_buffer: Handle,
        /// Region to write.
        rect: PixelRect,
        /// Pixel format of `pixels`.
        format: u32,
        /// Pixel type of `pixels`.
        ty: u32,
        /// Tightly packed source pixels.
        pixels: Vec<u8>,
    },
    /// [`RcOp::OpenColorBuffer2`].
    OpenColorBuffer2 {
        /// Target color buffer.
        color_buffer: Handle,
    },
    /// [`RcOp::CreateClientImage`].
    CreateClientImage {
        /// Owning context.
        context: Handle,
        /// Image target.
        target: u32,
        /// Source buffer name.
        buffer: u32,
    },
    /// [`RcOp::DestroyClientImage`].
    DestroyClientImage {
        /// Image to destroy.
        image: Handle,
    },
    /// [`RcOp::SelectChecksumCalculator`].
    SelectChecksumCalculator {
        /// Checksum protocol version.
        protocol: u32,
        /// Unused.
        #[serde(default)]
        reserved: u32,
    },
}

impl Request {
    /// Operation this request invokes.
    pub fn op(&self) -> RcOp {
        match self {
            Request::GetRendererVersion => RcOp::GetRendererVersion,
            Request::GetEglVersion => RcOp::GetEglVersion,
            Request::QueryEglString { .. } => RcOp::QueryEglString,
            Request::GetGlString { .. } => RcOp::GetGlString,
            Request::GetNumConfigs => RcOp::GetNumConfigs,
            Request::GetConfigs { .. } => RcOp::GetConfigs,
            Request::ChooseConfig { .. } => RcOp::ChooseConfig,
            Request::GetFbParam { .. } => RcOp::GetFbParam,
            Request::CreateContext { .. } => RcOp::CreateContext,
            Request::DestroyContext { .. } => RcOp::DestroyContext,
            Request::CreateWindowSurface { .. } => RcOp::CreateWindowSurface,
            Request::DestroyWindowSurface { .. } => RcOp::DestroyWindowSurface,
            Request::CreateColorBuffer { .. } => RcOp::CreateColorBuffer,
            Request::OpenColorBuffer { .. } => RcOp::OpenColorBuffer,
            Request::CloseColorBuffer { .. } => RcOp::CloseColorBuffer,
            Request::SetWindowColorBuffer { .. } => RcOp::SetWindowColorBuffer,
            Request::FlushWindowColorBuffer { .. } => RcOp::FlushWindowColorBuffer,
            Request::MakeCurrent { .. } => RcOp::MakeCurrent,
            Request::FbPost { .. } => RcOp::FbPost,
            Request::FbSetSwapInterval { .. } => RcOp::FbSetSwapInterval,
            Request::BindTexture { .. } => RcOp::BindTexture,
            Request::BindRenderbuffer { .. } => RcOp::BindRenderbuffer,
            Request::ColorBufferCacheFlush { .. } => RcOp::ColorBufferCacheFlush,
            Request::ReadColorBuffer { .. } => RcOp::ReadColorBuffer,
            Request::UpdateColorBuffer { .. } => RcOp::UpdateColorBuffer,
            Request::OpenColorBuffer2 { .. } => RcOp::OpenColorBuffer2,
            Request::CreateClientImage { .. } => RcOp::CreateClientImage,
            Request::DestroyClientImage { .. } => RcOp::DestroyClientImage,
            Request::SelectChecksumCalculator { .. } => RcOp::SelectChecksumCalculator,
        }
    }

    /// Decode one request from JSON.
    pub fn from_json(s: &str) -> RcResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| RenderControlError::protocol(format!("decode request: {e}")))
    }
}

/// Reply to one [`Request`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    /// The operation has no return value.
    None,
    /// Integer result.
    Int {
        /// Returned value.
        value: i32,
    },
    /// Newly created resource, `0` on failure.
    Handle {
        /// Returned handle.
        handle: Handle,
    },
    /// Boolean result.
    Bool {
        /// Returned value.
        value: bool,
    },
    /// Reply to [`RcOp::GetEglVersion`].
    EglVersion {
        /// Whether a backend answered.
        ok: bool,
        /// Major version.
        major: i32,
        /// Minor version.
        minor: i32,
    },
    /// Reply to [`RcOp::GetNumConfigs`].
    NumConfigs {
        /// Number of configs.
        count: u32,
        /// Attributes per config.
        attribs: u32,
    },
    /// Result code of a string query plus the string it wrote.
    Text {
        /// `+L` written, `-L` needed, or `0`.
        code: i32,
        /// String read back from the reply buffer.
        text: String,
    },
    /// Result code of a word-array query plus the words written.
    Words {
        /// Words written, or `-L` needed.
        code: i32,
        /// Words read back from the reply buffer.
        words: Vec<u32>,
    },
    /// Pixels read from a color buffer.
    Pixels {
        /// Packed pixel data.
        pixels: Vec<u8>,
    },
}

impl Response {
    /// The integer result code, where the operation has one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Response::Int { value } => Some(*value),
            Response::Text { code, .. } | Response::Words { code, .. } => Some(*code),
            Response::Bool { value } => Some(i32::from(*value)),
            Response::Handle { handle } => i32::try_from(handle.0).ok(),
            _ => None,
        }
    }
}

// A clamped buffer can never hold a reply larger than `MAX_REPLY_BYTES`, so
// the guest would retry with `-L` indefinitely. Say so.
fn reply_capacity(op: RcOp, capacity: u32, unit: usize) -> usize {
    let limit = MAX_REPLY_BYTES / unit;
    let requested = capacity as usize;
    if requested > limit {
        warn!(op = op.name(), requested, limit, "reply buffer clamped");
        return limit;
    }
    requested
}

fn read_reply_len(rect: &PixelRect, format: u32, ty: u32) -> usize {
    let bpp = bytes_per_pixel(format, ty).unwrap_or(0);
    let len = rect.pixel_count().saturating_mul(bpp);
    if len > MAX_REPLY_BYTES {
        warn!(?rect, len, limit = MAX_REPLY_BYTES, "pixel readback clamped");
        return MAX_REPLY_BYTES;
    }
    len
}

/// Run one request against `rc` on behalf of the worker owning `thread`.
pub fn execute<R>(rc: &R, thread: &mut RenderThreadInfo, req: &Request) -> Response
where
    R: RenderControl + ?Sized,
{
    match req {
        Request::GetRendererVersion => Response::Int {
            value: rc.get_renderer_version(),
        },
        Request::GetEglVersion => match rc.get_egl_version() {
            Some(v) => Response::EglVersion {
                ok: true,
                major: v.major,
                minor: v.minor,
            },
            None => Response::EglVersion {
                ok: false,
                major: 0,
                minor: 0,
            },
        },
        Request::QueryEglString { name, capacity } => {
            let mut buf = vec![0u8; reply_capacity(RcOp::QueryEglString, *capacity, 1)];
            let code = rc.query_egl_string(*name, &mut buf);
            text_reply(code, &buf)
        }
        Request::GetGlString { name, capacity } => {
            let mut buf = vec![0u8; reply_capacity(RcOp::GetGlString, *capacity, 1)];
            let code = rc.get_gl_string(thread, *name, &mut buf);
            text_reply(code, &buf)
        }
        Request::GetNumConfigs => {
            let info = rc.get_num_configs();
            Response::NumConfigs {
                count: info.count,
                attribs: info.attribs,
            }
        }
        Request::GetConfigs { capacity } => {
            let mut buf = vec![0u32; reply_capacity(RcOp::GetConfigs, *capacity, 4)];
            let code = rc.get_configs(&mut buf);
            words_reply(code, buf)
        }
        Request::ChooseConfig { attribs, capacity } => {
            let mut buf = vec![0u32; reply_capacity(RcOp::ChooseConfig, *capacity, 4)];
            let code = rc.choose_config(attribs, &mut buf);
            let written = usize::try_from(code).unwrap_or(0).min(buf.len());
            buf.truncate(written);
            Response::Words { code, words: buf }
        }
        Request::GetFbParam { param } => Response::Int {
            value: rc.get_fb_param(*param),
        },
        Request::CreateContext {
            config,
            share,
            gl_version,
        } => Response::Handle {
            handle: rc.create_context(*config, *share, *gl_version),
        },
        Request::DestroyContext { context } => {
            rc.destroy_context(thread, *context);
            Response::None
        }
        Request::CreateWindowSurface {
            config,
            width,
            height,
        } => Response::Handle {
            handle: rc.create_window_surface(*config, *width, *height),
        },
        Request::DestroyWindowSurface { surface } => {
            rc.destroy_window_surface(*surface);
            Response::None
        }
        Request::CreateColorBuffer {
            width,
            height,
            internal_format,
        } => Response::Handle {
            handle: rc.create_color_buffer(*width, *height, *internal_format),
        },
        Request::OpenColorBuffer { color_buffer } => {
            rc.open_color_buffer(*color_buffer);
            Response::None
        }
        Request::CloseColorBuffer { color_buffer } => {
            rc.close_color_buffer(*color_buffer);
            Response::None
        }
        Request::SetWindowColorBuffer {
            surface,
            color_buffer,
        } => {
            rc.set_window_color_buffer(*surface, *color_buffer);
            Response::None
        }
        Request::FlushWindowColorBuffer { surface } => Response::Int {
            value: rc.flush_window_color_buffer(thread, *surface),
        },
        Request::MakeCurrent {
            context,
            draw,
            read,
        } => Response::Bool {
            value: rc.make_current(thread, *context, *draw, *read),
        },
        Request::FbPost { color_buffer } => {
            rc.fb_post(*color_buffer);
            Response::None
        }
        Request::FbSetSwapInterval { interval } => {
            rc.fb_set_swap_interval(*interval);
            Response::None
        }
        Request::BindTexture { color_buffer } => {
            rc.bind_texture(thread, *color_buffer);
            Response::None
        }
        Request::BindRenderbuffer { color_buffer } => {
            rc.bind_renderbuffer(thread, *color_buffer);
            Response::None
        }
        Request::ColorBufferCacheFlush {
            color_buffer,
            post_count,
            for_read,
        } => Response::Int {
            value: rc.color_buffer_cache_flush(thread, *color_buffer, *post_count, *for_read),
        },
        Request::ReadColorBuffer {
            color_buffer,
            rect,
            format,
            ty,
        } => {
            let mut pixels = vec![0u8; read_reply_len(rect, *format, *ty)];
            rc.read_color_buffer(*color_buffer, *rect, *format, *ty, &mut pixels);
            Response::Pixels { pixels }
        }
        Request::UpdateColorBuffer {
            color_buffer,
            rect,
            format,
            ty,
            pixels,
        } => Response::Int {
            value: rc.update_color_buffer(thread, *color_buffer, *rect, *format, *ty, pixels),
        },
        Request::OpenColorBuffer2 { color_buffer } => Response::Int {
            value: rc.open_color_buffer2(*color_buffer),
        },
        Request::CreateClientImage {
            context,
            target,
            buffer,
        } => Response::Handle {
            handle: rc.create_client_image(*context, *target, *buffer),
        },
        Request::DestroyClientImage { image } => Response::Int {
            value: rc.destroy_client_image(*image),
        },
        Request::SelectChecksumCalculator { protocol, reserved } => {
            rc.select_checksum_calculator(thread, *protocol, *reserved);
            Response::None
        }
    }
}

fn text_reply(code: i32, buf: &[u8]) -> Response {
    let text = if code > 0 {
        read_string_reply(buf).to_owned()
    } else {
        String::new()
    };
    Response::Text { code, text }
}

fn words_reply(code: i32, mut buf: Vec<u32>) -> Response {
    let written = usize::try_from(code).unwrap_or(0);
    buf.truncate(written);
    Response::Words { code, words: buf }
}

#[cfg(test)]
#[path = "../../tests/unit/control/decoder.rs"]
mod tests;
