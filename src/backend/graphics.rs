use crate::{
    backend::configs::ConfigTable,
    foundation::handle::{Handle, PixelRect, WorkerId},
};

/// Family of a rendering context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ContextKind {
    /// OpenGL ES 1.x (fixed function).
    Gles1,
    /// OpenGL ES 2.0 and later.
    Gles2,
}

impl ContextKind {
    /// Map the guest's requested GL major version to a context family.
    ///
    /// Guests request 2 or 3 for programmable pipelines; everything else is
    /// treated as GLES1.
    pub fn from_version_hint(gl_version: u32) -> Self {
        match gl_version {
            2 | 3 => ContextKind::Gles2,
            _ => ContextKind::Gles1,
        }
    }
}

/// Version of the host EGL implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EglVersion {
    /// Major version.
    pub major: i32,
    /// Minor version.
    pub minor: i32,
}

/// The host graphics resource manager the render control layer drives.
///
/// Implementations own every context, surface, color buffer and client image
/// and hand out the [`Handle`]s that name them. Methods take `&self`: workers
/// call in concurrently and implementations are responsible for their own
/// internal synchronization.
pub trait GraphicsBackend: Send + Sync {
    /// EGL version of the host implementation.
    fn egl_version(&self) -> EglVersion;

    /// `eglQueryString(name)`, `None` for unknown selectors.
    fn query_egl_string(&self, name: u32) -> Option<String>;

    /// String reported by `glGetString(name)` for a context of `kind`.
    fn gl_string(&self, kind: ContextKind, name: u32) -> Option<String>;

    /// Framebuffer configs exposed to the guest.
    fn configs(&self) -> &ConfigTable;

    /// Fill `out` with handles of configs matching the `EGL_NONE`-terminated
    /// attribute list and return the number of matches (which may exceed
    /// `out.len()`).
    fn choose_config(&self, attribs: &[i32], out: &mut [u32]) -> i32;

    /// Display width in pixels.
    fn width(&self) -> u32;

    /// Display height in pixels.
    fn height(&self) -> u32;

    /// New context for `config`, `Handle::NONE` on failure.
    fn create_render_context(&self, config: Handle, share: Handle, kind: ContextKind) -> Handle;

    /// Destroy `context` and unbind it from any worker.
    fn destroy_render_context(&self, context: Handle);

    /// Family of `context`, `None` if unknown.
    fn context_kind(&self, context: Handle) -> Option<ContextKind>;

    /// New window surface for `config`, `Handle::NONE` on failure.
    fn create_window_surface(&self, config: Handle, width: u32, height: u32) -> Handle;

    /// Off-screen surface, used for the context created to answer string queries.
    fn create_pbuffer_surface(&self, config: Handle, width: u32, height: u32) -> Handle;

    /// Destroy a window or pbuffer surface.
    fn destroy_window_surface(&self, surface: Handle);

    /// New color buffer with one reference, `Handle::NONE` on failure.
    fn create_color_buffer(&self, width: u32, height: u32, internal_format: u32) -> Handle;

    /// Take a reference on a color buffer. `0` on success, `-1` otherwise.
    fn open_color_buffer(&self, color_buffer: Handle) -> i32;

    /// Drop one reference; the last one frees the buffer.
    fn close_color_buffer(&self, color_buffer: Handle);

    /// Attach `color_buffer` to `surface`.
    fn set_window_surface_color_buffer(&self, surface: Handle, color_buffer: Handle) -> bool;

    /// Resolve `surface` into its attached color buffer.
    fn flush_window_surface_color_buffer(&self, surface: Handle) -> bool;

    /// Bind `context` with the given surfaces on `worker`. `Handle::NONE` for
    /// all three unbinds the worker's current context.
    fn bind_context(&self, worker: WorkerId, context: Handle, draw: Handle, read: Handle) -> bool;

    /// Present `color_buffer` on the display.
    fn post(&self, color_buffer: Handle) -> bool;

    /// Bind `color_buffer` as the texture of `context`.
    fn bind_color_buffer_to_texture(&self, context: Handle, color_buffer: Handle) -> bool;

    /// Bind `color_buffer` as the renderbuffer of `context`.
    fn bind_color_buffer_to_renderbuffer(&self, context: Handle, color_buffer: Handle) -> bool;

    /// Copy `rect` of `color_buffer` into `out` as `format` / `ty`.
    fn read_color_buffer(
        &self,
        color_buffer: Handle,
        rect: PixelRect,
        format: u32,
        ty: u32,
        out: &mut [u8],
    ) -> bool;

    /// Write `pixels` in `format` / `ty` into `rect` of `color_buffer`.
    fn update_color_buffer(
        &self,
        color_buffer: Handle,
        rect: PixelRect,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) -> bool;

    /// New client image from `buffer` of `context`.
    fn create_client_image(&self, context: Handle, target: u32, buffer: u32) -> Handle;

    /// Destroy `image`. `false` if unknown.
    fn destroy_client_image(&self, image: Handle) -> bool;
}

#[cfg(test)]
#[path = "../../tests/unit/backend/graphics.rs"]
mod tests;
