use std::sync::{Arc, Once};

use tracing::{debug, warn};

use crate::{
    backend::{
        graphics::{ContextKind, EglVersion, GraphicsBackend},
        slot::BackendSlot,
    },
    checksum::calculator::MAX_VERSION_STRING,
    control::wire::{write_string_reply, write_words_reply},
    foundation::{
        config::FeatureFlags,
        handle::{Handle, PixelRect},
    },
    protocol::{
        enums::{
            FB_FPS, FB_HEIGHT, FB_MAX_SWAP_INTERVAL, FB_MIN_SWAP_INTERVAL, FB_WIDTH, FB_XDPI,
            FB_YDPI, GL_EXTENSIONS,
        },
        opcodes::RcOp,
    },
    sync::gate::OrderingGate,
    thread::info::{CurrentContext, RenderThreadInfo, TrivialContext},
};

/// Version of this render control implementation, reported to guests.
pub const RENDERER_VERSION: i32 = 1;

const FB_DPI: i32 = 72;
const FB_REFRESH_RATE: i32 = 60;
const FB_SWAP_INTERVAL: i32 = 1;

/// `(number of configs, attributes per config)` as reported by `GetNumConfigs`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfigPackInfo {
    /// Number of configs.
    pub count: u32,
    /// Attributes per config.
    pub attribs: u32,
}

/// The render control operation set.
///
/// Each method is one published guest operation. Failures are reported with
/// the sentinels the guest protocol defines: `false`, `Handle::NONE`, `-1`,
/// or a negative length for an undersized reply buffer (see
/// [`crate::control::wire`]). Methods never panic because the backend is
/// missing.
///
/// Operations that depend on the calling guest thread take that worker's
/// [`RenderThreadInfo`].
pub trait RenderControl {
    /// Version of this implementation, always [`RENDERER_VERSION`].
    fn get_renderer_version(&self) -> i32;

    /// EGL version of the backend, `None` without one.
    fn get_egl_version(&self) -> Option<EglVersion>;

    /// `eglQueryString` into `buf`, using the variable-length reply convention.
    fn query_egl_string(&self, name: u32, buf: &mut [u8]) -> i32;

    /// `glGetString` for the worker's current context. A worker without one
    /// gets a private GLES2 context bound first, and keeps it until it binds
    /// another context or is released.
    fn get_gl_string(&self, thread: &mut RenderThreadInfo, name: u32, buf: &mut [u8]) -> i32;

    /// Config count and attributes per config.
    fn get_num_configs(&self) -> ConfigPackInfo;

    /// Packed config table (header row first) into `buf`.
    fn get_configs(&self, buf: &mut [u32]) -> i32;

    /// Configs matching `attribs` into `configs`. Returns the number written.
    fn choose_config(&self, attribs: &[i32], configs: &mut [u32]) -> i32;

    /// One framebuffer parameter, `0` for unknown selectors.
    fn get_fb_param(&self, param: i32) -> i32;

    /// New context for `config`, optionally sharing with `share`.
    fn create_context(&self, config: Handle, share: Handle, gl_version: u32) -> Handle;

    /// Destroy `context`, clearing it from `thread` if it was current there.
    fn destroy_context(&self, thread: &mut RenderThreadInfo, context: Handle);

    /// New window surface for `config`.
    fn create_window_surface(&self, config: Handle, width: u32, height: u32) -> Handle;

    /// Destroy `surface`. Unknown handles are ignored.
    fn destroy_window_surface(&self, surface: Handle);

    /// New color buffer with a reference count of one.
    fn create_color_buffer(&self, width: u32, height: u32, internal_format: u32) -> Handle;

    /// Compatibility form of [`RenderControl::open_color_buffer2`] for guests
    /// that predate the status code.
    fn open_color_buffer(&self, color_buffer: Handle);

    /// Take a reference on `color_buffer`. Returns `0`, or `-1` if unknown.
    fn open_color_buffer2(&self, color_buffer: Handle) -> i32;

    /// Drop a reference on `color_buffer`.
    fn close_color_buffer(&self, color_buffer: Handle);

    /// Attach `color_buffer` to `surface`.
    fn set_window_color_buffer(&self, surface: Handle, color_buffer: Handle);

    /// Flush a surface's color buffer while holding the ordering gate.
    fn flush_window_color_buffer(&self, thread: &RenderThreadInfo, surface: Handle) -> i32;

    /// Bind `context` with `draw` / `read` on this worker. All three `NONE`
    /// unbinds.
    fn make_current(
        &self,
        thread: &mut RenderThreadInfo,
        context: Handle,
        draw: Handle,
        read: Handle,
    ) -> bool;

    /// Present `color_buffer`.
    fn fb_post(&self, color_buffer: Handle);

    /// Accepted and ignored.
    fn fb_set_swap_interval(&self, interval: i32);

    /// Bind `color_buffer` to the texture of the worker's current context.
    fn bind_texture(&self, thread: &RenderThreadInfo, color_buffer: Handle);

    /// Bind `color_buffer` to the renderbuffer of the worker's current context.
    fn bind_renderbuffer(&self, thread: &RenderThreadInfo, color_buffer: Handle);

    /// Lock phase of a guest buffer write: takes the ordering gate and keeps
    /// it on `thread` until the matching [`RenderControl::update_color_buffer`].
    fn color_buffer_cache_flush(
        &self,
        thread: &mut RenderThreadInfo,
        color_buffer: Handle,
        post_count: i32,
        for_read: bool,
    ) -> i32;

    /// Read `rect` of `color_buffer` into `out` as `format` / `ty`.
    fn read_color_buffer(
        &self,
        color_buffer: Handle,
        rect: PixelRect,
        format: u32,
        ty: u32,
        out: &mut [u8],
    );

    /// Commit phase of a guest buffer write: writes the pixels, then releases
    /// the gate taken by the preceding cache flush on this worker.
    fn update_color_buffer(
        &self,
        thread: &mut RenderThreadInfo,
        color_buffer: Handle,
        rect: PixelRect,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) -> i32;

    /// New client image from a texture of `context`.
    fn create_client_image(&self, context: Handle, target: u32, buffer: u32) -> Handle;

    /// Destroy `image`. Returns `1` on success, `0` if unknown.
    fn destroy_client_image(&self, image: Handle) -> i32;

    /// Switch the worker's pipe checksum protocol to `protocol`.
    fn select_checksum_calculator(
        &self,
        thread: &mut RenderThreadInfo,
        protocol: u32,
        reserved: u32,
    );

    /// Worker shutdown: unbind, destroy the host-created string query context
    /// and drop any held gate ticket. Not a guest operation.
    fn release_thread(&self, thread: &mut RenderThreadInfo);
}

/// [`RenderControl`] over an injected backend slot and ordering gate.
#[derive(Debug)]
pub struct RenderControlDispatcher {
    slot: BackendSlot,
    gate: Arc<OrderingGate>,
    features: FeatureFlags,
    announce: Once,
}

impl RenderControlDispatcher {
    /// Dispatcher over `slot`, ordered by `gate`.
    pub fn new(slot: BackendSlot, gate: Arc<OrderingGate>, features: FeatureFlags) -> Self {
        Self {
            slot,
            gate,
            features,
            announce: Once::new(),
        }
    }

    /// Dispatcher with a gate built from `features`.
    pub fn with_features(backend: Option<Arc<dyn GraphicsBackend>>, features: FeatureFlags) -> Self {
        let slot = match backend {
            Some(b) => BackendSlot::with_backend(b),
            None => BackendSlot::empty(),
        };
        Self::new(slot, Arc::new(OrderingGate::from_flags(&features)), features)
    }

    /// The slot holding the backend, for late install or teardown.
    pub fn backend_slot(&self) -> &BackendSlot {
        &self.slot
    }

    /// The gralloc ordering gate.
    pub fn gate(&self) -> &Arc<OrderingGate> {
        &self.gate
    }

    /// Feature flags this dispatcher was built with.
    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    fn backend(&self, op: RcOp) -> Option<Arc<dyn GraphicsBackend>> {
        let fb = self.slot.get();
        if fb.is_none() {
            debug!(op = op.name(), "no graphics backend");
        }
        fb
    }

    fn create_trivial_context(
        &self,
        fb: &dyn GraphicsBackend,
        thread: &mut RenderThreadInfo,
    ) -> Option<ContextKind> {
        let kind = ContextKind::Gles2;
        if let Some(trivial) = thread.trivial_context() {
            if fb.bind_context(thread.worker(), trivial.context, trivial.surface, trivial.surface) {
                thread.set_current(Some(CurrentContext {
                    context: trivial.context,
                    kind,
                    draw: trivial.surface,
                    read: trivial.surface,
                }));
                return Some(kind);
            }
            release_trivial_context(fb, thread);
        }

        let config = Handle(0);
        if fb.configs().get(config.0).is_none() {
            warn!("backend exposes no framebuffer config for string queries");
            return None;
        }

        let context = fb.create_render_context(config, Handle::NONE, kind);
        if context.is_none() {
            return None;
        }
        let surface = fb.create_pbuffer_surface(config, 1, 1);
        if surface.is_none() {
            fb.destroy_render_context(context);
            return None;
        }
        if !fb.bind_context(thread.worker(), context, surface, surface) {
            fb.destroy_window_surface(surface);
            fb.destroy_render_context(context);
            return None;
        }

        debug!(worker = thread.worker().0, %context, "bound trivial context for string query");
        thread.set_trivial_context(TrivialContext { context, surface });
        thread.set_current(Some(CurrentContext {
            context,
            kind,
            draw: surface,
            read: surface,
        }));
        Some(kind)
    }
}

fn release_trivial_context(fb: &dyn GraphicsBackend, thread: &mut RenderThreadInfo) {
    if let Some(trivial) = thread.take_trivial_context() {
        fb.destroy_window_surface(trivial.surface);
        fb.destroy_render_context(trivial.context);
        debug!(worker = thread.worker().0, context = %trivial.context, "released trivial context");
    }
}

fn with_protocol_token(extensions: &str) -> String {
    if extensions.is_empty() || extensions.ends_with(' ') {
        format!("{extensions}{MAX_VERSION_STRING} ")
    } else {
        format!("{extensions} {MAX_VERSION_STRING} ")
    }
}

fn current_context(thread: &RenderThreadInfo) -> Handle {
    thread
        .current_context()
        .map_or(Handle::NONE, |cur| cur.context)
}

impl RenderControl for RenderControlDispatcher {
    fn get_renderer_version(&self) -> i32 {
        self.announce.call_once(|| {
            debug!(
                version = RENDERER_VERSION,
                gralloc_sync = self.gate.is_enabled(),
                gl_pipe_checksum = self.features.gl_pipe_checksum,
                "render control ready"
            );
        });
        RENDERER_VERSION
    }

    fn get_egl_version(&self) -> Option<EglVersion> {
        self.backend(RcOp::GetEglVersion).map(|fb| fb.egl_version())
    }

    fn query_egl_string(&self, name: u32, buf: &mut [u8]) -> i32 {
        let s = self
            .backend(RcOp::QueryEglString)
            .and_then(|fb| fb.query_egl_string(name));
        write_string_reply(s.as_deref(), buf)
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(worker = thread.worker().0, name = name)
    )]
    fn get_gl_string(&self, thread: &mut RenderThreadInfo, name: u32, buf: &mut [u8]) -> i32 {
        let Some(fb) = self.backend(RcOp::GetGlString) else {
            return write_string_reply(None, buf);
        };

        let kind = match thread.current_context().map(|cur| cur.kind) {
            Some(kind) => kind,
            None => match self.create_trivial_context(&*fb, thread) {
                Some(kind) => kind,
                None => return write_string_reply(None, buf),
            },
        };

        let driver = fb.gl_string(kind, name);
        if self.features.gl_pipe_checksum && name == GL_EXTENSIONS {
            let extended = with_protocol_token(driver.as_deref().unwrap_or(""));
            return write_string_reply(Some(&extended), buf);
        }
        write_string_reply(driver.as_deref(), buf)
    }

    fn get_num_configs(&self) -> ConfigPackInfo {
        self.backend(RcOp::GetNumConfigs)
            .map(|fb| {
                let (count, attribs) = fb.configs().pack_info();
                ConfigPackInfo { count, attribs }
            })
            .unwrap_or_default()
    }

    fn get_configs(&self, buf: &mut [u32]) -> i32 {
        match self.backend(RcOp::GetConfigs) {
            Some(fb) => write_words_reply(&fb.configs().pack(), buf),
            None => 0,
        }
    }

    fn choose_config(&self, attribs: &[i32], configs: &mut [u32]) -> i32 {
        let Some(fb) = self.backend(RcOp::ChooseConfig) else {
            return 0;
        };
        if attribs.is_empty() {
            return 0;
        }
        fb.choose_config(attribs, configs)
    }

    fn get_fb_param(&self, param: i32) -> i32 {
        let Some(fb) = self.backend(RcOp::GetFbParam) else {
            return 0;
        };
        match param {
            FB_WIDTH => i32::try_from(fb.width()).unwrap_or(i32::MAX),
            FB_HEIGHT => i32::try_from(fb.height()).unwrap_or(i32::MAX),
            FB_XDPI | FB_YDPI => FB_DPI,
            FB_FPS => FB_REFRESH_RATE,
            FB_MIN_SWAP_INTERVAL | FB_MAX_SWAP_INTERVAL => FB_SWAP_INTERVAL,
            _ => 0,
        }
    }

    fn create_context(&self, config: Handle, share: Handle, gl_version: u32) -> Handle {
        match self.backend(RcOp::CreateContext) {
            Some(fb) => {
                fb.create_render_context(config, share, ContextKind::from_version_hint(gl_version))
            }
            None => Handle::NONE,
        }
    }

    fn destroy_context(&self, thread: &mut RenderThreadInfo, context: Handle) {
        let Some(fb) = self.backend(RcOp::DestroyContext) else {
            return;
        };
        if thread
            .trivial_context()
            .is_some_and(|trivial| trivial.context == context)
        {
            release_trivial_context(&*fb, thread);
        } else {
            fb.destroy_render_context(context);
        }
        if current_context(thread) == context {
            thread.set_current(None);
        }
    }

    fn create_window_surface(&self, config: Handle, width: u32, height: u32) -> Handle {
        match self.backend(RcOp::CreateWindowSurface) {
            Some(fb) => fb.create_window_surface(config, width, height),
            None => Handle::NONE,
        }
    }

    fn destroy_window_surface(&self, surface: Handle) {
        if let Some(fb) = self.backend(RcOp::DestroyWindowSurface) {
            fb.destroy_window_surface(surface);
        }
    }

    fn create_color_buffer(&self, width: u32, height: u32, internal_format: u32) -> Handle {
        match self.backend(RcOp::CreateColorBuffer) {
            Some(fb) => fb.create_color_buffer(width, height, internal_format),
            None => Handle::NONE,
        }
    }

    fn open_color_buffer(&self, color_buffer: Handle) {
        let _ = self.open_color_buffer2(color_buffer);
    }

    fn open_color_buffer2(&self, color_buffer: Handle) -> i32 {
        match self.backend(RcOp::OpenColorBuffer2) {
            Some(fb) => fb.open_color_buffer(color_buffer),
            None => -1,
        }
    }

    fn close_color_buffer(&self, color_buffer: Handle) {
        if let Some(fb) = self.backend(RcOp::CloseColorBuffer) {
            fb.close_color_buffer(color_buffer);
        }
    }

    fn set_window_color_buffer(&self, surface: Handle, color_buffer: Handle) {
        if let Some(fb) = self.backend(RcOp::SetWindowColorBuffer)
            && !fb.set_window_surface_color_buffer(surface, color_buffer)
        {
            debug!(%surface, %color_buffer, "set window color buffer failed");
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(worker = thread.worker().0, %surface))]
    fn flush_window_color_buffer(&self, thread: &RenderThreadInfo, surface: Handle) -> i32 {
        // A worker between cache flush and update is already serialized;
        // taking a second ticket would wait on itself.
        let _hold = (!thread.holds_gate()).then(|| self.gate.acquire());

        let Some(fb) = self.backend(RcOp::FlushWindowColorBuffer) else {
            return -1;
        };
        if fb.flush_window_surface_color_buffer(surface) {
            0
        } else {
            -1
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(worker = thread.worker().0, %context))]
    fn make_current(
        &self,
        thread: &mut RenderThreadInfo,
        context: Handle,
        draw: Handle,
        read: Handle,
    ) -> bool {
        let Some(fb) = self.backend(RcOp::MakeCurrent) else {
            return false;
        };
        if !fb.bind_context(thread.worker(), context, draw, read) {
            return false;
        }

        let current = fb.context_kind(context).map(|kind| CurrentContext {
            context,
            kind,
            draw,
            read,
        });
        thread.set_current(current);
        if thread
            .trivial_context()
            .is_some_and(|trivial| trivial.context != context)
        {
            release_trivial_context(&*fb, thread);
        }
        true
    }

    fn fb_post(&self, color_buffer: Handle) {
        if let Some(fb) = self.backend(RcOp::FbPost)
            && !fb.post(color_buffer)
        {
            debug!(%color_buffer, "post failed");
        }
    }

    fn fb_set_swap_interval(&self, _interval: i32) {}

    fn bind_texture(&self, thread: &RenderThreadInfo, color_buffer: Handle) {
        if let Some(fb) = self.backend(RcOp::BindTexture) {
            fb.bind_color_buffer_to_texture(current_context(thread), color_buffer);
        }
    }

    fn bind_renderbuffer(&self, thread: &RenderThreadInfo, color_buffer: Handle) {
        if let Some(fb) = self.backend(RcOp::BindRenderbuffer) {
            fb.bind_color_buffer_to_renderbuffer(current_context(thread), color_buffer);
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(worker = thread.worker().0, %color_buffer))]
    fn color_buffer_cache_flush(
        &self,
        thread: &mut RenderThreadInfo,
        color_buffer: Handle,
        _post_count: i32,
        _for_read: bool,
    ) -> i32 {
        if thread.holds_gate() {
            warn!(%color_buffer, "cache flush while this worker already holds the gralloc gate");
            return 0;
        }
        let hold = self.gate.acquire();
        if hold.ticket().is_some() {
            thread.park_gate_hold(hold);
        }
        0
    }

    fn read_color_buffer(
        &self,
        color_buffer: Handle,
        rect: PixelRect,
        format: u32,
        ty: u32,
        out: &mut [u8],
    ) {
        if let Some(fb) = self.backend(RcOp::ReadColorBuffer)
            && !fb.read_color_buffer(color_buffer, rect, format, ty, out)
        {
            debug!(%color_buffer, ?rect, "read color buffer failed");
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(worker = thread.worker().0, %color_buffer))]
    fn update_color_buffer(
        &self,
        thread: &mut RenderThreadInfo,
        color_buffer: Handle,
        rect: PixelRect,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) -> i32 {
        // Released only after the write lands, on every path.
        let _hold = thread.take_gate_hold();

        let Some(fb) = self.backend(RcOp::UpdateColorBuffer) else {
            return -1;
        };
        if !fb.update_color_buffer(color_buffer, rect, format, ty, pixels) {
            debug!(%color_buffer, ?rect, "update color buffer failed");
        }
        0
    }

    fn create_client_image(&self, context: Handle, target: u32, buffer: u32) -> Handle {
        match self.backend(RcOp::CreateClientImage) {
            Some(fb) => fb.create_client_image(context, target, buffer),
            None => Handle::NONE,
        }
    }

    fn destroy_client_image(&self, image: Handle) -> i32 {
        match self.backend(RcOp::DestroyClientImage) {
            Some(fb) => i32::from(fb.destroy_client_image(image)),
            None => 0,
        }
    }

    fn select_checksum_calculator(
        &self,
        thread: &mut RenderThreadInfo,
        protocol: u32,
        _reserved: u32,
    ) {
        thread.checksum_mut().set_version(protocol);
    }

    #[tracing::instrument(level = "trace", skip_all, fields(worker = thread.worker().0))]
    fn release_thread(&self, thread: &mut RenderThreadInfo) {
        drop(thread.take_gate_hold());
        if let Some(fb) = self.slot.get() {
            if thread.current_context().is_some()
                && !fb.bind_context(thread.worker(), Handle::NONE, Handle::NONE, Handle::NONE)
            {
                debug!("unbind on release failed");
            }
            release_trivial_context(&*fb, thread);
        }
        let _ = thread.take_trivial_context();
        thread.set_current(None);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/control/dispatcher.rs"]
mod tests;
