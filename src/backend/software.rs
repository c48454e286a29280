use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::debug;

use crate::{
    backend::{
        configs::{ConfigTable, FbConfig},
        graphics::{ContextKind, EglVersion, GraphicsBackend},
    },
    foundation::{
        error::{RenderControlError, RcResult},
        handle::{Handle, PixelRect, WorkerId},
    },
    protocol::enums::{
        EGL_CLIENT_APIS, EGL_EXTENSIONS, EGL_GL_TEXTURE_2D_KHR, EGL_NATIVE_BUFFER_ANDROID,
        EGL_VENDOR, EGL_VERSION, GL_EXTENSIONS, GL_RENDERER, GL_UNSIGNED_BYTE, GL_VENDOR,
        GL_VERSION, bytes_per_pixel,
    },
};

/// Options for [`SoftwareBackend`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SoftwareBackendOpts {
    /// Display width in pixels.
    pub width: u32,
    /// Display height in pixels.
    pub height: u32,
    /// Reported EGL version.
    pub egl_version: EglVersion,
    /// `GL_VENDOR` and `EGL_VENDOR` string.
    pub vendor: String,
    /// `GL_RENDERER` string.
    pub renderer: String,
    /// `GL_VERSION` for GLES1 contexts.
    pub gles1_version: String,
    /// `GL_VERSION` for GLES2 contexts.
    pub gles2_version: String,
    /// `GL_EXTENSIONS` for GLES1 contexts.
    pub gles1_extensions: String,
    /// `GL_EXTENSIONS` for GLES2 contexts.
    pub gles2_extensions: String,
    /// `EGL_EXTENSIONS` string.
    pub egl_extensions: String,
    /// Framebuffer configs, indexed in order.
    pub configs: Vec<FbConfig>,
}

impl Default for SoftwareBackendOpts {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            egl_version: EglVersion { major: 1, minor: 4 },
            vendor: "Render Control".to_owned(),
            renderer: "Software Rasterizer".to_owned(),
            gles1_version: "OpenGL ES-CM 1.1".to_owned(),
            gles2_version: "OpenGL ES 3.0".to_owned(),
            gles1_extensions: "GL_OES_EGL_image GL_OES_framebuffer_object ".to_owned(),
            gles2_extensions: concat!(
                "GL_OES_EGL_image GL_OES_EGL_image_external ",
                "GL_OES_depth24 GL_OES_packed_depth_stencil "
            )
            .to_owned(),
            egl_extensions: concat!(
                "EGL_KHR_image_base EGL_KHR_gl_texture_2D_image ",
                "EGL_ANDROID_image_native_buffer"
            )
            .to_owned(),
            configs: vec![
                FbConfig::rgba8888(24, 8),
                FbConfig::rgba8888(0, 0),
                FbConfig::rgb565(),
            ],
        }
    }
}

/// Observable state of one color buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorBufferStats {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Open references.
    pub refcount: u32,
    /// Successful updates.
    pub updates: u64,
    /// Window surface flushes into this buffer.
    pub flushes: u64,
    /// Times presented.
    pub posts: u64,
}

#[derive(Debug)]
struct ContextEntry {
    kind: ContextKind,
    bound_by: Option<WorkerId>,
    texture: Option<Handle>,
    renderbuffer: Option<Handle>,
}

#[derive(Debug)]
struct SurfaceEntry {
    color_buffer: Option<Handle>,
}

#[derive(Debug)]
struct ColorBufferEntry {
    stats: ColorBufferStats,
    // RGBA8, row-major.
    pixels: Vec<u8>,
}

#[derive(Debug)]
struct State {
    next_handle: u32,
    contexts: HashMap<Handle, ContextEntry>,
    surfaces: HashMap<Handle, SurfaceEntry>,
    color_buffers: HashMap<Handle, ColorBufferEntry>,
    images: HashMap<Handle, (Handle, u32)>,
    bindings: HashMap<WorkerId, Handle>,
    last_posted: Option<Handle>,
}

impl State {
    fn gen_handle(&mut self) -> Handle {
        loop {
            let h = Handle(self.next_handle);
            self.next_handle = self.next_handle.wrapping_add(1);
            if h.is_some()
                && !self.contexts.contains_key(&h)
                && !self.surfaces.contains_key(&h)
                && !self.color_buffers.contains_key(&h)
                && !self.images.contains_key(&h)
            {
                return h;
            }
        }
    }

    fn unbind_worker(&mut self, worker: WorkerId) {
        if let Some(prev) = self.bindings.remove(&worker)
            && let Some(ctx) = self.contexts.get_mut(&prev)
        {
            ctx.bound_by = None;
        }
    }
}

/// In-memory reference implementation of [`GraphicsBackend`].
///
/// Keeps handle tables and RGBA8 pixel storage without touching a GPU. Used
/// by tests and by the replay tool.
#[derive(Debug)]
pub struct SoftwareBackend {
    opts: SoftwareBackendOpts,
    configs: ConfigTable,
    state: Mutex<State>,
}

impl SoftwareBackend {
    /// Backend configured by `opts`. Fails on a zero display size or an empty config list.
    pub fn new(opts: SoftwareBackendOpts) -> RcResult<Self> {
        if opts.width == 0 || opts.height == 0 {
            return Err(RenderControlError::backend(
                "software backend display size must be non-zero",
            ));
        }
        if opts.configs.is_empty() {
            return Err(RenderControlError::backend(
                "software backend needs at least one framebuffer config",
            ));
        }
        let configs = ConfigTable::new(opts.configs.clone());
        Ok(Self {
            opts,
            configs,
            state: Mutex::new(State {
                next_handle: 1,
                contexts: HashMap::new(),
                surfaces: HashMap::new(),
                color_buffers: HashMap::new(),
                images: HashMap::new(),
                bindings: HashMap::new(),
                last_posted: None,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counters of a color buffer, `None` if unknown.
    pub fn color_buffer_stats(&self, color_buffer: Handle) -> Option<ColorBufferStats> {
        self.state()
            .color_buffers
            .get(&color_buffer)
            .map(|cb| cb.stats)
    }

    /// Copy of the RGBA8 contents of a color buffer.
    pub fn color_buffer_pixels(&self, color_buffer: Handle) -> Option<Vec<u8>> {
        self.state()
            .color_buffers
            .get(&color_buffer)
            .map(|cb| cb.pixels.clone())
    }

    /// Context `worker` has bound.
    pub fn bound_context(&self, worker: WorkerId) -> Option<Handle> {
        self.state().bindings.get(&worker).copied()
    }

    /// Color buffer attached to `surface`.
    pub fn surface_color_buffer(&self, surface: Handle) -> Option<Handle> {
        self.state()
            .surfaces
            .get(&surface)
            .and_then(|s| s.color_buffer)
    }

    /// Color buffer last bound as `context`'s texture.
    pub fn texture_binding(&self, context: Handle) -> Option<Handle> {
        self.state().contexts.get(&context).and_then(|c| c.texture)
    }

    /// Color buffer last bound as `context`'s renderbuffer.
    pub fn renderbuffer_binding(&self, context: Handle) -> Option<Handle> {
        self.state()
            .contexts
            .get(&context)
            .and_then(|c| c.renderbuffer)
    }

    /// Color buffer most recently presented.
    pub fn last_posted(&self) -> Option<Handle> {
        self.state().last_posted
    }

    /// Number of live resources of every kind.
    pub fn live_handles(&self) -> usize {
        let st = self.state();
        st.contexts.len() + st.surfaces.len() + st.color_buffers.len() + st.images.len()
    }

    fn create_surface(&self, config: Handle, width: u32, height: u32) -> Handle {
        if self.configs.get(config.0).is_none() || width == 0 || height == 0 {
            return Handle::NONE;
        }
        let mut st = self.state();
        let h = st.gen_handle();
        st.surfaces.insert(h, SurfaceEntry { color_buffer: None });
        h
    }
}

impl GraphicsBackend for SoftwareBackend {
    fn egl_version(&self) -> EglVersion {
        self.opts.egl_version
    }

    fn query_egl_string(&self, name: u32) -> Option<String> {
        match name {
            EGL_VENDOR => Some(self.opts.vendor.clone()),
            EGL_VERSION => Some(format!(
                "{}.{} {}",
                self.opts.egl_version.major, self.opts.egl_version.minor, self.opts.renderer
            )),
            EGL_EXTENSIONS => Some(self.opts.egl_extensions.clone()),
            EGL_CLIENT_APIS => Some("OpenGL_ES".to_owned()),
            _ => None,
        }
    }

    fn gl_string(&self, kind: ContextKind, name: u32) -> Option<String> {
        let s = match (name, kind) {
            (GL_VENDOR, _) => &self.opts.vendor,
            (GL_RENDERER, _) => &self.opts.renderer,
            (GL_VERSION, ContextKind::Gles1) => &self.opts.gles1_version,
            (GL_VERSION, ContextKind::Gles2) => &self.opts.gles2_version,
            (GL_EXTENSIONS, ContextKind::Gles1) => &self.opts.gles1_extensions,
            (GL_EXTENSIONS, ContextKind::Gles2) => &self.opts.gles2_extensions,
            _ => return None,
        };
        Some(s.clone())
    }

    fn configs(&self) -> &ConfigTable {
        &self.configs
    }

    fn choose_config(&self, attribs: &[i32], out: &mut [u32]) -> i32 {
        let mut found = 0usize;
        for (id, cfg) in self.configs.iter() {
            if cfg.satisfies(id, attribs) {
                if let Some(slot) = out.get_mut(found) {
                    *slot = id;
                }
                found += 1;
            }
        }
        i32::try_from(found).unwrap_or(i32::MAX)
    }

    fn width(&self) -> u32 {
        self.opts.width
    }

    fn height(&self) -> u32 {
        self.opts.height
    }

    fn create_render_context(&self, config: Handle, share: Handle, kind: ContextKind) -> Handle {
        if self.configs.get(config.0).is_none() {
            return Handle::NONE;
        }
        let mut st = self.state();
        if share.is_some() && !st.contexts.contains_key(&share) {
            return Handle::NONE;
        }
        let h = st.gen_handle();
        st.contexts.insert(
            h,
            ContextEntry {
                kind,
                bound_by: None,
                texture: None,
                renderbuffer: None,
            },
        );
        debug!(context = %h, ?kind, "context created");
        h
    }

    fn destroy_render_context(&self, context: Handle) {
        let mut st = self.state();
        if st.contexts.remove(&context).is_some() {
            st.bindings.retain(|_, bound| *bound != context);
        }
    }

    fn context_kind(&self, context: Handle) -> Option<ContextKind> {
        self.state().contexts.get(&context).map(|c| c.kind)
    }

    fn create_window_surface(&self, config: Handle, width: u32, height: u32) -> Handle {
        self.create_surface(config, width, height)
    }

    fn create_pbuffer_surface(&self, config: Handle, width: u32, height: u32) -> Handle {
        self.create_surface(config, width, height)
    }

    fn destroy_window_surface(&self, surface: Handle) {
        self.state().surfaces.remove(&surface);
    }

    fn create_color_buffer(&self, width: u32, height: u32, internal_format: u32) -> Handle {
        if width == 0 || height == 0 || bytes_per_pixel(internal_format, GL_UNSIGNED_BYTE).is_none()
        {
            return Handle::NONE;
        }
        let Some(len) = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(4))
        else {
            return Handle::NONE;
        };
        let mut st = self.state();
        let h = st.gen_handle();
        st.color_buffers.insert(
            h,
            ColorBufferEntry {
                stats: ColorBufferStats {
                    width,
                    height,
                    refcount: 1,
                    ..Default::default()
                },
                pixels: vec![0; len],
            },
        );
        h
    }

    fn open_color_buffer(&self, color_buffer: Handle) -> i32 {
        match self.state().color_buffers.get_mut(&color_buffer) {
            Some(cb) => {
                cb.stats.refcount = cb.stats.refcount.saturating_add(1);
                0
            }
            None => -1,
        }
    }

    fn close_color_buffer(&self, color_buffer: Handle) {
        let mut st = self.state();
        let Some(cb) = st.color_buffers.get_mut(&color_buffer) else {
            return;
        };
        cb.stats.refcount = cb.stats.refcount.saturating_sub(1);
        if cb.stats.refcount == 0 {
            st.color_buffers.remove(&color_buffer);
            debug!(color_buffer = %color_buffer, "color buffer freed");
        }
    }

    fn set_window_surface_color_buffer(&self, surface: Handle, color_buffer: Handle) -> bool {
        let mut st = self.state();
        if !st.color_buffers.contains_key(&color_buffer) {
            return false;
        }
        match st.surfaces.get_mut(&surface) {
            Some(s) => {
                s.color_buffer = Some(color_buffer);
                true
            }
            None => false,
        }
    }

    fn flush_window_surface_color_buffer(&self, surface: Handle) -> bool {
        let mut st = self.state();
        let Some(cb) = st.surfaces.get(&surface).and_then(|s| s.color_buffer) else {
            return false;
        };
        match st.color_buffers.get_mut(&cb) {
            Some(entry) => {
                entry.stats.flushes += 1;
                true
            }
            None => false,
        }
    }

    fn bind_context(&self, worker: WorkerId, context: Handle, draw: Handle, read: Handle) -> bool {
        let mut st = self.state();
        if context.is_none() && draw.is_none() && read.is_none() {
            st.unbind_worker(worker);
            return true;
        }
        if !st.surfaces.contains_key(&draw) || !st.surfaces.contains_key(&read) {
            return false;
        }
        match st.contexts.get(&context) {
            Some(ctx) if ctx.bound_by.is_none_or(|w| w == worker) => {}
            _ => return false,
        }
        st.unbind_worker(worker);
        if let Some(ctx) = st.contexts.get_mut(&context) {
            ctx.bound_by = Some(worker);
        }
        st.bindings.insert(worker, context);
        true
    }

    fn post(&self, color_buffer: Handle) -> bool {
        let mut st = self.state();
        match st.color_buffers.get_mut(&color_buffer) {
            Some(cb) => {
                cb.stats.posts += 1;
                st.last_posted = Some(color_buffer);
                true
            }
            None => false,
        }
    }

    fn bind_color_buffer_to_texture(&self, context: Handle, color_buffer: Handle) -> bool {
        let mut st = self.state();
        if !st.color_buffers.contains_key(&color_buffer) {
            return false;
        }
        match st.contexts.get_mut(&context) {
            Some(ctx) => {
                ctx.texture = Some(color_buffer);
                true
            }
            None => false,
        }
    }

    fn bind_color_buffer_to_renderbuffer(&self, context: Handle, color_buffer: Handle) -> bool {
        let mut st = self.state();
        if !st.color_buffers.contains_key(&color_buffer) {
            return false;
        }
        match st.contexts.get_mut(&context) {
            Some(ctx) => {
                ctx.renderbuffer = Some(color_buffer);
                true
            }
            None => false,
        }
    }

    fn read_color_buffer(
        &self,
        color_buffer: Handle,
        rect: PixelRect,
        format: u32,
        ty: u32,
        out: &mut [u8],
    ) -> bool {
        let Some(bpp) = bytes_per_pixel(format, ty) else {
            return false;
        };
        let st = self.state();
        let Some(cb) = st.color_buffers.get(&color_buffer) else {
            return false;
        };
        let Some((x, y, w, h)) = rect.clamp_to(cb.stats.width, cb.stats.height) else {
            return false;
        };
        if out.len() < rect.pixel_count() * bpp {
            return false;
        }

        let stride = cb.stats.width as usize * 4;
        for row in 0..h as usize {
            let src_row = (y as usize + row) * stride + x as usize * 4;
            for col in 0..w as usize {
                let src = &cb.pixels[src_row + col * 4..src_row + col * 4 + 4];
                let dst = (row * w as usize + col) * bpp;
                out[dst..dst + bpp].copy_from_slice(&src[..bpp]);
            }
        }
        true
    }

    fn update_color_buffer(
        &self,
        color_buffer: Handle,
        rect: PixelRect,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) -> bool {
        let Some(bpp) = bytes_per_pixel(format, ty) else {
            return false;
        };
        let mut st = self.state();
        let Some(cb) = st.color_buffers.get_mut(&color_buffer) else {
            return false;
        };
        let Some((x, y, w, h)) = rect.clamp_to(cb.stats.width, cb.stats.height) else {
            return false;
        };
        if pixels.len() < rect.pixel_count() * bpp {
            return false;
        }

        let stride = cb.stats.width as usize * 4;
        for row in 0..h as usize {
            let dst_row = (y as usize + row) * stride + x as usize * 4;
            for col in 0..w as usize {
                let src = (row * w as usize + col) * bpp;
                let dst = dst_row + col * 4;
                cb.pixels[dst..dst + bpp].copy_from_slice(&pixels[src..src + bpp]);
                if bpp == 3 {
                    cb.pixels[dst + 3] = 0xff;
                }
            }
        }
        cb.stats.updates += 1;
        true
    }

    fn create_client_image(&self, context: Handle, target: u32, buffer: u32) -> Handle {
        let mut st = self.state();
        let valid = match target {
            EGL_GL_TEXTURE_2D_KHR => st.contexts.contains_key(&context) && buffer != 0,
            EGL_NATIVE_BUFFER_ANDROID => {
                (context.is_none() || st.contexts.contains_key(&context))
                    && st.color_buffers.contains_key(&Handle(buffer))
            }
            _ => false,
        };
        if !valid {
            return Handle::NONE;
        }
        let h = st.gen_handle();
        st.images.insert(h, (context, target));
        h
    }

    fn destroy_client_image(&self, image: Handle) -> bool {
        self.state().images.remove(&image).is_some()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/software.rs"]
mod tests;
