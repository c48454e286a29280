//! Numeric constants that appear as arguments on the render control wire.

// GL string selectors.
/// Implementation vendor.
pub const GL_VENDOR: u32 = 0x1F00;
/// Renderer name.
pub const GL_RENDERER: u32 = 0x1F01;
/// Version string of the context's API.
pub const GL_VERSION: u32 = 0x1F02;
/// Space-separated extension list.
pub const GL_EXTENSIONS: u32 = 0x1F03;

// EGL string selectors.
/// EGL implementation vendor.
pub const EGL_VENDOR: u32 = 0x3053;
/// EGL version string.
pub const EGL_VERSION: u32 = 0x3054;
/// EGL extension list.
pub const EGL_EXTENSIONS: u32 = 0x3055;
/// Client APIs the display supports.
pub const EGL_CLIENT_APIS: u32 = 0x308D;

// Pixel transfer formats and types.
/// Three 8-bit channels.
pub const GL_RGB: u32 = 0x1907;
/// Four 8-bit channels.
pub const GL_RGBA: u32 = 0x1908;
/// One byte per channel.
pub const GL_UNSIGNED_BYTE: u32 = 0x1401;

// Client image targets.
/// Image backed by a GL 2D texture.
pub const EGL_GL_TEXTURE_2D_KHR: u32 = 0x30B1;
/// Image backed by a native gralloc buffer.
pub const EGL_NATIVE_BUFFER_ANDROID: u32 = 0x3140;

// EGL config attributes.
/// Total color bits.
pub const EGL_BUFFER_SIZE: i32 = 0x3020;
/// Alpha bits.
pub const EGL_ALPHA_SIZE: i32 = 0x3021;
/// Blue bits.
pub const EGL_BLUE_SIZE: i32 = 0x3022;
/// Green bits.
pub const EGL_GREEN_SIZE: i32 = 0x3023;
/// Red bits.
pub const EGL_RED_SIZE: i32 = 0x3024;
/// Depth bits.
pub const EGL_DEPTH_SIZE: i32 = 0x3025;
/// Stencil bits.
pub const EGL_STENCIL_SIZE: i32 = 0x3026;
/// Config caveat.
pub const EGL_CONFIG_CAVEAT: i32 = 0x3027;
/// Config id, the config's index on this wire.
pub const EGL_CONFIG_ID: i32 = 0x3028;
/// Samples per pixel.
pub const EGL_SAMPLES: i32 = 0x3031;
/// Number of multisample buffers.
pub const EGL_SAMPLE_BUFFERS: i32 = 0x3032;
/// Supported surface kinds.
pub const EGL_SURFACE_TYPE: i32 = 0x3033;
/// Attribute list terminator, also "no caveat".
pub const EGL_NONE: i32 = 0x3038;
/// Supported client APIs.
pub const EGL_RENDERABLE_TYPE: i32 = 0x3040;
/// Matches any value.
pub const EGL_DONT_CARE: i32 = -1;

// EGL_SURFACE_TYPE / EGL_RENDERABLE_TYPE bits.
/// Off-screen pbuffer surfaces.
pub const EGL_PBUFFER_BIT: i32 = 0x0001;
/// Window surfaces.
pub const EGL_WINDOW_BIT: i32 = 0x0004;
/// OpenGL ES 1.x.
pub const EGL_OPENGL_ES_BIT: i32 = 0x0001;
/// OpenGL ES 2.0 and later.
pub const EGL_OPENGL_ES2_BIT: i32 = 0x0004;

// Framebuffer parameters accepted by `GetFBParam`.
/// Display width in pixels.
pub const FB_WIDTH: i32 = 1;
/// Display height in pixels.
pub const FB_HEIGHT: i32 = 2;
/// Horizontal DPI.
pub const FB_XDPI: i32 = 3;
/// Vertical DPI.
pub const FB_YDPI: i32 = 4;
/// Refresh rate.
pub const FB_FPS: i32 = 5;
/// Pixel format, reported as `0`.
pub const FB_FORMAT: i32 = 6;
/// Smallest swap interval.
pub const FB_MIN_SWAP_INTERVAL: i32 = 7;
/// Largest swap interval.
pub const FB_MAX_SWAP_INTERVAL: i32 = 8;

// Boolean results as EGL encodes them.
/// EGL false.
pub const EGL_FALSE: i32 = 0;
/// EGL true.
pub const EGL_TRUE: i32 = 1;

/// Bytes per pixel of a `(format, type)` pixel transfer, if supported.
pub fn bytes_per_pixel(format: u32, ty: u32) -> Option<usize> {
    match (format, ty) {
        (GL_RGBA, GL_UNSIGNED_BYTE) => Some(4),
        (GL_RGB, GL_UNSIGNED_BYTE) => Some(3),
        _ => None,
    }
}
