use super::*;
use crate::{
    backend::software::{SoftwareBackend, SoftwareBackendOpts},
    control::wire::read_string_reply,
    protocol::enums::{EGL_VENDOR, FB_FORMAT, GL_RGBA, GL_UNSIGNED_BYTE, GL_VERSION},
};

fn setup(features: FeatureFlags) -> (Arc<SoftwareBackend>, RenderControlDispatcher) {
    let fb = Arc::new(
        SoftwareBackend::new(SoftwareBackendOpts {
            width: 4,
            height: 2,
            ..Default::default()
        })
        .unwrap(),
    );
    let backend: Arc<dyn GraphicsBackend> = fb.clone();
    let rc = RenderControlDispatcher::with_features(Some(backend), features);
    (fb, rc)
}

fn bare() -> RenderControlDispatcher {
    RenderControlDispatcher::with_features(None, FeatureFlags::all_enabled())
}

#[test]
fn renderer_version_is_fixed() {
    assert_eq!(bare().get_renderer_version(), RENDERER_VERSION);
}

#[test]
fn egl_queries_follow_backend() {
    let (_fb, rc) = setup(FeatureFlags::default());
    let v = rc.get_egl_version().unwrap();
    assert_eq!((v.major, v.minor), (1, 4));

    let mut buf = [0u8; 64];
    let n = rc.query_egl_string(EGL_VENDOR, &mut buf);
    assert!(n > 0);
    assert_eq!(read_string_reply(&buf), "Render Control");
    assert_eq!(n as usize, "Render Control".len() + 1);

    assert_eq!(rc.query_egl_string(0xdead, &mut buf), 0);
    assert_eq!(buf[0], 0);
}

#[test]
fn gl_string_binds_trivial_context_once() {
    let (fb, rc) = setup(FeatureFlags::default());
    let mut thread = RenderThreadInfo::new();
    let mut buf = [0u8; 64];

    assert!(rc.get_gl_string(&mut thread, GL_VERSION, &mut buf) > 0);
    assert_eq!(read_string_reply(&buf), "OpenGL ES 3.0");
    let cur = *thread.current_context().unwrap();
    assert_eq!(cur.kind, ContextKind::Gles2);
    assert_eq!(fb.bound_context(thread.worker()), Some(cur.context));

    let live = fb.live_handles();
    rc.get_gl_string(&mut thread, GL_VERSION, &mut buf);
    assert_eq!(fb.live_handles(), live);
}

#[test]
fn extensions_carry_checksum_token_when_enabled() {
    let mut buf = [0u8; 256];

    let (_fb, rc) = setup(FeatureFlags::all_enabled());
    let mut thread = RenderThreadInfo::new();
    rc.get_gl_string(&mut thread, GL_EXTENSIONS, &mut buf);
    let ext = read_string_reply(&buf).to_owned();
    assert!(ext.contains(&format!(" {MAX_VERSION_STRING} ")), "{ext}");

    let (_fb, rc) = setup(FeatureFlags::default());
    let mut thread = RenderThreadInfo::new();
    rc.get_gl_string(&mut thread, GL_EXTENSIONS, &mut buf);
    assert!(!read_string_reply(&buf).contains(MAX_VERSION_STRING));
}

#[test]
fn protocol_token_is_space_separated() {
    assert_eq!(with_protocol_token(""), format!("{MAX_VERSION_STRING} "));
    assert_eq!(with_protocol_token("A"), format!("A {MAX_VERSION_STRING} "));
    assert_eq!(with_protocol_token("A "), format!("A {MAX_VERSION_STRING} "));
}

#[test]
fn configs_are_packed_with_header_row() {
    let (fb, rc) = setup(FeatureFlags::default());
    let info = rc.get_num_configs();
    assert_eq!(info.count as usize, fb.configs().len());

    let need = ((info.count + 1) * info.attribs) as usize;
    let mut small = vec![0u32; need - 1];
    assert_eq!(rc.get_configs(&mut small), -(need as i32));
    assert!(small.iter().all(|&w| w == 0));

    let mut buf = vec![0u32; need];
    assert_eq!(rc.get_configs(&mut buf), need as i32);
    assert_eq!(buf, fb.configs().pack());
}

#[test]
fn choose_config_with_empty_attribs_is_zero() {
    let (_fb, rc) = setup(FeatureFlags::default());
    let mut out = [0u32; 4];
    assert_eq!(rc.choose_config(&[], &mut out), 0);
    assert!(rc.choose_config(&[crate::protocol::enums::EGL_NONE], &mut out) > 0);
}

#[test]
fn fb_params() {
    let (_fb, rc) = setup(FeatureFlags::default());
    assert_eq!(rc.get_fb_param(FB_WIDTH), 4);
    assert_eq!(rc.get_fb_param(FB_HEIGHT), 2);
    assert_eq!(rc.get_fb_param(FB_XDPI), 72);
    assert_eq!(rc.get_fb_param(FB_FPS), 60);
    assert_eq!(rc.get_fb_param(FB_MAX_SWAP_INTERVAL), 1);
    assert_eq!(rc.get_fb_param(FB_FORMAT), 0);
    assert_eq!(rc.get_fb_param(999), 0);
}

#[test]
fn context_kind_follows_version_hint() {
    let (fb, rc) = setup(FeatureFlags::default());
    let gles1 = rc.create_context(Handle(0), Handle::NONE, 1);
    let gles2 = rc.create_context(Handle(0), Handle::NONE, 2);
    let gles3 = rc.create_context(Handle(0), Handle::NONE, 3);
    assert_eq!(fb.context_kind(gles1), Some(ContextKind::Gles1));
    assert_eq!(fb.context_kind(gles2), Some(ContextKind::Gles2));
    assert_eq!(fb.context_kind(gles3), Some(ContextKind::Gles2));
}

#[test]
fn make_current_tracks_worker_state() {
    let (fb, rc) = setup(FeatureFlags::default());
    let mut thread = RenderThreadInfo::new();
    let ctx = rc.create_context(Handle(0), Handle::NONE, 1);
    let surf = rc.create_window_surface(Handle(0), 4, 2);

    assert!(rc.make_current(&mut thread, ctx, surf, surf));
    assert_eq!(thread.current_context().map(|c| c.kind), Some(ContextKind::Gles1));

    let mut other = RenderThreadInfo::new();
    assert!(!rc.make_current(&mut other, ctx, surf, surf));
    assert!(other.current_context().is_none());

    assert!(rc.make_current(&mut thread, Handle::NONE, Handle::NONE, Handle::NONE));
    assert!(thread.current_context().is_none());
    assert_eq!(fb.bound_context(thread.worker()), None);
}

#[test]
fn destroying_current_context_clears_worker() {
    let (_fb, rc) = setup(FeatureFlags::default());
    let mut thread = RenderThreadInfo::new();
    let ctx = rc.create_context(Handle(0), Handle::NONE, 2);
    let surf = rc.create_window_surface(Handle(0), 4, 2);
    assert!(rc.make_current(&mut thread, ctx, surf, surf));

    rc.destroy_context(&mut thread, ctx);
    assert!(thread.current_context().is_none());
    rc.destroy_context(&mut thread, ctx);
}

#[test]
fn color_buffer_open_close() {
    let (fb, rc) = setup(FeatureFlags::default());
    let cb = rc.create_color_buffer(4, 2, GL_RGBA);
    assert_eq!(rc.open_color_buffer2(cb), 0);
    rc.open_color_buffer(cb);
    assert_eq!(fb.color_buffer_stats(cb).unwrap().refcount, 3);
    for _ in 0..3 {
        rc.close_color_buffer(cb);
    }
    assert!(fb.color_buffer_stats(cb).is_none());
    assert_eq!(rc.open_color_buffer2(cb), -1);
    rc.close_color_buffer(cb);
}

#[test]
fn cache_flush_then_update_commits_and_releases() {
    let (fb, rc) = setup(FeatureFlags::all_enabled());
    let mut thread = RenderThreadInfo::new();
    let cb = rc.create_color_buffer(1, 1, GL_RGBA);
    let rect = PixelRect::new(0, 0, 1, 1);

    assert_eq!(rc.color_buffer_cache_flush(&mut thread, cb, 0, false), 0);
    assert!(thread.holds_gate());
    assert_eq!(
        rc.update_color_buffer(&mut thread, cb, rect, GL_RGBA, GL_UNSIGNED_BYTE, &[1, 2, 3, 4]),
        0
    );
    assert!(!thread.holds_gate());
    assert_eq!(fb.color_buffer_pixels(cb).unwrap(), vec![1, 2, 3, 4]);

    let mut out = [0u8; 4];
    rc.read_color_buffer(cb, rect, GL_RGBA, GL_UNSIGNED_BYTE, &mut out);
    assert_eq!(out, [1, 2, 3, 4]);

    // Next ticket is served immediately.
    assert_eq!(rc.gate().acquire().ticket(), Some(1));
}

#[test]
fn disabled_gate_parks_nothing() {
    let (_fb, rc) = setup(FeatureFlags::default());
    let mut thread = RenderThreadInfo::new();
    let cb = rc.create_color_buffer(1, 1, GL_RGBA);
    rc.color_buffer_cache_flush(&mut thread, cb, 0, false);
    assert!(!thread.holds_gate());
    assert_eq!(rc.gate().tickets_issued(), 0);
}

#[test]
fn flush_while_holding_does_not_self_deadlock() {
    let (fb, rc) = setup(FeatureFlags::all_enabled());
    let mut thread = RenderThreadInfo::new();
    let cb = rc.create_color_buffer(4, 2, GL_RGBA);
    let surf = rc.create_window_surface(Handle(0), 4, 2);
    rc.set_window_color_buffer(surf, cb);
    assert_eq!(fb.surface_color_buffer(surf), Some(cb));

    rc.color_buffer_cache_flush(&mut thread, cb, 0, false);
    assert_eq!(rc.flush_window_color_buffer(&thread, surf), 0);
    rc.color_buffer_cache_flush(&mut thread, cb, 0, false);
    assert_eq!(rc.gate().tickets_issued(), 1);

    let rect = PixelRect::new(0, 0, 1, 1);
    rc.update_color_buffer(&mut thread, cb, rect, GL_RGBA, GL_UNSIGNED_BYTE, &[0; 4]);
    assert_eq!(rc.flush_window_color_buffer(&thread, surf), 0);
    assert_eq!(fb.color_buffer_stats(cb).unwrap().flushes, 2);
}

#[test]
fn bind_uses_current_context() {
    let (fb, rc) = setup(FeatureFlags::default());
    let mut thread = RenderThreadInfo::new();
    let cb = rc.create_color_buffer(4, 2, GL_RGBA);
    let ctx = rc.create_context(Handle(0), Handle::NONE, 2);
    let surf = rc.create_window_surface(Handle(0), 4, 2);

    rc.bind_texture(&thread, cb);
    assert_eq!(fb.texture_binding(ctx), None);

    rc.make_current(&mut thread, ctx, surf, surf);
    rc.bind_texture(&thread, cb);
    rc.bind_renderbuffer(&thread, cb);
    assert_eq!(fb.texture_binding(ctx), Some(cb));
    assert_eq!(fb.renderbuffer_binding(ctx), Some(cb));
}

#[test]
fn post_and_swap_interval() {
    let (fb, rc) = setup(FeatureFlags::default());
    let cb = rc.create_color_buffer(4, 2, GL_RGBA);
    rc.fb_post(cb);
    rc.fb_post(Handle(0xbad));
    rc.fb_set_swap_interval(0);
    assert_eq!(fb.last_posted(), Some(cb));
    assert_eq!(fb.color_buffer_stats(cb).unwrap().posts, 1);
}

#[test]
fn client_image_lifecycle() {
    let (_fb, rc) = setup(FeatureFlags::default());
    let cb = rc.create_color_buffer(4, 2, GL_RGBA);
    let img = rc.create_client_image(
        Handle::NONE,
        crate::protocol::enums::EGL_NATIVE_BUFFER_ANDROID,
        cb.0,
    );
    assert!(img.is_some());
    assert_eq!(rc.destroy_client_image(img), 1);
    assert_eq!(rc.destroy_client_image(img), 0);
}

#[test]
fn checksum_selection_is_per_worker() {
    let rc = bare();
    let mut a = RenderThreadInfo::new();
    let b = RenderThreadInfo::new();
    rc.select_checksum_calculator(&mut a, 1, 0);
    assert_eq!(a.checksum().version(), 1);
    assert_eq!(b.checksum().version(), 0);
    rc.select_checksum_calculator(&mut a, 7, 0);
    assert_eq!(a.checksum().version(), 1);
}

#[test]
fn missing_backend_yields_neutral_results() {
    let rc = bare();
    let mut thread = RenderThreadInfo::new();
    let mut buf = [0xffu8; 16];
    let mut words = [0u32; 16];
    let rect = PixelRect::new(0, 0, 1, 1);

    assert!(rc.get_egl_version().is_none());
    assert_eq!(rc.query_egl_string(EGL_VENDOR, &mut buf), 0);
    assert_eq!(rc.get_gl_string(&mut thread, GL_VERSION, &mut buf), 0);
    assert_eq!(buf[0], 0);
    assert_eq!(rc.get_num_configs(), ConfigPackInfo::default());
    assert_eq!(rc.get_configs(&mut words), 0);
    assert_eq!(rc.choose_config(&[0x3038], &mut words), 0);
    assert_eq!(rc.get_fb_param(FB_WIDTH), 0);
    assert_eq!(rc.create_context(Handle(0), Handle::NONE, 2), Handle::NONE);
    assert_eq!(rc.create_window_surface(Handle(0), 1, 1), Handle::NONE);
    assert_eq!(rc.create_color_buffer(1, 1, GL_RGBA), Handle::NONE);
    assert_eq!(rc.open_color_buffer2(Handle(1)), -1);
    assert!(!rc.make_current(&mut thread, Handle(1), Handle(2), Handle(2)));
    assert_eq!(rc.flush_window_color_buffer(&thread, Handle(1)), -1);
    assert_eq!(rc.create_client_image(Handle(1), 0, 0), Handle::NONE);
    assert_eq!(rc.destroy_client_image(Handle(1)), 0);

    rc.color_buffer_cache_flush(&mut thread, Handle(1), 0, false);
    assert!(thread.holds_gate());
    assert_eq!(
        rc.update_color_buffer(&mut thread, Handle(1), rect, GL_RGBA, GL_UNSIGNED_BYTE, &[0; 4]),
        -1
    );
    assert!(!thread.holds_gate());
    assert_eq!(rc.gate().acquire().ticket(), Some(1));
}

#[test]
fn teardown_mid_session_is_neutral() {
    let (_fb, rc) = setup(FeatureFlags::default());
    let cb = rc.create_color_buffer(1, 1, GL_RGBA);
    assert!(cb.is_some());
    assert!(rc.backend_slot().teardown().is_some());
    assert_eq!(rc.open_color_buffer2(cb), -1);
    rc.close_color_buffer(cb);
    rc.fb_post(cb);
}

#[test]
fn gl_string_then_unbind_does_not_accumulate_handles() {
    let (fb, rc) = setup(FeatureFlags::default());
    let mut thread = RenderThreadInfo::new();
    let mut buf = [0u8; 64];

    for _ in 0..5 {
        assert!(rc.get_gl_string(&mut thread, GL_VERSION, &mut buf) > 0);
        assert_eq!(fb.live_handles(), 2);
        assert!(thread.trivial_context().is_some());

        assert!(rc.make_current(&mut thread, Handle::NONE, Handle::NONE, Handle::NONE));
        assert!(thread.trivial_context().is_none());
        assert_eq!(fb.live_handles(), 0);
    }
}

#[test]
fn binding_a_guest_context_releases_the_trivial_one() {
    let (fb, rc) = setup(FeatureFlags::default());
    let mut thread = RenderThreadInfo::new();
    let mut buf = [0u8; 64];

    let ctx = rc.create_context(Handle(0), Handle::NONE, 2);
    let surface = rc.create_window_surface(Handle(0), 2, 2);
    rc.get_gl_string(&mut thread, GL_VERSION, &mut buf);
    let trivial = thread.trivial_context().unwrap();

    assert!(rc.make_current(&mut thread, ctx, surface, surface));
    assert!(thread.trivial_context().is_none());
    assert_eq!(fb.context_kind(trivial.context), None);
    assert_eq!(fb.live_handles(), 2);
}

#[test]
fn destroying_the_trivial_context_frees_its_surface() {
    let (fb, rc) = setup(FeatureFlags::default());
    let mut thread = RenderThreadInfo::new();
    let mut buf = [0u8; 64];

    rc.get_gl_string(&mut thread, GL_VERSION, &mut buf);
    let trivial = thread.trivial_context().unwrap();
    rc.destroy_context(&mut thread, trivial.context);

    assert!(thread.current_context().is_none());
    assert!(thread.trivial_context().is_none());
    assert_eq!(fb.live_handles(), 0);
}

#[test]
fn release_thread_frees_worker_resources() {
    let (fb, rc) = setup(FeatureFlags::all_enabled());
    let mut thread = RenderThreadInfo::new();
    let mut buf = [0u8; 64];

    rc.get_gl_string(&mut thread, GL_VERSION, &mut buf);
    rc.color_buffer_cache_flush(&mut thread, Handle(1), 0, false);
    assert!(thread.holds_gate());

    rc.release_thread(&mut thread);
    assert!(!thread.holds_gate());
    assert!(thread.current_context().is_none());
    assert!(thread.trivial_context().is_none());
    assert_eq!(fb.bound_context(thread.worker()), None);
    assert_eq!(fb.live_handles(), 0);
    assert_eq!(rc.gate().acquire().ticket(), Some(1));
}

#[test]
fn release_thread_without_backend_clears_state() {
    let rc = bare();
    let mut thread = RenderThreadInfo::new();
    rc.color_buffer_cache_flush(&mut thread, Handle(1), 0, false);

    rc.release_thread(&mut thread);
    assert!(!thread.holds_gate());
    assert!(thread.current_context().is_none());
}
