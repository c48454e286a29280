use super::*;
use crate::{
    backend::software::{SoftwareBackend, SoftwareBackendOpts},
    control::dispatcher::RenderControlDispatcher,
    foundation::config::FeatureFlags,
    protocol::enums::{EGL_VENDOR, GL_RGBA, GL_UNSIGNED_BYTE},
};
use std::sync::Arc;

fn dispatcher() -> RenderControlDispatcher {
    let fb = SoftwareBackend::new(SoftwareBackendOpts {
        width: 2,
        height: 2,
        ..Default::default()
    })
    .unwrap();
    RenderControlDispatcher::with_features(Some(Arc::new(fb)), FeatureFlags::all_enabled())
}

#[test]
fn every_request_maps_to_its_opcode() {
    let req = Request::from_json(r#"{"op":"select_checksum_calculator","protocol":1}"#).unwrap();
    assert_eq!(req.op(), RcOp::SelectChecksumCalculator);
    assert_eq!(req.op().opcode(), 10028);

    let req = Request::from_json(r#"{"op":"open_color_buffer2","color_buffer":3}"#).unwrap();
    assert_eq!(req.op(), RcOp::OpenColorBuffer2);
}

#[test]
fn malformed_requests_are_protocol_errors() {
    let err = Request::from_json(r#"{"op":"no_such_op"}"#).unwrap_err();
    assert!(matches!(err, RenderControlError::Protocol(_)));
    assert!(Request::from_json(r#"{"op":"get_fb_param"}"#).is_err());
}

#[test]
fn string_query_reports_required_length() {
    let rc = dispatcher();
    let mut thread = RenderThreadInfo::new();

    let small = Request::QueryEglString {
        name: EGL_VENDOR,
        capacity: 2,
    };
    let Response::Text { code, text } = execute(&rc, &mut thread, &small) else {
        panic!("expected text reply");
    };
    assert!(code < 0);
    assert!(text.is_empty());

    let retry = Request::QueryEglString {
        name: EGL_VENDOR,
        capacity: code.unsigned_abs(),
    };
    let reply = execute(&rc, &mut thread, &retry);
    assert_eq!(reply.code(), Some(-code));
    assert!(matches!(reply, Response::Text { text, .. } if text == "Render Control"));
}

#[test]
fn configs_reply_is_trimmed_to_written_words() {
    let rc = dispatcher();
    let mut thread = RenderThreadInfo::new();
    let Response::NumConfigs { count, attribs } =
        execute(&rc, &mut thread, &Request::GetNumConfigs)
    else {
        panic!("expected config info");
    };
    let need = (count + 1) * attribs;

    let reply = execute(
        &rc,
        &mut thread,
        &Request::GetConfigs {
            capacity: need + 10,
        },
    );
    let Response::Words { code, words } = reply else {
        panic!("expected words");
    };
    assert_eq!(code, need as i32);
    assert_eq!(words.len(), need as usize);
}

#[test]
fn huge_capacities_are_clamped() {
    let rc = dispatcher();
    let mut thread = RenderThreadInfo::new();
    let reply = execute(
        &rc,
        &mut thread,
        &Request::GetConfigs { capacity: u32::MAX },
    );
    assert!(reply.code().unwrap() > 0);
    assert_eq!(
        reply_capacity(RcOp::GetConfigs, u32::MAX, 4),
        MAX_REPLY_BYTES / 4
    );
}

#[test]
fn capacities_within_the_limit_are_kept() {
    let limit = MAX_REPLY_BYTES as u32;
    assert_eq!(reply_capacity(RcOp::GetGlString, 64, 1), 64);
    assert_eq!(reply_capacity(RcOp::GetGlString, limit, 1), MAX_REPLY_BYTES);
    assert_eq!(
        reply_capacity(RcOp::GetGlString, limit + 1, 1),
        MAX_REPLY_BYTES
    );
    assert_eq!(reply_capacity(RcOp::ChooseConfig, limit / 4 + 1, 4), MAX_REPLY_BYTES / 4);
}

#[test]
fn readback_length_is_clamped() {
    let small = PixelRect::new(0, 0, 2, 2);
    assert_eq!(read_reply_len(&small, GL_RGBA, GL_UNSIGNED_BYTE), 16);
    let huge = PixelRect::new(0, 0, 1 << 14, 1 << 14);
    assert_eq!(read_reply_len(&huge, GL_RGBA, GL_UNSIGNED_BYTE), MAX_REPLY_BYTES);
}

#[test]
fn pixels_round_trip_through_requests() {
    let rc = dispatcher();
    let mut thread = RenderThreadInfo::new();
    let Response::Handle { handle: cb } = execute(
        &rc,
        &mut thread,
        &Request::CreateColorBuffer {
            width: 2,
            height: 2,
            internal_format: GL_RGBA,
        },
    ) else {
        panic!("expected handle");
    };
    let rect = PixelRect::new(1, 1, 1, 1);

    let flush = Request::ColorBufferCacheFlush {
        color_buffer: cb,
        post_count: 0,
        for_read: false,
    };
    assert_eq!(execute(&rc, &mut thread, &flush), Response::Int { value: 0 });
    assert!(thread.holds_gate());

    let update = Request::UpdateColorBuffer {
        color_buffer: cb,
        rect,
        format: GL_RGBA,
        ty: GL_UNSIGNED_BYTE,
        pixels: vec![9, 8, 7, 6],
    };
    assert_eq!(execute(&rc, &mut thread, &update), Response::Int { value: 0 });
    assert!(!thread.holds_gate());

    let read = Request::ReadColorBuffer {
        color_buffer: cb,
        rect,
        format: GL_RGBA,
        ty: GL_UNSIGNED_BYTE,
    };
    assert_eq!(
        execute(&rc, &mut thread, &read),
        Response::Pixels {
            pixels: vec![9, 8, 7, 6]
        }
    );
}

#[test]
fn egl_version_reply_without_backend() {
    let rc = RenderControlDispatcher::with_features(None, FeatureFlags::default());
    let mut thread = RenderThreadInfo::new();
    assert_eq!(
        execute(&rc, &mut thread, &Request::GetEglVersion),
        Response::EglVersion {
            ok: false,
            major: 0,
            minor: 0
        }
    );
}

#[test]
fn responses_serialize_with_kind_tag() {
    let json = serde_json::to_string(&Response::Int { value: 5 }).unwrap();
    assert_eq!(json, r#"{"kind":"int","value":5}"#);
    let json = serde_json::to_string(&Response::None).unwrap();
    assert_eq!(json, r#"{"kind":"none"}"#);
}
