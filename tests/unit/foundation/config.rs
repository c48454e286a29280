use super::*;

#[test]
fn defaults_are_disabled() {
    let f = FeatureFlags::default();
    assert!(!f.gralloc_sync);
    assert!(!f.gl_pipe_checksum);
}

#[test]
fn partial_json_keeps_defaults() {
    let f = FeatureFlags::from_reader(r#"{ "gralloc_sync": true }"#.as_bytes()).unwrap();
    assert!(f.gralloc_sync);
    assert!(!f.gl_pipe_checksum);
}

#[test]
fn malformed_json_is_serde_error() {
    let err = FeatureFlags::from_reader("{ nope".as_bytes()).unwrap_err();
    assert!(matches!(err, RenderControlError::Serde(_)));
}

#[test]
fn missing_file_is_config_error() {
    let err = FeatureFlags::from_path("target/does-not-exist/flags.json").unwrap_err();
    assert!(err.to_string().contains("config error:"));
}
