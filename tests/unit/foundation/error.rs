use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        RenderControlError::config("x")
            .to_string()
            .contains("config error:")
    );
    assert!(
        RenderControlError::backend("x")
            .to_string()
            .contains("backend error:")
    );
    assert!(
        RenderControlError::protocol("x")
            .to_string()
            .contains("protocol error:")
    );
    assert!(
        RenderControlError::replay("x")
            .to_string()
            .contains("replay error:")
    );
    assert!(
        RenderControlError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = RenderControlError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
