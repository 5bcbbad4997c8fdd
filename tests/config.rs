use std::path::PathBuf;

use drift::{EngineConfig, EngineError};

#[test]
fn empty_document_is_the_default() {
    let config = EngineConfig::from_toml_str("").unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.sample_rate, 48_000);
    assert_eq!(config.liveness_check_interval_ms, 5000);
    assert!(config.seed.is_none());
}

#[test]
fn fields_override_defaults() {
    let config = EngineConfig::from_toml_str(
        r#"
        sample_rate = 44100
        start_suspended = true
        asset_root = "public"
        seed = 42
        "#,
    )
    .unwrap();

    assert_eq!(config.sample_rate, 44100);
    assert!(config.start_suspended);
    assert_eq!(config.asset_root, PathBuf::from("public"));
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.output_buffer_frames, 8192);
}

#[test]
fn invalid_values_are_rejected() {
    assert!(matches!(
        EngineConfig::from_toml_str("sample_rate = 0"),
        Err(EngineError::Config(_))
    ));
    assert!(matches!(
        EngineConfig::from_toml_str("message_queue_size = 0"),
        Err(EngineError::Config(_))
    ));
    assert!(matches!(
        EngineConfig::from_toml_str("sample_rate = \"fast\""),
        Err(EngineError::Toml(_))
    ));
}

#[test]
fn loads_from_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drift.toml");
    std::fs::write(&path, "keepalive_frequency = 0.01\n").unwrap();

    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.keepalive_frequency, 0.01);
    assert!(matches!(
        EngineConfig::load(&dir.path().join("missing.toml")),
        Err(EngineError::Io(_))
    ));
}

#[test]
fn builders_chain() {
    let config = EngineConfig::default()
        .with_sample_rate(22050)
        .with_seed(9)
        .with_asset_root("/srv/drift")
        .suspended();
    assert_eq!(config.sample_rate, 22050);
    assert_eq!(config.seed, Some(9));
    assert_eq!(config.asset_root, PathBuf::from("/srv/drift"));
    assert!(config.start_suspended);
    assert!(config.validate().is_ok());
}
