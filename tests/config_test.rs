//! Configuration loading and validation tests.

use m4bkit::config::{load_config, load_config_or_default, Config};
use std::fs;
use tempfile::tempdir;

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("m4bkit.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn empty_file_uses_defaults() {
    let (_dir, path) = write_config("");
    let config = load_config(&path).unwrap();

    assert_eq!(config.extraction.max_tracks, 10);
    assert_eq!(config.extraction.max_text_samples, 100);
    assert_eq!(config.extraction.max_chapter_entries, 1000);
    assert_eq!(config.extraction.segment_secs, 600.0);
    assert!(!config.output.json);
    assert!(config.output.pretty);
}

#[test]
fn partial_sections_keep_other_defaults() {
    let (_dir, path) = write_config(
        r#"
[extraction]
max_text_samples = 250

[output]
json = true
"#,
    );
    let config = load_config(&path).unwrap();

    assert_eq!(config.extraction.max_text_samples, 250);
    assert_eq!(config.extraction.max_tracks, 10);
    assert!(config.output.json);
    assert!(config.output.pretty);
}

#[test]
fn zero_limits_are_rejected() {
    for field in ["max_tracks", "max_text_samples", "max_chapter_entries"] {
        let (_dir, path) = write_config(&format!("[extraction]\n{field} = 0\n"));
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains(field), "{field}: {err}");
    }
}

#[test]
fn bad_segment_length_is_rejected() {
    for value in ["0.0", "-10.0", "nan", "inf"] {
        let (_dir, path) = write_config(&format!("[extraction]\nsegment_secs = {value}\n"));
        assert!(load_config(&path).is_err(), "segment_secs = {value}");
    }
}

#[test]
fn malformed_toml_reports_path() {
    let (_dir, path) = write_config("[extraction\nmax_tracks = ");
    let err = load_config(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config file"));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = load_config_or_default(Some(missing.as_path())).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn explicit_path_wins() {
    let (_dir, path) = write_config("[extraction]\nsegment_secs = 120.0\n");
    let config = load_config_or_default(Some(path.as_path())).unwrap();
    assert_eq!(config.extraction.segment_secs, 120.0);
}

#[test]
fn config_round_trips_through_toml() {
    let mut config = Config::default();
    config.extraction.max_tracks = 3;
    config.output.json = true;

    let text = toml::to_string(&config).unwrap();
    let (_dir, path) = write_config(&text);
    let loaded = load_config(&path).unwrap();

    assert_eq!(loaded.extraction, config.extraction);
    assert!(loaded.output.json);
}
