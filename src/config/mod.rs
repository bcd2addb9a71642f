mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Read and validate one TOML config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load `custom_path` if given, else the first existing default location,
/// else built-in defaults.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./m4bkit.toml",
        "~/.config/m4bkit/config.toml",
        "/etc/m4bkit/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Reject limits the extractor cannot work with.
fn validate_config(config: &Config) -> Result<()> {
    let extraction = &config.extraction;

    if extraction.max_tracks == 0 {
        anyhow::bail!("extraction.max_tracks cannot be 0");
    }
    if extraction.max_text_samples == 0 {
        anyhow::bail!("extraction.max_text_samples cannot be 0");
    }
    if extraction.max_chapter_entries == 0 {
        anyhow::bail!("extraction.max_chapter_entries cannot be 0");
    }
    if !extraction.segment_secs.is_finite() || extraction.segment_secs <= 0.0 {
        anyhow::bail!(
            "extraction.segment_secs must be a positive number, got {}",
            extraction.segment_secs
        );
    }

    if extraction.segment_secs < 60.0 {
        tracing::warn!(
            "extraction.segment_secs is {}s; long books will get many synthetic parts",
            extraction.segment_secs
        );
    }

    Ok(())
}
