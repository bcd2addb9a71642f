use m4bkit_media::ExtractOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Bounds for atom scanning and chapter generation
    #[serde(default)]
    pub extraction: ExtractOptions,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Print JSON instead of text, as if `--json` were always given
    #[serde(default)]
    pub json: bool,

    /// Indent JSON output
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_pretty() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            pretty: default_pretty(),
        }
    }
}
