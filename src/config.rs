use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    pub writer_post_dir: PathBuf,
    pub writer_image_dir: PathBuf,
    pub hugo_post_dir: PathBuf,
    pub hugo_image_dir: PathBuf,

    /// Body text for empty source files and placeholder posts.
    pub empty_body_text: String,

    /// Base path used inside `ref` shortcodes.
    #[serde(default = "default_ref_base")]
    pub ref_base: String,

    /// Descend into subdirectories of `writer_post_dir`.
    #[serde(default)]
    pub recursive: bool,
}

fn default_ref_base() -> String {
    "/docs".to_string()
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("while reading config file {:?}", path))?;
        toml::from_str(&raw).with_context(|| format!("while parsing config file {:?}", path))
    }

    /// Default location: `<config_dir>/ia2hugo/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ia2hugo").join("config.toml"))
    }
}
