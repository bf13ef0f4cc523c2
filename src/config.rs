use anyhow::Context;
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::processing::color_ramp::Rgb;
use crate::processing::colorizer::Normalization;
use crate::processing::segments::{StyleOptions, NEUTRAL_COLOR};

/// Runtime settings, read from a TOML file. Every field has a default, so an
/// empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub atlas: AtlasSettings,
    pub display: DisplaySettings,
    pub styling: StylingSettings,
}

impl Settings {
    pub fn from_toml_str(src: &str) -> anyhow::Result<Self> {
        toml::from_str(src).context("invalid settings")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_toml_str(&src).with_context(|| format!("in {}", path.display()))
    }
}

/// Location of the GIF atlas resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasSettings {
    pub resources_dir: PathBuf,
    pub gif_version: u32,
    /// Explicit color table, bypassing the versioned default.
    pub color_table: Option<PathBuf>,
}

impl Default for AtlasSettings {
    fn default() -> Self {
        Self {
            resources_dir: PathBuf::from("Resources"),
            gif_version: 3,
            color_table: None,
        }
    }
}

impl AtlasSettings {
    /// `<resources>/Color/BrainAnatomyLabelsV<version>_0.txt` unless overridden.
    pub fn color_table_path(&self) -> PathBuf {
        match &self.color_table {
            Some(path) => path.clone(),
            None => self
                .resources_dir
                .join("Color")
                .join(format!("BrainAnatomyLabelsV{}_0.txt", self.gif_version)),
        }
    }

    pub fn reference_path(&self) -> PathBuf {
        self.resources_dir.join("Image").join("MNI_152_mri.nii.gz")
    }

    pub fn parcellation_path(&self) -> PathBuf {
        self.resources_dir.join("Image").join("MNI_152_gif.nii.gz")
    }
}

/// How the score volume is shown as a 2D foreground layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Voxels below this value are not drawn.
    pub lower_threshold: f64,
    pub window_min: f64,
    pub window_max: f64,
    pub foreground_opacity: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            lower_threshold: 1.0,
            window_min: 0.0,
            window_max: 100.0,
            foreground_opacity: 1.0,
        }
    }
}

/// What to do when a segment name is missing from the color table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Style nothing.
    #[default]
    Abort,
    /// Style what resolves, report the rest.
    Isolate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylingSettings {
    /// Named palette, or a path to a color table file.
    pub palette: String,
    pub neutral_color: [f64; 3],
    pub normalization: Normalization,
    pub failure_policy: FailurePolicy,
}

impl Default for StylingSettings {
    fn default() -> Self {
        Self {
            palette: "Plasma".to_string(),
            neutral_color: [NEUTRAL_COLOR.r, NEUTRAL_COLOR.g, NEUTRAL_COLOR.b],
            normalization: Normalization::Legacy,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl StylingSettings {
    pub fn style_options(&self) -> StyleOptions {
        StyleOptions {
            neutral_color: Rgb::from(self.neutral_color),
            normalization: self.normalization,
        }
    }
}
