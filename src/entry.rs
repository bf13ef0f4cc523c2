use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use std::path::{Path, PathBuf};

use crate::config::{FailurePolicy, Settings};
use crate::io::input::{read_color_table, read_score_table, ScoreTable, VoxelType};
use crate::io::output::{write_raw_scores, write_styles_csv, write_styles_json};
use crate::io::Parcellation;
use crate::processing::color_ramp::ColorRamp;
use crate::processing::colorizer::{normalize, ScoreRange};
use crate::processing::segments::{
    assign_segment_styles, assign_segment_styles_isolated, segments_from_color_table,
    StyleReport,
};
use crate::texture::{middle_slice, save_slice_overlay, SliceAxis};

/// Raw label volume handed over by the host.
#[derive(Debug, Clone)]
pub struct ParcellationInput {
    pub path: PathBuf,
    pub shape: Vec<usize>,
    pub voxel_type: VoxelType,
}

#[derive(Debug, Clone)]
pub struct ColorizeRequest {
    pub scores_path: PathBuf,
    pub output_dir: PathBuf,
    pub parcellation: Option<ParcellationInput>,
    pub axis: SliceAxis,
}

#[derive(Debug, Clone)]
pub struct ColorizeOutcome {
    pub color_table: String,
    pub range: ScoreRange,
    pub report: StyleReport,
    pub written: Vec<PathBuf>,
}

fn scores_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scores".to_string())
}

/// Artifacts of one colorize run, all named after the score file.
struct Outputs<'a> {
    dir: &'a Path,
    stem: &'a str,
    settings: &'a Settings,
    axis: SliceAxis,
    ramp: &'a ColorRamp,
}

impl Outputs<'_> {
    /// Each path is recorded before its write starts, so a half-written file
    /// is tracked too.
    fn write(
        &self,
        report: &StyleReport,
        scores: &ScoreTable,
        parcellation: Option<&Parcellation>,
        written: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let json_path = self.dir.join(format!("styles_{}.json", self.stem));
        written.push(json_path.clone());
        write_styles_json(&json_path, &report.styles)?;

        let csv_path = self.dir.join(format!("styles_{}.csv", self.stem));
        written.push(csv_path.clone());
        write_styles_csv(&csv_path, &report.styles)?;

        let Some(parcellation) = parcellation else {
            return Ok(());
        };
        let volume = parcellation.score_volume(scores);

        let raw_path = self.dir.join(format!("scores_{}.raw", self.stem));
        written.push(raw_path.clone());
        write_raw_scores(&raw_path, &volume)?;

        if volume.ndim() == 3 {
            let index = middle_slice(volume.shape(), self.axis);
            let png_path = self.dir.join(format!(
                "overlay_{}_{:03}_{}.png",
                self.axis.name(),
                index,
                self.stem
            ));
            written.push(png_path.clone());
            save_slice_overlay(
                &volume,
                self.axis,
                index,
                self.ramp,
                &self.settings.display,
                &png_path,
            )?;
        } else {
            warn!(ndim = volume.ndim(), "score volume is not 3D, skipping overlay");
        }
        Ok(())
    }
}

/// Removes the regular files among `paths`.
fn remove_partial(paths: &[PathBuf]) {
    for path in paths.iter().filter(|p| p.is_file()) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed partial output"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial output"),
        }
    }
}

/// Normalization bounds of a score file.
pub fn run_range(scores_path: &Path) -> Result<ScoreRange> {
    let scores = read_score_table(scores_path)
        .with_context(|| format!("Failed to load scores from {}", scores_path.display()))?;
    normalize(&scores).with_context(|| format!("no valid scores in {}", scores_path.display()))
}

/// Colors every segment of the atlas by its score and writes the results.
///
/// Nothing is written when the score file holds no positive score, or when a
/// segment does not resolve under [`FailurePolicy::Abort`]. If one output
/// fails to write, the files already written by this call are removed.
pub fn run_colorize(settings: &Settings, request: &ColorizeRequest) -> Result<ColorizeOutcome> {
    let scores_path = &request.scores_path;
    let scores = read_score_table(scores_path)
        .with_context(|| format!("Failed to load scores from {}", scores_path.display()))?;
    let range = normalize(&scores)
        .with_context(|| format!("no valid scores in {}", scores_path.display()))?;
    info!(
        entries = scores.len(),
        min_positive = range.min_positive,
        max_positive = range.max_positive,
        "loaded scores"
    );

    let palette = &settings.styling.palette;
    let ramp = ColorRamp::resolve(palette)
        .with_context(|| format!("Failed to resolve color ramp '{}'", palette))?;

    let color_table_path = settings.atlas.color_table_path();
    let parcellation = match &request.parcellation {
        Some(input) => Some(
            Parcellation::load(&input.path, &input.shape, input.voxel_type, &color_table_path)
                .with_context(|| format!("Failed to load parcellation {}", input.path.display()))?,
        ),
        None => None,
    };

    let color_table = match &parcellation {
        Some(p) => p.color_table().clone(),
        None => read_color_table(&color_table_path).with_context(|| {
            format!("Failed to load color table {}", color_table_path.display())
        })?,
    };

    let segments = match &parcellation {
        Some(p) => p.segments(),
        None => segments_from_color_table(&color_table),
    };

    let options = settings.styling.style_options();
    let report = match settings.styling.failure_policy {
        FailurePolicy::Abort => StyleReport {
            styles: assign_segment_styles(&segments, &scores, &ramp, &color_table, &options)?,
            unresolved: Vec::new(),
        },
        FailurePolicy::Isolate => {
            assign_segment_styles_isolated(&segments, &scores, &ramp, &color_table, &options)?
        }
    };
    if !report.is_complete() {
        warn!(
            unresolved = report.unresolved.len(),
            "some segments have no structure in {}",
            color_table.name()
        );
    }
    info!(
        segments = report.styles.len(),
        visible = report.styles.visible_count(),
        "styled segments"
    );

    let out = &request.output_dir;
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory {}", out.display()))?;
    let stem = scores_stem(scores_path);
    let outputs = Outputs {
        dir: out,
        stem: &stem,
        settings,
        axis: request.axis,
        ramp: &ramp,
    };

    let mut written = Vec::new();
    if let Err(e) = outputs.write(&report, &scores, parcellation.as_ref(), &mut written) {
        remove_partial(&written);
        return Err(e);
    }

    for path in &written {
        info!(path = %path.display(), "wrote");
    }

    Ok(ColorizeOutcome {
        color_table: color_table.name().to_string(),
        range,
        report,
        written,
    })
}
