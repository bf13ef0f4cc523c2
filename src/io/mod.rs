pub mod input;
pub mod output;

use input::{read_color_table, read_raw_labels, ColorTable, Label, VoxelType};
use ndarray::ArrayD;
use tracing::info;

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;
use crate::processing::colorizer::build_score_volume;
use crate::processing::segments::{segments_from_labels, Segment};
use input::ScoreTable;

/// The active parcellation: one label per voxel plus the atlas color table
/// that names those labels.
#[derive(Debug, Clone)]
pub struct Parcellation {
    labels: ArrayD<Label>,
    color_table: ColorTable,
}

impl Parcellation {
    pub fn new(labels: ArrayD<Label>, color_table: ColorTable) -> Self {
        Self {
            labels,
            color_table,
        }
    }

    /// Loads a raw label buffer and the color table that goes with it.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        labels_path: P,
        shape: &[usize],
        voxel_type: VoxelType,
        color_table_path: Q,
    ) -> Result<Self> {
        let labels = read_raw_labels(labels_path.as_ref(), shape, voxel_type)?;
        let color_table = read_color_table(color_table_path)?;
        info!(
            path = %labels_path.as_ref().display(),
            shape = ?shape,
            table = color_table.name(),
            "loaded parcellation"
        );
        Ok(Self::new(labels, color_table))
    }

    pub fn labels(&self) -> &ArrayD<Label> {
        &self.labels
    }

    pub fn color_table(&self) -> &ColorTable {
        &self.color_table
    }

    pub fn shape(&self) -> &[usize] {
        self.labels.shape()
    }

    /// Distinct labels present in the volume, background included.
    pub fn present_labels(&self) -> BTreeSet<Label> {
        self.labels.iter().copied().collect()
    }

    /// Segments the host would create when converting this label map.
    pub fn segments(&self) -> Vec<Segment> {
        segments_from_labels(self.present_labels(), &self.color_table)
    }

    pub fn score_volume(&self, scores: &ScoreTable) -> ArrayD<f64> {
        build_score_volume(&self.labels, scores)
    }
}
