// File: src/python_bind.rs
use pyo3::exceptions::{PyIOError, PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use std::collections::HashMap;

use crate::error::SemioError;
use crate::io::input::{labels_from_raw, read_color_table, read_score_table, Label, ScoreTable};
use crate::processing::color_ramp::{ColorRamp, Rgb};
use crate::processing::colorizer::{build_score_volume, color_for_score, normalize};
use crate::processing::segments::{
    assign_segment_styles, assign_segment_styles_isolated, Segment, StyleOptions, StyledSegment,
};

fn to_py_err(e: SemioError) -> PyErr {
    match e {
        SemioError::UnknownStructure { .. } => PyKeyError::new_err(e.to_string()),
        SemioError::Io { .. } => PyIOError::new_err(e.to_string()),
        SemioError::EmptyRange
        | SemioError::MalformedScore { .. }
        | SemioError::MalformedColorTable { .. }
        | SemioError::EmptyRamp
        | SemioError::UnknownPalette(_)
        | SemioError::ShapeMismatch { .. }
        | SemioError::LabelOutOfRange { .. } => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn ramp_from_tuples(ramp: Vec<(f64, f64, f64)>) -> PyResult<ColorRamp> {
    ColorRamp::new(ramp.into_iter().map(|(r, g, b)| Rgb::new(r, g, b)).collect())
        .map_err(to_py_err)
}

/// Display state of one segment, as returned by `assign_segment_styles`.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PySegmentStyle {
    #[pyo3(get)]
    pub segment_id: String,
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub label: u32,
    #[pyo3(get)]
    pub score: Option<f64>,
    #[pyo3(get)]
    pub color: (f64, f64, f64),
    #[pyo3(get)]
    pub opacity: f64,
    #[pyo3(get)]
    pub visible_2d: bool,
    #[pyo3(get)]
    pub visible_3d: bool,
}

#[pymethods]
impl PySegmentStyle {
    fn __repr__(&self) -> String {
        format!(
            "SegmentStyle(id={}, label={}, color=({:.3}, {:.3}, {:.3}), visible={})",
            self.segment_id,
            self.label,
            self.color.0,
            self.color.1,
            self.color.2,
            self.visible_3d
        )
    }
}

impl From<&StyledSegment> for PySegmentStyle {
    fn from(entry: &StyledSegment) -> Self {
        Self {
            segment_id: entry.segment.id.clone(),
            name: entry.segment.name.clone(),
            label: entry.style.label,
            score: entry.style.score,
            color: entry.style.color.into(),
            opacity: entry.style.opacity,
            visible_2d: entry.style.visible_2d,
            visible_3d: entry.style.visible_3d,
        }
    }
}

/// Reads a `label, score` CSV into a dict.
///
/// Raises ValueError on the first malformed row; nothing is returned then.
#[pyfunction]
#[pyo3(name = "read_score_table")]
pub fn read_score_table_py(path: &str) -> PyResult<HashMap<Label, f64>> {
    let table = read_score_table(path).map_err(to_py_err)?;
    Ok(table.iter().collect())
}

/// Score of every voxel's label, flattened in the same order as `labels`.
///
/// Example:
///     >>> import semiovis as sv
///     >>> sv.build_score_volume([1, 2, 3], (3,), {1: 5.0, 2: -1.0})
///     [5.0, -1.0, 0.0]
#[pyfunction]
#[pyo3(name = "build_score_volume")]
pub fn build_score_volume_py(
    labels: Vec<i64>,
    shape: Vec<usize>,
    scores: HashMap<Label, f64>,
) -> PyResult<Vec<f64>> {
    let parcellation = labels_from_raw(labels, &shape).map_err(to_py_err)?;
    let scores: ScoreTable = scores.into_iter().collect();
    Ok(build_score_volume(&parcellation, &scores).iter().copied().collect())
}

/// Returns `(min_positive, max_positive)`; ValueError without positive scores.
#[pyfunction]
#[pyo3(name = "normalize")]
pub fn normalize_py(scores: HashMap<Label, f64>) -> PyResult<(f64, f64)> {
    let scores: ScoreTable = scores.into_iter().collect();
    let range = normalize(&scores).map_err(to_py_err)?;
    Ok((range.min_positive, range.max_positive))
}

#[pyfunction]
#[pyo3(name = "color_for_score")]
pub fn color_for_score_py(normalized: f64, ramp: Vec<(f64, f64, f64)>) -> PyResult<(f64, f64, f64)> {
    let ramp = ramp_from_tuples(ramp)?;
    Ok(color_for_score(normalized, &ramp).into())
}

/// Named palette (e.g. "Plasma") as a list of RGB tuples.
#[pyfunction]
#[pyo3(name = "named_ramp")]
pub fn named_ramp_py(name: &str) -> PyResult<Vec<(f64, f64, f64)>> {
    let ramp = ColorRamp::named(name).map_err(to_py_err)?;
    Ok(ramp.colors().iter().map(|&c| c.into()).collect())
}

/// Styles segments given as `(segment_id, name)` pairs.
///
/// Returns `(styles, unresolved_ids)`. With `isolate=False` an unknown
/// structure raises KeyError and no style is produced; with `isolate=True`
/// unknown segments are skipped and listed.
#[pyfunction]
#[pyo3(
    name = "assign_segment_styles",
    signature = (segments, scores, ramp, color_table_path, isolate = false, neutral_color = (0.5, 0.5, 0.5))
)]
pub fn assign_segment_styles_py(
    segments: Vec<(String, String)>,
    scores: HashMap<Label, f64>,
    ramp: Vec<(f64, f64, f64)>,
    color_table_path: &str,
    isolate: bool,
    neutral_color: (f64, f64, f64),
) -> PyResult<(HashMap<String, PySegmentStyle>, Vec<String>)> {
    let segments: Vec<Segment> = segments
        .into_iter()
        .map(|(id, name)| Segment::new(id, name))
        .collect();
    let scores: ScoreTable = scores.into_iter().collect();
    let ramp = ramp_from_tuples(ramp)?;
    let table = read_color_table(color_table_path).map_err(to_py_err)?;
    let options = StyleOptions {
        neutral_color: Rgb::new(neutral_color.0, neutral_color.1, neutral_color.2),
        ..StyleOptions::default()
    };

    let (styles, unresolved) = if isolate {
        let report = assign_segment_styles_isolated(&segments, &scores, &ramp, &table, &options)
            .map_err(to_py_err)?;
        (report.styles, report.unresolved)
    } else {
        let styles = assign_segment_styles(&segments, &scores, &ramp, &table, &options)
            .map_err(to_py_err)?;
        (styles, Vec::new())
    };

    let styles = styles
        .iter()
        .map(|entry| (entry.segment.id.clone(), PySegmentStyle::from(entry)))
        .collect();
    let unresolved = unresolved.into_iter().map(|s| s.id).collect();
    Ok((styles, unresolved))
}
