//! Colors the regions of a brain parcellation by per-region semiology scores.
//!
//! The engine takes a label volume, a `label -> score` table and a color
//! ramp, and produces a score volume, normalization bounds and a per-segment
//! color/visibility mapping for the host viewer to apply.

pub mod config;
pub mod entry;
pub mod error;
pub mod io;
pub mod processing;
pub mod texture;
mod utils;

#[cfg(feature = "python")]
mod python_bind;

pub use error::{Result, SemioError};
pub use io::input::{ColorTable, Label, ScoreTable};
pub use io::Parcellation;
pub use processing::color_ramp::{ColorRamp, NamedPalette, Rgb};
pub use processing::colorizer::{
    build_score_volume, color_for_score, normalize, Normalization, ScoreRange,
};
pub use processing::segments::{
    assign_segment_styles, assign_segment_styles_isolated, Segment, SegmentStyle, StyleMap,
    StyleOptions, StyleReport,
};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// This is the module importable from Python:
///
/// ```python
/// import semiovis as sv
/// scores = sv.read_score_table("scores.csv")
/// styles, unresolved = sv.assign_segment_styles(
///     segments, scores, sv.named_ramp("Plasma"), "BrainAnatomyLabelsV3_0.txt"
/// )
/// ```
#[cfg(feature = "python")]
#[pymodule]
fn semiovis(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use python_bind::*;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(read_score_table_py, m)?)?;
    m.add_function(wrap_pyfunction!(build_score_volume_py, m)?)?;
    m.add_function(wrap_pyfunction!(normalize_py, m)?)?;
    m.add_function(wrap_pyfunction!(color_for_score_py, m)?)?;
    m.add_function(wrap_pyfunction!(named_ramp_py, m)?)?;
    m.add_function(wrap_pyfunction!(assign_segment_styles_py, m)?)?;

    m.add_class::<PySegmentStyle>()?;
    Ok(())
}
