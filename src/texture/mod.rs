pub mod texture;

use image::RgbaImage;
use ndarray::{ArrayBase, Axis, Data, Dimension, Ix3};
use tracing::debug;

use std::path::Path;
use std::str::FromStr;

use crate::config::DisplaySettings;
use crate::error::{Result, SemioError};
use crate::processing::color_ramp::ColorRamp;
use texture::render_slice;

/// Slice orientation of a `(z, y, x)` ordered volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceAxis {
    Axial,
    Coronal,
    Sagittal,
}

impl SliceAxis {
    pub fn axis(self) -> Axis {
        match self {
            SliceAxis::Axial => Axis(0),
            SliceAxis::Coronal => Axis(1),
            SliceAxis::Sagittal => Axis(2),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SliceAxis::Axial => "axial",
            SliceAxis::Coronal => "coronal",
            SliceAxis::Sagittal => "sagittal",
        }
    }
}

impl FromStr for SliceAxis {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "axial" => Ok(SliceAxis::Axial),
            "coronal" => Ok(SliceAxis::Coronal),
            "sagittal" => Ok(SliceAxis::Sagittal),
            other => Err(format!("unknown slice axis '{}'", other)),
        }
    }
}

/// Index of the middle slice along `axis`.
pub fn middle_slice(shape: &[usize], axis: SliceAxis) -> usize {
    shape.get(axis.axis().index()).map_or(0, |&n| n / 2)
}

/// Renders one slice of a 3D score volume as an RGBA overlay.
pub fn render_slice_overlay<S, D>(
    volume: &ArrayBase<S, D>,
    axis: SliceAxis,
    index: usize,
    ramp: &ColorRamp,
    display: &DisplaySettings,
) -> Result<RgbaImage>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let volume = volume
        .view()
        .into_dimensionality::<Ix3>()
        .map_err(|_| SemioError::NotVolumetric {
            ndim: volume.ndim(),
        })?;

    let len = volume.len_of(axis.axis());
    if index >= len {
        return Err(SemioError::SliceOutOfRange { index, len });
    }

    Ok(render_slice(volume.index_axis(axis.axis(), index), ramp, display))
}

pub fn save_slice_overlay<S, D, P>(
    volume: &ArrayBase<S, D>,
    axis: SliceAxis,
    index: usize,
    ramp: &ColorRamp,
    display: &DisplaySettings,
    path: P,
) -> Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
    P: AsRef<Path>,
{
    let img = render_slice_overlay(volume, axis, index, ramp, display)?;
    img.save(path.as_ref())?;
    debug!(path = %path.as_ref().display(), axis = axis.name(), index, "saved overlay");
    Ok(())
}
