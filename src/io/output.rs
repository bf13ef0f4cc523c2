use ndarray::{ArrayBase, Data, Dimension};
use serde::Serialize;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, SemioError};
use crate::processing::segments::StyleMap;

/// Flat row of the CSV style export.
#[derive(Debug, Serialize)]
struct StyleRow<'a> {
    segment: &'a str,
    name: &'a str,
    label: u32,
    score: Option<f64>,
    r: f64,
    g: f64,
    b: f64,
    opacity: f64,
    visible_2d: bool,
    visible_3d: bool,
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| SemioError::io(path, e))?;
    Ok(BufWriter::new(file))
}

pub fn write_styles_json<P: AsRef<Path>>(path: P, styles: &StyleMap) -> Result<()> {
    let path = path.as_ref();
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, styles)?;
    writer.flush().map_err(|e| SemioError::io(path, e))?;
    Ok(())
}

pub fn write_styles_csv<P: AsRef<Path>>(path: P, styles: &StyleMap) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_writer(create(path)?);
    for entry in styles.iter() {
        let style = &entry.style;
        writer.serialize(StyleRow {
            segment: &entry.segment.id,
            name: &entry.segment.name,
            label: style.label,
            score: style.score,
            r: style.color.r,
            g: style.color.g,
            b: style.color.b,
            opacity: style.opacity,
            visible_2d: style.visible_2d,
            visible_3d: style.visible_3d,
        })?;
    }
    writer.flush().map_err(|e| SemioError::io(path, e))?;
    Ok(())
}

/// Writes a score volume as little-endian `f32` in logical (row-major) order.
pub fn write_raw_scores<P, S, D>(path: P, volume: &ArrayBase<S, D>) -> Result<()>
where
    P: AsRef<Path>,
    S: Data<Elem = f64>,
    D: Dimension,
{
    let path = path.as_ref();
    let mut writer = create(path)?;
    for &value in volume.iter() {
        writer
            .write_all(&(value as f32).to_le_bytes())
            .map_err(|e| SemioError::io(path, e))?;
    }
    writer.flush().map_err(|e| SemioError::io(path, e))?;
    Ok(())
}
