use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the score colorizer and its readers.
///
/// Every variant is local to one load or one recoloring pass; nothing here is
/// meant to take the host session down.
#[derive(Debug, Error)]
pub enum SemioError {
    /// No score in the table is strictly positive, so there is no range to
    /// normalize into.
    #[error("no positive scores present; normalization range is empty")]
    EmptyRange,

    #[error("segment '{name}' has no matching structure in color table '{table}'")]
    UnknownStructure { name: String, table: String },

    #[error("malformed score row {row}: {source}")]
    MalformedScore {
        row: u64,
        #[source]
        source: csv::Error,
    },

    #[error("color table line {line}: {reason}")]
    MalformedColorTable { line: usize, reason: String },

    #[error("color ramp must contain at least one color")]
    EmptyRamp,

    #[error("unknown palette '{0}'")]
    UnknownPalette(String),

    #[error("voxel buffer holds {len} values but shape {shape:?} needs {expected}")]
    ShapeMismatch {
        len: usize,
        expected: usize,
        shape: Vec<usize>,
    },

    #[error("label {value} at voxel {index} is outside 0..=4294967295")]
    LabelOutOfRange { value: i64, index: usize },

    #[error("expected a 3D volume, got {ndim} dimensions")]
    NotVolumetric { ndim: usize },

    #[error("slice {index} is out of range for axis of length {len}")]
    SliceOutOfRange { index: usize, len: usize },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl SemioError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SemioError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SemioError>;
