use csv::{ReaderBuilder, Trim};
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, SemioError};
use crate::processing::color_ramp::Rgb;

/// Integer identifier of one anatomical structure in a parcellation atlas.
pub type Label = u32;

/// Utility: detect whether the file uses comma or tab as delimiter.
fn detect_delimiter<P: AsRef<Path>>(path: P) -> Result<u8> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SemioError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut first_line = String::new();
    reader
        .read_line(&mut first_line)
        .map_err(|e| SemioError::io(path, e))?;

    let tabs = first_line.matches('\t').count();
    let commas = first_line.matches(',').count();

    if tabs > commas {
        Ok(b'\t')
    } else {
        Ok(b',')
    }
}

/// Sparse mapping from region label to semiology score.
///
/// Labels that are absent carry no score. Iteration is in ascending label
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    scores: BTreeMap<Label, f64>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a score, returning the one it replaced.
    pub fn insert(&mut self, label: Label, score: f64) -> Option<f64> {
        self.scores.insert(label, score)
    }

    pub fn get(&self, label: Label) -> Option<f64> {
        self.scores.get(&label).copied()
    }

    /// Score of `label`, or 0.0 when the label is unscored.
    pub fn score_or_zero(&self, label: Label) -> f64 {
        self.get(label).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Label, f64)> + '_ {
        self.scores.iter().map(|(&label, &score)| (label, score))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.scores.values().copied()
    }

    /// Reads a two-column `label, score` CSV with a header row.
    ///
    /// Any row that does not parse aborts the whole load. Later rows win over
    /// earlier rows with the same label. Integer labels outside the label
    /// range (negative ones, say) can match no voxel and are skipped.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut table = ScoreTable::new();
        for (index, result) in reader.records().enumerate() {
            let row = index as u64 + 1;
            let (raw, score): (i64, f64) = result
                .and_then(|record| record.deserialize(None))
                .map_err(|source| SemioError::MalformedScore { row, source })?;
            let Ok(label) = Label::try_from(raw) else {
                debug!(row, label = raw, "label outside the label range; row skipped");
                continue;
            };

            if let Some(previous) = table.insert(label, score) {
                debug!(label, previous, score, "duplicate label overwrites earlier score");
            }
        }
        Ok(table)
    }
}

impl FromIterator<(Label, f64)> for ScoreTable {
    fn from_iter<I: IntoIterator<Item = (Label, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

pub fn read_score_table<P: AsRef<Path>>(path: P) -> Result<ScoreTable> {
    let path = path.as_ref();
    let delim = detect_delimiter(path)?;
    let file = File::open(path).map_err(|e| SemioError::io(path, e))?;
    let table = ScoreTable::from_reader(file, delim)?;
    debug!(path = %path.display(), entries = table.len(), "loaded score table");
    Ok(table)
}

/// One structure of an atlas color table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorTableEntry {
    pub label: Label,
    pub name: String,
    pub color: Rgb,
    pub alpha: f64,
}

/// Label -> name -> display color lookup of a parcellation atlas.
#[derive(Debug, Clone)]
pub struct ColorTable {
    name: String,
    entries: Vec<ColorTableEntry>,
    by_name: HashMap<String, usize>,
    by_label: BTreeMap<Label, usize>,
}

impl ColorTable {
    /// Parses the line-oriented `label name r g b alpha` format.
    ///
    /// Blank lines and `#` comments are skipped, channels are 0-255 and get
    /// scaled to [0, 1].
    pub fn parse(name: &str, src: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (lineno, raw) in src.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            entries.push(parse_entry(line, lineno + 1)?);
        }
        Ok(Self::from_entries(name, entries))
    }

    pub fn from_entries(name: &str, entries: Vec<ColorTableEntry>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_label = BTreeMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if by_name.contains_key(&entry.name) {
                warn!(table = name, structure = %entry.name, "duplicate structure name, keeping first");
            } else {
                by_name.insert(entry.name.clone(), i);
            }
            if by_label.contains_key(&entry.label) {
                warn!(table = name, label = entry.label, "duplicate label, keeping first");
            } else {
                by_label.insert(entry.label, i);
            }
        }

        Self {
            name: name.to_string(),
            entries,
            by_name,
            by_label,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[ColorTableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn label_for_name(&self, name: &str) -> Option<Label> {
        self.by_name.get(name).map(|&i| self.entries[i].label)
    }

    /// Like [`ColorTable::label_for_name`], but a missing name is an error.
    pub fn resolve(&self, name: &str) -> Result<Label> {
        self.label_for_name(name)
            .ok_or_else(|| SemioError::UnknownStructure {
                name: name.to_string(),
                table: self.name.clone(),
            })
    }

    pub fn entry(&self, label: Label) -> Option<&ColorTableEntry> {
        self.by_label.get(&label).map(|&i| &self.entries[i])
    }

    pub fn name_for_label(&self, label: Label) -> Option<&str> {
        self.entry(label).map(|e| e.name.as_str())
    }

    /// Entries ordered by label, the order a ramp built from this table uses.
    pub fn entries_by_label(&self) -> impl Iterator<Item = &ColorTableEntry> + '_ {
        self.by_label.values().map(|&i| &self.entries[i])
    }
}

fn parse_entry(line: &str, lineno: usize) -> Result<ColorTableEntry> {
    let malformed = |reason: String| SemioError::MalformedColorTable {
        line: lineno,
        reason,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(malformed(format!(
            "expected 6 fields (label name r g b alpha), found {}",
            fields.len()
        )));
    }

    let label: Label = fields[0]
        .parse()
        .map_err(|_| malformed(format!("bad label '{}'", fields[0])))?;

    let mut channels = [0.0; 4];
    for (slot, raw) in channels.iter_mut().zip(&fields[2..]) {
        let value: f64 = raw
            .parse()
            .map_err(|_| malformed(format!("bad channel '{}'", raw)))?;
        if !(0.0..=255.0).contains(&value) {
            return Err(malformed(format!("channel {} outside 0-255", value)));
        }
        *slot = value / 255.0;
    }

    Ok(ColorTableEntry {
        label,
        name: fields[1].to_string(),
        color: Rgb::new(channels[0], channels[1], channels[2]),
        alpha: channels[3],
    })
}

/// Reads a color table file; its name is the file stem.
pub fn read_color_table<P: AsRef<Path>>(path: P) -> Result<ColorTable> {
    let path = path.as_ref();
    let src = std::fs::read_to_string(path).map_err(|e| SemioError::io(path, e))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let table = ColorTable::parse(&name, &src)?;
    debug!(path = %path.display(), structures = table.len(), "loaded color table");
    Ok(table)
}

/// Element type of a headerless little-endian label buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoxelType {
    U8,
    U16,
    I32,
}

impl VoxelType {
    pub fn size(self) -> usize {
        match self {
            VoxelType::U8 => 1,
            VoxelType::U16 => 2,
            VoxelType::I32 => 4,
        }
    }
}

impl FromStr for VoxelType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "u8" | "uint8" => Ok(VoxelType::U8),
            "u16" | "uint16" => Ok(VoxelType::U16),
            "i32" | "int32" => Ok(VoxelType::I32),
            other => Err(format!("unsupported voxel type '{}'", other)),
        }
    }
}

/// Number of voxels in `shape`, `None` when it does not fit in `usize`.
fn voxel_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Builds a label array from raw integer values in row-major order.
pub fn labels_from_raw(values: Vec<i64>, shape: &[usize]) -> Result<ArrayD<Label>> {
    let expected = voxel_count(shape).unwrap_or(usize::MAX);
    if values.len() != expected {
        return Err(SemioError::ShapeMismatch {
            len: values.len(),
            expected,
            shape: shape.to_vec(),
        });
    }

    let labels = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            Label::try_from(value).map_err(|_| SemioError::LabelOutOfRange { value, index })
        })
        .collect::<Result<Vec<Label>>>()?;

    ArrayD::from_shape_vec(IxDyn(shape), labels).map_err(|_| SemioError::ShapeMismatch {
        len: expected,
        expected,
        shape: shape.to_vec(),
    })
}

/// Reads a raw parcellation buffer of the given shape and element type.
pub fn read_raw_labels<P: AsRef<Path>>(
    path: P,
    shape: &[usize],
    voxel_type: VoxelType,
) -> Result<ArrayD<Label>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| SemioError::io(path, e))?;

    let size = voxel_type.size();
    let expected = voxel_count(shape).unwrap_or(usize::MAX);
    let fits = expected
        .checked_mul(size)
        .is_some_and(|needed| needed == bytes.len());
    if !fits {
        return Err(SemioError::ShapeMismatch {
            len: bytes.len() / size,
            expected,
            shape: shape.to_vec(),
        });
    }

    let values: Vec<i64> = bytes
        .chunks_exact(size)
        .map(|chunk| match voxel_type {
            VoxelType::U8 => chunk[0] as i64,
            VoxelType::U16 => u16::from_le_bytes([chunk[0], chunk[1]]) as i64,
            VoxelType::I32 => i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as i64,
        })
        .collect();

    labels_from_raw(values, shape)
}
