use ndarray::{Array, ArrayBase, Data, Dimension};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SemioError};
use crate::io::input::{Label, ScoreTable};
use crate::processing::color_ramp::{ColorRamp, Rgb};

/// Maps every voxel of a parcellation to the score of its label, 0.0 where
/// the label is unscored. Negative scores pass through untouched.
pub fn build_score_volume<S, D>(parcellation: &ArrayBase<S, D>, scores: &ScoreTable) -> Array<f64, D>
where
    S: Data<Elem = Label>,
    D: Dimension,
{
    parcellation.map(|&label| scores.score_or_zero(label))
}

/// How a positive score is rescaled before it indexes a ramp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// `(score - min_positive) / max_positive`, kept bit-for-bit compatible
    /// with existing score renderings. The top score lands below 1.0.
    #[default]
    Legacy,
    /// `(score - min_positive) / (max_positive - min_positive)`, clamped to
    /// [0, 1]; 0.0 when every positive score is equal.
    MinMax,
}

/// Bounds used to rescale scores into ramp positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRange {
    /// Smallest strictly positive score.
    pub min_positive: f64,
    /// Largest score over the whole table, non-positive entries included.
    pub max_positive: f64,
}

impl ScoreRange {
    /// Legacy rescaling. Not clamped: a non-positive score comes out negative.
    pub fn normalized(&self, score: f64) -> f64 {
        (score - self.min_positive) / self.max_positive
    }

    pub fn normalized_with(&self, score: f64, mode: Normalization) -> f64 {
        match mode {
            Normalization::Legacy => self.normalized(score),
            Normalization::MinMax => {
                let span = self.max_positive - self.min_positive;
                if span > 0.0 {
                    ((score - self.min_positive) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            }
        }
    }
}

/// Computes the normalization bounds of a score table.
///
/// Fails with [`SemioError::EmptyRange`] when no score is strictly positive.
pub fn normalize(scores: &ScoreTable) -> Result<ScoreRange> {
    let min_positive = scores
        .values()
        .filter(|&s| s > 0.0)
        .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |m| m.min(s))))
        .ok_or(SemioError::EmptyRange)?;

    let max_positive = scores.values().fold(f64::NEG_INFINITY, f64::max);

    Ok(ScoreRange {
        min_positive,
        max_positive,
    })
}

/// Ramp index for a normalized score: `floor((len - 1) * t)` clamped into
/// the ramp. NaN maps to the first entry.
pub fn color_index(normalized: f64, len: usize) -> usize {
    if len == 0 || normalized.is_nan() {
        return 0;
    }
    let last = (len - 1) as f64;
    (last * normalized).floor().clamp(0.0, last) as usize
}

pub fn color_for_score(normalized: f64, ramp: &ColorRamp) -> Rgb {
    ramp.colors()[color_index(normalized, ramp.len())]
}

#[cfg(test)]
mod colorizer_tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr3, Array2};

    fn four_color_ramp() -> ColorRamp {
        ColorRamp::new(vec![
            Rgb::new(0.0, 0.0, 0.0),
            Rgb::new(0.25, 0.0, 0.0),
            Rgb::new(0.5, 0.0, 0.0),
            Rgb::new(1.0, 0.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_score_volume_looks_up_labels() {
        let parcellation = arr1(&[1u32, 2, 3, 1, 3]);
        let scores: ScoreTable = [(1, 5.0), (2, -1.0)].into_iter().collect();

        let volume = build_score_volume(&parcellation, &scores);

        assert_eq!(volume.to_vec(), vec![5.0, -1.0, 0.0, 5.0, 0.0]);
    }

    #[test]
    fn test_score_volume_keeps_shape() {
        let parcellation = arr3(&[[[0u32, 4], [4, 9]], [[9, 9], [0, 4]]]);
        let scores: ScoreTable = [(4, 2.5), (9, 0.0)].into_iter().collect();

        let volume = build_score_volume(&parcellation, &scores);

        assert_eq!(volume.shape(), parcellation.shape());
        assert_eq!(volume[[0, 0, 1]], 2.5);
        assert_eq!(volume[[1, 0, 0]], 0.0);
        assert_eq!(volume[[1, 1, 0]], 0.0);
    }

    #[test]
    fn test_score_volume_of_empty_table_is_zero() {
        let parcellation = Array2::<u32>::from_elem((3, 4), 7);
        let volume = build_score_volume(&parcellation.view(), &ScoreTable::new());
        assert!(volume.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_normalize_uses_literal_bounds() {
        let scores: ScoreTable = [(10, 2.0), (20, 8.0)].into_iter().collect();
        let range = normalize(&scores).unwrap();

        assert_relative_eq!(range.min_positive, 2.0);
        assert_relative_eq!(range.max_positive, 8.0);
        assert_relative_eq!(range.normalized(2.0), 0.0);
        assert_relative_eq!(range.normalized(8.0), 0.75);
    }

    #[test]
    fn test_normalize_ignores_non_positive_for_minimum() {
        let scores: ScoreTable = [(1, 0.0), (2, -4.0), (3, 2.0), (4, 10.0)]
            .into_iter()
            .collect();
        let range = normalize(&scores).unwrap();

        assert_relative_eq!(range.min_positive, 2.0);
        assert_relative_eq!(range.max_positive, 10.0);
        // (10 - 2) / 10, not 1.0
        assert_relative_eq!(range.normalized(10.0), 0.8);
        assert_relative_eq!(range.normalized(-4.0), -0.6);
    }

    #[test]
    fn test_normalize_without_positive_scores_fails() {
        let scores: ScoreTable = [(1, 0.0), (2, -3.0)].into_iter().collect();
        assert!(matches!(normalize(&scores), Err(SemioError::EmptyRange)));
        assert!(matches!(normalize(&ScoreTable::new()), Err(SemioError::EmptyRange)));
    }

    #[test]
    fn test_min_max_normalization() {
        let scores: ScoreTable = [(1, 2.0), (2, 6.0), (3, 10.0)].into_iter().collect();
        let range = normalize(&scores).unwrap();

        assert_relative_eq!(range.normalized_with(2.0, Normalization::MinMax), 0.0);
        assert_relative_eq!(range.normalized_with(6.0, Normalization::MinMax), 0.5);
        assert_relative_eq!(range.normalized_with(10.0, Normalization::MinMax), 1.0);
        assert_relative_eq!(range.normalized_with(-5.0, Normalization::MinMax), 0.0);

        let flat: ScoreTable = [(1, 3.0), (2, 3.0)].into_iter().collect();
        let range = normalize(&flat).unwrap();
        assert_relative_eq!(range.normalized_with(3.0, Normalization::MinMax), 0.0);
    }

    #[test]
    fn test_color_for_score_endpoints() {
        let ramp = four_color_ramp();
        assert_eq!(color_for_score(0.0, &ramp), ramp.first());
        assert_eq!(color_for_score(1.0, &ramp), ramp.last());
        assert_eq!(color_for_score(0.75, &ramp), ramp.colors()[2]);
    }

    #[test]
    fn test_color_for_score_clamps_out_of_range() {
        let ramp = four_color_ramp();
        assert_eq!(color_for_score(-0.6, &ramp), ramp.first());
        assert_eq!(color_for_score(3.5, &ramp), ramp.last());
        assert_eq!(color_for_score(f64::INFINITY, &ramp), ramp.last());
        assert_eq!(color_for_score(f64::NAN, &ramp), ramp.first());
    }

    #[test]
    fn test_color_index_single_entry_ramp() {
        assert_eq!(color_index(0.0, 1), 0);
        assert_eq!(color_index(0.9, 1), 0);
        assert_eq!(color_index(0.5, 0), 0);
    }
}
