use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SemioError};
use crate::io::input::{ColorTable, Label, ScoreTable};
use crate::processing::color_ramp::{ColorRamp, Rgb};
use crate::processing::colorizer::{color_for_score, normalize, Normalization, ScoreRange};

/// Color given to segments without a positive score.
pub const NEUTRAL_COLOR: Rgb = Rgb::new(0.5, 0.5, 0.5);

/// A named region of the host segmentation, one per region label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub name: String,
}

impl Segment {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Segment for `label`, named as the color table names it. Labels the
    /// table does not know get a placeholder name that will not resolve.
    pub fn for_label(label: Label, table: &ColorTable) -> Self {
        let name = table
            .name_for_label(label)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Label_{}", label));
        Self::new(format!("Segment_{}", label), name)
    }
}

/// One segment per label, background (0) excluded, in iteration order.
pub fn segments_from_labels<I>(labels: I, table: &ColorTable) -> Vec<Segment>
where
    I: IntoIterator<Item = Label>,
{
    labels
        .into_iter()
        .filter(|&label| label != 0)
        .map(|label| Segment::for_label(label, table))
        .collect()
}

/// One segment per non-background structure of the color table.
pub fn segments_from_color_table(table: &ColorTable) -> Vec<Segment> {
    segments_from_labels(table.entries_by_label().map(|e| e.label), table)
}

/// Display state of one segment in the 2D and 3D views.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentStyle {
    pub label: Label,
    pub score: Option<f64>,
    pub color: Rgb,
    pub opacity: f64,
    pub visible_2d: bool,
    pub visible_3d: bool,
}

impl SegmentStyle {
    fn hidden(label: Label, score: Option<f64>, neutral: Rgb) -> Self {
        Self {
            label,
            score,
            color: neutral,
            opacity: 0.0,
            visible_2d: false,
            visible_3d: false,
        }
    }

    fn shown(label: Label, score: f64, color: Rgb) -> Self {
        Self {
            label,
            score: Some(score),
            color,
            opacity: 1.0,
            visible_2d: true,
            visible_3d: true,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible_2d || self.visible_3d
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleOptions {
    pub neutral_color: Rgb,
    pub normalization: Normalization,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            neutral_color: NEUTRAL_COLOR,
            normalization: Normalization::Legacy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledSegment {
    pub segment: Segment,
    pub style: SegmentStyle,
}

/// Segment id -> style, in the order the segments were given.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StyleMap {
    entries: Vec<StyledSegment>,
}

impl StyleMap {
    pub fn get(&self, segment_id: &str) -> Option<&SegmentStyle> {
        self.entries
            .iter()
            .find(|e| e.segment.id == segment_id)
            .map(|e| &e.style)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyledSegment> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn visible_count(&self) -> usize {
        self.entries.iter().filter(|e| e.style.is_visible()).count()
    }

    fn push(&mut self, segment: Segment, style: SegmentStyle) {
        self.entries.push(StyledSegment { segment, style });
    }
}

/// Result of styling with per-segment failure isolation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleReport {
    pub styles: StyleMap,
    pub unresolved: Vec<Segment>,
}

impl StyleReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Style of a single label. `range` must be present whenever the table holds
/// a positive score.
pub fn style_for_label(
    label: Label,
    scores: &ScoreTable,
    range: Option<&ScoreRange>,
    ramp: &ColorRamp,
    options: &StyleOptions,
) -> SegmentStyle {
    let score = scores.get(label);
    match (score, range) {
        (Some(s), Some(range)) if s > 0.0 => {
            let t = range.normalized_with(s, options.normalization);
            SegmentStyle::shown(label, s, color_for_score(t, ramp))
        }
        _ => SegmentStyle::hidden(label, score, options.neutral_color),
    }
}

fn score_range(scores: &ScoreTable) -> Result<Option<ScoreRange>> {
    match normalize(scores) {
        Ok(range) => Ok(Some(range)),
        Err(SemioError::EmptyRange) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Styles every segment, or none of them.
///
/// All segment names are resolved against `table` before any style is
/// computed, so an unknown structure leaves no partial result behind.
pub fn assign_segment_styles(
    segments: &[Segment],
    scores: &ScoreTable,
    ramp: &ColorRamp,
    table: &ColorTable,
    options: &StyleOptions,
) -> Result<StyleMap> {
    let labels = segments
        .iter()
        .map(|segment| table.resolve(&segment.name))
        .collect::<Result<Vec<Label>>>()?;

    let range = score_range(scores)?;
    let mut styles = StyleMap::default();
    for (segment, label) in segments.iter().zip(labels) {
        let style = style_for_label(label, scores, range.as_ref(), ramp, options);
        styles.push(segment.clone(), style);
    }

    debug!(
        segments = styles.len(),
        visible = styles.visible_count(),
        "assigned segment styles"
    );
    Ok(styles)
}

/// Styles every segment that resolves and reports the ones that do not.
pub fn assign_segment_styles_isolated(
    segments: &[Segment],
    scores: &ScoreTable,
    ramp: &ColorRamp,
    table: &ColorTable,
    options: &StyleOptions,
) -> Result<StyleReport> {
    let range = score_range(scores)?;
    let mut report = StyleReport::default();

    for segment in segments {
        match table.resolve(&segment.name) {
            Ok(label) => {
                let style = style_for_label(label, scores, range.as_ref(), ramp, options);
                report.styles.push(segment.clone(), style);
            }
            Err(e) => {
                warn!(segment = %segment.id, "{}", e);
                report.unresolved.push(segment.clone());
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod segment_tests {
    use super::*;
    use crate::utils::test_utils::{sample_color_table, SAMPLE_COLOR_TABLE};
    use rand::Rng;

    fn ramp4() -> ColorRamp {
        ColorRamp::new(vec![
            Rgb::new(0.0, 0.0, 1.0),
            Rgb::new(0.0, 1.0, 0.0),
            Rgb::new(1.0, 1.0, 0.0),
            Rgb::new(1.0, 0.0, 0.0),
        ])
        .unwrap()
    }

    fn two_region_table() -> ColorTable {
        ColorTable::parse("atlas", "0 Background 0 0 0 0\n10 Region_A 10 10 10 255\n20 Region_B 20 20 20 255\n")
            .unwrap()
    }

    #[test]
    fn test_end_to_end_example() {
        let table = two_region_table();
        let segments = segments_from_color_table(&table);
        let scores: ScoreTable = [(10, 2.0), (20, 8.0)].into_iter().collect();
        let ramp = ramp4();

        let styles =
            assign_segment_styles(&segments, &scores, &ramp, &table, &StyleOptions::default())
                .unwrap();

        assert_eq!(styles.len(), 2);
        let a = styles.get("Segment_10").unwrap();
        assert_eq!(a.color, ramp.colors()[0]);
        assert!(a.visible_2d && a.visible_3d);
        assert_eq!(a.opacity, 1.0);

        let b = styles.get("Segment_20").unwrap();
        assert_eq!(b.color, ramp.colors()[2]);
        assert_eq!(b.score, Some(8.0));
    }

    #[test]
    fn test_unscored_and_non_positive_are_hidden() {
        let table = ColorTable::parse("gif", SAMPLE_COLOR_TABLE).unwrap();
        let segments = segments_from_color_table(&table);
        let scores: ScoreTable = [(31, 0.0), (32, -2.0), (48, 4.0)].into_iter().collect();
        let options = StyleOptions::default();

        let styles = assign_segment_styles(&segments, &scores, &ramp4(), &table, &options).unwrap();

        for id in ["Segment_31", "Segment_32"] {
            let style = styles.get(id).unwrap();
            assert_eq!(style.color, NEUTRAL_COLOR);
            assert_eq!(style.opacity, 0.0);
            assert!(!style.visible_2d && !style.visible_3d);
        }
        assert_eq!(styles.get("Segment_32").unwrap().score, Some(-2.0));
        assert!(styles.get("Segment_48").unwrap().is_visible());
        assert_eq!(styles.visible_count(), 1);
    }

    #[test]
    fn test_custom_neutral_color() {
        let table = two_region_table();
        let segments = segments_from_color_table(&table);
        let scores: ScoreTable = [(20, 1.0)].into_iter().collect();
        let options = StyleOptions {
            neutral_color: Rgb::new(1.0, 1.0, 1.0),
            ..StyleOptions::default()
        };

        let styles = assign_segment_styles(&segments, &scores, &ramp4(), &table, &options).unwrap();
        assert_eq!(styles.get("Segment_10").unwrap().color, Rgb::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_no_positive_scores_hides_everything() {
        let table = two_region_table();
        let segments = segments_from_color_table(&table);
        let scores: ScoreTable = [(10, -1.0)].into_iter().collect();

        let styles =
            assign_segment_styles(&segments, &scores, &ramp4(), &table, &StyleOptions::default())
                .unwrap();
        assert_eq!(styles.visible_count(), 0);
    }

    #[test]
    fn test_unknown_structure_aborts_before_styling() {
        let table = two_region_table();
        let segments = vec![
            Segment::new("Segment_10", "Region_A"),
            Segment::new("Segment_99", "Region_Z"),
            Segment::new("Segment_20", "Region_B"),
        ];
        let scores: ScoreTable = [(10, 2.0), (20, 8.0)].into_iter().collect();

        let err =
            assign_segment_styles(&segments, &scores, &ramp4(), &table, &StyleOptions::default())
                .unwrap_err();
        match err {
            SemioError::UnknownStructure { name, table } => {
                assert_eq!(name, "Region_Z");
                assert_eq!(table, "atlas");
            }
            other => panic!("expected UnknownStructure, got {:?}", other),
        }
    }

    #[test]
    fn test_isolated_styling_reports_unresolved() {
        let table = two_region_table();
        let segments = vec![
            Segment::new("Segment_10", "Region_A"),
            Segment::new("Segment_99", "Region_Z"),
            Segment::new("Segment_20", "Region_B"),
        ];
        let scores: ScoreTable = [(10, 2.0), (20, 8.0)].into_iter().collect();

        let report = assign_segment_styles_isolated(
            &segments,
            &scores,
            &ramp4(),
            &table,
            &StyleOptions::default(),
        )
        .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.unresolved, vec![Segment::new("Segment_99", "Region_Z")]);
        assert_eq!(report.styles.len(), 2);
        assert!(report.styles.get("Segment_99").is_none());
        assert_eq!(report.styles.get("Segment_20").unwrap().color, ramp4().colors()[2]);
    }

    #[test]
    fn test_segments_for_unknown_label_use_placeholder() {
        let table = sample_color_table();
        let segments = segments_from_labels([0, 48, 500], &table);

        assert_eq!(
            segments,
            vec![
                Segment::new("Segment_48", "Right_Hippocampus"),
                Segment::new("Segment_500", "Label_500"),
            ]
        );
        assert!(table.resolve(&segments[1].name).is_err());
    }

    #[test]
    fn test_styles_preserve_segment_order() {
        let table = two_region_table();
        let segments = vec![
            Segment::new("Segment_20", "Region_B"),
            Segment::new("Segment_10", "Region_A"),
        ];
        let styles = assign_segment_styles(
            &segments,
            &ScoreTable::new(),
            &ramp4(),
            &table,
            &StyleOptions::default(),
        )
        .unwrap();

        let ids: Vec<&str> = styles.iter().map(|e| e.segment.id.as_str()).collect();
        assert_eq!(ids, vec!["Segment_20", "Segment_10"]);
    }

    #[test]
    fn test_styling_is_idempotent() {
        let mut rng = rand::rng();
        let table = two_region_table();
        let segments = segments_from_color_table(&table);
        let ramp = ColorRamp::named("Viridis").unwrap();

        for _ in 0..50 {
            let scores: ScoreTable = [
                (10, rng.random_range(-5.0..20.0)),
                (20, rng.random_range(0.1..20.0)),
            ]
            .into_iter()
            .collect();

            let options = StyleOptions::default();
            let first = assign_segment_styles(&segments, &scores, &ramp, &table, &options).unwrap();
            let second = assign_segment_styles(&segments, &scores, &ramp, &table, &options).unwrap();
            assert_eq!(first, second);
        }
    }
}
