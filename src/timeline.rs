//! Hit testing for the after-effect graph.
//!
//! Shells render the timeline as an SVG in a fixed viewbox and report pointer
//! positions back in viewbox units. The core owns the projection and the
//! highlighted point, so every shell agrees on which checkpoint a pointer
//! position refers to.

use serde::{Deserialize, Serialize};

use crate::schema::TimelineCheckpoint;
use crate::{GRAPH_MARGIN_X, GRAPH_VIEWBOX_WIDTH};

/// Horizontal geometry of the rendered graph, in viewbox units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineLayout {
    pub width: f64,
    pub margin: f64,
}

impl Default for TimelineLayout {
    fn default() -> Self {
        Self {
            width: GRAPH_VIEWBOX_WIDTH,
            margin: GRAPH_MARGIN_X,
        }
    }
}

impl TimelineLayout {
    /// X position for `hour_offset`, scaled so the last checkpoint sits on
    /// the right edge of the drawable area. `max_offset` must be the last
    /// checkpoint's offset; offsets are never extrapolated past it.
    #[must_use]
    pub fn projected_x(&self, hour_offset: f64, max_offset: f64) -> f64 {
        let drawable = self.width - 2.0 * self.margin;
        if max_offset <= 0.0 {
            return self.margin;
        }
        self.margin + (hour_offset / max_offset) * drawable
    }

    /// Projects a whole series. Empty input yields an empty projection.
    #[must_use]
    pub fn project(&self, series: &[TimelineCheckpoint]) -> Vec<f64> {
        let Some(last) = series.last() else {
            return Vec::new();
        };
        series
            .iter()
            .map(|p| self.projected_x(p.hour_offset, last.hour_offset))
            .collect()
    }
}

/// The highlighted point on the graph, driven by pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimelineCursor {
    active_index: Option<usize>,
}

impl TimelineCursor {
    /// Highlights the checkpoint nearest to pointer position `x`. Ties go to
    /// the lower index. A pointer outside the drawable area still snaps to
    /// the nearest endpoint. No-op on an empty series.
    pub fn pointer_moved(&mut self, layout: &TimelineLayout, series: &[TimelineCheckpoint], x: f64) {
        let projected = layout.project(series);
        if projected.is_empty() {
            return;
        }
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, px) in projected.iter().enumerate() {
            let distance = (x - px).abs();
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        self.active_index = Some(best);
    }

    pub fn pointer_left(&mut self) {
        self.active_index = None;
    }

    #[must_use]
    pub const fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    /// The highlighted checkpoint, if the pointer is over the graph.
    #[must_use]
    pub fn selected<'a>(&self, series: &'a [TimelineCheckpoint]) -> Option<&'a TimelineCheckpoint> {
        self.active_index.and_then(|i| series.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Confidence;

    fn checkpoint(offset: f64) -> TimelineCheckpoint {
        TimelineCheckpoint {
            time_window: format!("{offset}h"),
            hour_offset: offset,
            energy_score: 50,
            focus_score: 50,
            digestion_score: 50,
            feeling_indicators: vec!["Okay".into()],
            description: "steady".into(),
            confidence: Confidence::Medium,
            recovery_tip: None,
        }
    }

    fn series() -> Vec<TimelineCheckpoint> {
        vec![checkpoint(0.5), checkpoint(2.0), checkpoint(4.0)]
    }

    #[test]
    fn test_projection_spans_margin_to_width_minus_margin() {
        let layout = TimelineLayout::default();
        let xs = layout.project(&series());
        assert!((xs[0] - 17.0).abs() < 1e-9); // 6 + (0.5/4)*88
        assert!((xs[1] - 50.0).abs() < 1e-9);
        assert!((xs[2] - 94.0).abs() < 1e-9);
    }

    #[test]
    fn test_pointer_near_second_offset_picks_index_one() {
        let layout = TimelineLayout::default();
        let series = series();
        let mut cursor = TimelineCursor::default();
        // x for an offset of 1.9 hours is 47.8, closest to the 2h point.
        cursor.pointer_moved(&layout, &series, 47.8);
        assert_eq!(cursor.active_index(), Some(1));
    }

    #[test]
    fn test_pointer_past_the_end_clamps_to_last_index() {
        let layout = TimelineLayout::default();
        let series = series();
        let mut cursor = TimelineCursor::default();
        cursor.pointer_moved(&layout, &series, 250.0);
        assert_eq!(cursor.active_index(), Some(2));
    }

    #[test]
    fn test_tie_goes_to_lower_index() {
        let layout = TimelineLayout::default();
        let series = series();
        let mut cursor = TimelineCursor::default();
        // Exactly halfway between the 0.5h point (x=17) and the 2h point (x=50).
        cursor.pointer_moved(&layout, &series, 33.5);
        assert_eq!(cursor.active_index(), Some(0));
    }

    #[test]
    fn test_empty_series_is_a_no_op() {
        let layout = TimelineLayout::default();
        let mut cursor = TimelineCursor::default();
        cursor.pointer_moved(&layout, &[], 40.0);
        assert_eq!(cursor.active_index(), None);
    }

    #[test]
    fn test_single_element_is_always_nearest() {
        let layout = TimelineLayout::default();
        let series = vec![checkpoint(1.0)];
        let mut cursor = TimelineCursor::default();
        cursor.pointer_moved(&layout, &series, 0.0);
        assert_eq!(cursor.active_index(), Some(0));
        cursor.pointer_moved(&layout, &series, 100.0);
        assert_eq!(cursor.active_index(), Some(0));
    }

    #[test]
    fn test_pointer_left_clears_highlight() {
        let layout = TimelineLayout::default();
        let series = series();
        let mut cursor = TimelineCursor::default();
        cursor.pointer_moved(&layout, &series, 50.0);
        assert!(cursor.selected(&series).is_some());
        cursor.pointer_left();
        assert_eq!(cursor.active_index(), None);
        assert!(cursor.selected(&series).is_none());
    }
}
