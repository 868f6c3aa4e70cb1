//! The plot transform pipeline.
//!
//! Each selected series passes through, in this order and no other:
//! mask → normalize → scale → offset. The order is load-bearing:
//! normalizing before masking would pick the divisor from points the
//! mask is about to discard, and offsets computed before scaling
//! would stack lines on pre-scale maxima. Reordering changes the
//! numbers on every plot.
//!
//! The batch order is the caller's workspace order, passed in
//! explicitly; in stack mode it decides which line sits at the bottom.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::loader::Series;

/// How a batch of series is composed into one plot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlotMode {
    /// Vertical cumulative offsets: each line rides on the maxima of
    /// the lines below it.
    #[default]
    Stack,
    /// Independent positional offsets proportional to the batch index.
    Overlay,
}

impl fmt::Display for PlotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotMode::Stack => write!(f, "stack"),
            PlotMode::Overlay => write!(f, "overlay"),
        }
    }
}

impl FromStr for PlotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stack" => Ok(PlotMode::Stack),
            "overlay" => Ok(PlotMode::Overlay),
            other => Err(format!("unknown plot mode: {:?}", other)),
        }
    }
}

/// Knobs of one transform pass. The params layer builds this from the
/// live parameter snapshot; defaults match an untouched UI.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    /// Mask window on the x axis; an unset bound falls back to the
    /// series' own extremum. Swapped bounds are corrected, not errors.
    pub mask_low: Option<f64>,
    pub mask_high: Option<f64>,
    /// Divide each series by its own maximum before scaling.
    pub normalize: bool,
    /// One scalar shared by the whole batch.
    pub scale: f64,
    /// Per-index offsets (overlay) / per-boundary gap (stack).
    pub x_offset: f64,
    pub y_offset: f64,
    pub mode: PlotMode,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            mask_low: None,
            mask_high: None,
            normalize: true,
            scale: 1.0,
            x_offset: 0.0,
            y_offset: 0.0,
            mode: PlotMode::Stack,
        }
    }
}

/// Result of one transform pass. `dropped` holds the original batch
/// indices of series the mask emptied; survivors are re-indexed
/// contiguously for the offset stage.
#[derive(Debug, Default)]
pub struct TransformOutcome {
    pub series: Vec<Series>,
    pub dropped: Vec<usize>,
}

/// Run the full pipeline over a batch, consuming it.
pub fn transform_batch(batch: Vec<Series>, opts: &TransformOptions) -> TransformOutcome {
    let mut outcome = TransformOutcome::default();

    for (index, series) in batch.into_iter().enumerate() {
        let mut series = mask_series(series, opts.mask_low, opts.mask_high);
        if series.is_empty() {
            log::warn!(
                "series {} has no points inside the mask window; dropped from this plot",
                index
            );
            outcome.dropped.push(index);
            continue;
        }
        if opts.normalize {
            normalize_series(&mut series);
        }
        for y in &mut series.y {
            *y *= opts.scale;
        }
        outcome.series.push(series);
    }

    match opts.mode {
        PlotMode::Overlay => overlay_offsets(&mut outcome.series, opts.x_offset, opts.y_offset),
        PlotMode::Stack => stack_offsets(&mut outcome.series, opts.y_offset),
    }

    outcome
}

/// Keep the points with `low <= x <= high`, inclusive. Bounds given
/// in the wrong order are swapped.
fn mask_series(series: Series, low: Option<f64>, high: Option<f64>) -> Series {
    if series.is_empty() {
        return series;
    }
    let min_x = series.x.iter().copied().fold(f64::INFINITY, f64::min);
    let max_x = series.x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lo = low.unwrap_or(min_x);
    let hi = high.unwrap_or(max_x);
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };

    let mut kept = Series::default();
    for (&x, &y) in series.x.iter().zip(&series.y) {
        if x >= lo && x <= hi {
            kept.x.push(x);
            kept.y.push(y);
        }
    }
    kept
}

/// Divide y by its own positive maximum, falling back to the maximum
/// magnitude for all-nonpositive data. A zero or non-finite divisor
/// makes this a no-op.
fn normalize_series(series: &mut Series) {
    let positive_max = series
        .y
        .iter()
        .copied()
        .filter(|v| *v > 0.0)
        .fold(f64::NEG_INFINITY, f64::max);
    let divisor = if positive_max.is_finite() && positive_max > 0.0 {
        positive_max
    } else {
        series.y.iter().map(|v| v.abs()).fold(0.0f64, f64::max)
    };
    if divisor == 0.0 || !divisor.is_finite() {
        return;
    }
    for y in &mut series.y {
        *y /= divisor;
    }
}

fn overlay_offsets(series: &mut [Series], x_offset: f64, y_offset: f64) {
    for (i, s) in series.iter_mut().enumerate() {
        let dx = x_offset * i as f64;
        let dy = y_offset * i as f64;
        if dx != 0.0 {
            for x in &mut s.x {
                *x += dx;
            }
        }
        if dy != 0.0 {
            for y in &mut s.y {
                *y += dy;
            }
        }
    }
}

/// Stack each line on the running sum of the earlier lines' own
/// maxima, one `y_offset` gap per boundary. No gap is added after the
/// last line; the headroom would be wasted.
fn stack_offsets(series: &mut [Series], y_offset: f64) {
    let n = series.len();
    let mut cumulative = 0.0;
    for i in 0..n {
        let own_max = series[i].max_y();
        if i > 0 {
            for y in &mut series[i].y {
                *y += cumulative;
            }
        }
        if i + 1 < n {
            cumulative += own_max + y_offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(x: &[f64], y: &[f64]) -> Series {
        Series {
            x: x.to_vec(),
            y: y.to_vec(),
        }
    }

    fn raw_options() -> TransformOptions {
        // normalization off so tests control exact values
        TransformOptions {
            normalize: false,
            ..TransformOptions::default()
        }
    }

    #[test]
    fn test_stack_baseline_arithmetic() {
        let s0 = series(&[0.0, 1.0, 2.0], &[0.2, 1.0, 0.4]);
        let s1 = series(&[0.0, 1.0, 2.0], &[0.0, 2.0, 1.0]);
        let opts = TransformOptions {
            y_offset: 1.0,
            mode: PlotMode::Stack,
            ..TransformOptions::default()
        };
        let out = transform_batch(vec![s0, s1], &opts);
        assert_eq!(out.series.len(), 2);

        // normalized: max(y0') == 1.0, min(y1 pre-offset) == 0.0
        let max_y0 = out.series[0].max_y();
        let min_y1 = out.series[1].y.iter().copied().fold(f64::INFINITY, f64::min);
        assert!(
            (min_y1 - (max_y0 + 1.0)).abs() < 1e-12,
            "stack baseline: min(y1')={} max(y0')={}",
            min_y1,
            max_y0
        );
    }

    #[test]
    fn test_stack_first_series_untouched_no_trailing_gap() {
        let s0 = series(&[0.0, 1.0], &[1.0, 3.0]);
        let s1 = series(&[0.0, 1.0], &[2.0, 5.0]);
        let s2 = series(&[0.0, 1.0], &[1.0, 1.0]);
        let opts = TransformOptions {
            y_offset: 0.5,
            mode: PlotMode::Stack,
            ..raw_options()
        };
        let out = transform_batch(vec![s0, s1, s2], &opts);

        assert_eq!(out.series[0].y, vec![1.0, 3.0], "series 0 only scaled");
        // cumulative after s0: 3.0 + 0.5 = 3.5
        assert_eq!(out.series[1].y, vec![5.5, 8.5]);
        // cumulative after s1: 3.5 + 5.0 + 0.5 = 9.0; s2 gets no trailing gap
        assert_eq!(out.series[2].y, vec![10.0, 10.0]);
    }

    #[test]
    fn test_overlay_offsets_are_positional() {
        let s0 = series(&[1.0, 2.0], &[1.0, 2.0]);
        let s1 = series(&[1.0, 2.0], &[1.0, 2.0]);
        let s2 = series(&[1.0, 2.0], &[1.0, 2.0]);
        let opts = TransformOptions {
            x_offset: 10.0,
            y_offset: 0.25,
            mode: PlotMode::Overlay,
            ..raw_options()
        };
        let out = transform_batch(vec![s0, s1, s2], &opts);
        assert_eq!(out.series[0].x, vec![1.0, 2.0]);
        assert_eq!(out.series[1].x, vec![11.0, 12.0]);
        assert_eq!(out.series[2].x, vec![21.0, 22.0]);
        assert_eq!(out.series[2].y, vec![1.5, 2.5]);
    }

    #[test]
    fn test_mask_bounds_auto_swap() {
        let s = series(&[0.0, 1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let opts = TransformOptions {
            mask_low: Some(3.0),
            mask_high: Some(1.0),
            ..raw_options()
        };
        let out = transform_batch(vec![s], &opts);
        assert_eq!(out.series[0].x, vec![1.0, 2.0, 3.0]);
        assert!(out.series[0].x.iter().all(|&x| (1.0..=3.0).contains(&x)));
    }

    #[test]
    fn test_mask_defaults_to_series_extent() {
        let s = series(&[5.0, 3.0, 1.0], &[1.0, 2.0, 3.0]);
        let out = transform_batch(vec![s.clone()], &raw_options());
        assert_eq!(out.series[0], s, "no mask bounds, no change");
    }

    #[test]
    fn test_fully_masked_series_dropped_with_survivors_reindexed() {
        let inside = series(&[0.0, 1.0], &[1.0, 2.0]);
        let outside = series(&[100.0, 101.0], &[1.0, 2.0]);
        let opts = TransformOptions {
            mask_low: Some(0.0),
            mask_high: Some(10.0),
            x_offset: 5.0,
            mode: PlotMode::Overlay,
            ..raw_options()
        };
        let out = transform_batch(vec![outside, inside], &opts);
        assert_eq!(out.dropped, vec![0]);
        assert_eq!(out.series.len(), 1);
        // the survivor is index 0 now: no offset applied
        assert_eq!(out.series[0].x, vec![0.0, 1.0]);
    }

    #[test]
    fn test_normalize_by_positive_max() {
        let mut s = series(&[0.0, 1.0, 2.0], &[-8.0, 2.0, 4.0]);
        normalize_series(&mut s);
        assert_eq!(s.y, vec![-2.0, 0.5, 1.0]);
    }

    #[test]
    fn test_normalize_all_negative_uses_magnitude() {
        let mut s = series(&[0.0, 1.0], &[-2.0, -8.0]);
        normalize_series(&mut s);
        assert_eq!(s.y, vec![-0.25, -1.0]);
    }

    #[test]
    fn test_normalize_zero_divisor_is_noop() {
        let mut s = series(&[0.0, 1.0], &[0.0, 0.0]);
        normalize_series(&mut s);
        assert_eq!(s.y, vec![0.0, 0.0]);
    }

    #[test]
    fn test_scale_applies_before_stacking() {
        let s0 = series(&[0.0], &[2.0]);
        let s1 = series(&[0.0], &[2.0]);
        let opts = TransformOptions {
            scale: 3.0,
            y_offset: 0.0,
            mode: PlotMode::Stack,
            ..raw_options()
        };
        let out = transform_batch(vec![s0, s1], &opts);
        assert_eq!(out.series[0].y, vec![6.0]);
        // baseline is the post-scale maximum of series 0
        assert_eq!(out.series[1].y, vec![12.0]);
    }

    #[test]
    fn test_mode_parse_round_trip() {
        assert_eq!("stack".parse::<PlotMode>().unwrap(), PlotMode::Stack);
        assert_eq!("Overlay".parse::<PlotMode>().unwrap(), PlotMode::Overlay);
        assert!("sideways".parse::<PlotMode>().is_err());
        assert_eq!(PlotMode::Stack.to_string(), "stack");
    }
}
