//! Aggregate statistics over a scored table

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use serde::Serialize;

use crate::batch::ScoredTable;
use crate::data::{column_cells, Cell};
use crate::error::Error;
use crate::export::{to_frame, PREDICTION_COLUMN, PROBABILITY_COLUMN};
use crate::model::Segment;
use crate::source::{flag, number, sheet_row};

/// Number of probability bins used by default
pub const DEFAULT_BINS: usize = 20;

/// One equal-width slice of [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Aggregates shown in the analytics view.
///
/// Rows without a prediction are left out of every statistic: `continue_share` is the mean
/// over scored rows only, and is `None` when nothing was scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub scored: usize,
    pub absent: usize,
    pub continue_share: Option<f64>,
    pub mean_probability: Option<f64>,
    pub probability_histogram: Vec<HistogramBin>,
    pub segment_counts: BTreeMap<Segment, usize>,
}

impl Summary {
    pub fn segment_count(&self, segment: Segment) -> usize {
        self.segment_counts.get(&segment).copied().unwrap_or(0)
    }
}

/// Summarize a freshly scored batch.
pub fn summarize(table: &ScoredTable, bins: usize) -> crate::Result<Summary> {
    summarize_frame(&to_frame(table)?, bins)
}

/// Summarize an uploaded table that carries `Prediction` and `Probability` columns.
/// Other columns are ignored.
pub fn summarize_frame(df: &DataFrame, bins: usize) -> crate::Result<Summary> {
    let predictions = column_cells(df, PREDICTION_COLUMN)?;
    let probabilities = column_cells(df, PROBABILITY_COLUMN)?;

    let (predictions, probabilities) = match (predictions, probabilities) {
        (Some(pred), Some(prob)) => (pred, prob),
        (pred, prob) => {
            let mut missing = Vec::new();
            if pred.is_none() {
                missing.push(PREDICTION_COLUMN.to_string());
            }
            if prob.is_none() {
                missing.push(PROBABILITY_COLUMN.to_string());
            }
            return Err(Error::Schema { missing });
        }
    };

    let predictions = predictions
        .iter()
        .enumerate()
        .map(|(idx, cell)| prediction_cell(cell, sheet_row(idx)))
        .collect::<crate::Result<Vec<_>>>()?;
    let probabilities = probabilities
        .iter()
        .enumerate()
        .map(|(idx, cell)| probability_cell(cell, sheet_row(idx)))
        .collect::<crate::Result<Vec<_>>>()?;

    let mut segment_counts = BTreeMap::from([(Segment::Continue, 0), (Segment::Stop, 0)]);
    for segment in predictions.iter().flatten() {
        *segment_counts.entry(*segment).or_default() += 1;
    }

    let scored = predictions.iter().flatten().count();
    let continuing = segment_counts[&Segment::Continue];
    let continue_share = (scored > 0).then(|| continuing as f64 / scored as f64);

    let present: Vec<f64> = probabilities.iter().flatten().copied().collect();
    let mean_probability =
        (!present.is_empty()).then(|| present.iter().sum::<f64>() / present.len() as f64);

    Ok(Summary {
        rows: df.height(),
        scored,
        absent: df.height() - scored,
        continue_share,
        mean_probability,
        probability_histogram: histogram(&present, bins),
        segment_counts,
    })
}

fn prediction_cell(cell: &Cell, row: usize) -> crate::Result<Option<Segment>> {
    if *cell == Cell::Empty {
        return Ok(None);
    }
    let continues = flag(cell, row, PREDICTION_COLUMN)?;
    Ok(Some(if continues {
        Segment::Continue
    } else {
        Segment::Stop
    }))
}

fn probability_cell(cell: &Cell, row: usize) -> crate::Result<Option<f64>> {
    if *cell == Cell::Empty {
        return Ok(None);
    }
    let p = number(cell, row, PROBABILITY_COLUMN)?;
    if !(0.0..=1.0).contains(&p) {
        return Err(Error::Format(format!(
            "row {row}, column '{PROBABILITY_COLUMN}': {p} is outside [0, 1]"
        )));
    }
    Ok(Some(p))
}

/// Count probabilities into `bins` equal-width bins over [0, 1]. 1.0 lands in the last bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let bins = bins.max(1);
    let scale = bins as f64;

    let mut counts = vec![0usize; bins];
    for &p in values {
        let idx = ((p * scale) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: i as f64 / scale,
            upper: (i + 1) as f64 / scale,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{NamedFrom, Series};

    fn frame(predictions: Vec<Option<i64>>, probabilities: Vec<Option<f64>>) -> DataFrame {
        let n = predictions.len();
        DataFrame::new(vec![
            Series::new("customer", (0..n as i64).collect::<Vec<_>>()),
            Series::new(PREDICTION_COLUMN, predictions),
            Series::new(PROBABILITY_COLUMN, probabilities),
        ])
        .unwrap()
    }

    #[test]
    fn test_share_and_segments() {
        let df = frame(
            vec![Some(1), Some(1), Some(0), Some(1)],
            vec![Some(0.9), Some(0.7), Some(0.2), Some(0.65)],
        );

        let summary = summarize_frame(&df, DEFAULT_BINS).unwrap();

        assert_eq!(summary.continue_share, Some(0.75));
        assert_eq!(summary.segment_count(Segment::Continue), 3);
        assert_eq!(summary.segment_count(Segment::Stop), 1);
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.absent, 0);
    }

    #[test]
    fn test_absent_rows_excluded_from_share() {
        let df = frame(
            vec![Some(1), None, Some(0), None],
            vec![Some(0.9), None, Some(0.1), None],
        );

        let summary = summarize_frame(&df, DEFAULT_BINS).unwrap();

        assert_eq!(summary.continue_share, Some(0.5));
        assert_eq!(summary.scored, 2);
        assert_eq!(summary.absent, 2);
        let total: usize = summary.probability_histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 2);
        assert!((summary.mean_probability.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_nothing_scored() {
        let df = frame(vec![None, None], vec![None, None]);
        let summary = summarize_frame(&df, DEFAULT_BINS).unwrap();

        assert_eq!(summary.continue_share, None);
        assert_eq!(summary.mean_probability, None);
        assert_eq!(summary.segment_count(Segment::Continue), 0);
        assert_eq!(summary.segment_count(Segment::Stop), 0);
    }

    #[test]
    fn test_missing_probability_is_schema_error() {
        let df = frame(vec![Some(1)], vec![Some(0.5)])
            .drop(PROBABILITY_COLUMN)
            .unwrap();

        match summarize_frame(&df, DEFAULT_BINS) {
            Err(Error::Schema { missing }) => assert_eq!(missing, vec!["Probability"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_prediction_cell() {
        let df = frame(vec![Some(1), Some(3)], vec![Some(0.5), Some(0.4)]);

        match summarize_frame(&df, DEFAULT_BINS) {
            Err(Error::Format(msg)) => assert!(msg.contains("row 3"), "{msg}"),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_histogram_edges() {
        let bins = histogram(&[0.0, 0.05, 0.5, 0.99, 1.0], 20);

        assert_eq!(bins.len(), 20);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[1].count, 1);
        assert_eq!(bins[10].count, 1);
        assert_eq!(bins[19].count, 2);
        assert_eq!(bins[0].lower, 0.0);
        assert!((bins[19].upper - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_values_on_bin_edges_open_their_bin() {
        let bins = histogram(&[0.15, 0.35, 0.6], 20);

        assert_eq!(bins[3].count, 1);
        assert_eq!(bins[7].count, 1);
        assert_eq!(bins[12].count, 1);
        assert_eq!(bins[3].lower, 0.15);
        assert_eq!(bins[2].upper, 0.15);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 3);
    }
}
