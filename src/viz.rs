//! Charts and console output for prediction summaries, rendered with Plotters

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::Error;
use crate::model::Segment;
use crate::summary::Summary;

const HISTOGRAM_FILE: &str = "probability_histogram.svg";
const SEGMENTS_FILE: &str = "segment_counts.svg";

const SEGMENTS: [(Segment, RGBColor); 2] = [(Segment::Continue, GREEN), (Segment::Stop, RED)];

fn chart_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Chart(e.to_string())
}

/// Histogram of the probability of continuing, as an SVG document
pub fn render_probability_histogram(summary: &Summary) -> crate::Result<String> {
    let max_count = summary
        .probability_histogram
        .iter()
        .map(|bin| bin.count)
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (800, 400)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Probability distribution", ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..1f64, 0f64..(max_count * 1.1))
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .x_desc("Probability of continuing")
            .y_desc("Frequency")
            .axis_desc_style(("sans-serif", 15))
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(summary.probability_histogram.iter().map(|bin| {
                Rectangle::new(
                    [(bin.lower, 0.0), (bin.upper, bin.count as f64)],
                    BLUE.mix(0.6).filled(),
                )
            }))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    Ok(svg)
}

/// Bar chart of Continue vs Stop counts, as an SVG document
pub fn render_segment_chart(summary: &Summary) -> crate::Result<String> {
    let max_count = SEGMENTS
        .iter()
        .map(|(segment, _)| summary.segment_count(*segment))
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (600, 400)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Segment counts", ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d((0i32..2).into_segmented(), 0f64..(max_count * 1.1))
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Segment")
            .y_desc("Customers")
            .x_label_formatter(&|value| match value {
                SegmentValue::CenterOf(0) => Segment::Continue.to_string(),
                SegmentValue::CenterOf(1) => Segment::Stop.to_string(),
                _ => String::new(),
            })
            .axis_desc_style(("sans-serif", 15))
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(SEGMENTS.iter().zip(0i32..).map(|((segment, color), x)| {
                let count = summary.segment_count(*segment) as f64;
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(x), 0.0), (SegmentValue::Exact(x + 1), count)],
                    color.filled(),
                );
                bar.set_margin(0, 0, 40, 40);
                bar
            }))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    Ok(svg)
}

/// Write both charts into `dir`, creating it if needed, and return the written paths.
pub fn write_report(summary: &Summary, dir: &Path) -> crate::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let charts = [
        (HISTOGRAM_FILE, render_probability_histogram(summary)?),
        (SEGMENTS_FILE, render_segment_chart(summary)?),
    ];

    let mut written = Vec::with_capacity(charts.len());
    for (name, svg) in charts {
        let path = dir.join(name);
        std::fs::write(&path, svg)?;
        tracing::info!(path = %path.display(), "chart saved");
        written.push(path);
    }

    Ok(written)
}

/// Print the summary metrics to the console
pub fn print_summary(summary: &Summary) {
    println!("\n=== Prediction Summary ===");
    println!("Rows: {}", summary.rows);
    println!("Scored: {} (missing predictions: {})", summary.scored, summary.absent);

    match summary.continue_share {
        Some(share) => println!("Share predicted to continue buying: {:.2}%", share * 100.0),
        None => println!("Share predicted to continue buying: n/a"),
    }
    if let Some(mean) = summary.mean_probability {
        println!("Mean probability of continuing: {:.1}%", mean * 100.0);
    }

    println!("\nSegment counts:");
    for (segment, count) in &summary.segment_counts {
        println!("  {:8} | {}", segment.to_string(), count);
    }

    println!("\nProbability distribution:");
    let widest = summary
        .probability_histogram
        .iter()
        .map(|bin| bin.count)
        .max()
        .unwrap_or(0)
        .max(1);
    for bin in &summary.probability_histogram {
        let bar = "#".repeat(bin.count * 40 / widest);
        println!(
            "  {:.2}-{:.2} | {:5} {}",
            bin.lower, bin.upper, bin.count, bar
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{histogram, HistogramBin};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn create_test_summary() -> Summary {
        Summary {
            rows: 6,
            scored: 5,
            absent: 1,
            continue_share: Some(0.6),
            mean_probability: Some(0.55),
            probability_histogram: histogram(&[0.1, 0.35, 0.6, 0.8, 0.9], 10),
            segment_counts: BTreeMap::from([(Segment::Continue, 3), (Segment::Stop, 2)]),
        }
    }

    #[test]
    fn test_render_probability_histogram() {
        let svg = render_probability_histogram(&create_test_summary()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Probability distribution"));
    }

    #[test]
    fn test_render_segment_chart() {
        let svg = render_segment_chart(&create_test_summary()).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Segment counts"));
    }

    #[test]
    fn test_render_empty_summary() {
        let summary = Summary {
            rows: 0,
            scored: 0,
            absent: 0,
            continue_share: None,
            mean_probability: None,
            probability_histogram: vec![HistogramBin {
                lower: 0.0,
                upper: 1.0,
                count: 0,
            }],
            segment_counts: BTreeMap::new(),
        };
        assert!(render_probability_histogram(&summary).is_ok());
        assert!(render_segment_chart(&summary).is_ok());
    }

    #[test]
    fn test_write_report() {
        let temp_dir = tempdir().unwrap();
        let out_dir = temp_dir.path().join("charts");

        let written = write_report(&create_test_summary(), &out_dir).unwrap();

        assert_eq!(written.len(), 2);
        assert!(out_dir.join(HISTOGRAM_FILE).exists());
        assert!(out_dir.join(SEGMENTS_FILE).exists());
    }
}
