use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use csv::Writer;
use serde::Serialize;

use crate::classifier::{AnalysisResult, Category};
use crate::errors::Result;
use crate::pipeline::{PipelineReport, SegmentationPath};

/// Serializable summary of one analyzed image
#[derive(Debug, Serialize)]
pub struct ReportSummary<'a> {
    pub filename: &'a str,
    pub width: u32,
    pub height: u32,
    pub segmentation: SegmentationPath,
    pub degraded_segmentation: bool,
    pub threshold: Option<f64>,
    #[serde(flatten)]
    pub result: &'a AnalysisResult,
}

impl<'a> ReportSummary<'a> {
    pub fn new(filename: &'a str, report: &'a PipelineReport) -> Self {
        Self {
            filename,
            width: report.segmented.width(),
            height: report.segmented.height(),
            segmentation: report.path,
            degraded_segmentation: report.degraded_segmentation(),
            threshold: report.threshold,
            result: &report.result,
        }
    }
}

/// Write the summary as pretty JSON to any writer
pub fn write_json<W: Write>(summary: &ReportSummary<'_>, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writeln!(writer)?;
    Ok(())
}

/// Write `<output_dir>/<filename>.json`
pub fn write_json_report<P: AsRef<Path>>(
    summary: &ReportSummary<'_>,
    output_dir: P,
) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join(format!("{}.json", summary.filename));

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = fs::File::create(&output_path)?;
    write_json(summary, std::io::BufWriter::new(file))?;

    Ok(output_path)
}

/// Write `<output_dir>/<filename>.csv` with one row per category plus healthy/unhealthy/total rows
pub fn write_csv_report<P: AsRef<Path>>(
    summary: &ReportSummary<'_>,
    output_dir: P,
) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join(format!("{}.csv", summary.filename));

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(&output_path)?;
    let result = summary.result;
    let counts = &result.counts;

    writer.write_record(["Image", "Category", "Pixels", "Percent", "Verdict"])?;

    for category in Category::ALL {
        writer.write_record(&[
            summary.filename.to_string(),
            category.name().to_string(),
            counts.get(category).to_string(),
            format!("{:.6}", result.percents.get(category)),
            result.verdict.to_string(),
        ])?;
    }

    let totals = [
        ("healthy", counts.healthy(), result.healthy_pct),
        ("unhealthy", counts.unhealthy(), result.unhealthy_pct),
        ("total", counts.total, if counts.total > 0 { 100.0 } else { 0.0 }),
    ];
    for (name, pixels, pct) in totals {
        writer.write_record(&[
            summary.filename.to_string(),
            name.to_string(),
            pixels.to_string(),
            format!("{:.6}", pct),
            result.verdict.to_string(),
        ])?;
    }

    writer.flush()?;

    Ok(output_path)
}
