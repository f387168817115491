pub mod compile;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

pub use compile::compile;
pub use run::run;

use crate::{
    cli::SummaryArgs,
    report::{self, OutputFiles},
    tasks::{DayMaxima, ForecastPoint, HottestSummary, RangeMatch},
};

/// Finalizes Task 1 and writes all three reports, returning their paths.
pub fn write_reports(
    files: &OutputFiles,
    summary: &SummaryArgs,
    days: &DayMaxima,
    matches: &[RangeMatch],
    points: &[ForecastPoint],
) -> Result<Vec<PathBuf>> {
    let paths = report_paths(files);

    let hottest = HottestSummary::new(days, summary.t1_top_count, summary.t1_monthly);
    report::save_hottest(&hottest, summary.t1_top_count, &paths[0])
        .context("writing the hottest day report")?;
    report::save_lines(matches, &paths[1]).context("writing the range report")?;
    report::save_lines(points, &paths[2]).context("writing the forecast report")?;

    info!(
        "Reports written for {} days, {} range matches, {} forecast points",
        days.len(),
        matches.len(),
        points.len()
    );

    Ok(paths.to_vec())
}

pub fn report_paths(files: &OutputFiles) -> [PathBuf; 3] {
    [
        files.report_path(&files.task1),
        files.report_path(&files.task2),
        files.report_path(&files.task3),
    ]
}
