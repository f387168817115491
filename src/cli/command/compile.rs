use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::{
    checkpoint::{self, CheckpointStore},
    cli::{create_spinner, CompileArgs, SummaryArgs},
    report::{self, OutputFiles, ReportFile},
    tasks::{hottest::merge_maxima, DayMaxima, HottestSummary},
};

use super::report_paths;

/// Rebuilds the reports from the checkpoints of an earlier run.
pub async fn compile(args: &CompileArgs) -> Result<Vec<PathBuf>> {
    let files = args.output.files();
    let store = CheckpointStore::new(&files);

    if store.hottest_checkpoints()?.is_empty() {
        bail!("No checkpoints found in `{}`", files.dir.display());
    }

    compile_checkpoints(&store, &files, &args.summary)
}

/// Merges Task 1 checkpoints in index order and copies the Task 2 and Task 3
/// checkpoints into their reports one at a time.
pub fn compile_checkpoints(
    store: &CheckpointStore,
    files: &OutputFiles,
    summary: &SummaryArgs,
) -> Result<Vec<PathBuf>> {
    let bar = create_spinner("Compiling checkpoints...".to_string());
    let paths = report_paths(files);

    let mut days = DayMaxima::new();
    for (_, path) in store.hottest_checkpoints()? {
        merge_maxima(&mut days, checkpoint::load_hottest(&path)?);
    }
    let hottest = HottestSummary::new(&days, summary.t1_top_count, summary.t1_monthly);
    report::save_hottest(&hottest, summary.t1_top_count, &paths[0])
        .context("writing the hottest day report")?;

    let mut ranges = ReportFile::create(&paths[1])?;
    for (index, path) in store.range_checkpoints()? {
        let matches = checkpoint::load_ranges(&path)
            .with_context(|| format!("loading range checkpoint {}", index))?;
        ranges.write_lines(&matches)?;
    }
    let range_count = ranges.finish()?;

    let mut forecast = ReportFile::create(&paths[2])?;
    for (index, path) in store.forecast_checkpoints()? {
        let points = checkpoint::load_forecast(&path)
            .with_context(|| format!("loading forecast checkpoint {}", index))?;
        forecast.write_lines(&points)?;
    }
    let point_count = forecast.finish()?;

    bar.finish_with_message("Checkpoints compiled");
    info!(
        "Compiled {} days, {} range matches, {} forecast points",
        days.len(),
        range_count,
        point_count
    );

    Ok(paths.to_vec())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::{
        cli::OutputArgs,
        tasks::{
            tests::{day, hm},
            DailyMax, ForecastPoint, MonthlyAverage, RangeMatch,
        },
    };

    fn compile_args(dir: &std::path::Path) -> CompileArgs {
        CompileArgs {
            output: OutputArgs {
                output_dir: dir.to_path_buf(),
                t1_file_name: "task1".to_string(),
                t2_file_name: "task2".to_string(),
                t3_file_name: "task3".to_string(),
            },
            summary: SummaryArgs {
                t1_top_count: 2,
                t1_monthly: MonthlyAverage::Pairwise,
            },
        }
    }

    fn one_day(date: &str, temp: f64, h: u32, m: u32) -> DayMaxima {
        [(day(date), DailyMax { temp, time: hm(h, m) })]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn should_compile_reports_from_checkpoints() {
        let tmp = TempDir::new().unwrap();
        let args = compile_args(tmp.path());
        let store = CheckpointStore::new(&args.output.files());

        store
            .save(
                0,
                &one_day("01/06/2006", 17.0, 12, 0),
                &[RangeMatch {
                    date: day("01/06/2006"),
                    time: hm(9, 20),
                }],
                &[ForecastPoint {
                    date: day("01/07/2006"),
                    time: hm(9, 10),
                    value: 23.671875,
                }],
            )
            .unwrap();
        store
            .save(
                1,
                &one_day("01/06/2006", 17.5, 14, 0),
                &[RangeMatch {
                    date: day("03/06/2006"),
                    time: hm(10, 20),
                }],
                &[],
            )
            .unwrap();

        let paths = compile(&args).await.unwrap();

        assert_eq!(
            fs::read_to_string(&paths[0]).unwrap(),
            "Average time of hottest daily temperature (over month)\n\
             06/2006 14:00\n\
             \n\
             Most commonly occurring hottest time of day\n\
             14:00\n\
             \n\
             Top 2 hottest times on distinct days\n\
             17.5 01/06/2006\n"
        );
        assert_eq!(
            fs::read_to_string(&paths[1]).unwrap(),
            "01/06/2006 09:20\n03/06/2006 10:20\n"
        );
        assert_eq!(
            fs::read_to_string(&paths[2]).unwrap(),
            "01/07/2006 09:10 23.671875\n"
        );
    }

    #[tokio::test]
    async fn should_fail_without_checkpoints() {
        let tmp = TempDir::new().unwrap();

        assert!(compile(&compile_args(tmp.path())).await.is_err());
    }

    #[tokio::test]
    async fn should_fail_on_malformed_checkpoint() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("task1-ckpt-0.json"), r#"{"01/06/2006": 3}"#).unwrap();

        assert!(compile(&compile_args(tmp.path())).await.is_err());
    }
}
