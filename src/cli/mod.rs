//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use chrono::NaiveDate;
use clap::{command, Args, Parser, Subcommand};
use indicatif::ProgressBar;

use crate::{
    config,
    download::Source,
    reading::Measure,
    report::OutputFiles,
    tasks::{ForecastMode, MonthlyAverage, RangeSpec},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream the weather log and write the three task reports
    Run(RunArgs),
    /// Rebuild the reports from checkpoints of an earlier run
    Compile(CompileArgs),
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Directory for reports and checkpoints
    #[arg(long, default_value = config::OUTPUT_DIR)]
    pub output_dir: PathBuf,

    #[arg(long, default_value = config::T1_FILE_NAME)]
    pub t1_file_name: String,

    #[arg(long, default_value = config::T2_FILE_NAME)]
    pub t2_file_name: String,

    #[arg(long, default_value = config::T3_FILE_NAME)]
    pub t3_file_name: String,
}

impl OutputArgs {
    pub fn files(&self) -> OutputFiles {
        OutputFiles {
            dir: self.output_dir.clone(),
            task1: self.t1_file_name.clone(),
            task2: self.t2_file_name.clone(),
            task3: self.t3_file_name.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    /// Number of hottest days in the Task 1 report
    #[arg(long, default_value_t = config::T1_TOP_COUNT)]
    pub t1_top_count: usize,

    /// How hottest times are averaged per month
    #[arg(long, value_enum, default_value_t = MonthlyAverage::Pairwise)]
    pub t1_monthly: MonthlyAverage,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// URL of the CSV weather log
    #[arg(long, default_value = config::URL)]
    pub url: String,

    /// Read a local CSV instead of the URL
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Data rows per chunk
    #[arg(long, default_value_t = config::CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Write task state to disk every N chunks
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub checkpoint_every: Option<u64>,

    /// Run the three tasks on separate threads per chunk
    #[arg(long)]
    pub parallel: bool,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub summary: SummaryArgs,

    /// Column whose daily maximum is tracked
    #[arg(long, default_value = config::T1_COL_NAME)]
    pub t1_col_name: Measure,

    #[arg(long, default_value = config::T2_START_DATE, value_parser = parse_day)]
    pub t2_start_date: NaiveDate,

    #[arg(long, default_value = config::T2_END_DATE, value_parser = parse_day)]
    pub t2_end_date: NaiveDate,

    /// `Column Name:low:high`, bounds inclusive; repeat for several ranges
    #[arg(long = "t2-range", default_values = config::T2_COL_VALUE_RANGES)]
    pub t2_ranges: Vec<RangeSpec>,

    /// Column projected forward
    #[arg(long, default_value = config::T3_COL_NAME)]
    pub t3_col_name: Measure,

    #[arg(long, default_value = config::T3_START_DATE, value_parser = parse_day)]
    pub t3_start_date: NaiveDate,

    /// Length of the source window in days
    #[arg(long, default_value_t = config::T3_NUM_DAYS, value_parser = clap::value_parser!(u32).range(1..=31))]
    pub t3_num_days: u32,

    /// Target daily average of the forecast
    #[arg(long, default_value_t = config::T3_AVERAGE_TEMP)]
    pub t3_average: f64,

    #[arg(long, value_enum, default_value_t = ForecastMode::PerChunk)]
    pub t3_mode: ForecastMode,
}

impl RunArgs {
    pub fn source(&self) -> Source {
        match &self.input {
            Some(path) => Source::File(path.clone()),
            None => Source::Url(self.url.clone()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub summary: SummaryArgs,
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, config::DATE_FORMAT)
        .map_err(|_| format!("expected a DD/MM/YYYY date, got `{}`", s))
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

// -- Tests -------------------------------------------------------------------
