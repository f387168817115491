//! Periodic snapshots of task state, written as JSON next to the reports and
//! merged back when the reports are compiled.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::{
    config::{CHECKPOINT_EXTENSION, CHECKPOINT_TIME_FORMAT, DATE_FORMAT, TIME_FORMAT},
    error::{Result, WeatherError},
    reading::normalize::{parse_date, parse_time},
    report::OutputFiles,
    tasks::{summary::parse_day_maxima, DayMaxima, ForecastPoint, RangeMatch},
};

#[derive(Debug, Serialize)]
struct DailyMaxRecord {
    temp: f64,
    time: String,
}

/// Reads and writes `{task}-ckpt-{index}.json` files in the output directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    hottest: String,
    ranges: String,
    forecast: String,
}

impl CheckpointStore {
    pub fn new(files: &OutputFiles) -> Self {
        CheckpointStore {
            dir: files.dir.clone(),
            hottest: files.task1.clone(),
            ranges: files.task2.clone(),
            forecast: files.task3.clone(),
        }
    }

    pub fn path(&self, task: &str, index: usize) -> PathBuf {
        self.dir
            .join(format!("{}-ckpt-{}.{}", task, index, CHECKPOINT_EXTENSION))
    }

    /// Removes checkpoints left over from an earlier run.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for task in [&self.hottest, &self.ranges, &self.forecast] {
            for (_, path) in self.list(task)? {
                fs::remove_file(&path).map_err(|e| {
                    error!("Could not remove `{}`: {}", path.display(), e);
                    WeatherError::file_write(&path, e)
                })?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Removed {} stale checkpoint files", removed);
        }
        Ok(removed)
    }

    /// Writes one checkpoint per task under `index`.
    pub fn save(
        &self,
        index: usize,
        days: &DayMaxima,
        matches: &[RangeMatch],
        points: &[ForecastPoint],
    ) -> Result<()> {
        let days: BTreeMap<String, DailyMaxRecord> = days
            .iter()
            .map(|(date, max)| {
                (
                    date.format(DATE_FORMAT).to_string(),
                    DailyMaxRecord {
                        temp: max.temp,
                        time: max.time.format(CHECKPOINT_TIME_FORMAT).to_string(),
                    },
                )
            })
            .collect();
        let matches: Vec<(String, String)> = matches
            .iter()
            .map(|m| {
                (
                    m.date.format(DATE_FORMAT).to_string(),
                    m.time.format(TIME_FORMAT).to_string(),
                )
            })
            .collect();
        let points: Vec<(String, String, f64)> = points
            .iter()
            .map(|p| {
                (
                    p.date.format(DATE_FORMAT).to_string(),
                    p.time.format(TIME_FORMAT).to_string(),
                    p.value,
                )
            })
            .collect();

        write_json(&self.path(&self.hottest, index), &days)?;
        write_json(&self.path(&self.ranges, index), &matches)?;
        write_json(&self.path(&self.forecast, index), &points)?;

        debug!(
            "Checkpoint {}: {} days, {} range matches, {} forecast points",
            index,
            days.len(),
            matches.len(),
            points.len()
        );
        Ok(())
    }

    /// Checkpoints of `task` in index order.
    pub fn list(&self, task: &str) -> Result<Vec<(usize, PathBuf)>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let prefix = format!("{}-ckpt-", task);
        let suffix = format!(".{}", CHECKPOINT_EXTENSION);
        let entries = fs::read_dir(&self.dir).map_err(|e| read_error(&self.dir, e))?;

        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| read_error(&self.dir, e))?.path();
            let index = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_prefix(&prefix))
                .and_then(|rest| rest.strip_suffix(&suffix))
                .and_then(|index| index.parse::<usize>().ok());
            if let Some(index) = index {
                found.push((index, path));
            }
        }
        found.sort_by_key(|(index, _)| *index);

        Ok(found)
    }

    pub fn hottest_checkpoints(&self) -> Result<Vec<(usize, PathBuf)>> {
        self.list(&self.hottest)
    }

    pub fn range_checkpoints(&self) -> Result<Vec<(usize, PathBuf)>> {
        self.list(&self.ranges)
    }

    pub fn forecast_checkpoints(&self) -> Result<Vec<(usize, PathBuf)>> {
        self.list(&self.forecast)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| write_error(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)
        .map_err(|e| write_error(path, std::io::Error::from(e)))?;
    writer.flush().map_err(|e| write_error(path, e))
}

fn write_error(path: &Path, e: std::io::Error) -> WeatherError {
    error!("Error while writing checkpoint `{}`: {}", path.display(), e);
    WeatherError::file_write(path, e)
}

fn read_error(path: &Path, e: std::io::Error) -> WeatherError {
    let e = WeatherError::DataLoading(format!("cannot read `{}`: {}", path.display(), e));
    error!("{}", e);
    e
}

fn invalid(path: &Path, message: impl std::fmt::Display) -> WeatherError {
    let e = WeatherError::InvalidFormat(format!("`{}`: {}", path.display(), message));
    error!("{}", e);
    e
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| read_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| invalid(path, e))
}

/// Loads a Task 1 checkpoint, validating its shape first.
pub fn load_hottest(path: &Path) -> Result<DayMaxima> {
    let value: Value = read_json(path)?;
    parse_day_maxima(&value)
}

pub fn load_ranges(path: &Path) -> Result<Vec<RangeMatch>> {
    let rows: Vec<(String, String)> = read_json(path)?;
    rows.into_iter()
        .map(|(date, time)| {
            Ok(RangeMatch {
                date: parse_date(&date).map_err(|e| invalid(path, e))?,
                time: parse_time(&time).map_err(|e| invalid(path, e))?,
            })
        })
        .collect()
}

pub fn load_forecast(path: &Path) -> Result<Vec<ForecastPoint>> {
    let rows: Vec<(String, String, f64)> = read_json(path)?;
    rows.into_iter()
        .map(|(date, time, value)| {
            Ok(ForecastPoint {
                date: parse_date(&date).map_err(|e| invalid(path, e))?,
                time: parse_time(&time).map_err(|e| invalid(path, e))?,
                value,
            })
        })
        .collect()
}

// -- Tests -------------------------------------------------------------------
