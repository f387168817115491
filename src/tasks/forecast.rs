//! Projects each source day's temperature pattern one month forward,
//! rescaled to a target daily average.

use std::{collections::BTreeMap, fmt};

use chrono::{Months, NaiveDate, NaiveTime};
use clap::ValueEnum;
use tracing::warn;

use crate::{
    config::{DATE_FORMAT, TIME_FORMAT},
    error::{Result, WeatherError},
    reading::{Measure, Observation},
};

use super::{format_float, DateWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
/// How a day's mean is computed.
pub enum ForecastMode {
    /// Mean over the rows of the day present in the current chunk. A day split
    /// across chunks is projected once per part, each against its own mean.
    PerChunk,
    /// Rows are buffered until the day is complete. Assumes each day's rows
    /// are contiguous in the stream.
    WholeDay,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub value: f64,
}

impl fmt::Display for ForecastPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.date.format(DATE_FORMAT),
            self.time.format(TIME_FORMAT),
            format_float(self.value)
        )
    }
}

#[derive(Debug, Clone)]
pub struct Forecast {
    window: DateWindow,
    measure: Measure,
    target: f64,
    mode: ForecastMode,
    open_day: Vec<Observation>,
    last_closed: Option<NaiveDate>,
    points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn new(window: DateWindow, measure: Measure, target: f64, mode: ForecastMode) -> Self {
        Forecast {
            window,
            measure,
            target,
            mode,
            open_day: Vec::new(),
            last_closed: None,
            points: Vec::new(),
        }
    }

    pub fn absorb(&mut self, rows: &[Observation]) -> Result<()> {
        let in_window = rows.iter().filter(|row| self.window.contains(row.date));

        match self.mode {
            ForecastMode::PerChunk => {
                let mut days: BTreeMap<NaiveDate, Vec<&Observation>> = BTreeMap::new();
                for row in in_window {
                    days.entry(row.date).or_default().push(row);
                }
                for day in days.values() {
                    let points = project_day(day, self.measure, self.target)?;
                    self.points.extend(points);
                }
            }
            ForecastMode::WholeDay => {
                let rows: Vec<Observation> = in_window.cloned().collect();
                for row in rows {
                    if self.open_day.first().is_some_and(|open| open.date != row.date) {
                        self.close_day()?;
                    }
                    if self.last_closed.is_some_and(|closed| row.date <= closed) {
                        warn!(
                            "Rows for {} arrived after the day was projected",
                            row.date.format(DATE_FORMAT)
                        );
                    }
                    self.open_day.push(row);
                }
            }
        }

        Ok(())
    }

    /// Projects the day still being buffered, if any.
    pub fn finish(&mut self) -> Result<()> {
        self.close_day()
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Takes the projected points. A day still open stays buffered.
    pub fn take(&mut self) -> Vec<ForecastPoint> {
        std::mem::take(&mut self.points)
    }

    fn close_day(&mut self) -> Result<()> {
        if self.open_day.is_empty() {
            return Ok(());
        }
        let day = std::mem::take(&mut self.open_day);
        let rows: Vec<&Observation> = day.iter().collect();
        let points = project_day(&rows, self.measure, self.target)?;
        self.points.extend(points);
        self.last_closed = day.first().map(|row| row.date);
        Ok(())
    }
}

/// Rescales one day's rows around their mean to `target` and shifts them one
/// calendar month ahead, clamping to the end of shorter months.
fn project_day(rows: &[&Observation], measure: Measure, target: f64) -> Result<Vec<ForecastPoint>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let sum: f64 = rows.iter().map(|row| row.value(measure)).sum();
    let mean = sum / rows.len() as f64;

    rows.iter()
        .map(|row| {
            let deviation = (row.value(measure) - mean) / mean;
            let date = row
                .date
                .checked_add_months(Months::new(1))
                .ok_or_else(|| WeatherError::DateOutOfRange(row.date.format(DATE_FORMAT).to_string()))?;
            Ok(ForecastPoint {
                date,
                time: row.time,
                value: target + target * deviation,
            })
        })
        .collect()
}

// -- Tests -------------------------------------------------------------------
