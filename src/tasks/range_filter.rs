//! Collects the times at which columns fall inside closed value ranges.

use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveTime};

use crate::{
    config::{DATE_FORMAT, TIME_FORMAT},
    error::{Result, WeatherError},
    reading::{Measure, Observation},
};

use super::DateWindow;

#[derive(Debug, Clone, Copy, PartialEq)]
/// A column and the closed interval its values must fall in.
pub struct RangeSpec {
    pub measure: Measure,
    pub low: f64,
    pub high: f64,
}

impl RangeSpec {
    pub fn new(measure: Measure, low: f64, high: f64) -> Self {
        RangeSpec { measure, low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Parses `Column Name:low:high`.
impl FromStr for RangeSpec {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            WeatherError::InvalidFormat(format!(
                "expected `Column Name:low:high`, got `{}`",
                s
            ))
        };

        let mut parts = s.rsplitn(3, ':');
        let high = parts.next().ok_or_else(invalid)?;
        let low = parts.next().ok_or_else(invalid)?;
        let column = parts.next().ok_or_else(invalid)?;

        let low: f64 = low.trim().parse().map_err(|_| invalid())?;
        let high: f64 = high.trim().parse().map_err(|_| invalid())?;
        if low > high {
            return Err(invalid());
        }

        Ok(RangeSpec::new(column.parse()?, low, high))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMatch {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl fmt::Display for RangeMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.date.format(DATE_FORMAT),
            self.time.format(TIME_FORMAT)
        )
    }
}

#[derive(Debug, Clone)]
pub struct RangeMatches {
    window: DateWindow,
    specs: Vec<RangeSpec>,
    matches: Vec<RangeMatch>,
}

impl RangeMatches {
    pub fn new(window: DateWindow, specs: Vec<RangeSpec>) -> Self {
        RangeMatches {
            window,
            specs,
            matches: Vec::new(),
        }
    }

    /// Appends the matches of one chunk: spec by spec, rows in chunk order.
    /// A row matching several specs is recorded once per spec.
    pub fn absorb(&mut self, rows: &[Observation]) {
        let in_window: Vec<&Observation> = rows
            .iter()
            .filter(|row| self.window.contains(row.date))
            .collect();

        for spec in &self.specs {
            self.matches.extend(
                in_window
                    .iter()
                    .filter(|row| spec.contains(row.value(spec.measure)))
                    .map(|row| RangeMatch {
                        date: row.date,
                        time: row.time,
                    }),
            );
        }
    }

    pub fn matches(&self) -> &[RangeMatch] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn take(&mut self) -> Vec<RangeMatch> {
        std::mem::take(&mut self.matches)
    }
}

// -- Tests -------------------------------------------------------------------
