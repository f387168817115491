//! Column names of the weather log and the numeric measures they carry.

use std::{fmt, str::FromStr};

use crate::{
    config::{DATE_COL_NAME, TIME_COL_NAME},
    error::{Result, WeatherError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// A numeric column the tasks can operate on.
pub enum Measure {
    OutsideTemperature,
    HiTemperature,
    LowTemperature,
}

impl Measure {
    pub const ALL: [Measure; 3] = [
        Measure::OutsideTemperature,
        Measure::HiTemperature,
        Measure::LowTemperature,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            Measure::OutsideTemperature => "Outside Temperature",
            Measure::HiTemperature => "Hi Temperature",
            Measure::LowTemperature => "Low Temperature",
        }
    }
}

impl FromStr for Measure {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self> {
        Measure::ALL
            .into_iter()
            .find(|m| m.column_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                WeatherError::InvalidFormat(format!(
                    "`{}` is not one of the numeric columns {:?}",
                    s,
                    Measure::ALL.map(|m| m.column_name())
                ))
            })
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Every column the tasks need, in header order of the source.
pub fn required_columns() -> Vec<&'static str> {
    let mut columns = vec![DATE_COL_NAME, TIME_COL_NAME];
    columns.extend(Measure::ALL.iter().map(|m| m.column_name()));
    columns
}

#[derive(Debug, Clone, PartialEq)]
/// Positions of the required columns within a CSV header.
pub struct ColumnIndex {
    pub date: usize,
    pub time: usize,
    measures: [usize; 3],
}

impl ColumnIndex {
    /// Resolves the required columns against `header`. Columns not listed by
    /// [`required_columns`] are ignored, which drops them from the normalized rows.
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Result<Self> {
        let position = |name: &str| header.iter().position(|h| h.as_ref().trim() == name);

        let missing: Vec<String> = required_columns()
            .into_iter()
            .filter(|name| position(*name).is_none())
            .map(String::from)
            .collect();

        if !missing.is_empty() {
            return Err(WeatherError::DataValidation {
                missing,
                found: header.iter().map(|h| h.as_ref().to_string()).collect(),
            });
        }

        // All positions exist at this point.
        let find = |name: &str| position(name).unwrap_or_default();
        Ok(ColumnIndex {
            date: find(DATE_COL_NAME),
            time: find(TIME_COL_NAME),
            measures: Measure::ALL.map(|m| find(m.column_name())),
        })
    }

    pub fn measure(&self, measure: Measure) -> usize {
        match measure {
            Measure::OutsideTemperature => self.measures[0],
            Measure::HiTemperature => self.measures[1],
            Measure::LowTemperature => self.measures[2],
        }
    }
}

// -- Tests -------------------------------------------------------------------
