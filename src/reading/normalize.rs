//! Coerces a raw chunk into typed observations.

use chrono::{NaiveDate, NaiveTime};
use csv::StringRecord;
use tracing::{debug, error};

use crate::{
    config::{DATE_COL_NAME, DATE_FORMAT, TIME_COL_NAME, TIME_FORMAT},
    error::{Result, WeatherError},
};

use super::{ColumnIndex, Measure, Observation, RawChunk};

/// Normalizes every row of `chunk`.
///
/// Rows with a missing or empty cell in a required column are dropped. A
/// present cell that cannot be coerced fails the whole chunk, since it means
/// the source no longer matches the expected layout.
pub fn normalize(chunk: &RawChunk) -> Result<Vec<Observation>> {
    let index = ColumnIndex::from_header(&chunk.header)?;
    let mut observations = Vec::with_capacity(chunk.len());

    for record in &chunk.rows {
        match parse_record(record, &index) {
            Ok(Some(observation)) => observations.push(observation),
            Ok(None) => {}
            Err(e) => {
                error!("Chunk rejected: {}", e);
                return Err(e);
            }
        }
    }

    debug!(
        "Normalized {} of {} rows",
        observations.len(),
        chunk.len()
    );

    Ok(observations)
}

fn parse_record(record: &StringRecord, index: &ColumnIndex) -> Result<Option<Observation>> {
    // Every present cell is coerced before nulls are considered, so a bad
    // value fails the chunk even when another cell of the row is blank.
    let date = cell(record, index.date).map(parse_date).transpose()?;
    let time = cell(record, index.time).map(parse_time).transpose()?;

    let mut values = [None; 3];
    for (slot, measure) in values.iter_mut().zip(Measure::ALL) {
        *slot = match cell(record, index.measure(measure)) {
            Some(raw) => parse_value(raw, measure)?,
            None => None,
        };
    }

    let (Some(date), Some(time), [Some(outside_temp), Some(hi_temp), Some(low_temp)]) =
        (date, time, values)
    else {
        return Ok(None);
    };

    Ok(Some(Observation {
        date,
        time,
        outside_temp,
        hi_temp,
        low_temp,
    }))
}

// A cell counts as null when absent or blank.
fn cell(record: &StringRecord, position: usize) -> Option<&str> {
    record
        .get(position)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parses a zero-padded `dd/mm/YYYY` date. Unpadded forms such as
/// `1/6/2006` are rejected so every accepted date formats back unchanged.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .filter(|date| date.format(DATE_FORMAT).to_string() == s)
        .ok_or_else(|| WeatherError::UnsupportedDataType {
            column: DATE_COL_NAME.to_string(),
            value: s.to_string(),
        })
}

/// Parses a zero-padded `HH:MM` time.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .ok()
        .filter(|time| time.format(TIME_FORMAT).to_string() == s)
        .ok_or_else(|| WeatherError::UnsupportedDataType {
            column: TIME_COL_NAME.to_string(),
            value: s.to_string(),
        })
}

// `NaN` parses but is a null reading.
fn parse_value(s: &str, measure: Measure) -> Result<Option<f64>> {
    match s.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(WeatherError::UnsupportedDataType {
            column: measure.column_name().to_string(),
            value: s.to_string(),
        }),
    }
}

// -- Tests -------------------------------------------------------------------
