//! Turns the completed per-day maxima into the Task 1 report.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime, Timelike};
use clap::ValueEnum;
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    config::{CHECKPOINT_TIME_FORMAT, DATE_FORMAT, MONTH_FORMAT, TIME_FORMAT},
    error::{Result, WeatherError},
};

use super::{format_float, DailyMax, DayMaxima};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
/// How the hottest times of a month are averaged.
pub enum MonthlyAverage {
    /// Running average `(avg + next) / 2` in date order, floored to the minute.
    Pairwise,
    /// Arithmetic mean of all hottest times of the month, floored to the minute.
    TrueMean,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HottestSummary {
    /// `(MM/YYYY, HH:MM)` per month in date order.
    pub monthly: Vec<(String, String)>,
    /// `HH:MM`; `None` when no day was recorded.
    pub most_common: Option<String>,
    /// `(temperature, DD/MM/YYYY)`, hottest first.
    pub top: Vec<(String, String)>,
}

impl HottestSummary {
    pub fn new(days: &DayMaxima, top_count: usize, monthly: MonthlyAverage) -> Self {
        let summary = HottestSummary {
            monthly: monthly_average_hottest_time(days, monthly),
            most_common: most_common_hottest_time(days),
            top: top_hottest(days, top_count),
        };
        debug!(
            "Summarised {} days into {} months",
            days.len(),
            summary.monthly.len()
        );
        summary
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() / 60
}

fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Average time of the daily maximum per month, months in first-seen order.
pub fn monthly_average_hottest_time(
    days: &DayMaxima,
    mode: MonthlyAverage,
) -> Vec<(String, String)> {
    // (month, running average, sum, count)
    let mut months: Vec<(String, u32, u32, u32)> = Vec::new();

    for (date, max) in days {
        let month = date.format(MONTH_FORMAT).to_string();
        let minutes = minute_of_day(max.time);

        match months.last_mut() {
            Some((current, avg, sum, count)) if *current == month => {
                *avg = (*avg + minutes) / 2;
                *sum += minutes;
                *count += 1;
            }
            _ => months.push((month, minutes, minutes, 1)),
        }
    }

    months
        .into_iter()
        .map(|(month, avg, sum, count)| {
            let minutes = match mode {
                MonthlyAverage::Pairwise => avg,
                MonthlyAverage::TrueMean => sum / count,
            };
            (month, format_minutes(minutes))
        })
        .collect()
}

/// The time of day that most often holds the daily maximum. Ties go to the
/// time seen first in date order.
pub fn most_common_hottest_time(days: &DayMaxima) -> Option<String> {
    let mut counts: HashMap<NaiveTime, usize> = HashMap::new();
    for max in days.values() {
        *counts.entry(max.time).or_default() += 1;
    }

    let mut best: Option<(NaiveTime, usize)> = None;
    for max in days.values() {
        let count = counts[&max.time];
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((max.time, count));
        }
    }

    best.map(|(time, _)| time.format(TIME_FORMAT).to_string())
}

/// The `count` hottest days, hottest first, earlier date first on ties.
pub fn top_hottest(days: &DayMaxima, count: usize) -> Vec<(String, String)> {
    let mut entries: Vec<(&NaiveDate, &DailyMax)> = days.iter().collect();
    entries.sort_by(|a, b| b.1.temp.total_cmp(&a.1.temp).then_with(|| a.0.cmp(b.0)));

    entries
        .into_iter()
        .take(count)
        .map(|(date, max)| {
            (
                format_float(max.temp),
                date.format(DATE_FORMAT).to_string(),
            )
        })
        .collect()
}

/// Checks the serialized per-day maxima and converts them back.
///
/// Expected shape:
/// `{"01/06/2006": {"temp": 17.2, "time": "15:00:00"}, ...}`
pub fn parse_day_maxima(value: &Value) -> Result<DayMaxima> {
    let invalid = |message: String| {
        error!("Task 1 state not in valid format: {}", message);
        WeatherError::InvalidFormat(message)
    };

    let Value::Object(map) = value else {
        return Err(invalid(format!(
            "expected Task 1 state to be an object but got `{}`",
            value
        )));
    };

    let mut days = DayMaxima::new();
    for (key, entry) in map {
        let date = NaiveDate::parse_from_str(key, DATE_FORMAT).map_err(|_| {
            invalid(format!("expected a `DD/MM/YYYY` key but got `{}`", key))
        })?;

        let Value::Object(fields) = entry else {
            return Err(invalid(format!(
                "expected the entry for `{}` to be an object but got `{}`",
                key, entry
            )));
        };

        if fields.len() != 2 || !fields.contains_key("temp") || !fields.contains_key("time") {
            return Err(invalid(format!(
                "expected keys {{\"temp\", \"time\"}} for `{}` but got {:?}",
                key,
                fields.keys().collect::<Vec<_>>()
            )));
        }

        let temp = fields["temp"].as_f64().ok_or_else(|| {
            invalid(format!(
                "expected `temp` of `{}` to be a number but got `{}`",
                key, fields["temp"]
            ))
        })?;

        let time = fields["time"]
            .as_str()
            .and_then(|s| NaiveTime::parse_from_str(s, CHECKPOINT_TIME_FORMAT).ok())
            .ok_or_else(|| {
                invalid(format!(
                    "expected `time` of `{}` to be HH:MM:SS but got `{}`",
                    key, fields["time"]
                ))
            })?;

        days.insert(date, DailyMax { temp, time });
    }

    Ok(days)
}

// -- Tests -------------------------------------------------------------------
