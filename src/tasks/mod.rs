//! The three analyses and the state each carries across chunks.

pub mod forecast;
pub mod hottest;
pub mod range_filter;
pub mod summary;

use std::thread;

use chrono::NaiveDate;
use tracing::debug;

use crate::{error::Result, reading::Observation};

pub use forecast::{Forecast, ForecastMode, ForecastPoint};
pub use hottest::{DailyMax, DayMaxima, HottestDays};
pub use range_filter::{RangeMatch, RangeMatches, RangeSpec};
pub use summary::{HottestSummary, MonthlyAverage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Closed date interval.
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateWindow { start, end }
    }

    /// Window of `days` consecutive days beginning at `start`.
    pub fn from_start(start: NaiveDate, days: u32) -> Self {
        let end = start
            .checked_add_days(chrono::Days::new(days.saturating_sub(1) as u64))
            .unwrap_or(NaiveDate::MAX);
        DateWindow { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The three aggregators, each owning its carry-over state.
#[derive(Debug)]
pub struct TaskSet {
    pub hottest: HottestDays,
    pub ranges: RangeMatches,
    pub forecast: Forecast,
}

impl TaskSet {
    /// Feeds one normalized chunk to every task. With `parallel` the tasks run
    /// on scoped threads and are joined before returning.
    pub fn absorb(&mut self, rows: &[Observation], parallel: bool) -> Result<()> {
        if !parallel {
            self.hottest.absorb(rows);
            self.ranges.absorb(rows);
            return self.forecast.absorb(rows);
        }

        let TaskSet {
            hottest,
            ranges,
            forecast,
        } = self;

        thread::scope(|s| {
            let t1 = s.spawn(move || hottest.absorb(rows));
            let t2 = s.spawn(move || ranges.absorb(rows));
            let t3 = s.spawn(move || forecast.absorb(rows));

            join(t1);
            join(t2);
            join(t3)
        })
    }

    /// Flushes state that waits for the end of the stream.
    pub fn finish(&mut self) -> Result<()> {
        self.forecast.finish()
    }

    pub fn is_empty(&self) -> bool {
        self.hottest.is_empty() && self.ranges.is_empty() && self.forecast.is_empty()
    }

    /// Hands over the accumulated state and starts a fresh segment.
    pub fn take(&mut self) -> (DayMaxima, Vec<RangeMatch>, Vec<ForecastPoint>) {
        let taken = (
            self.hottest.take(),
            self.ranges.take(),
            self.forecast.take(),
        );
        debug!(
            "Took {} days, {} range matches, {} forecast points",
            taken.0.len(),
            taken.1.len(),
            taken.2.len()
        );
        taken
    }
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

/// Formats a float the way the reports expect: shortest round-trip digits
/// with at least one fractional digit (`25.0`, `31.000000000000004`).
/// Magnitudes from 1e16 up or below 1e-4 use a signed two-digit exponent
/// (`1e+20`, `1.5e-05`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    if value != 0.0 {
        let scientific = format!("{:e}", value);
        if let Some((mantissa, exponent)) = scientific.split_once('e') {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            if !(-4..16).contains(&exponent) {
                let sign = if exponent < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
            }
        }
    }

    let s = value.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::reading::Measure;

    pub fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%d/%m/%Y").unwrap()
    }

    pub fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    pub fn obs(date: &str, time: NaiveTime, outside: f64, hi: f64, low: f64) -> Observation {
        Observation {
            date: day(date),
            time,
            outside_temp: outside,
            hi_temp: hi,
            low_temp: low,
        }
    }

    /// Rows shared by the task tests.
    pub fn sample_rows() -> Vec<Observation> {
        vec![
            obs("31/05/2006", hm(9, 0), 9.3, 9.7, 9.1),
            obs("01/06/2006", hm(9, 10), 10.1, 21.2, 9.7),
            obs("01/06/2006", hm(9, 20), 10.7, 21.3, 10.4),
            obs("01/06/2006", hm(9, 30), 11.2, 23.3, 10.9),
            obs("02/06/2006", hm(9, 40), 11.4, 23.4, 11.3),
            obs("02/06/2006", hm(10, 10), 18.6, 18.6, 10.0),
            obs("03/06/2006", hm(10, 20), 18.4, 18.5, 10.1),
            obs("09/06/2006", hm(10, 30), 18.3, 18.3, 10.5),
            obs("09/06/2006", hm(10, 40), 18.2, 18.3, 10.6),
            obs("12/06/2006", hm(10, 50), 18.4, 18.6, 18.3),
        ]
    }

    fn task_set() -> TaskSet {
        let window = DateWindow::new(day("01/06/2006"), day("09/06/2006"));
        TaskSet {
            hottest: HottestDays::new(Measure::OutsideTemperature),
            ranges: RangeMatches::new(
                window,
                vec![
                    RangeSpec::new(Measure::HiTemperature, 21.3, 23.3),
                    RangeSpec::new(Measure::LowTemperature, 10.1, 10.5),
                ],
            ),
            forecast: Forecast::new(
                DateWindow::from_start(day("01/06/2006"), 9),
                Measure::OutsideTemperature,
                25.0,
                ForecastMode::PerChunk,
            ),
        }
    }

    #[test]
    fn should_format_floats_with_fraction() {
        assert_eq!(format_float(25.0), "25.0");
        assert_eq!(format_float(19.6), "19.6");
        assert_eq!(format_float(-3.0), "-3.0");
        assert_eq!(format_float(31.000000000000004), "31.000000000000004");
        assert_eq!(format_float(f64::NAN), "nan");
    }

    #[test]
    fn should_switch_to_exponent_form_at_the_extremes() {
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(-2.5e17), "-2.5e+17");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(1e-100), "1e-100");
        assert_eq!(format_float(0.0), "0.0");
    }

    #[test]
    fn should_build_window_from_start_and_length() {
        let window = DateWindow::from_start(day("01/06/2006"), 9);

        assert_eq!(window.end, day("09/06/2006"));
        assert!(window.contains(day("01/06/2006")));
        assert!(window.contains(day("09/06/2006")));
        assert!(!window.contains(day("10/06/2006")));
        assert!(!window.contains(day("31/05/2006")));
    }

    #[test]
    fn should_produce_same_state_in_parallel_and_sequential_modes() {
        let rows = sample_rows();
        let mut sequential = task_set();
        let mut parallel = task_set();

        for chunk in rows.chunks(3) {
            sequential.absorb(chunk, false).unwrap();
            parallel.absorb(chunk, true).unwrap();
        }

        assert_eq!(sequential.take(), parallel.take());
    }

    #[test]
    fn should_reset_state_on_take() {
        let mut tasks = task_set();
        tasks.absorb(&sample_rows(), false).unwrap();
        assert!(!tasks.is_empty());

        let (days, matches, points) = tasks.take();
        assert_eq!(days.len(), 6);
        assert_eq!(matches.len(), 5);
        assert_eq!(points.len(), 8);
        assert!(tasks.is_empty());
    }
}
