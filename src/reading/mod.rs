pub mod column;
pub mod normalize;

use chrono::{NaiveDate, NaiveTime};
use csv::StringRecord;

pub use column::{ColumnIndex, Measure};
pub use normalize::normalize;

/// One cleaned row of the weather log.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub outside_temp: f64,
    pub hi_temp: f64,
    pub low_temp: f64,
}

impl Observation {
    pub fn value(&self, measure: Measure) -> f64 {
        match measure {
            Measure::OutsideTemperature => self.outside_temp,
            Measure::HiTemperature => self.hi_temp,
            Measure::LowTemperature => self.low_temp,
        }
    }
}

/// A bounded batch of rows as read from the CSV, not yet typed.
#[derive(Debug, Clone, Default)]
pub struct RawChunk {
    pub header: Vec<String>,
    pub rows: Vec<StringRecord>,
}

impl RawChunk {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
