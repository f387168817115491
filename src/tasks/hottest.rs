//! Per-day maximum of a temperature column and the time it occurred.

use std::collections::{btree_map::Entry, BTreeMap};

use chrono::{NaiveDate, NaiveTime};

use crate::reading::{Measure, Observation};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyMax {
    pub temp: f64,
    pub time: NaiveTime,
}

/// Running maxima keyed by day, iterated in date order.
pub type DayMaxima = BTreeMap<NaiveDate, DailyMax>;

/// Offers `candidate` as the maximum for `date`. An existing entry is only
/// replaced by a strictly greater temperature, so the earliest time wins ties.
pub fn record_max(days: &mut DayMaxima, date: NaiveDate, candidate: DailyMax) {
    match days.entry(date) {
        Entry::Vacant(slot) => {
            slot.insert(candidate);
        }
        Entry::Occupied(mut slot) => {
            if candidate.temp > slot.get().temp {
                slot.insert(candidate);
            }
        }
    }
}

/// Merges maxima produced elsewhere, such as a checkpoint segment, with the
/// same rule as [`record_max`].
pub fn merge_maxima(days: &mut DayMaxima, other: DayMaxima) {
    for (date, candidate) in other {
        record_max(days, date, candidate);
    }
}

#[derive(Debug, Clone)]
pub struct HottestDays {
    measure: Measure,
    days: DayMaxima,
}

impl HottestDays {
    pub fn new(measure: Measure) -> Self {
        HottestDays {
            measure,
            days: DayMaxima::new(),
        }
    }

    /// Folds a chunk into the running maxima.
    ///
    /// Feeding rows one by one through the strict comparison picks, per day,
    /// the first row holding the chunk maximum and then keeps the stored entry
    /// unless that maximum beats it. Any split of the rows into chunks yields
    /// the same state.
    pub fn absorb(&mut self, rows: &[Observation]) {
        for row in rows {
            record_max(
                &mut self.days,
                row.date,
                DailyMax {
                    temp: row.value(self.measure),
                    time: row.time,
                },
            );
        }
    }

    pub fn days(&self) -> &DayMaxima {
        &self.days
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&DailyMax> {
        self.days.get(date)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn take(&mut self) -> DayMaxima {
        std::mem::take(&mut self.days)
    }
}

// -- Tests -------------------------------------------------------------------
