use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DatasetError, Result};

/// Multiplier that keeps the year and day-of-year apart in a day-key.
const YEAR_PADDING: i32 = 1000;

/// One calendar day's weather observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub high_temperature: i32,
    pub low_temperature: i32,
    /// Missing in the legacy three-field layout, in which case it is 0.0.
    #[serde(default)]
    pub precipitation: f64,
}

impl DayRecord {
    pub fn new(
        date: NaiveDate,
        high_temperature: i32,
        low_temperature: i32,
        precipitation: f64,
    ) -> Self {
        Self {
            date,
            high_temperature,
            low_temperature,
            precipitation,
        }
    }

    /// Identifies the calendar day across data sources as `year * 1000 + day_of_year`.
    pub fn day_key(&self) -> i32 {
        self.date.year() * YEAR_PADDING + self.date.ordinal() as i32
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Thresholds and histogram settings scoped to one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub high_temperature_threshold: i32,
    pub low_temperature_threshold: i32,
    pub histogram_bucket_size: i32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            high_temperature_threshold: 90,
            low_temperature_threshold: 32,
            histogram_bucket_size: 10,
        }
    }
}

impl DatasetConfig {
    /// Checks the configuration before it is attached to a dataset.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::InvalidBucketSize` if the histogram bucket size is zero or negative.
    /// No ordering between the two thresholds is enforced.
    pub fn validate(&self) -> Result<()> {
        if self.histogram_bucket_size <= 0 {
            return Err(DatasetError::InvalidBucketSize(self.histogram_bucket_size));
        }
        Ok(())
    }
}

/// Decision applied to the next pending conflict group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Keep the record that was already in the dataset.
    Keep,
    /// Replace it with the most recently imported record.
    Replace,
}

/// Records that share a calendar day after a merge.
///
/// Members are ordered with the pre-existing records first, followed by the
/// imported ones, each in the order they were supplied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictGroup {
    pub day_key: i32,
    pub members: Vec<DayRecord>,
}

impl ConflictGroup {
    pub fn date(&self) -> Option<NaiveDate> {
        self.members.first().map(|day| day.date)
    }

    /// Consumes the group and yields the record that survives `resolution`.
    pub(crate) fn into_survivor(self, resolution: Resolution) -> Option<DayRecord> {
        let mut members = self.members;
        match resolution {
            Resolution::Keep if members.is_empty() => None,
            Resolution::Keep => Some(members.swap_remove(0)),
            Resolution::Replace => members.pop(),
        }
    }
}

/// Read-only summary of one month of a year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    pub month: u32,
    /// Every day tied for the month's highest high, ascending by day of month.
    pub high_temperature_days: Vec<DayRecord>,
    /// Every day tied for the month's lowest low, ascending by day of month.
    pub low_temperature_days: Vec<DayRecord>,
    pub average_high_temperature: f64,
    pub average_low_temperature: f64,
    pub day_count: usize,
}

impl MonthlyAggregate {
    /// Builds the aggregate for `month` from that month's records.
    ///
    /// Returns `None` when `days` is empty, since a month without records has
    /// no extremes or averages.
    pub fn from_days(month: u32, days: &[&DayRecord]) -> Option<Self> {
        let highest = days.iter().map(|day| day.high_temperature).max()?;
        let lowest = days.iter().map(|day| day.low_temperature).min()?;

        let mut high_temperature_days: Vec<DayRecord> = days
            .iter()
            .filter(|day| day.high_temperature == highest)
            .map(|&day| day.clone())
            .collect();
        high_temperature_days.sort_by_key(|day| day.date.day());

        let mut low_temperature_days: Vec<DayRecord> = days
            .iter()
            .filter(|day| day.low_temperature == lowest)
            .map(|&day| day.clone())
            .collect();
        low_temperature_days.sort_by_key(|day| day.date.day());

        let highs: Vec<i32> = days.iter().map(|day| day.high_temperature).collect();
        let lows: Vec<i32> = days.iter().map(|day| day.low_temperature).collect();

        Some(Self {
            month,
            high_temperature_days,
            low_temperature_days,
            average_high_temperature: average(&highs)?,
            average_low_temperature: average(&lows)?,
            day_count: days.len(),
        })
    }
}

/// Every per-year statistic a report needs, as plain data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub highest_temperature_days: Vec<DayRecord>,
    pub lowest_temperature_days: Vec<DayRecord>,
    pub lowest_high_temperature_days: Vec<DayRecord>,
    pub highest_low_temperature_days: Vec<DayRecord>,
    pub highest_precipitation_days: Vec<DayRecord>,
    pub average_high_temperature: f64,
    pub average_low_temperature: f64,
    pub high_temperature_threshold: i32,
    pub days_over_threshold: usize,
    pub low_temperature_threshold: i32,
    pub days_under_threshold: usize,
    pub high_temperature_histogram: BTreeMap<i64, usize>,
    pub low_temperature_histogram: BTreeMap<i64, usize>,
    pub months: Vec<MonthlyAggregate>,
}

/// Arithmetic mean of `temps`, or `None` for an empty slice.
pub fn average(temps: &[i32]) -> Option<f64> {
    if temps.is_empty() {
        return None;
    }
    let sum: i64 = temps.iter().map(|&t| i64::from(t)).sum();
    Some(sum as f64 / temps.len() as f64)
}
