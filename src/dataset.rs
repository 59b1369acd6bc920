use crate::error::{DatasetError, Result};
use crate::histogram::histogram;
use crate::structs::{
    ConflictGroup, DatasetConfig, DayRecord, MonthlyAggregate, Resolution, YearSummary, average,
};
use chrono::{Datelike, NaiveDate};
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Which end of an ordering a tie-all query selects.
#[derive(Debug, Clone, Copy)]
enum Extreme {
    Highest,
    Lowest,
}

impl Extreme {
    fn prefers<K: PartialOrd>(self, candidate: &K, current: &K) -> bool {
        match self {
            Extreme::Highest => candidate > current,
            Extreme::Lowest => candidate < current,
        }
    }
}

/// Owns a collection of day records together with the thresholds and
/// histogram settings used to analyze it, and the queue of same-day
/// conflicts left over from a merge.
///
/// Records held in a pending conflict group are not part of [`days`](Self::days)
/// until the group is resolved, so queries issued mid-merge only see days
/// that are already unique.
#[derive(Debug, Clone, Default)]
pub struct WeatherDataset {
    days: Vec<DayRecord>,
    config: DatasetConfig,
    conflicting_days: VecDeque<ConflictGroup>,
}

impl WeatherDataset {
    /// Wraps `days` with the default configuration. Records are taken as
    /// supplied; same-day duplicates are not removed.
    pub fn new(days: Vec<DayRecord>) -> Self {
        debug!("Creating dataset with {} days", days.len());
        Self {
            days,
            config: DatasetConfig::default(),
            conflicting_days: VecDeque::new(),
        }
    }

    /// Wraps `days` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::InvalidBucketSize` if the configuration fails validation.
    pub fn with_config(days: Vec<DayRecord>, config: DatasetConfig) -> Result<Self> {
        config.validate()?;
        let mut dataset = Self::new(days);
        dataset.config = config;
        Ok(dataset)
    }

    /// Merges `incoming` records into `existing`, consuming it.
    ///
    /// All records from both sources are grouped by day-key. A day supplied
    /// exactly once is accepted into the merged days immediately. A day supplied
    /// more than once becomes a conflict group, held out of the days until it
    /// is resolved with [`resolve_next`](Self::resolve_next).
    ///
    /// The merged dataset inherits the configuration of `existing`. Conflict
    /// groups still pending on `existing` stay at the front of the queue, and
    /// an incoming record for one of their days joins that group.
    ///
    /// # Arguments
    ///
    /// * `existing` - Dataset whose storage is moved into the result
    /// * `incoming` - Newly imported records
    pub fn merged(
        existing: WeatherDataset,
        incoming: impl IntoIterator<Item = DayRecord>,
    ) -> Self {
        let WeatherDataset {
            days,
            config,
            conflicting_days,
        } = existing;
        let carried = conflicting_days.len();

        // Pending members come first so they stay ahead of anything newer.
        let pending = conflicting_days.into_iter().flat_map(|group| group.members);

        let mut order: Vec<i32> = Vec::new();
        let mut groups: HashMap<i32, Vec<DayRecord>> = HashMap::new();
        for day in pending.chain(days).chain(incoming) {
            let key = day.day_key();
            groups
                .entry(key)
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(day);
        }

        let mut merged = Self {
            days: Vec::with_capacity(order.len()),
            config,
            conflicting_days: VecDeque::new(),
        };

        for day_key in order {
            let Some(mut members) = groups.remove(&day_key) else {
                continue;
            };
            if members.len() == 1 {
                merged.days.extend(members.pop());
            } else {
                trace!("Day {} supplied {} times", day_key, members.len());
                merged.conflicting_days.push_back(ConflictGroup { day_key, members });
            }
        }

        debug!(
            "Merged into {} days | {} conflicting day groups, {} carried over",
            merged.days.len(),
            merged.conflicting_days.len(),
            carried
        );
        merged
    }

    pub fn days(&self) -> &[DayRecord] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    // Conflict resolution

    pub fn conflicting_days_count(&self) -> usize {
        self.conflicting_days.len()
    }

    /// Pending conflict groups in the order they will be resolved.
    pub fn conflicting_days(&self) -> impl Iterator<Item = &ConflictGroup> {
        self.conflicting_days.iter()
    }

    /// Members of the next unresolved conflict group, or an empty slice when
    /// nothing is pending. Does not change the queue.
    pub fn next_conflicting_days(&self) -> &[DayRecord] {
        self.conflicting_days
            .front()
            .map(|group| group.members.as_slice())
            .unwrap_or(&[])
    }

    /// Resolves the next pending conflict group.
    ///
    /// `Resolution::Keep` admits the pre-existing record of the group;
    /// `Resolution::Replace` admits the most recently imported one. The other
    /// members are discarded and the conflict count drops by one.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::NoConflicts` if no group is pending.
    pub fn resolve_next(&mut self, resolution: Resolution) -> Result<()> {
        let group = self
            .conflicting_days
            .pop_front()
            .ok_or(DatasetError::NoConflicts)?;
        let day_key = group.day_key;

        if let Some(survivor) = group.into_survivor(resolution) {
            debug!("Resolved day {} with {:?} | kept {}", day_key, resolution, survivor.date);
            self.replace_day(survivor);
        }
        Ok(())
    }

    pub fn keep_original_days(&mut self) -> Result<()> {
        self.resolve_next(Resolution::Keep)
    }

    pub fn replace_original_days(&mut self) -> Result<()> {
        self.resolve_next(Resolution::Replace)
    }

    // Record editing

    pub fn find_day(&self, date: NaiveDate) -> Option<&DayRecord> {
        self.days.iter().find(|day| day.date == date)
    }

    /// Adds a record for a day that is not yet present.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::DuplicateDay` if a record for the same date exists.
    pub fn add_day(&mut self, day: DayRecord) -> Result<()> {
        if self.find_day(day.date).is_some() {
            return Err(DatasetError::DuplicateDay(day.date));
        }
        self.days.push(day);
        Ok(())
    }

    /// Inserts `day`, swapping out any record for the same date.
    ///
    /// Returns the record that was replaced, if there was one.
    pub fn replace_day(&mut self, day: DayRecord) -> Option<DayRecord> {
        match self.days.iter_mut().find(|existing| existing.date == day.date) {
            Some(existing) => Some(std::mem::replace(existing, day)),
            None => {
                self.days.push(day);
                None
            }
        }
    }

    /// Overwrites the readings of the record on `date`.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::DayNotFound` if no record exists for `date`.
    pub fn update_day(
        &mut self,
        date: NaiveDate,
        high_temperature: i32,
        low_temperature: i32,
        precipitation: f64,
    ) -> Result<()> {
        let day = self
            .days
            .iter_mut()
            .find(|day| day.date == date)
            .ok_or(DatasetError::DayNotFound(date))?;
        day.high_temperature = high_temperature;
        day.low_temperature = low_temperature;
        day.precipitation = precipitation;
        Ok(())
    }

    pub fn remove_day(&mut self, date: NaiveDate) -> Option<DayRecord> {
        let index = self.days.iter().position(|day| day.date == date)?;
        Some(self.days.remove(index))
    }

    pub fn clear(&mut self) {
        self.days.clear();
        self.conflicting_days.clear();
    }

    // Configuration

    pub fn set_high_temperature_threshold(&mut self, threshold: i32) {
        trace!("High temperature threshold set to {}", threshold);
        self.config.high_temperature_threshold = threshold;
    }

    pub fn set_low_temperature_threshold(&mut self, threshold: i32) {
        trace!("Low temperature threshold set to {}", threshold);
        self.config.low_temperature_threshold = threshold;
    }

    /// # Errors
    ///
    /// Returns `DatasetError::InvalidBucketSize` if `bucket_size` is zero or
    /// negative; the previous size is left in place.
    pub fn set_histogram_bucket_size(&mut self, bucket_size: i32) -> Result<()> {
        if bucket_size <= 0 {
            return Err(DatasetError::InvalidBucketSize(bucket_size));
        }
        trace!("Histogram bucket size set to {}", bucket_size);
        self.config.histogram_bucket_size = bucket_size;
        Ok(())
    }

    pub fn set_config(&mut self, config: DatasetConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    // Queries

    fn days_of_year(&self, year: i32) -> impl Iterator<Item = &DayRecord> {
        self.days.iter().filter(move |day| day.year() == year)
    }

    /// Every record of `year` whose `key` equals the extreme value of `key`.
    /// Records for which `key` yields `None` take no part in the comparison.
    fn tied_days<K: PartialOrd>(
        &self,
        year: i32,
        key: impl Fn(&DayRecord) -> Option<K>,
        extreme: Extreme,
    ) -> Result<Vec<DayRecord>> {
        let mut best: Option<K> = None;
        for candidate in self.days_of_year(year).filter_map(&key) {
            if best.as_ref().is_none_or(|current| extreme.prefers(&candidate, current)) {
                best = Some(candidate);
            }
        }
        let best = best.ok_or(DatasetError::NoDataForYear(year))?;

        Ok(self
            .days_of_year(year)
            .filter(|day| key(*day).is_some_and(|value| value == best))
            .cloned()
            .collect())
    }

    /// Days of `year` tied for the highest high temperature.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::NoDataForYear` if the year has no records.
    pub fn highest_temperature_days_of_year(&self, year: i32) -> Result<Vec<DayRecord>> {
        self.tied_days(year, |day| Some(day.high_temperature), Extreme::Highest)
    }

    /// Days of `year` tied for the lowest low temperature.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::NoDataForYear` if the year has no records.
    pub fn lowest_temperature_days_of_year(&self, year: i32) -> Result<Vec<DayRecord>> {
        self.tied_days(year, |day| Some(day.low_temperature), Extreme::Lowest)
    }

    /// Days of `year` tied for the lowest high temperature.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::NoDataForYear` if the year has no records.
    pub fn lowest_high_temperature_days_of_year(&self, year: i32) -> Result<Vec<DayRecord>> {
        self.tied_days(year, |day| Some(day.high_temperature), Extreme::Lowest)
    }

    /// Days of `year` tied for the highest low temperature.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::NoDataForYear` if the year has no records.
    pub fn highest_low_temperature_days_of_year(&self, year: i32) -> Result<Vec<DayRecord>> {
        self.tied_days(year, |day| Some(day.low_temperature), Extreme::Highest)
    }

    /// Days of `year` tied for the most precipitation, in date order.
    ///
    /// A NaN precipitation is not a reading and never matches.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::NoDataForYear` if the year has no records with a
    /// numeric precipitation.
    pub fn highest_precipitation_days_of_year(&self, year: i32) -> Result<Vec<DayRecord>> {
        let precipitation = |day: &DayRecord| Some(day.precipitation).filter(|p| !p.is_nan());
        let mut days = self.tied_days(year, precipitation, Extreme::Highest)?;
        days.sort_by_key(|day| day.date);
        Ok(days)
    }

    /// Days of `year` at or above the high threshold.
    ///
    /// A day counts when either its high or its low reaches the threshold.
    pub fn count_days_over_threshold(&self, year: i32) -> usize {
        let threshold = self.config.high_temperature_threshold;
        self.days_of_year(year)
            .filter(|day| day.high_temperature >= threshold || day.low_temperature >= threshold)
            .count()
    }

    /// Days of `year` at or below the low threshold.
    ///
    /// A day counts when either its low or its high reaches the threshold.
    pub fn count_days_under_threshold(&self, year: i32) -> usize {
        let threshold = self.config.low_temperature_threshold;
        self.days_of_year(year)
            .filter(|day| day.low_temperature <= threshold || day.high_temperature <= threshold)
            .count()
    }

    /// Distinct years with at least one record, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.days
            .iter()
            .map(DayRecord::year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn high_temperatures_for_year(&self, year: i32) -> Vec<i32> {
        self.days_of_year(year).map(|day| day.high_temperature).collect()
    }

    pub fn low_temperatures_for_year(&self, year: i32) -> Vec<i32> {
        self.days_of_year(year).map(|day| day.low_temperature).collect()
    }

    pub fn average_high_temperature_of_year(&self, year: i32) -> Result<f64> {
        average(&self.high_temperatures_for_year(year)).ok_or(DatasetError::NoDataForYear(year))
    }

    pub fn average_low_temperature_of_year(&self, year: i32) -> Result<f64> {
        average(&self.low_temperatures_for_year(year)).ok_or(DatasetError::NoDataForYear(year))
    }

    /// One aggregate per month of `year` that has records, ascending by month.
    /// Months without records are absent.
    pub fn monthly_aggregates(&self, year: i32) -> Vec<MonthlyAggregate> {
        let mut months: BTreeMap<u32, Vec<&DayRecord>> = BTreeMap::new();
        for day in self.days_of_year(year) {
            months.entry(day.date.month()).or_default().push(day);
        }

        months
            .into_iter()
            .filter_map(|(month, days)| MonthlyAggregate::from_days(month, &days))
            .collect()
    }

    pub fn high_temperature_histogram(&self, year: i32) -> Result<BTreeMap<i64, usize>> {
        histogram(
            &self.high_temperatures_for_year(year),
            self.config.histogram_bucket_size,
        )
    }

    pub fn low_temperature_histogram(&self, year: i32) -> Result<BTreeMap<i64, usize>> {
        histogram(
            &self.low_temperatures_for_year(year),
            self.config.histogram_bucket_size,
        )
    }

    /// Gathers every per-year statistic for `year`.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::NoDataForYear` if the year has no records.
    pub fn year_summary(&self, year: i32) -> Result<YearSummary> {
        Ok(YearSummary {
            year,
            highest_temperature_days: self.highest_temperature_days_of_year(year)?,
            lowest_temperature_days: self.lowest_temperature_days_of_year(year)?,
            lowest_high_temperature_days: self.lowest_high_temperature_days_of_year(year)?,
            highest_low_temperature_days: self.highest_low_temperature_days_of_year(year)?,
            highest_precipitation_days: self.highest_precipitation_days_of_year(year)?,
            average_high_temperature: self.average_high_temperature_of_year(year)?,
            average_low_temperature: self.average_low_temperature_of_year(year)?,
            high_temperature_threshold: self.config.high_temperature_threshold,
            days_over_threshold: self.count_days_over_threshold(year),
            low_temperature_threshold: self.config.low_temperature_threshold,
            days_under_threshold: self.count_days_under_threshold(year),
            high_temperature_histogram: self.high_temperature_histogram(year)?,
            low_temperature_histogram: self.low_temperature_histogram(year)?,
            months: self.monthly_aggregates(year),
        })
    }

    /// One summary per year present, ascending by year.
    pub fn summaries(&self) -> Result<Vec<YearSummary>> {
        self.years()
            .into_iter()
            .map(|year| self.year_summary(year))
            .collect()
    }
}
