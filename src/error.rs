use chrono::NaiveDate;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DatasetError {
    #[error("No data for year: {0}")]
    NoDataForYear(i32),
    #[error("Invalid histogram bucket size: {0} (must be positive)")]
    InvalidBucketSize(i32),
    #[error("No conflicting days left to resolve")]
    NoConflicts,
    #[error("Day already exists: {0}")]
    DuplicateDay(NaiveDate),
    #[error("Day not found: {0}")]
    DayNotFound(NaiveDate),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
