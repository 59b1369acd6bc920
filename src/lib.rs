pub mod dataset;
pub mod error;
pub mod histogram;
pub mod structs;

// Re-export public API
pub use dataset::WeatherDataset;
pub use error::{DatasetError, Result};
pub use histogram::{bucket_floor, histogram};
pub use structs::{
    ConflictGroup, DatasetConfig, DayRecord, MonthlyAggregate, Resolution, YearSummary, average,
};
