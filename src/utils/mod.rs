//! Utility functions and types

pub mod data_loader;

pub use data_loader::{DataSaver, SeriesLoader, DEFAULT_DATE_COLUMN, DEFAULT_DATE_FORMAT, DEFAULT_VALUE_COLUMN};
