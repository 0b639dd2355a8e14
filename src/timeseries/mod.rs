//! Time series module
//!
//! Provides supervised-learning views of a daily series:
//! - Lag features
//! - Calendar (date-derived) attributes
//! - Chronological train/evaluation splitting

mod features;
mod validation;

pub use features::{CalendarAttribute, FeatureRow, LagFeatureBuilder};
pub use validation::{DateSplit, SplitRows};
