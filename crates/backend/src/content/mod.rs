//! Content aggregation: schedule analysis, document ranking, and the
//! assembled daily briefing input handed to script generation.

pub mod aggregator;
pub mod documents;
pub mod schedule;

pub use aggregator::{ContentSource, DailyContent, GoogleContentSource};
