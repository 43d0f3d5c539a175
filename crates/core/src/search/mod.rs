//! Full-text search over notes, backed by tantivy.
//!
//! Queries go through a date-math preprocessing pass first, so `now-7d` and
//! friends turn into concrete timestamps before the query parser sees them.

mod datemath;
mod index;

pub use datemath::{preprocess_dates, preprocess_dates_at};
pub use index::{SearchError, SearchHit, SearchIndex};
