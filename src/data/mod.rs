//! Labeled time series collections
//!
//! Provides the read-only data the search strategies walk over:
//! - [`TimeSeries`] - one (possibly multivariate) labeled series
//! - [`Dataset`] - an ordered collection with class and length summaries

mod dataset;
mod series;

pub use dataset::Dataset;
pub use series::TimeSeries;
