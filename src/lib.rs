//! Shapelet Search - exploration strategies for shapelet discovery
//!
//! This crate decides which windows of a time series dataset get scored when
//! looking for shapelets. Scoring itself is injected through
//! [`search::QualityEvaluator`].
//!
//! # Modules
//!
//! ## Core
//! - [`data`] - Labeled time series and datasets
//! - [`search`] - Search strategies, configuration and budgets
//! - [`surrogate`] - Regression surrogates for the Bayesian search
//!
//! ## Scoring
//! - [`quality`] - F-statistic reference evaluator
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core
pub mod data;
pub mod search;
pub mod surrogate;

// Scoring
pub mod quality;

// Services
pub mod cli;

pub use error::{Result, ShapeletError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, ShapeletError};

    // Data
    pub use crate::data::{Dataset, TimeSeries};

    // Search
    pub use crate::search::budget::{theoretical_shapelet_count, timed_cost, SubsamplePlan};
    pub use crate::search::{
        create_search, Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType,
        ShapeletSearcher, VisitRecord,
    };

    // Surrogates
    pub use crate::surrogate::{GaussianProcess, KernelType, Surrogate};

    // Scoring
    pub use crate::quality::FStatEvaluator;
}
