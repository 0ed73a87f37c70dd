//! Error taxonomy for the validation core
//!
//! Two families live here:
//! - Recoverable data-quality failures (`DataUnavailable`, `ModelUnavailable`)
//!   that components absorb with documented substitute values.
//! - Entity/geometry failures (`InvalidGeometry`, `UnknownCrop`) that propagate
//!   to the caller as named errors so one bad parcel never aborts a batch.

use thiserror::Error;

/// Errors raised by the decision engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Upstream statistic or weather sample missing for the resolved window
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Malformed, degenerate or self-intersecting parcel boundary
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Claimed or catalog crop name not found
    #[error("unknown crop '{0}'")]
    UnknownCrop(String),

    /// Learned-model artifact missing, unreadable or unusable for inference
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Crop catalog could not be built
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Engine configuration rejected
    #[error("config error: {0}")]
    Config(String),

    /// No overlap alert with this id
    #[error("alert {0} not found")]
    AlertNotFound(u64),

    /// Parcel registry state could not be accessed
    #[error("registry error: {0}")]
    Registry(String),
}

impl ValidationError {
    /// True for failures the engine recovers from locally
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ValidationError::DataUnavailable(_) | ValidationError::ModelUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;
