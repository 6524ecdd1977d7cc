//! Error Types
//!
//! Every fallible operation in this crate returns [`AlgoResult`]. None of the
//! variants are transient: the core performs no I/O, so a failure always means
//! the caller has to change its input.

use thiserror::Error;

use crate::types::ItemId;

pub type AlgoResult<T> = Result<T, AlgoError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlgoError {
    /// Malformed or incomplete input (missing feature, bad latency, unknown band label).
    #[error("validation error: {0}")]
    Validation(String),

    /// Prediction requested before the regression model was fitted.
    #[error("regression model has not been fitted")]
    UnfittedModel,

    /// `XᵀX + λR` could not be factorised.
    #[error("regularized covariance matrix ({dimension}x{dimension}) is singular; increase lambda or drop collinear features")]
    SingularMatrix { dimension: usize },

    /// A result was recorded for an item that was never scheduled.
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),
}

impl AlgoError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
