pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod report;
pub mod simulation;

pub use engine::RecallEngine;
pub use error::{ServiceError, ServiceResult};
