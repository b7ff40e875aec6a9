//! Infrastructure layer: config, logging and application errors.

pub mod config;
pub mod contracts;
pub mod error;
pub mod logging;
