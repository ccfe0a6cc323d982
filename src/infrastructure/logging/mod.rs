//! Structured logging.

pub mod logger;

pub use logger::{LoggerImpl, LoggingError};
