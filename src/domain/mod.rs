//! Domain layer: models and ports. No dependency on adapters,
//! application, or infrastructure.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
