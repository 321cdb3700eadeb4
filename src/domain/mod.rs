//! Domain layer for the autoresolve selection engine
//!
//! This module contains core models, repository ports and errors.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
