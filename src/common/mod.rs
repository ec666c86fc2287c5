//! Common types and utilities shared across batchtree.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants
//! - Error types
//! - Page offsets

pub mod config;
pub mod error;
mod offset;

pub use error::{Error, Result};
pub use offset::Offset;
