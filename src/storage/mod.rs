//! Storage layer - memory-mapped file access.
//!
//! This module handles persistent storage:
//! - [`BatchStore`] - Fixed-batch and raw access to one mapped file
//! - [`ValueLog`] - Length-prefixed value records on top of a `BatchStore`

mod batch_store;
mod value_log;

pub use batch_store::BatchStore;
pub use value_log::ValueLog;
