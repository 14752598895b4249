//! Shared CSV-to-Parquet conversion domain primitives.
//!
//! This crate owns the notification and response contracts, the object key
//! rules, and configuration resolution. It intentionally excludes AWS SDK,
//! Lambda runtime, and columnar encoding concerns.

pub mod config;
pub mod contract;
pub mod storage_keys;
