//! AWS-oriented adapters and handlers for the CSV-to-Parquet converter.
//!
//! This crate owns runtime integration details (the Lambda handler, the
//! storage adapter, and columnar encoding) and exposes a single runtime module
//! boundary for the contract, key, and configuration primitives.

pub mod adapters;
pub mod encoding;
pub mod handlers;
pub mod runtime;
