//! Integration tests - Connector scans against the in-memory document engine
//!
//! These tests drive schema resolution, pushdown and decoding end to end.

mod concurrency_tests;
mod data_type_tests;
mod filter_pushdown_tests;
