//! Integration tests for MediaHub
//!
//! These tests run against a real, migrated SQLite database.

mod access_tests;
mod aggregator_tests;
mod audit_tests;
