//! Step definitions for Cucumber scenarios

pub mod access_steps;
