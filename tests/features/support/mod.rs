//! Shared support code for Cucumber scenarios

pub mod world;

pub use world::TestWorld;
