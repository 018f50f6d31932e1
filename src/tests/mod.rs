//! Shared test infrastructure

pub mod utils;
