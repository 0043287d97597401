//! Core types: errors, configuration, parameter spaces.

pub mod config;
pub mod errors;
pub mod space;
