//! CLI command implementations.

pub mod cache;
pub mod common;
pub mod config;
pub mod get;
pub mod inspect;
pub mod seed;
