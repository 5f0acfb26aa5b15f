//! Data types shared across the pipeline.

pub mod config;
pub mod page;
pub mod summary;
pub mod verification;
