//! Helper functions shared across the pipeline

mod files;

pub use files::{copy_dir, write_atomic};
