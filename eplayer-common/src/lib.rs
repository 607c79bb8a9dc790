//! # eplayer Common Library
//!
//! Shared code for the eplayer crates including:
//! - Error type shared by configuration and utility code
//! - Bootstrap configuration loading (TOML)
//! - Tracing initialisation
//! - PTS / 90 kHz clock helpers

pub mod config;
pub mod error;
pub mod logging;
pub mod pts;

pub use error::{Error, Result};
