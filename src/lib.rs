//! Drawsy - solves handwritten math sketches with a multimodal model

pub mod config;
pub mod error;
pub mod types;

pub mod imaging;
pub mod prompt;
pub mod model;
pub mod repair;
pub mod calculator;
pub mod api;

pub use calculator::Calculator;
pub use config::Config;
pub use error::{Error, Result};
pub use repair::{normalize_response, RepairPipeline, RepairStep};
pub use types::*;
