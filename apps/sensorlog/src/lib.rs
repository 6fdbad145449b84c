//! # sensorlog
//!
//! Application layer around `sensorlog-core`: configuration loading,
//! concrete data sources, publish dispatch and the tick loop.

pub mod cli;
pub mod config;
pub mod homematic;
pub mod publish;
pub mod runtime;
pub mod sources;

pub use config::{Settings, SourceSpec};
pub use runtime::{Runtime, Subscription};
