//! Deepsift Core - Core data structures and capability traits
//!
//! This crate defines the shared abstractions used by every other deepsift crate:
//! the error taxonomy, configuration, logging, async helpers and the narrow
//! capability contracts the research orchestrator depends on.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
