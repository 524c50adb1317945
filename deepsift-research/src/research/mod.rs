//! Deep research over heterogeneous retrieval sources
//!
//! The engine breaks a question into sub-queries, gathers evidence from every
//! configured source, summarizes and reflects on it round by round, and stops
//! on depth, token budget or a reflection signal.

pub mod engine;
pub mod types;

pub use engine::DeepSearchAgent;
pub use types::{ResearchReport, RoundRecord, TerminationReason};
