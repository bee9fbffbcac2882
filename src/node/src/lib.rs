//! Reference overlay node for Postboard.
//!
//! The node tracks Postboard tokens submitted under its topic, answers
//! lookups for them, and keeps authenticated message boxes that clients use
//! to deliver tips.

pub mod config;
pub mod errors;
pub mod lookup;
pub mod messagebox;
pub mod metrics;
pub mod server;
pub mod storage;
pub mod topic;

pub use config::NodeConfig;
pub use errors::NodeError;
pub use server::{routes, start_http_server, NodeState};
pub use storage::OverlayStore;
