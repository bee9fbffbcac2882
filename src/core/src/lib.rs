//! Core primitives for Postboard.
//!
//! This crate provides the PushDrop token codec that attaches post payloads
//! to outputs, the post payload layout with its identity linkage, and the
//! action (transaction) model shared by the client and the overlay node.

pub mod errors;
pub mod post;
pub mod pushdrop;
pub mod types;
pub mod wire;

// Re-export commonly used types
pub use errors::CoreError;
pub use post::{DecodedPost, PostPayload};
pub use pushdrop::PushDropToken;
pub use types::{
    Action, ActionInput, ActionOutput, LookupOutput, Outpoint, PostRecord, PostStatus, Satoshis,
    Script, Signature, TokenRef,
};
