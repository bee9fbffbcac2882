//! Terminal client for Postboard.

pub mod board;
pub mod commands;
pub mod config;
pub mod controller;
pub mod errors;
pub mod overlay;
pub mod payments;
pub mod render;
pub mod services;
pub mod wallet;

// Re-export commonly used types and functions
pub use board::{reduce, BoardEvent, BoardState, Notification, NotificationLevel};
pub use config::{ClientConfig, NetworkMode};
pub use controller::{BoardController, BoardOptions};
pub use errors::ClientError;
pub use overlay::HttpOverlay;
pub use payments::MessageBoxPayments;
pub use services::{OverlayService, PaymentService, SigningService};
pub use wallet::LocalWallet;
