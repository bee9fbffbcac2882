//! Integration tests for Postboard.

pub mod board_tests;
pub mod core_tests;
pub mod node_tests;

use postboard_cli::{BoardController, BoardOptions, HttpOverlay, LocalWallet, MessageBoxPayments};
use postboard_core::wire::TIPS_MESSAGE_BOX;
use postboard_node::{start_http_server, NodeConfig, NodeState};
use std::sync::Arc;
use tempfile::TempDir;

/// A board wired to a live node over HTTP.
pub type LiveBoard = BoardController<LocalWallet, HttpOverlay, MessageBoxPayments<LocalWallet>>;

/// A node running on an ephemeral local port.
pub struct TestNode {
    /// Keeps the database directory alive
    pub dir: TempDir,
    /// Base URL of the node
    pub url: String,
}

/// Starts a node with a fresh database on the current runtime.
pub async fn spawn_node() -> anyhow::Result<TestNode> {
    let dir = tempfile::tempdir()?;
    let config = NodeConfig::default();
    let state = Arc::new(NodeState::open(dir.path(), &config.overlay)?);
    let addr = start_http_server(([127, 0, 0, 1], 0).into(), state, &config.http).await?;
    Ok(TestNode {
        dir,
        url: format!("http://{}", addr),
    })
}

/// Builds a board for `wallet` against the node at `url`.
pub fn board(wallet: LocalWallet, url: &str) -> LiveBoard {
    let wallet = Arc::new(wallet);
    BoardController::new(
        wallet.clone(),
        HttpOverlay::new(url),
        MessageBoxPayments::new(url, TIPS_MESSAGE_BOX, wallet),
        BoardOptions::default(),
    )
}
