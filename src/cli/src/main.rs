//! Terminal client for Postboard.

use anyhow::Result;
use colored::Colorize;
use postboard_cli::commands::{export_seed, identity, init_seed, list, post, redeem, tip, tips, watch};
use postboard_cli::ClientConfig;
use postboard_core::Outpoint;
use std::path::PathBuf;
use structopt::StructOpt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command line arguments for the Postboard client.
#[derive(Debug, StructOpt)]
#[structopt(name = "postboard", about = "Post messages backed by locked satoshis")]
struct Opt {
    /// Path to the configuration file
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Path to the wallet file
    #[structopt(short, long, parse(from_os_str))]
    wallet: Option<PathBuf>,

    /// Overlay to connect to
    #[structopt(short, long)]
    overlay: Option<String>,

    /// Subcommand to run
    #[structopt(subcommand)]
    cmd: Command,
}

/// Subcommands for the Postboard client.
#[derive(Debug, StructOpt)]
enum Command {
    /// Initialize a new seed
    #[structopt(name = "init-seed")]
    InitSeed {
        /// Restore from an existing mnemonic instead of generating one
        #[structopt(long)]
        phrase: Option<String>,
    },

    /// Export the seed
    #[structopt(name = "export-seed")]
    ExportSeed,

    /// Show the identity key posts are signed with
    #[structopt(name = "identity")]
    Identity,

    /// Create a post
    #[structopt(name = "post")]
    Post {
        /// Post text
        #[structopt(long)]
        text: String,

        /// Satoshis to lock into the post
        #[structopt(long)]
        amount: Option<u64>,
    },

    /// List posts and collect waiting tips
    #[structopt(name = "list")]
    List,

    /// Redeem one of your posts
    #[structopt(name = "redeem")]
    Redeem {
        /// Transaction id of the post
        #[structopt(long)]
        txid: String,

        /// Output index of the post
        #[structopt(long, default_value = "0")]
        output_index: u32,
    },

    /// Tip the author of a post
    #[structopt(name = "tip")]
    Tip {
        /// Transaction id of the post
        #[structopt(long)]
        txid: String,

        /// Output index of the post
        #[structopt(long, default_value = "0")]
        output_index: u32,

        /// Satoshis to send
        #[structopt(long)]
        amount: u64,
    },

    /// Collect waiting tips
    #[structopt(name = "tips")]
    Tips,

    /// Keep the board refreshed until interrupted
    #[structopt(name = "watch")]
    Watch {
        /// Seconds between refreshes
        #[structopt(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let opt = Opt::from_args();

    let mut config = match &opt.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    config.apply_env();
    if let Some(overlay) = &opt.overlay {
        config.set_overlay_url(overlay);
    }

    let wallet_file = match opt.wallet {
        Some(path) => path,
        None => {
            let mut dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            dir.push("postboard");
            dir.push("wallet.dat");
            dir
        }
    };

    if let Some(parent) = wallet_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match opt.cmd {
        Command::InitSeed { phrase } => {
            let identity = init_seed::run(&wallet_file, phrase.as_deref()).await?;
            println!("{} {}", "Seed initialized:".green(), wallet_file.display());
            println!("{} {}", "Identity key:".green(), identity);
        }
        Command::ExportSeed => {
            let seed = export_seed::run(&wallet_file).await?;
            println!("{} {}", "Seed:".green(), seed);
            println!("{}", "WARNING: Keep this seed safe and private!".red());
        }
        Command::Identity => {
            let key = identity::run(&wallet_file).await?;
            println!("{} {}", "Identity key:".green(), key);
        }
        Command::Post { text, amount } => {
            let record = post::run(&config, &wallet_file, &text, amount).await?;
            println!("{} {}", "Post created:".green(), record.outpoint());
        }
        Command::List => {
            list::run(&config, &wallet_file).await?;
        }
        Command::Redeem { txid, output_index } => {
            let record = redeem::run(&config, &wallet_file, &Outpoint::new(txid, output_index)).await?;
            println!("{} {} satoshis", "Redeemed:".green(), record.sats);
        }
        Command::Tip {
            txid,
            output_index,
            amount,
        } => {
            let receipt = tip::run(&config, &wallet_file, &Outpoint::new(txid, output_index), amount).await?;
            println!("{} {}", "Tip sent:".green(), receipt.txid);
        }
        Command::Tips => {
            let total = tips::run(&config, &wallet_file).await?;
            println!("{} {} satoshis", "Tips received:".green(), total);
        }
        Command::Watch { interval } => {
            watch::run(&config, &wallet_file, interval).await?;
        }
    }

    Ok(())
}
