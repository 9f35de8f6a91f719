//! webpass - operator front end for a git-synced password store
//!
//! Loads the same configuration a server would, then runs the background
//! sync loop or performs single store operations as an authenticated user.

mod ops;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use webpass_core::{AuthRegistry, Config};

/// Serve and inspect a pass-style password store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Username to authenticate as
    #[arg(short, long, env = "WEBPASS_USER", default_value = "")]
    user: String,

    /// Password to authenticate with
    #[arg(long, env = "WEBPASS_PASSWORD", hide_env_values = true, default_value = "")]
    password: String,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Keep the store in sync until interrupted
    Run,
    /// Pull from the remote once
    Sync,
    /// List every item in the store
    List,
    /// Decrypt an item; the passphrase is read from the first line of stdin
    Show { item: String },
    /// Write stdin (ciphertext) to an item, replacing it if present
    Insert { item: String },
    /// Print the PGP private key
    Key,
    /// Check credentials and print the store they unlock
    Login,
    /// List the available auth schemes
    Schemes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level: tracing::Level = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    tracing_subscriber::registry().with(stderr_layer).init();

    let registry = AuthRegistry::builtin();
    if let Command::Schemes = args.command {
        return ops::schemes(&registry);
    }

    let config = Config::load(&args.config)?;
    let ctx = ops::Context {
        config,
        registry,
        user: args.user,
        password: args.password,
    };

    match args.command {
        Command::Run => ops::run(&ctx).await,
        Command::Sync => ops::sync(&ctx).await,
        Command::List => ops::list(&ctx).await,
        Command::Show { item } => ops::show(&ctx, &item).await,
        Command::Insert { item } => ops::insert(&ctx, &item).await,
        Command::Key => ops::key(&ctx).await,
        Command::Login => ops::login(&ctx).await,
        Command::Schemes => ops::schemes(&ctx.registry),
    }
}
