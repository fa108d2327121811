// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod commands;

use clap::{Parser, Subcommand};

use disker_client::api::CampaignScope;
use disker_client::ClientConfig;

/// Command-line client for the disker creator marketplace.
#[derive(Parser)]
#[command(name = "disker", version)]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientConfig,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "DISKER_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log format (json or text).
    #[arg(long, env = "DISKER_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(long, env = "DISKER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with a Google ID token
    LoginGoogle { id_token: String },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami {
        /// Re-fetch the profile from the server first
        #[arg(long)]
        fetch: bool,
    },
    /// Show the local session state
    Status,
    /// List campaigns
    Campaigns {
        #[arg(long, value_enum, default_value_t = CampaignScope::Active)]
        scope: CampaignScope,
    },
    /// Show one campaign
    Campaign { id: u64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);
    std::process::exit(commands::run(cli).await);
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}
