//! CLI command implementations.

pub mod config;
pub mod demo;
pub mod serve;

use clap::{Args, Subcommand};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides `server.bind`).
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Emit JSON log lines (overrides `logging.format`).
    #[arg(long)]
    pub json_logs: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show,

    /// Write a starter mercato.toml.
    Init {
        /// Overwrite an existing file without asking.
        #[arg(short, long)]
        force: bool,

        /// Where to write (default: ./mercato.toml).
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Check the configuration for mistakes.
    Validate,
}

/// Arguments for the demo command.
#[derive(Args)]
pub struct DemoArgs {
    /// Customers racing for the last units in the stock scenario.
    #[arg(long, default_value_t = 12)]
    pub contenders: usize,

    /// Units available to the racing customers.
    #[arg(long, default_value_t = 5)]
    pub stock: i64,
}
