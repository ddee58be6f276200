//! Mercato CLI - Run and inspect the Mercato marketplace.
//!
//! Commands:
//! - `mercato serve` - Start the HTTP API
//! - `mercato config` - Manage configuration (`show`, `init`, `validate`)
//! - `mercato demo` - Walk through the cart-to-order flow in memory

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ConfigArgs, DemoArgs, ServeArgs};

/// Mercato CLI - Cart-to-order marketplace core
#[derive(Parser)]
#[command(name = "mercato")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve(ServeArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Run the in-memory demo scenario
    Demo(DemoArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);

    let ctx = match context::Context::load(cli.config.as_deref(), output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };
    if ctx.output.is_verbose() {
        ctx.output.debug(&format!("working directory: {}", ctx.cwd.display()));
    }

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
        Commands::Demo(args) => commands::demo::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
