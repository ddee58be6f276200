//! Run the HTTP API.

use anyhow::{bail, Context as _, Result};
use mercato_api::AppState;
use mercato_commerce::Marketplace;
use mercato_observability::{init_logging, LogFormat};

use super::ServeArgs;
use crate::context::Context;

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let errors = ctx.config.validate();
    if !errors.is_empty() {
        bail!("Invalid configuration: {}", errors.join("; "));
    }

    let mut logging = ctx.config.logging.clone();
    if args.json_logs {
        logging.format = LogFormat::Json;
    }
    init_logging(&logging)?;

    let spinner = ctx.output.spinner("Seeding catalog");
    let market = Marketplace::new(ctx.config.marketplace());
    let (products, coupons) = ctx.config.seeds();
    market.seed(products, coupons).await;
    spinner.finish_and_clear();

    let bind = args.bind.as_deref().unwrap_or(&ctx.config.server.bind);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    ctx.output
        .success(&format!("Serving on http://{}", listener.local_addr()?));
    mercato_api::serve(listener, AppState::new(market)).await?;
    Ok(())
}
