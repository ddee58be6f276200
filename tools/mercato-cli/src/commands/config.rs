//! Configuration management commands.

use std::io::IsTerminal;

use anyhow::{bail, Result};
use dialoguer::Confirm;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CONFIG_NAMES};
use crate::context::Context;
use crate::output::format_cents;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { force, path } => init_config(force, path.as_deref(), ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    if ctx.output.is_json() {
        ctx.output.json(config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    ctx.output.info("[server]");
    ctx.output.kv("bind", &config.server.bind);

    ctx.output.info("[logging]");
    ctx.output.kv("level", config.logging.level.as_str());
    ctx.output.kv("format", &format!("{:?}", config.logging.format).to_lowercase());
    if let Some(filter) = &config.logging.filter {
        ctx.output.kv("filter", filter);
    }

    ctx.output.info("[pricing]");
    ctx.output.kv("currency", config.pricing.currency.code());
    ctx.output.kv(
        "tax_rate",
        &format!("{}.{:02}%", config.pricing.tax_rate_bps / 100, config.pricing.tax_rate_bps % 100),
    );
    ctx.output.kv(
        "free_shipping_from",
        &format_cents(config.pricing.free_shipping_threshold_cents),
    );
    ctx.output.kv("flat_shipping", &format_cents(config.pricing.flat_shipping_cents));

    ctx.output.info("[retry]");
    ctx.output.kv("max_retries", &config.retry.max_retries.to_string());
    ctx.output.kv("base_delay_ms", &config.retry.base_delay_ms.to_string());

    ctx.output.info("[catalog]");
    for product in &config.catalog.products {
        ctx.output.list_item(&format!(
            "{} ({}) {} x{} sold by {}",
            product.id,
            product.name,
            format_cents(product.price_cents),
            product.stock,
            product.seller_id
        ));
    }
    for coupon in &config.catalog.coupons {
        ctx.output
            .list_item(&format!("coupon {} {:?} {}", coupon.code, coupon.kind, coupon.value));
    }

    Ok(())
}

fn init_config(force: bool, path: Option<&str>, ctx: &Context) -> Result<()> {
    let config_path = match path {
        Some(path) => ctx.resolve_path(path),
        None => ctx.cwd.join(CONFIG_NAMES[0]),
    };

    if config_path.exists() && !force {
        if !std::io::stdin().is_terminal() {
            bail!(
                "Config file already exists: {}. Use --force to overwrite.",
                config_path.display()
            );
        }
        let overwrite = Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", config_path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            ctx.output.warn("Aborted");
            return Ok(());
        }
    }

    std::fs::write(&config_path, generate_default_config())?;
    ctx.output.success(&format!("Created: {}", config_path.display()));
    ctx.output.debug("Edit [catalog] to seed products and coupons");
    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    let Some(path) = &ctx.config_path else {
        ctx.output
            .warn("No mercato.toml found, built-in defaults are in use");
        return Ok(());
    };

    ctx.output.header("Validating configuration");
    let errors = ctx.config.validate();
    if errors.is_empty() {
        ctx.output.success(&format!("{} is valid", path.display()));
        return Ok(());
    }
    for error in &errors {
        ctx.output.error(error);
    }
    bail!("Configuration has {} error(s)", errors.len())
}
