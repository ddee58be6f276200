//! Scripted walk through the cart-to-order flow against an in-memory
//! marketplace.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{ensure, Result};
use mercato_commerce::prelude::*;
use serde::Serialize;

use super::DemoArgs;
use crate::context::Context;
use crate::output::{format_cents, format_millis, status_badge};

const STEPS: usize = 5;

#[derive(Debug, Serialize)]
struct DemoSummary {
    order_number: String,
    cart_total_cents: i64,
    discounted_total_cents: i64,
    final_status: OrderStatus,
    stock_after_cancel: i64,
    race_orders: usize,
    race_reserved: i64,
    race_remaining: i64,
    notifications: usize,
}

fn product(id: &str, name: &str, price_cents: i64, stock: i64, seller: &str, currency: Currency) -> Product {
    let mut product = Product::new(
        ProductId::new(id),
        id.to_uppercase(),
        name,
        Money::new(price_cents, currency),
        UserId::new(seller),
    );
    product.stock = stock;
    product
}

fn checkout_request(items: Vec<LineRequest>) -> CheckoutRequest {
    CheckoutRequest {
        items,
        shipping_address: Address::new("Demo Buyer", "1 Main St", "Springfield", "IL", "62701", "US"),
        payment_method: Some(PaymentMethod::Card),
        ..CheckoutRequest::default()
    }
}

/// Run the demo command.
pub async fn run(args: DemoArgs, ctx: &Context) -> Result<()> {
    ensure!(args.stock >= 0, "--stock must not be negative");
    let out = &ctx.output;
    let config = ctx.config.marketplace();
    let currency = config.pricing.currency;
    let notifier = Arc::new(MemoryNotifier::new());
    let market = Marketplace::with_notifier(config, notifier.clone());

    out.header("Mercato demo");
    out.step(1, STEPS, "Seeding catalog");
    market
        .seed(
            vec![
                product("mug", "Stoneware Mug", 3000, 10, "seller-1", currency),
                product("lamp", "Desk Lamp", 4500, args.stock, "seller-2", currency),
            ],
            vec![Coupon::percentage("SAVE10", 10)],
        )
        .await;

    let customer = Actor::customer("demo-customer").with_contact("Demo Buyer", "buyer@example.com", None);
    let mug = ProductId::new("mug");

    out.step(2, STEPS, "Filling the cart");
    let cart = market.carts().add_item(&customer.id, &mug, 2, None).await?;
    let cart_total = cart.totals().total;
    out.kv("subtotal", &format_cents(cart.totals().subtotal.amount_cents));
    out.kv("tax", &format_cents(cart.totals().tax.amount_cents));
    out.kv("shipping", &format_cents(cart.totals().shipping.amount_cents));
    out.kv("total", &cart_total.display());

    let cart = market.carts().apply_coupon(&customer.id, "save10").await?;
    let discounted = cart.totals().total;
    out.kv("with SAVE10", &discounted.display());

    out.step(3, STEPS, "Checking out");
    let order = market
        .orders()
        .checkout(&customer, checkout_request(Vec::new()))
        .await?;
    out.kv("order", order.order_number.as_str());
    out.kv("status", &status_badge(order.status.as_str()));
    out.debug(&format!("reservations: {:?}", order.reservations));

    out.step(4, STEPS, "Confirming, then cancelling");
    let seller = Actor::seller("seller-1");
    market
        .orders()
        .update_status(&seller, &order.order_number, OrderStatus::Confirmed, Some("Accepted".into()))
        .await?;
    let cancelled = market
        .orders()
        .cancel(&customer, &order.order_number, Some("Changed my mind".into()))
        .await?;
    let ledger = market.catalog().ledger();
    let stock_after_cancel = ledger.available(&mug).await?;
    out.kv("status", &status_badge(cancelled.status.as_str()));
    out.kv("history entries", &cancelled.history.len().to_string());
    out.kv("mug stock", &stock_after_cancel.to_string());

    out.step(5, STEPS, &format!("{} customers race for {} lamps", args.contenders, args.stock));
    let started = Instant::now();
    let bar = out.progress(args.contenders as u64, "checkouts");
    let mut handles = Vec::with_capacity(args.contenders);
    for i in 0..args.contenders {
        let market = market.clone();
        handles.push(tokio::spawn(async move {
            let racer = Actor::customer(format!("racer-{i}"));
            let line = LineRequest {
                product_id: ProductId::new("lamp"),
                quantity: 1,
                variant: None,
            };
            market
                .orders()
                .checkout(&racer, checkout_request(vec![line]))
                .await
        }));
    }

    let (mut race_orders, mut race_reserved) = (0, 0);
    for handle in handles {
        match handle.await? {
            Ok(order) => {
                race_orders += 1;
                race_reserved += order.reservations.iter().map(|r| r.quantity).sum::<i64>();
            }
            Err(e) => out.debug(&format!("checkout rejected: {e}")),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    let race_remaining = ledger.available(&ProductId::new("lamp")).await?;

    out.table_row(&["orders", "reserved", "remaining", "elapsed"], &[8, 10, 10, 8]);
    let row = [
        race_orders.to_string(),
        race_reserved.to_string(),
        race_remaining.to_string(),
        format_millis(started.elapsed().as_millis()),
    ];
    let row: Vec<&str> = row.iter().map(String::as_str).collect();
    out.table_row(&row, &[8, 10, 10, 8]);

    let summary = DemoSummary {
        order_number: order.order_number.to_string(),
        cart_total_cents: cart_total.amount_cents,
        discounted_total_cents: discounted.amount_cents,
        final_status: cancelled.status,
        stock_after_cancel,
        race_orders,
        race_reserved,
        race_remaining,
        notifications: notifier.sent().len(),
    };

    if out.is_json() {
        out.json(&summary);
    } else {
        out.rule();
        out.kv("notifications", &summary.notifications.to_string());
    }

    ensure!(
        race_reserved <= args.stock && race_remaining >= 0,
        "stock oversold: reserved {race_reserved} of {}",
        args.stock
    );
    out.success("Demo finished");
    Ok(())
}
