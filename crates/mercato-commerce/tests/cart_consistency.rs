//! Cart behavior under repeated and concurrent mutation.

use chrono::{Duration, Utc};
use mercato_commerce::prelude::*;

fn product(id: &str, price_cents: i64, stock: i64) -> Product {
    let mut product = Product::new(
        ProductId::new(id),
        id.to_uppercase(),
        format!("Product {id}"),
        Money::new(price_cents, Currency::USD),
        UserId::new("s1"),
    );
    product.stock = stock;
    product
}

async fn market() -> Marketplace {
    let market = Marketplace::new(MarketplaceConfig::default());
    market
        .seed(
            vec![
                product("mug", 1200, 50),
                product("tee", 2500, 50),
                product("cap", 900, 50),
                product("pen", 150, 50),
                product("tank", 2000, 3),
                product("bolt", 10, 20_000),
            ],
            vec![Coupon::fixed("FIVE", Money::new(500, Currency::USD))],
        )
        .await;
    market
}

fn line(id: &str, quantity: i64) -> LineRequest {
    LineRequest {
        product_id: ProductId::new(id),
        quantity,
        variant: None,
    }
}

fn color(name: &str) -> Option<VariantSelector> {
    Some(VariantSelector {
        color: Some(name.into()),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_sync_is_idempotent() {
    let market = market().await;
    let customer = UserId::new("c1");
    let items = vec![line("mug", 2), line("tee", 1), line("mug", 1)];

    let first = market.carts().sync(&customer, items.clone()).await.unwrap();
    let second = market.carts().sync(&customer, items).await.unwrap();

    assert_eq!(first.items(), second.items());
    assert_eq!(first.totals(), second.totals());
    assert_eq!(second.items().len(), 2);
    assert_eq!(second.item_count(), 4);

    let empty = market.carts().sync(&customer, Vec::new()).await.unwrap();
    let again = market.carts().sync(&customer, Vec::new()).await.unwrap();
    assert!(empty.is_empty());
    assert!(again.is_empty());
    // flat shipping still applies under the threshold
    assert_eq!(again.totals().shipping.amount_cents, 999);
    assert_eq!(again.totals().total.amount_cents, 999);
}

#[tokio::test]
async fn test_sync_drops_invalid_lines() {
    let market = market().await;
    let customer = UserId::new("c1");

    let cart = market
        .carts()
        .sync(
            &customer,
            vec![line("mug", 1), line("ghost", 1), line("tee", 0), line("cap", 500)],
        )
        .await
        .unwrap();

    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].product_id, ProductId::new("mug"));
}

#[tokio::test]
async fn test_totals_follow_every_mutation() {
    let market = market().await;
    let customer = UserId::new("c1");
    let carts = market.carts();

    let cart = carts
        .add_item(&customer, &ProductId::new("mug"), 2, None)
        .await
        .unwrap();
    // 2400 + 204 tax + 999 shipping
    assert_eq!(cart.totals().total.amount_cents, 3603);

    let cart = carts.apply_coupon(&customer, "five").await.unwrap();
    assert_eq!(cart.totals().discount.amount_cents, 500);
    assert_eq!(cart.totals().total.amount_cents, 3103);

    let item_id = cart.items()[0].id.clone();
    let cart = carts.update_quantity(&customer, &item_id, 5).await.unwrap();
    // 6000 + 510 tax, free shipping, 500 off
    assert_eq!(cart.totals().total.amount_cents, 6010);

    let cart = carts.remove_coupon(&customer, "FIVE").await.unwrap();
    assert_eq!(cart.totals().total.amount_cents, 6510);

    let cart = carts.remove_item(&customer, &item_id).await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.totals().subtotal.amount_cents, 0);
    assert_eq!(cart.totals().total.amount_cents, 999);
}

#[tokio::test]
async fn test_new_cart_totals_match_pricing_formula() {
    let market = market().await;
    let cart = market.carts().get_or_create(&UserId::new("c1")).await.unwrap();

    assert!(cart.is_empty());
    assert_eq!(cart.totals().tax.amount_cents, 0);
    assert_eq!(cart.totals().shipping.amount_cents, 999);
    assert_eq!(cart.totals().total.amount_cents, 999);
}

#[tokio::test]
async fn test_sync_drops_lines_over_quantity_limit() {
    let market = market().await;
    let customer = UserId::new("c1");

    let cart = market
        .carts()
        .sync(&customer, vec![line("mug", 1), line("bolt", 10_000)])
        .await
        .unwrap();

    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].product_id, ProductId::new("mug"));

    // two entries that only exceed the limit once merged
    let cart = market
        .carts()
        .sync(&customer, vec![line("bolt", 6_000), line("bolt", 6_000), line("pen", 2)])
        .await
        .unwrap();
    assert_eq!(cart.items().len(), 1);
    assert_eq!(cart.items()[0].product_id, ProductId::new("pen"));
}

#[tokio::test]
async fn test_variants_draw_on_one_stock_counter() {
    let market = market().await;
    let customer = UserId::new("c1");
    let tank = ProductId::new("tank");

    market
        .carts()
        .add_item(&customer, &tank, 2, color("red"))
        .await
        .unwrap();
    let err = market
        .carts()
        .add_item(&customer, &tank, 2, color("blue"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);

    let cart = market
        .carts()
        .add_item(&customer, &tank, 1, color("blue"))
        .await
        .unwrap();
    assert_eq!(cart.item_count(), 3);
}

#[tokio::test]
async fn test_sync_keeps_variants_within_stock() {
    let market = market().await;
    let customer = UserId::new("c1");
    let tank = |quantity, name| LineRequest {
        product_id: ProductId::new("tank"),
        quantity,
        variant: color(name),
    };

    let cart = market
        .carts()
        .sync(&customer, vec![tank(2, "red"), tank(2, "blue"), tank(1, "green"), line("mug", 1)])
        .await
        .unwrap();

    // red fits, blue would make four, green makes three
    assert_eq!(cart.items().len(), 3);
    let tanks: i64 = cart
        .items()
        .iter()
        .filter(|i| i.product_id == ProductId::new("tank"))
        .map(|i| i.quantity)
        .sum();
    assert_eq!(tanks, 3);
    assert!(cart.find_line(&ProductId::new("tank"), color("blue").as_ref()).is_none());
}

#[tokio::test]
async fn test_add_item_checks_availability() {
    let market = market().await;
    let customer = UserId::new("c1");

    market
        .carts()
        .add_item(&customer, &ProductId::new("pen"), 40, None)
        .await
        .unwrap();
    let err = market
        .carts()
        .add_item(&customer, &ProductId::new("pen"), 11, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientStock);

    // adding to a cart never reserves
    assert_eq!(
        market
            .catalog()
            .ledger()
            .available(&ProductId::new("pen"))
            .await
            .unwrap(),
        50
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_both_land() {
    let market = market().await;
    let customer = UserId::new("c1");

    let mut handles = Vec::new();
    for id in ["mug", "tee", "cap", "pen"] {
        let market = market.clone();
        let customer = customer.clone();
        handles.push(tokio::spawn(async move {
            market
                .carts()
                .add_item(&customer, &ProductId::new(id), 1, None)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let cart = market.carts().get_or_create(&customer).await.unwrap();
    assert_eq!(cart.items().len(), 4);
    assert_eq!(cart.totals().subtotal.amount_cents, 1200 + 2500 + 900 + 150);
}

#[tokio::test]
async fn test_sweep_marks_idle_carts_abandoned() {
    let market = market().await;
    let idle = UserId::new("idle");
    let empty = UserId::new("empty");

    market
        .carts()
        .add_item(&idle, &ProductId::new("mug"), 1, None)
        .await
        .unwrap();
    market.carts().get_or_create(&empty).await.unwrap();

    let swept = market
        .carts()
        .sweep_abandoned(Utc::now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(swept, 1);

    let cart = market.carts().get_or_create(&idle).await.unwrap();
    assert_eq!(cart.status, CartStatus::Abandoned);
    assert_eq!(cart.items().len(), 1);

    // activity revives the cart
    let cart = market
        .carts()
        .add_item(&idle, &ProductId::new("tee"), 1, None)
        .await
        .unwrap();
    assert_eq!(cart.status, CartStatus::Active);
}
