//! Order service.
//!
//! Checkout persists the order first and reserves stock second. The
//! reservations that actually succeed are written back onto the order, so a
//! later cancellation returns exactly those units. Every change to an order
//! after creation is a compare-and-swap on the order document, retried on
//! version conflicts.

use std::sync::Arc;

use chrono::Utc;
use mercato_store::{Collection, MemoryStore, StoreError};
use serde::{Deserialize, Serialize};

use crate::cart::{AppliedCoupon, CartService, CouponDirectory, PricingPolicy};
use crate::catalog::{Catalog, StockLedger};
use crate::checkout::{
    builder, seller_view, CheckoutRequest, Order, OrderBuilder, OrderLine, OrderStatus,
    Reservation, SellerOrderView, ShippingInfo, StatusEntry, TrackingUpdate, Transition,
};
use crate::error::CommerceError;
use crate::identity::{Actor, Role};
use crate::ids::{OrderNumber, UserId};
use crate::notify::{dispatch, Notification, Notifier, OrderEvent};
use crate::retry::{ConflictError, RetryCoordinator};

/// Store namespace for orders.
pub const ORDER_NAMESPACE: &str = "order";

/// Attempts at finding an unused order number.
const ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// Listing filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    /// 1-based page.
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl OrderQuery {
    const DEFAULT_LIMIT: usize = 20;
    const MAX_LIMIT: usize = 100;

    fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        let page = self.page.unwrap_or(1).max(1);
        items
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect()
    }
}

/// Customer-facing tracking summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingView {
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub shipping: ShippingInfo,
    pub history: Vec<StatusEntry>,
}

/// Order placement and lifecycle.
#[derive(Clone)]
pub struct OrderService {
    orders: Collection<Order>,
    carts: CartService,
    builder: OrderBuilder,
    ledger: Arc<dyn StockLedger>,
    coupons: Arc<dyn CouponDirectory>,
    notifier: Arc<dyn Notifier>,
    retry: RetryCoordinator,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("orders", &self.orders)
            .field("carts", &self.carts)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl OrderService {
    /// Create an order service. Carts are read and cleared through `carts`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<MemoryStore>,
        carts: CartService,
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn StockLedger>,
        coupons: Arc<dyn CouponDirectory>,
        notifier: Arc<dyn Notifier>,
        policy: PricingPolicy,
        retry: RetryCoordinator,
    ) -> Self {
        Self {
            orders: Collection::new(store, ORDER_NAMESPACE),
            carts,
            builder: OrderBuilder::new(catalog, Arc::clone(&ledger), policy),
            ledger,
            coupons,
            notifier,
            retry,
        }
    }

    /// Place an order from the cart, or from `request.items` when given.
    pub async fn checkout(
        &self,
        customer: &Actor,
        request: CheckoutRequest,
    ) -> Result<Order, CommerceError> {
        // `cart_version` pins the cart snapshot the order is built from
        let (lines, mut coupons, cart_version) = if request.items.is_empty() {
            let cart = self.carts.get_or_create(&customer.id).await?;
            let lines: Vec<OrderLine> = cart.items().iter().map(OrderLine::from).collect();
            (lines, cart.coupons().to_vec(), Some(cart.version))
        } else {
            let lines: Vec<OrderLine> = request.items.iter().map(OrderLine::from).collect();
            (lines, Vec::new(), None)
        };
        self.resolve_coupons(&request.coupon_codes, &mut coupons).await?;

        let now = Utc::now();
        let mut order = self
            .builder
            .build(customer, &lines, coupons, &request, now)
            .await?;

        self.insert_unique(&mut order).await?;
        self.reserve_stock(&mut order).await;

        match self.carts.mark_converted(&customer.id, cart_version).await {
            Ok(_) => {}
            Err(e) if e.is_conflict() => {
                tracing::debug!(customer_id = %customer.id, "Cart changed during checkout, left as is");
            }
            Err(e) => {
                tracing::warn!(customer_id = %customer.id, error = %e, "Failed to clear cart after checkout");
            }
        }

        tracing::info!(
            order_number = %order.order_number,
            customer_id = %order.customer_id,
            items = order.items.len(),
            total_cents = order.pricing.total.amount_cents,
            "Order placed"
        );

        self.notify_placed(&order).await;
        Ok(order)
    }

    async fn resolve_coupons(
        &self,
        codes: &[String],
        coupons: &mut Vec<AppliedCoupon>,
    ) -> Result<(), CommerceError> {
        let now = Utc::now();
        for code in codes {
            let code = crate::cart::normalize_code(code);
            if code.is_empty() || coupons.iter().any(|c| c.code == code) {
                continue;
            }
            let coupon = self
                .coupons
                .find(&code)
                .await?
                .ok_or_else(|| CommerceError::InvalidCoupon {
                    code: code.clone(),
                    reason: "unknown coupon".into(),
                })?;
            if !coupon.active || coupon.is_expired(now) {
                return Err(CommerceError::InvalidCoupon {
                    code,
                    reason: "coupon is not active".into(),
                });
            }
            coupons.push(AppliedCoupon::from_coupon(&coupon));
        }
        Ok(())
    }

    /// Insert under a fresh order number, regenerating on collisions.
    async fn insert_unique(&self, order: &mut Order) -> Result<(), CommerceError> {
        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            match self.orders.insert(order.order_number.as_str(), order).await {
                Ok(version) => {
                    order.version = version;
                    return Ok(());
                }
                Err(StoreError::AlreadyExists(_)) => {
                    tracing::debug!(order_number = %order.order_number, attempt, "Order number taken");
                    order.order_number = builder::generate_order_number(Utc::now());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CommerceError::Storage(format!(
            "no free order number after {ORDER_NUMBER_ATTEMPTS} attempts"
        )))
    }

    /// Reserve the order's stock and record what was taken.
    ///
    /// If the record cannot be written, the units just taken go back to the
    /// ledger: an order that holds no recorded reservation must not hold
    /// stock either.
    async fn reserve_stock(&self, order: &mut Order) {
        let mut reserved = Vec::new();
        let mut shortfall = Vec::new();

        for demand in builder::demand_by_product(&lines_of(order)) {
            match self.ledger.reserve(&demand.product_id, demand.quantity).await {
                Ok(()) => reserved.push(demand),
                Err(e) => {
                    tracing::warn!(
                        order_number = %order.order_number,
                        product_id = %demand.product_id,
                        quantity = demand.quantity,
                        error = %e,
                        "Stock reservation failed after validation"
                    );
                    shortfall.push(demand);
                }
            }
        }

        let taken = reserved.clone();
        let number = order.order_number.clone();
        let number = &number;
        let recorded = self
            .retry
            .run("record_reservations", move || {
                let reserved = reserved.clone();
                let shortfall = shortfall.clone();
                async move {
                    let mut current = self.load(number).await?;
                    let mut release = Vec::new();
                    if current.stock_released_at.is_some() {
                        // cancelled before the reservations were recorded
                        release = reserved;
                    } else {
                        current.reservations = reserved;
                    }
                    current.stock_shortfall = shortfall;
                    current.version = self
                        .orders
                        .compare_and_swap(number.as_str(), current.version, &current)
                        .await?;
                    Ok::<_, CommerceError>((current, release))
                }
            })
            .await;

        match recorded {
            Ok((updated, release)) => {
                self.release(&updated.order_number, &release).await;
                *order = updated;
            }
            Err(e) => {
                tracing::error!(
                    order_number = %order.order_number,
                    lines = taken.len(),
                    error = %e,
                    "Failed to record reservations, returning stock"
                );
                self.release(&order.order_number, &taken).await;
            }
        }
    }

    async fn release(&self, order_number: &OrderNumber, reservations: &[Reservation]) {
        for r in reservations {
            if let Err(e) = self.ledger.release(&r.product_id, r.quantity).await {
                tracing::error!(
                    order_number = %order_number,
                    product_id = %r.product_id,
                    quantity = r.quantity,
                    error = %e,
                    "Stock release failed"
                );
            }
        }
        if !reservations.is_empty() {
            tracing::info!(order_number = %order_number, lines = reservations.len(), "Stock released");
        }
    }

    async fn load(&self, order_number: &OrderNumber) -> Result<Order, CommerceError> {
        let stored = self
            .orders
            .get(order_number.as_str())
            .await?
            .ok_or_else(|| CommerceError::OrderNotFound(order_number.to_string()))?;
        let mut order = stored.value;
        order.version = stored.version;
        Ok(order)
    }

    /// Read-modify-write an order, then return released stock to the ledger.
    async fn modify<F>(
        &self,
        operation: &str,
        order_number: &OrderNumber,
        change: F,
    ) -> Result<Transition, CommerceError>
    where
        F: Fn(&Order) -> Result<Transition, CommerceError>,
    {
        let change = &change;
        let mut transition = self
            .retry
            .run(operation, move || async move {
                let current = self.load(order_number).await?;
                let mut transition = change(&current)?;
                transition.order.version = self
                    .orders
                    .compare_and_swap(order_number.as_str(), current.version, &transition.order)
                    .await?;
                Ok::<_, CommerceError>(transition)
            })
            .await?;

        let release = std::mem::take(&mut transition.release);
        self.release(order_number, &release).await;

        if transition.status_changed() {
            tracing::info!(
                order_number = %order_number,
                from = %transition.from,
                to = %transition.order.status,
                "Order status changed"
            );
        }
        Ok(transition)
    }

    /// Get an order the actor may see.
    pub async fn get(&self, actor: &Actor, order_number: &OrderNumber) -> Result<Order, CommerceError> {
        let order = self.load(order_number).await?;
        let visible = match actor.role {
            Role::Admin => true,
            Role::Seller => order.has_seller(&actor.id),
            Role::Customer => order.customer_id == actor.id,
        };
        if !visible {
            // don't reveal that the number exists
            return Err(CommerceError::OrderNotFound(order_number.to_string()));
        }
        Ok(order)
    }

    /// Customers see their own orders, admins see every order. Newest first.
    pub async fn list(&self, actor: &Actor, query: &OrderQuery) -> Result<Vec<Order>, CommerceError> {
        if actor.is_seller() {
            return Err(CommerceError::Forbidden(
                "sellers list orders through the seller view".into(),
            ));
        }
        let mut orders: Vec<Order> = self
            .orders
            .all()
            .await?
            .into_iter()
            .map(|stored| {
                let mut order = stored.value;
                order.version = stored.version;
                order
            })
            .filter(|o| actor.is_admin() || o.customer_id == actor.id)
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(query.paginate(orders))
    }

    /// Cancel an order. Returns reserved stock once.
    pub async fn cancel(
        &self,
        actor: &Actor,
        order_number: &OrderNumber,
        reason: Option<String>,
    ) -> Result<Order, CommerceError> {
        self.update_status(actor, order_number, OrderStatus::Cancelled, reason)
            .await
    }

    /// Move an order to a new status.
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_number: &OrderNumber,
        status: OrderStatus,
        note: Option<String>,
    ) -> Result<Order, CommerceError> {
        let transition = self
            .modify("update_status", order_number, |order| {
                order.transition(status, note.clone(), actor, Utc::now())
            })
            .await?;
        self.notify_status(&transition).await;
        Ok(transition.order)
    }

    /// Attach carrier details; ships a processing order.
    pub async fn attach_tracking(
        &self,
        actor: &Actor,
        order_number: &OrderNumber,
        update: TrackingUpdate,
    ) -> Result<Order, CommerceError> {
        let transition = self
            .modify("attach_tracking", order_number, |order| {
                order.attach_tracking(update.clone(), actor, Utc::now())
            })
            .await?;

        dispatch(
            self.notifier.as_ref(),
            Notification {
                event: OrderEvent::TrackingAttached,
                recipient: transition.order.customer_id.clone(),
                order_number: transition.order.order_number.clone(),
                payload: serde_json::json!({
                    "carrier": transition.order.shipping.carrier,
                    "tracking_number": transition.order.shipping.tracking_number,
                    "estimated_delivery": transition.order.shipping.estimated_delivery,
                }),
            },
        )
        .await;
        self.notify_status(&transition).await;
        Ok(transition.order)
    }

    /// Shipping progress of an order the actor may see.
    pub async fn track(&self, actor: &Actor, order_number: &OrderNumber) -> Result<TrackingView, CommerceError> {
        let order = self.get(actor, order_number).await?;
        Ok(TrackingView {
            order_number: order.order_number,
            status: order.status,
            shipping: order.shipping,
            history: order.history,
        })
    }

    /// The seller's slice of every order containing their items. Newest first.
    pub async fn seller_orders(
        &self,
        seller: &Actor,
        query: &OrderQuery,
    ) -> Result<Vec<SellerOrderView>, CommerceError> {
        let seller_id = require_seller(seller)?;
        let mut views = Vec::new();
        for stored in self.orders.all().await? {
            if query.status.map_or(false, |s| stored.value.status != s) {
                continue;
            }
            if let Some(view) = seller_view(&stored.value, seller_id)? {
                views.push(view);
            }
        }
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(query.paginate(views))
    }

    /// The seller's slice of one order.
    pub async fn seller_order(
        &self,
        seller: &Actor,
        order_number: &OrderNumber,
    ) -> Result<SellerOrderView, CommerceError> {
        let seller_id = require_seller(seller)?;
        let order = self.load(order_number).await?;
        seller_view(&order, seller_id)?
            .ok_or_else(|| CommerceError::OrderNotFound(order_number.to_string()))
    }

    async fn notify_placed(&self, order: &Order) {
        let total = order.pricing.total.display();
        dispatch(
            self.notifier.as_ref(),
            Notification {
                event: OrderEvent::OrderPlaced,
                recipient: order.customer_id.clone(),
                order_number: order.order_number.clone(),
                payload: serde_json::json!({
                    "total": total,
                    "items": order.item_count(),
                    "email": order.customer.email,
                }),
            },
        )
        .await;

        for seller_id in order.seller_ids() {
            let view = match seller_view(order, &seller_id) {
                Ok(Some(view)) => view,
                _ => continue,
            };
            dispatch(
                self.notifier.as_ref(),
                Notification {
                    event: OrderEvent::SellerOrderReceived,
                    recipient: seller_id,
                    order_number: order.order_number.clone(),
                    payload: serde_json::json!({
                        "items": view.item_count,
                        "subtotal": view.subtotal.display(),
                    }),
                },
            )
            .await;
        }
    }

    async fn notify_status(&self, transition: &Transition) {
        if !transition.status_changed() {
            return;
        }
        let order = &transition.order;
        dispatch(
            self.notifier.as_ref(),
            Notification {
                event: OrderEvent::StatusChanged {
                    from: transition.from,
                    to: order.status,
                },
                recipient: order.customer_id.clone(),
                order_number: order.order_number.clone(),
                payload: serde_json::json!({
                    "note": order.last_entry().and_then(|e| e.note.clone()),
                }),
            },
        )
        .await;
    }
}

fn lines_of(order: &Order) -> Vec<OrderLine> {
    order
        .items
        .iter()
        .map(|i| OrderLine {
            product_id: i.product_id.clone(),
            quantity: i.quantity,
            variant: i.variant.clone(),
            unit_price: Some(i.unit_price),
        })
        .collect()
}

fn require_seller(actor: &Actor) -> Result<&UserId, CommerceError> {
    match actor.role {
        Role::Seller | Role::Admin => Ok(&actor.id),
        Role::Customer => Err(CommerceError::Forbidden("seller access required".into())),
    }
}
