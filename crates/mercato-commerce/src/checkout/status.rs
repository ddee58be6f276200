//! Order status state machine.
//!
//! ```text
//! pending -> confirmed -> processing -> shipped -> delivered
//!     \__________\____________\____________\_____> cancelled | refunded
//! ```
//!
//! Sellers and admins may skip forward along the chain. Nothing moves
//! backward and terminal orders never move. Transitions are pure: they
//! return the updated order plus the stock the caller must hand back to
//! the ledger once the update is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkout::{Order, OrderStatus, PaymentMethod, PaymentStatus, Reservation, StatusEntry};
use crate::error::CommerceError;
use crate::identity::{Actor, Role};

/// Result of applying a change to an order.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The updated order.
    pub order: Order,
    /// Status before the change.
    pub from: OrderStatus,
    /// Reservations to return to the ledger.
    pub release: Vec<Reservation>,
}

impl Transition {
    /// Check if the status changed.
    pub fn status_changed(&self) -> bool {
        self.from != self.order.status
    }
}

/// Carrier details attached by a seller or admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingUpdate {
    pub carrier: String,
    pub tracking_number: String,
    #[serde(default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

fn illegal(from: OrderStatus, to: OrderStatus, reason: &str) -> CommerceError {
    CommerceError::IllegalTransition {
        from: from.to_string(),
        to: to.to_string(),
        reason: reason.to_string(),
    }
}

fn forbidden(message: &str) -> CommerceError {
    CommerceError::Forbidden(message.to_string())
}

/// Check that `actor` may move `order` to `to`.
pub fn check_transition(order: &Order, to: OrderStatus, actor: &Actor) -> Result<(), CommerceError> {
    let from = order.status;

    match actor.role {
        Role::Customer => {
            if order.customer_id != actor.id {
                return Err(forbidden("not your order"));
            }
            if to != OrderStatus::Cancelled {
                return Err(forbidden("customers may only cancel orders"));
            }
            if !from.is_terminal() && !from.customer_can_cancel() {
                return Err(illegal(from, to, "order can no longer be cancelled"));
            }
        }
        Role::Seller => {
            if !order.has_seller(&actor.id) {
                return Err(forbidden("order has none of your items"));
            }
        }
        Role::Admin => {}
    }

    if from.is_terminal() {
        return Err(illegal(from, to, "order is already final"));
    }
    if from == to {
        return Err(illegal(from, to, "order already has this status"));
    }
    if let (Some(current), Some(next)) = (from.rank(), to.rank()) {
        if next < current {
            return Err(illegal(from, to, "status cannot move backward"));
        }
    }
    Ok(())
}

impl Order {
    /// Move the order to `to`, applying the transition's side effects.
    pub fn transition(
        &self,
        to: OrderStatus,
        note: Option<String>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Transition, CommerceError> {
        check_transition(self, to, actor)?;

        let from = self.status;
        let mut order = self.clone();
        let mut release = Vec::new();

        match to {
            OrderStatus::Confirmed => {
                if order.payment.status == PaymentStatus::Pending {
                    order.payment.status = PaymentStatus::Completed;
                    order.payment.paid_at = Some(now);
                }
            }
            OrderStatus::Shipped => {
                order.shipping.shipped_at.get_or_insert(now);
            }
            OrderStatus::Delivered => {
                order.shipping.shipped_at.get_or_insert(now);
                order.shipping.delivered_at = Some(now);
                if order.payment.method == PaymentMethod::CashOnDelivery
                    && order.payment.status == PaymentStatus::Pending
                {
                    order.payment.status = PaymentStatus::Completed;
                    order.payment.paid_at = Some(now);
                }
            }
            OrderStatus::Cancelled => {
                if order.stock_released_at.is_none() {
                    release = order.reservations.clone();
                    order.stock_released_at = Some(now);
                }
                order.cancellation_reason = note.clone();
            }
            OrderStatus::Refunded => {
                if order.payment.status == PaymentStatus::Completed {
                    order.payment.status = PaymentStatus::Refunded;
                }
            }
            OrderStatus::Pending | OrderStatus::Processing => {}
        }

        order.status = to;
        order.history.push(StatusEntry {
            status: to,
            at: now,
            note,
            actor: Some(actor.id.clone()),
        });
        order.updated_at = now;

        Ok(Transition {
            order,
            from,
            release,
        })
    }

    /// Record carrier details. A `processing` order moves to `shipped`.
    pub fn attach_tracking(
        &self,
        update: TrackingUpdate,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Transition, CommerceError> {
        match actor.role {
            Role::Customer => return Err(forbidden("only sellers and admins attach tracking")),
            Role::Seller if !self.has_seller(&actor.id) => {
                return Err(forbidden("order has none of your items"))
            }
            _ => {}
        }
        if update.carrier.trim().is_empty() || update.tracking_number.trim().is_empty() {
            return Err(CommerceError::validation("carrier and tracking number are required"));
        }
        if matches!(self.status, OrderStatus::Cancelled | OrderStatus::Refunded) {
            return Err(illegal(self.status, OrderStatus::Shipped, "order is closed"));
        }

        let mut base = self.clone();
        base.shipping.carrier = Some(update.carrier.trim().to_string());
        base.shipping.tracking_number = Some(update.tracking_number.trim().to_string());
        base.shipping.estimated_delivery = update.estimated_delivery;
        base.updated_at = now;

        if base.status == OrderStatus::Processing {
            let note = format!(
                "Shipped via {} ({})",
                update.carrier.trim(),
                update.tracking_number.trim()
            );
            return base.transition(OrderStatus::Shipped, Some(note), actor, now);
        }

        Ok(Transition {
            from: base.status,
            order: base,
            release: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::PricingBreakdown;
    use crate::checkout::{Address, CustomerSnapshot, OrderItem, Payment, ShippingInfo};
    use crate::ids::{OrderNumber, ProductId, UserId};
    use crate::money::{Currency, Money};

    fn order(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            order_number: OrderNumber::new("ORD1234560ABC"),
            customer_id: UserId::new("c1"),
            customer: CustomerSnapshot::default(),
            items: vec![OrderItem {
                product_id: ProductId::new("p1"),
                seller_id: UserId::new("s1"),
                name: "Widget".into(),
                sku: "W-1".into(),
                image: None,
                quantity: 2,
                unit_price: Money::new(3000, Currency::USD),
                variant: None,
            }],
            pricing: PricingBreakdown::zero(Currency::USD),
            shipping_address: Address::default(),
            billing_address: Address::default(),
            payment: Payment {
                method: PaymentMethod::Card,
                status: PaymentStatus::Pending,
                transaction_id: None,
                paid_at: None,
            },
            shipping: ShippingInfo::default(),
            status,
            history: vec![StatusEntry {
                status: OrderStatus::Pending,
                at: now,
                note: None,
                actor: Some(UserId::new("c1")),
            }],
            coupons: Vec::new(),
            notes: None,
            reservations: vec![Reservation {
                product_id: ProductId::new("p1"),
                quantity: 2,
            }],
            stock_shortfall: Vec::new(),
            stock_released_at: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    fn assert_illegal(result: Result<Transition, CommerceError>) {
        assert!(matches!(result, Err(CommerceError::IllegalTransition { .. })), "{result:?}");
    }

    fn assert_forbidden(result: Result<Transition, CommerceError>) {
        assert!(matches!(result, Err(CommerceError::Forbidden(_))), "{result:?}");
    }

    #[test]
    fn test_forward_chain() {
        let admin = Actor::admin("a1");
        let mut current = order(OrderStatus::Pending);
        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            current = current.transition(next, None, &admin, Utc::now()).unwrap().order;
        }
        assert_eq!(current.status, OrderStatus::Delivered);
        assert_eq!(current.history.len(), 5);
        assert!(current.shipping.shipped_at.is_some());
        assert!(current.shipping.delivered_at.is_some());
    }

    #[test]
    fn test_seller_may_skip_forward() {
        let t = order(OrderStatus::Pending)
            .transition(OrderStatus::Shipped, None, &Actor::seller("s1"), Utc::now())
            .unwrap();
        assert_eq!(t.order.status, OrderStatus::Shipped);
        assert!(t.order.shipping.shipped_at.is_some());
    }

    #[test]
    fn test_backward_and_self_transitions_rejected() {
        let admin = Actor::admin("a1");
        assert_illegal(order(OrderStatus::Shipped).transition(OrderStatus::Confirmed, None, &admin, Utc::now()));
        assert_illegal(order(OrderStatus::Shipped).transition(OrderStatus::Shipped, None, &admin, Utc::now()));
        assert_illegal(order(OrderStatus::Confirmed).transition(OrderStatus::Pending, None, &admin, Utc::now()));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let admin = Actor::admin("a1");
        for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled, OrderStatus::Refunded] {
            for target in OrderStatus::ALL {
                assert_illegal(order(terminal).transition(target, None, &admin, Utc::now()));
            }
        }
    }

    #[test]
    fn test_customer_cancel_rules() {
        let owner = Actor::customer("c1");
        let t = order(OrderStatus::Confirmed)
            .transition(OrderStatus::Cancelled, Some("changed my mind".into()), &owner, Utc::now())
            .unwrap();
        assert_eq!(t.order.status, OrderStatus::Cancelled);
        assert_eq!(t.order.cancellation_reason.as_deref(), Some("changed my mind"));

        assert_forbidden(order(OrderStatus::Pending).transition(
            OrderStatus::Cancelled,
            None,
            &Actor::customer("someone-else"),
            Utc::now(),
        ));
        assert_forbidden(order(OrderStatus::Pending).transition(OrderStatus::Confirmed, None, &owner, Utc::now()));
        assert_illegal(order(OrderStatus::Processing).transition(OrderStatus::Cancelled, None, &owner, Utc::now()));
    }

    #[test]
    fn test_unrelated_seller_forbidden() {
        assert_forbidden(order(OrderStatus::Pending).transition(
            OrderStatus::Confirmed,
            None,
            &Actor::seller("s2"),
            Utc::now(),
        ));
    }

    #[test]
    fn test_cancel_releases_reservations_once() {
        let admin = Actor::admin("a1");
        let t = order(OrderStatus::Pending)
            .transition(OrderStatus::Cancelled, None, &admin, Utc::now())
            .unwrap();
        assert_eq!(t.release.len(), 1);
        assert_eq!(t.release[0].quantity, 2);
        assert!(t.order.stock_released_at.is_some());
        assert_eq!(t.order.history.len(), 2);

        // reservations already returned are not returned again
        let mut released = order(OrderStatus::Confirmed);
        released.stock_released_at = Some(Utc::now());
        let t = released
            .transition(OrderStatus::Cancelled, None, &admin, Utc::now())
            .unwrap();
        assert!(t.release.is_empty());
    }

    #[test]
    fn test_confirm_completes_pending_payment() {
        let t = order(OrderStatus::Pending)
            .transition(OrderStatus::Confirmed, None, &Actor::admin("a1"), Utc::now())
            .unwrap();
        assert_eq!(t.order.payment.status, PaymentStatus::Completed);
        assert!(t.order.payment.paid_at.is_some());
    }

    #[test]
    fn test_refund_marks_payment_refunded_without_release() {
        let mut paid = order(OrderStatus::Shipped);
        paid.payment.status = PaymentStatus::Completed;
        let t = paid
            .transition(OrderStatus::Refunded, None, &Actor::admin("a1"), Utc::now())
            .unwrap();
        assert_eq!(t.order.payment.status, PaymentStatus::Refunded);
        assert!(t.release.is_empty());
    }

    #[test]
    fn test_tracking_ships_processing_order() {
        let update = TrackingUpdate {
            carrier: "UPS".into(),
            tracking_number: "1Z999".into(),
            estimated_delivery: None,
        };
        let t = order(OrderStatus::Processing)
            .attach_tracking(update.clone(), &Actor::seller("s1"), Utc::now())
            .unwrap();
        assert_eq!(t.from, OrderStatus::Processing);
        assert_eq!(t.order.status, OrderStatus::Shipped);
        assert_eq!(t.order.shipping.tracking_number.as_deref(), Some("1Z999"));

        let t = order(OrderStatus::Confirmed)
            .attach_tracking(update.clone(), &Actor::admin("a1"), Utc::now())
            .unwrap();
        assert!(!t.status_changed());
        assert_eq!(t.order.shipping.carrier.as_deref(), Some("UPS"));

        assert_illegal(order(OrderStatus::Cancelled).attach_tracking(update.clone(), &Actor::admin("a1"), Utc::now()));
        assert_forbidden(order(OrderStatus::Processing).attach_tracking(update, &Actor::customer("c1"), Utc::now()));
    }
}
