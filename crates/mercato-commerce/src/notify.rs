//! Order notifications.
//!
//! Delivery is fire-and-forget: [`dispatch`] logs failures and never
//! returns them to the operation that triggered the notification.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checkout::OrderStatus;
use crate::ids::{OrderNumber, UserId};

/// Something that happened to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    /// Order placed, sent to the customer.
    OrderPlaced,
    /// Order contains the recipient's items, sent to each seller.
    SellerOrderReceived,
    /// Status changed, sent to the customer.
    StatusChanged { from: OrderStatus, to: OrderStatus },
    /// Tracking details attached, sent to the customer.
    TrackingAttached,
}

impl OrderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced => "order_placed",
            OrderEvent::SellerOrderReceived => "seller_order_received",
            OrderEvent::StatusChanged { .. } => "status_changed",
            OrderEvent::TrackingAttached => "tracking_attached",
        }
    }
}

/// A notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub event: OrderEvent,
    pub recipient: UserId,
    pub order_number: OrderNumber,
    /// Free-form details for templates.
    pub payload: serde_json::Value,
}

/// Delivery failure.
#[derive(Error, Debug)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Delivery channel for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Deliver a notification, logging instead of propagating failures.
pub async fn dispatch(notifier: &dyn Notifier, notification: Notification) {
    if let Err(e) = notifier.notify(&notification).await {
        tracing::warn!(
            event = notification.event.name(),
            recipient = %notification.recipient,
            order_number = %notification.order_number,
            error = %e,
            "Notification failed"
        );
    }
}

/// Notifier that writes each notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            event = notification.event.name(),
            recipient = %notification.recipient,
            order_number = %notification.order_number,
            "Notification sent"
        );
        Ok(())
    }
}

/// Notifier that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|e| NotifyError(e.to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _: &Notification) -> Result<(), NotifyError> {
            Err(NotifyError("smtp down".into()))
        }
    }

    fn placed() -> Notification {
        Notification {
            event: OrderEvent::OrderPlaced,
            recipient: UserId::new("c1"),
            order_number: OrderNumber::new("ORD1234560ABC"),
            payload: serde_json::json!({ "total": "$65.10" }),
        }
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        dispatch(&FailingNotifier, placed()).await;
    }

    #[tokio::test]
    async fn test_memory_notifier_records() {
        let notifier = MemoryNotifier::new();
        dispatch(&notifier, placed()).await;
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event.name(), "order_placed");
    }

    #[test]
    fn test_event_serialization() {
        let event = OrderEvent::StatusChanged {
            from: OrderStatus::Pending,
            to: OrderStatus::Confirmed,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "status_changed");
        assert_eq!(json["to"], "confirmed");
    }
}
