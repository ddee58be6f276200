//! Commerce error types.

use mercato_store::StoreError;
use thiserror::Error;

use crate::retry::ConflictError;

/// Errors that can occur in cart and order operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Product not found or not purchasable.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    CartItemNotFound(String),

    /// Coupon not applied to the cart.
    #[error("Coupon not applied: {0}")]
    CouponNotApplied(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Insufficient stock.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Coupon code rejected.
    #[error("Invalid coupon {code}: {reason}")]
    InvalidCoupon { code: String, reason: String },

    /// Coupon code already applied.
    #[error("Coupon already applied: {0}")]
    DuplicateCoupon(String),

    /// Malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Status change not permitted from the current state.
    #[error("Illegal transition from {from} to {to}: {reason}")]
    IllegalTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Actor may not perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Optimistic-concurrency conflict. Retried, never surfaced by services.
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// Retry budget for a conflicting write ran out.
    #[error("Concurrent update conflict persisted after {attempts} attempts, please try again")]
    ConcurrencyExhausted { attempts: u32 },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification of [`CommerceError`] used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, rejected before touching stock.
    Validation,
    /// Quantity exceeds availability.
    InsufficientStock,
    /// Retry budget exceeded; the caller should re-issue the operation.
    ConcurrencyExhausted,
    /// State machine violation.
    IllegalTransition,
    /// Actor lacks access.
    Forbidden,
    /// Cart, order, item or product absent.
    NotFound,
    /// Anything unexpected.
    Internal,
}

impl CommerceError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::ProductNotFound(_)
            | CommerceError::CartItemNotFound(_)
            | CommerceError::CouponNotApplied(_)
            | CommerceError::OrderNotFound(_) => ErrorKind::NotFound,
            CommerceError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CommerceError::InvalidQuantity(_)
            | CommerceError::InvalidCoupon { .. }
            | CommerceError::DuplicateCoupon(_)
            | CommerceError::Validation(_) => ErrorKind::Validation,
            CommerceError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            CommerceError::Forbidden(_) => ErrorKind::Forbidden,
            CommerceError::ConcurrencyExhausted { .. } => ErrorKind::ConcurrencyExhausted,
            CommerceError::VersionConflict(_)
            | CommerceError::Overflow
            | CommerceError::CurrencyMismatch { .. }
            | CommerceError::Storage(_)
            | CommerceError::Serialization(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CommerceError::Validation(message.into())
    }
}

impl ConflictError for CommerceError {
    fn is_conflict(&self) -> bool {
        matches!(self, CommerceError::VersionConflict(_))
    }

    fn exhausted(attempts: u32) -> Self {
        CommerceError::ConcurrencyExhausted { attempts }
    }
}

impl From<StoreError> for CommerceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict { .. } => CommerceError::VersionConflict(e.to_string()),
            StoreError::SerializeError(inner) => CommerceError::Serialization(inner.to_string()),
            other => CommerceError::Storage(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_version_conflict() {
        let err: CommerceError = StoreError::VersionConflict {
            key: "cart:c1".into(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(err.is_conflict());
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            CommerceError::InsufficientStock {
                product_id: "p".into(),
                requested: 2,
                available: 1
            }
            .kind(),
            ErrorKind::InsufficientStock
        );
        assert_eq!(CommerceError::DuplicateCoupon("X".into()).kind(), ErrorKind::Validation);
        assert_eq!(CommerceError::OrderNotFound("O".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            CommerceError::exhausted(4).kind(),
            ErrorKind::ConcurrencyExhausted
        );
    }

    #[test]
    fn test_exhausted_message_asks_to_retry() {
        let err = CommerceError::exhausted(4);
        assert!(err.to_string().contains("try again"));
    }
}
