//! Order state machine.
//!
//! Permitted edges:
//!
//! ```text
//! pending ──► pending      (informational events)
//! pending ──► paid         (capture; runs side effects)
//! pending ──► cancelled    (payment failure)
//! paid    ──► refunded     (refund)
//! ```
//!
//! Every other (current, target) pair is a no-op.

use super::OrderStatus;

/// Outcome of planning a transition against the stored status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Write `to` conditionally on the stored status still being `from`.
    Apply {
        /// Expected stored status (the compare half of compare-and-swap).
        from: OrderStatus,
        /// Status to write.
        to: OrderStatus,
    },
    /// The edge is not in the table; leave the order untouched.
    NotPermitted {
        /// Stored status.
        current: OrderStatus,
        /// Requested status.
        target: OrderStatus,
    },
}

impl TransitionPlan {
    /// Returns `true` when applying this plan settles the order.
    #[must_use]
    pub const fn settles(&self) -> bool {
        matches!(
            self,
            Self::Apply {
                from: OrderStatus::Pending,
                to: OrderStatus::Paid
            }
        )
    }
}

/// Returns `true` if the state machine permits `current → target`.
#[must_use]
pub const fn is_permitted(current: OrderStatus, target: OrderStatus) -> bool {
    matches!(
        (current, target),
        (OrderStatus::Pending, OrderStatus::Pending)
            | (OrderStatus::Pending, OrderStatus::Paid)
            | (OrderStatus::Pending, OrderStatus::Cancelled)
            | (OrderStatus::Paid, OrderStatus::Refunded)
    )
}

/// Plans the transition from the stored `current` status to `target`.
#[must_use]
pub const fn plan(current: OrderStatus, target: OrderStatus) -> TransitionPlan {
    if is_permitted(current, target) {
        TransitionPlan::Apply {
            from: current,
            to: target,
        }
    } else {
        TransitionPlan::NotPermitted { current, target }
    }
}
