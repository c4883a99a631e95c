//! Status and role enums for marketplace entities.
//!
//! The backend stores these as lowercase text columns, so every enum here
//! serializes in `snake_case` and round-trips through `Display`/`FromStr`
//! with the same spelling.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of an order.
///
/// ```text
/// pending -> confirmed -> ready -> accepted -> shipping -> delivered
///    \           \          \
///     +-----------+----------+--> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed by the customer, waiting for the store.
    #[default]
    Pending,
    /// Accepted by the store and being prepared.
    Confirmed,
    /// Ready for pickup; claimable by couriers.
    Ready,
    /// Claimed by a courier who has not collected it yet.
    Accepted,
    /// Collected and on its way.
    Shipping,
    /// Handed to the customer.
    Delivered,
    /// Cancelled before pickup.
    Cancelled,
}

/// Who is allowed to drive a given transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionActor {
    Store,
    Courier,
}

/// An attempted order status change that the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("order cannot move from {from} to {to}")]
pub struct TransitionError {
    /// Status the order is currently in.
    pub from: OrderStatus,
    /// Status that was requested.
    pub to: OrderStatus,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Ready,
        Self::Accepted,
        Self::Shipping,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Wire spelling used by the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Ready => "ready",
            Self::Accepted => "accepted",
            Self::Shipping => "shipping",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Customer-facing label (pt-BR).
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::Confirmed => "Em Preparo",
            Self::Ready => "Pronto",
            Self::Accepted => "Aceito",
            Self::Shipping => "Em Entrega",
            Self::Delivered => "Entregue",
            Self::Cancelled => "Cancelado",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Orders still in the store's kitchen queue.
    #[must_use]
    pub const fn is_store_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Ready)
    }

    /// Orders a courier is currently responsible for.
    #[must_use]
    pub const fn is_courier_active(&self) -> bool {
        matches!(self, Self::Accepted | Self::Shipping)
    }

    /// The actor allowed to move an order from `self` to `to`, if the
    /// transition is legal at all.
    #[must_use]
    pub const fn transition_actor(&self, to: Self) -> Option<TransitionActor> {
        match (self, to) {
            (Self::Pending, Self::Confirmed | Self::Cancelled)
            | (Self::Confirmed, Self::Ready | Self::Cancelled)
            | (Self::Ready, Self::Cancelled) => Some(TransitionActor::Store),
            (Self::Ready, Self::Accepted)
            | (Self::Accepted, Self::Shipping)
            | (Self::Shipping, Self::Delivered) => Some(TransitionActor::Courier),
            _ => None,
        }
    }

    /// Whether the lifecycle allows moving from `self` to `to`.
    #[must_use]
    pub const fn can_transition_to(&self, to: Self) -> bool {
        self.transition_actor(to).is_some()
    }

    /// Validate a transition.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when the lifecycle forbids the change.
    pub const fn check_transition(&self, to: Self) -> Result<(), TransitionError> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(TransitionError { from: *self, to })
        }
    }

    /// The forward step a store offers from this status, if any.
    #[must_use]
    pub const fn next_store_step(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Ready),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Role attached to a profile at sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A customer placing orders.
    Client,
    /// A restaurant or shop selling products.
    Store,
    /// A delivery courier.
    Courier,
    /// Marketplace back-office staff.
    Staff,
}

impl Role {
    /// Wire spelling used by the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Store => "store",
            Self::Courier => "courier",
            Self::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "store" => Ok(Self::Store),
            "courier" => Ok(Self::Courier),
            "staff" => Ok(Self::Staff),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Back-office approval state of a store profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl StoreStatus {
    /// Wire spelling used by the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of an order chat wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    /// The customer who placed the order.
    User,
    /// The store fulfilling the order.
    Store,
}

/// Which side of a support conversation wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportSender {
    User,
    Staff,
}

impl SupportSender {
    /// Wire spelling used by the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Staff => "staff",
        }
    }
}

/// How the customer intends to pay on delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Pix,
    CreditCard,
    Cash,
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pix" => Ok(Self::Pix),
            "credit_card" | "card" => Ok(Self::CreditCard),
            "cash" => Ok(Self::Cash),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}
