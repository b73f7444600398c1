//! Trade account entity.
//!
//! Accounts are value records. Updates build a new record and the repository
//! swaps it in through `remap`, so a published account is never mutated.

use crate::fixed::Fixed;
use crate::types::{AccountId, OrderId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeAccount {
    pub id: AccountId,
    pub currency: String,
    pub balance: Fixed,
    /// Orders currently owned by this account, by id only.
    pub orders: BTreeSet<OrderId>,
}

impl TradeAccount {
    pub fn new(id: AccountId, currency: impl Into<String>) -> Self {
        Self {
            id,
            currency: currency.into(),
            balance: Fixed::ZERO,
            orders: BTreeSet::new(),
        }
    }

    /// Returns `None` on overflow. The validator checks this before an action
    /// is emitted, so the applier treats `None` as a broken invariant.
    pub fn with_balance_change(&self, amount: Fixed) -> Option<Self> {
        let balance = self.balance.checked_add(amount)?;
        Some(Self {
            balance,
            ..self.clone()
        })
    }

    pub fn with_order(&self, order_id: OrderId) -> Self {
        let mut orders = self.orders.clone();
        orders.insert(order_id);
        Self {
            orders,
            ..self.clone()
        }
    }

    pub fn without_order(&self, order_id: OrderId) -> Self {
        let mut orders = self.orders.clone();
        orders.remove(&order_id);
        Self {
            orders,
            ..self.clone()
        }
    }

    pub fn owns(&self, order_id: OrderId) -> bool {
        self.orders.contains(&order_id)
    }

    /// Whether a debit of `amount` keeps the balance non-negative.
    pub fn can_cover(&self, amount: Fixed) -> bool {
        self.balance >= amount.abs()
    }
}
