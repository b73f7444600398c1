//! Order entity.
//!
//! An order points at its account by id. It does not own the account and the
//! account does not own it; both live in the repository.

use crate::fixed::Fixed;
use crate::types::{AccountId, OrderId};
use serde::{Deserialize, Serialize};

/// Direction is carried by the sign of the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub symbol: String,
    pub size: u64,
    pub price: Fixed,
}

impl Order {
    pub fn new(
        id: OrderId,
        account_id: AccountId,
        symbol: impl Into<String>,
        size: u64,
        price: Fixed,
    ) -> Self {
        Self {
            id,
            account_id,
            symbol: symbol.into(),
            size,
            price,
        }
    }

    pub fn adjusted(&self, size: u64, price: Fixed) -> Self {
        Self {
            size,
            price,
            ..self.clone()
        }
    }

    // negative price debits the account up front, so it is the buy side
    pub fn direction(&self) -> Direction {
        if self.price.is_negative() {
            Direction::Buy
        } else {
            Direction::Sell
        }
    }
}
