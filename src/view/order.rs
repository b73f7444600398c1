use crate::error::LedgerError;
use crate::order::{Direction, Order};
use crate::types::OrderId;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::resolver::{View, ViewCache, ViewLink, ViewResolver};
use super::TradeAccountView;

#[derive(Debug)]
pub struct OrderView<'r> {
    pub id: OrderId,
    pub symbol: String,
    pub size: u64,
    pub price: Decimal,
    pub direction: Direction,
    pub account: ViewLink<'r, TradeAccountView<'r>>,
}

impl<'r> OrderView<'r> {
    /// Follow the back-reference to the owning account's view.
    pub fn account(&self) -> Result<Rc<TradeAccountView<'r>>, LedgerError> {
        self.account.get()
    }
}

impl<'r> View<'r> for OrderView<'r> {
    type Entity = Order;

    fn map(id: OrderId, order: &Order, resolver: &ViewResolver<'r>) -> Result<Self, LedgerError> {
        Ok(Self {
            id,
            symbol: order.symbol.clone(),
            size: order.size,
            price: order.price.to_decimal(),
            direction: order.direction(),
            account: resolver.link(order.account_id),
        })
    }

    fn cache<'a>(cache: &'a ViewCache<'r>) -> &'a RefCell<HashMap<OrderId, Rc<Self>>> {
        &cache.orders
    }
}
