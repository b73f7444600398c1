use crate::account::TradeAccount;
use crate::error::LedgerError;
use crate::types::AccountId;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::resolver::{View, ViewCache, ViewResolver};
use super::OrderView;

/// Account as seen by readers: decimal balance and the orders it owns.
#[derive(Debug)]
pub struct TradeAccountView<'r> {
    pub id: AccountId,
    pub currency: String,
    pub balance: Decimal,
    pub orders: Vec<Rc<OrderView<'r>>>,
}

impl<'r> View<'r> for TradeAccountView<'r> {
    type Entity = TradeAccount;

    fn map(
        id: AccountId,
        account: &TradeAccount,
        resolver: &ViewResolver<'r>,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            id,
            currency: account.currency.clone(),
            balance: account.balance.to_decimal(),
            orders: resolver.link_set::<OrderView<'r>, _>(account.orders.iter().copied())?,
        })
    }

    fn cache<'a>(cache: &'a ViewCache<'r>) -> &'a RefCell<HashMap<AccountId, Rc<Self>>> {
        &cache.accounts
    }
}
