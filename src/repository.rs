//! Keyed entity storage.
//!
//! One table per entity type, selected through the [`Entity`] trait. Stored
//! values are immutable once published: `remap` computes a replacement from the
//! current value and swaps it into the slot. The repository does no locking;
//! callers get `&Repository` to read and `&mut Repository` to mutate, and the
//! engine only hands the latter to transaction actions.

use crate::account::TradeAccount;
use crate::error::LedgerError;
use crate::order::Order;
use crate::types::{AccountId, EntityKind, OrderId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// A type that has its own table in the repository.
pub trait Entity: Clone + Debug + Sized {
    type Id: Copy + Eq + Ord + Hash + Debug + Into<u64> + From<u64>;

    const KIND: EntityKind;

    fn table(repo: &Repository) -> &HashMap<Self::Id, Self>;
    fn table_mut(repo: &mut Repository) -> &mut HashMap<Self::Id, Self>;
}

impl Entity for TradeAccount {
    type Id = AccountId;

    const KIND: EntityKind = EntityKind::TradeAccount;

    fn table(repo: &Repository) -> &HashMap<AccountId, Self> {
        &repo.accounts
    }

    fn table_mut(repo: &mut Repository) -> &mut HashMap<AccountId, Self> {
        &mut repo.accounts
    }
}

impl Entity for Order {
    type Id = OrderId;

    const KIND: EntityKind = EntityKind::Order;

    fn table(repo: &Repository) -> &HashMap<OrderId, Self> {
        &repo.orders
    }

    fn table_mut(repo: &mut Repository) -> &mut HashMap<OrderId, Self> {
        &mut repo.orders
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repository {
    accounts: HashMap<AccountId, TradeAccount>,
    orders: HashMap<OrderId, Order>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has<E: Entity>(&self, id: E::Id) -> bool {
        E::table(self).contains_key(&id)
    }

    pub fn get<E: Entity>(&self, id: E::Id) -> Result<&E, LedgerError> {
        E::table(self)
            .get(&id)
            .ok_or_else(|| LedgerError::not_found(E::KIND, id))
    }

    pub fn store<E: Entity>(&mut self, id: E::Id, entity: E) -> Result<(), LedgerError> {
        let table = E::table_mut(self);
        if table.contains_key(&id) {
            return Err(LedgerError::DuplicateId {
                kind: E::KIND,
                id: id.into(),
            });
        }
        table.insert(id, entity);
        Ok(())
    }

    /// Removes and returns the entity so callers can cascade on its fields.
    pub fn remove<E: Entity>(&mut self, id: E::Id) -> Result<E, LedgerError> {
        E::table_mut(self)
            .remove(&id)
            .ok_or_else(|| LedgerError::not_found(E::KIND, id))
    }

    /// Replaces the stored entity with `f(id, current)`.
    ///
    /// `f` may refuse by returning an error, in which case the slot is left
    /// untouched.
    pub fn remap<E, F>(&mut self, id: E::Id, f: F) -> Result<(), LedgerError>
    where
        E: Entity,
        F: FnOnce(E::Id, &E) -> Result<E, LedgerError>,
    {
        let slot = E::table_mut(self)
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found(E::KIND, id))?;
        let next = f(id, slot)?;
        *slot = next;
        Ok(())
    }

    pub fn len<E: Entity>(&self) -> usize {
        E::table(self).len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.orders.is_empty()
    }

    /// Ids of one table in ascending order.
    pub fn ids<E: Entity>(&self) -> Vec<E::Id> {
        let mut ids: Vec<E::Id> = E::table(self).keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;

    fn repo_with_account() -> Repository {
        let mut repo = Repository::new();
        repo.store(AccountId(1), TradeAccount::new(AccountId(1), "USD"))
            .unwrap();
        repo
    }

    #[test]
    fn store_then_get() {
        let repo = repo_with_account();
        assert!(repo.has::<TradeAccount>(AccountId(1)));
        assert!(!repo.has::<Order>(OrderId(1)));
        assert_eq!(repo.get::<TradeAccount>(AccountId(1)).unwrap().currency, "USD");
    }

    #[test]
    fn store_rejects_duplicate_id() {
        let mut repo = repo_with_account();
        let result = repo.store(AccountId(1), TradeAccount::new(AccountId(1), "EUR"));
        assert!(matches!(
            result,
            Err(LedgerError::DuplicateId { kind: EntityKind::TradeAccount, id: 1 })
        ));
        assert_eq!(repo.get::<TradeAccount>(AccountId(1)).unwrap().currency, "USD");
    }

    #[test]
    fn get_missing_is_not_found() {
        let repo = Repository::new();
        assert!(matches!(
            repo.get::<Order>(OrderId(9)),
            Err(LedgerError::NotFound { kind: EntityKind::Order, id: 9 })
        ));
    }

    #[test]
    fn remove_returns_value_once() {
        let mut repo = repo_with_account();
        let order = Order::new(OrderId(1), AccountId(1), "EUR/USD", 1, Fixed::from_raw(1213));
        repo.store(OrderId(1), order.clone()).unwrap();

        assert_eq!(repo.remove::<Order>(OrderId(1)).unwrap(), order);
        assert!(repo.remove::<Order>(OrderId(1)).is_err());
    }

    #[test]
    fn remap_swaps_slot() {
        let mut repo = repo_with_account();
        repo.remap::<TradeAccount, _>(AccountId(1), |_, account| Ok(account.with_order(OrderId(3))))
            .unwrap();
        assert!(repo.get::<TradeAccount>(AccountId(1)).unwrap().owns(OrderId(3)));
    }

    #[test]
    fn remap_missing_is_not_found() {
        let mut repo = Repository::new();
        let result = repo.remap::<TradeAccount, _>(AccountId(4), |_, account| Ok(account.clone()));
        assert!(matches!(result, Err(LedgerError::NotFound { .. })));
    }

    #[test]
    fn remap_refusal_leaves_slot() {
        let mut repo = repo_with_account();
        let before = repo.clone();
        let result = repo.remap::<TradeAccount, _>(AccountId(1), |_, _| {
            Err(LedgerError::InvalidArgument("refused".into()))
        });
        assert!(result.is_err());
        assert_eq!(repo, before);
    }

    #[test]
    fn ids_are_sorted() {
        let mut repo = Repository::new();
        for raw in [5, 2, 9] {
            repo.store(AccountId(raw), TradeAccount::new(AccountId(raw), "USD"))
                .unwrap();
        }
        assert_eq!(repo.ids::<TradeAccount>(), vec![AccountId(2), AccountId(5), AccountId(9)]);
        assert_eq!(repo.len::<TradeAccount>(), 3);
        assert_eq!(repo.len::<Order>(), 0);
    }
}
