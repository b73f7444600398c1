//! Per-query view resolution.
//!
//! A [`ViewResolver`] borrows one repository for its whole life, so every view
//! it builds observes the same committed state. Built views are cached by id;
//! asking twice for the same entity returns the same `Rc`. Back-references are
//! [`ViewLink`]s that hold a weak handle to the resolver and go through the
//! cache on access, which is what keeps mutually referencing views finite.

use crate::error::LedgerError;
use crate::repository::{Entity, Repository};
use crate::types::{AccountId, OrderId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::{OrderView, TradeAccountView};

type IdOf<'r, V> = <<V as View<'r>>::Entity as Entity>::Id;

/// Mapping from one entity type to its read projection.
pub trait View<'r>: Sized + 'r {
    type Entity: Entity;

    fn map(
        id: <Self::Entity as Entity>::Id,
        entity: &Self::Entity,
        resolver: &ViewResolver<'r>,
    ) -> Result<Self, LedgerError>;

    /// The slot in the per-query cache holding views of this type.
    fn cache<'a>(cache: &'a ViewCache<'r>)
        -> &'a RefCell<HashMap<<Self::Entity as Entity>::Id, Rc<Self>>>;
}

/// Views already built in one query, one table per view type.
#[derive(Default)]
pub struct ViewCache<'r> {
    pub(super) accounts: RefCell<HashMap<AccountId, Rc<TradeAccountView<'r>>>>,
    pub(super) orders: RefCell<HashMap<OrderId, Rc<OrderView<'r>>>>,
}

pub struct ViewResolver<'r> {
    repo: &'r Repository,
    cache: ViewCache<'r>,
    this: Weak<ViewResolver<'r>>,
}

impl<'r> ViewResolver<'r> {
    fn new(repo: &'r Repository) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            repo,
            cache: ViewCache::default(),
            this: this.clone(),
        })
    }

    pub fn repository(&self) -> &'r Repository {
        self.repo
    }

    /// The view for `id`, built on first request and cached for the query.
    pub fn find<V: View<'r>>(&self, id: IdOf<'r, V>) -> Result<Rc<V>, LedgerError> {
        if let Some(view) = V::cache(&self.cache).borrow().get(&id) {
            return Ok(Rc::clone(view));
        }

        let entity = self.repo.get::<V::Entity>(id)?;
        let view = Rc::new(V::map(id, entity, self)?);

        let cached = Rc::clone(V::cache(&self.cache).borrow_mut().entry(id).or_insert(view));
        Ok(cached)
    }

    /// Lazy reference to a related view; nothing is built until it is followed.
    pub fn link<V: View<'r>>(&self, id: IdOf<'r, V>) -> ViewLink<'r, V> {
        ViewLink {
            id,
            resolver: self.this.clone(),
        }
    }

    /// Resolve a set of ids into views, ordered by id.
    pub fn link_set<V, I>(&self, ids: I) -> Result<Vec<Rc<V>>, LedgerError>
    where
        V: View<'r>,
        I: IntoIterator<Item = IdOf<'r, V>>,
    {
        let mut ids: Vec<IdOf<'r, V>> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(|id| self.find::<V>(id)).collect()
    }

    pub fn cached<V: View<'r>>(&self) -> usize {
        V::cache(&self.cache).borrow().len()
    }
}

impl fmt::Debug for ViewResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewResolver")
            .field("accounts", &self.cache.accounts.borrow().len())
            .field("orders", &self.cache.orders.borrow().len())
            .finish()
    }
}

/// Back-reference from one view to another in the same query.
pub struct ViewLink<'r, V: View<'r>> {
    id: IdOf<'r, V>,
    resolver: Weak<ViewResolver<'r>>,
}

impl<'r, V: View<'r>> ViewLink<'r, V> {
    pub fn id(&self) -> IdOf<'r, V> {
        self.id
    }

    /// Fails with `QueryClosed` once the owning [`Query`] is gone.
    pub fn get(&self) -> Result<Rc<V>, LedgerError> {
        let resolver = self.resolver.upgrade().ok_or(LedgerError::QueryClosed)?;
        resolver.find::<V>(self.id)
    }
}

impl<'r, V: View<'r>> Clone for ViewLink<'r, V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            resolver: self.resolver.clone(),
        }
    }
}

impl<'r, V: View<'r>> fmt::Debug for ViewLink<'r, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewLink").field(&self.id).finish()
    }
}

/// One consistent read over a repository.
///
/// Views it returns stay valid while it lives; following a link after the
/// query is dropped yields `QueryClosed`.
#[derive(Debug)]
pub struct Query<'r> {
    resolver: Rc<ViewResolver<'r>>,
}

impl<'r> Query<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        Self {
            resolver: ViewResolver::new(repo),
        }
    }

    pub fn find<V: View<'r>>(&self, id: IdOf<'r, V>) -> Result<Rc<V>, LedgerError> {
        self.resolver.find::<V>(id)
    }

    /// Every view of one type, ordered by id.
    pub fn all<V: View<'r>>(&self) -> Result<Vec<Rc<V>>, LedgerError> {
        let ids = self.resolver.repository().ids::<V::Entity>();
        self.resolver.link_set::<V, _>(ids)
    }

    pub fn resolver(&self) -> &ViewResolver<'r> {
        &self.resolver
    }
}
