// 7.0: domain events raised by transaction actions. they are buffered while a
// command applies and published once it has committed. the dispatch gate drops
// them for live-only subscribers while the ledger is replaying its journal.

use crate::fixed::Fixed;
use crate::types::{AccountId, OrderId};
use crate::view::Query;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::debug;

/// Execution context threaded through every action and publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Commands submitted by a client.
    Live,
    /// Commands re-driven from the journal during recovery.
    Replay,
}

impl ExecutionMode {
    pub fn is_replay(&self) -> bool {
        matches!(self, ExecutionMode::Replay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    AccountCreated,
    BalanceChanged,
    OrderPlaced,
    OrderAdjusted,
    OrderCancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    AccountCreated { account_id: AccountId },
    BalanceChanged { account_id: AccountId, amount: Fixed },
    OrderPlaced { order_id: OrderId, account_id: AccountId },
    OrderAdjusted { order_id: OrderId },
    OrderCancelled { order_id: OrderId, account_id: AccountId },
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LedgerEvent::AccountCreated { .. } => EventKind::AccountCreated,
            LedgerEvent::BalanceChanged { .. } => EventKind::BalanceChanged,
            LedgerEvent::OrderPlaced { .. } => EventKind::OrderPlaced,
            LedgerEvent::OrderAdjusted { .. } => EventKind::OrderAdjusted,
            LedgerEvent::OrderCancelled { .. } => EventKind::OrderCancelled,
        }
    }
}

/// Subscriber callback. Reads committed state through the query, not the payload.
pub type EventHandler = Box<dyn FnMut(&LedgerEvent, ExecutionMode, &Query<'_>)>;

struct Subscription {
    handler: EventHandler,
    during_replay: bool,
}

/// Handlers keyed by event kind plus a bounded history of what was published.
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Subscription>>,
    history: VecDeque<LedgerEvent>,
    history_limit: usize,
}

impl EventBus {
    pub fn new(history_limit: usize) -> Self {
        Self {
            handlers: HashMap::new(),
            history: VecDeque::new(),
            history_limit,
        }
    }

    /// Handler runs for live commands only.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&LedgerEvent, ExecutionMode, &Query<'_>) + 'static,
    {
        self.push(kind, Box::new(handler), false);
    }

    /// Handler also runs while replaying and must check the mode itself.
    pub fn subscribe_with_replay<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&LedgerEvent, ExecutionMode, &Query<'_>) + 'static,
    {
        self.push(kind, Box::new(handler), true);
    }

    fn push(&mut self, kind: EventKind, handler: EventHandler, during_replay: bool) {
        self.handlers.entry(kind).or_default().push(Subscription {
            handler,
            during_replay,
        });
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver committed events. Returns how many handler calls were made.
    pub fn publish(&mut self, events: &[LedgerEvent], mode: ExecutionMode, query: &Query<'_>) -> usize {
        let mut delivered = 0;
        for event in events {
            if let Some(subs) = self.handlers.get_mut(&event.kind()) {
                for sub in subs.iter_mut() {
                    if mode.is_replay() && !sub.during_replay {
                        continue;
                    }
                    (sub.handler)(event, mode, query);
                    delivered += 1;
                }
            }
            if !mode.is_replay() {
                self.record(event.clone());
            }
        }
        debug!(events = events.len(), delivered, ?mode, "events published");
        delivered
    }

    fn record(&mut self, event: LedgerEvent) {
        if self.history_limit == 0 {
            return;
        }
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }

    /// Live events in publish order, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &LedgerEvent> {
        self.history.iter()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers: usize = self.handlers.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("subscribers", &subscribers)
            .field("history", &self.history.len())
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn balance_changed() -> LedgerEvent {
        LedgerEvent::BalanceChanged {
            account_id: AccountId(1),
            amount: Fixed::from_raw(10),
        }
    }

    #[test]
    fn live_subscriber_skips_replay() {
        let repo = Repository::new();
        let query = Query::new(&repo);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut bus = EventBus::new(10);
        bus.subscribe(
            EventKind::BalanceChanged,
            move |_, mode, _| sink.borrow_mut().push(mode),
        );

        assert_eq!(bus.publish(&[balance_changed()], ExecutionMode::Replay, &query), 0);
        assert_eq!(bus.publish(&[balance_changed()], ExecutionMode::Live, &query), 1);
        assert_eq!(*seen.borrow(), vec![ExecutionMode::Live]);
    }

    #[test]
    fn replay_subscriber_sees_the_flag() {
        let repo = Repository::new();
        let query = Query::new(&repo);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut bus = EventBus::new(10);
        bus.subscribe_with_replay(
            EventKind::BalanceChanged,
            move |_, mode, _| sink.borrow_mut().push(mode.is_replay()),
        );

        bus.publish(&[balance_changed()], ExecutionMode::Replay, &query);
        bus.publish(&[balance_changed()], ExecutionMode::Live, &query);
        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn handlers_are_keyed_by_kind() {
        let repo = Repository::new();
        let query = Query::new(&repo);
        let mut bus = EventBus::new(10);
        bus.subscribe(EventKind::OrderPlaced, |_, _, _| {});

        assert_eq!(bus.subscriber_count(EventKind::OrderPlaced), 1);
        assert_eq!(bus.subscriber_count(EventKind::BalanceChanged), 0);
        assert_eq!(bus.publish(&[balance_changed()], ExecutionMode::Live, &query), 0);
    }

    #[test]
    fn history_is_bounded_and_live_only() {
        let repo = Repository::new();
        let query = Query::new(&repo);
        let mut bus = EventBus::new(2);

        bus.publish(&[balance_changed()], ExecutionMode::Replay, &query);
        assert_eq!(bus.history().count(), 0);

        let events: Vec<LedgerEvent> = (1..=3)
            .map(|raw| LedgerEvent::OrderAdjusted { order_id: OrderId(raw) })
            .collect();
        bus.publish(&events, ExecutionMode::Live, &query);

        let kept: Vec<&LedgerEvent> = bus.history().collect();
        assert_eq!(kept.len(), 2);
        assert_eq!(*kept[0], LedgerEvent::OrderAdjusted { order_id: OrderId(2) });
    }
}
