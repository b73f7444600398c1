// 8.1 engine/core.rs: ledger state and read access.

use super::config::LedgerConfig;
use crate::commands::LedgerCommand;
use crate::error::LedgerError;
use crate::events::{EventBus, EventKind, ExecutionMode, LedgerEvent};
use crate::ids::SequentialIds;
use crate::repository::Repository;
use crate::view::Query;

/** 8.1: all ledger state lives here */
#[derive(Debug)]
pub struct Ledger {
    pub(super) config: LedgerConfig,
    pub(super) repository: Repository,
    pub(super) ids: SequentialIds,
    pub(super) events: EventBus,
    pub(super) journal: Vec<LedgerCommand>,
    pub(super) mode: ExecutionMode,
    pub(super) committed: u64,
    pub(super) poisoned: bool,
}

impl Ledger {
    /// Ledger over a config the caller has already validated. Use
    /// [`Ledger::try_new`] for configs built by hand.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            ids: SequentialIds::new(config.first_id),
            events: EventBus::new(config.event_history),
            repository: Repository::new(),
            journal: Vec::new(),
            mode: ExecutionMode::Live,
            committed: 0,
            poisoned: false,
            config,
        }
    }

    pub fn try_new(config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Consistent read over the last committed state. The ledger cannot
    /// execute commands while the query or any view from it is alive.
    pub fn query(&self) -> Query<'_> {
        Query::new(&self.repository)
    }

    /// Committed commands in order. Empty when journaling is off.
    pub fn journal(&self) -> &[LedgerCommand] {
        &self.journal
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Handler for live commands only.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&LedgerEvent, ExecutionMode, &Query<'_>) + 'static,
    {
        self.events.subscribe(kind, handler);
    }

    /// Handler that also runs while the journal is replayed.
    pub fn subscribe_with_replay<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&LedgerEvent, ExecutionMode, &Query<'_>) + 'static,
    {
        self.events.subscribe_with_replay(kind, handler);
    }

    pub fn published_events(&self) -> impl Iterator<Item = &LedgerEvent> {
        self.events.history()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
