// trade-ledger: domain core of a trading ledger.
// commands are validated against the repository and turned into ordered
// transaction actions; actions are the only writers; views are projected from
// the committed repository on demand. deterministic, no I/O, single writer.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: AccountId, OrderId, EntityKind
//   2.x  fixed.rs: scaled-integer amounts, decimal boundary
//   3.x  error.rs: LedgerError, ErrorKind
//   4.x  ids.rs: deterministic id allocation
//        repository.rs: Entity trait, keyed copy-on-write storage
//        account.rs, order.rs: entity value records
//   5.x  actions.rs: transaction actions and their appliers
//        commands.rs: commands and their validators
//   6.x  view/: TradeAccountView, OrderView, per-query resolver
//   7.x  events.rs: domain events, replay-gated dispatch
//   8.x  engine/: Ledger driver: execute, commit, journal, recovery

pub mod account;
pub mod actions;
pub mod commands;
pub mod engine;
pub mod error;
pub mod events;
pub mod fixed;
pub mod ids;
pub mod order;
pub mod repository;
pub mod types;
pub mod view;

// re exports for convenience
pub use account::TradeAccount;
pub use actions::{TxAction, TxContext};
pub use commands::{
    AdjustOrder, CancelOrder, ChangeBalance, Command, CommandContext, CreateAccount, ExecuteOrder,
    LedgerCommand, MakeOrder,
};
pub use engine::{Ledger, LedgerConfig};
pub use error::{ErrorKind, LedgerError};
pub use events::{EventBus, EventKind, ExecutionMode, LedgerEvent};
pub use fixed::Fixed;
pub use ids::{IdGenerator, SequentialIds};
pub use order::{Direction, Order};
pub use repository::{Entity, Repository};
pub use types::{AccountId, EntityKind, OrderId};
pub use view::{OrderView, Query, TradeAccountView, View, ViewLink, ViewResolver};
