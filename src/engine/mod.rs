// 8.0: in-process ledger driver. owns the repository, id counters, event bus and
// command journal, and runs each command as validate -> apply in order ->
// commit -> publish. single writer; queries borrow the committed repository.

mod config;
mod core;
mod execute;
mod recovery;

pub use config::LedgerConfig;
pub use core::Ledger;
