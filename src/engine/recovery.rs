//! Recovery by re-driving a command journal.
//!
//! Commands go back through their validators with the ledger in replay mode.
//! Id counters start from the same seed, so every created id comes out the
//! same as in the original run, and live-only subscribers stay silent.

use super::config::LedgerConfig;
use super::core::Ledger;
use crate::commands::LedgerCommand;
use crate::error::LedgerError;
use crate::events::ExecutionMode;
use tracing::info;

impl Ledger {
    /// Re-drive `journal` on this ledger, which must not have committed
    /// anything yet. Returns the number of commands replayed.
    pub fn recover<I>(&mut self, journal: I) -> Result<u64, LedgerError>
    where
        I: IntoIterator<Item = LedgerCommand>,
    {
        if self.committed > 0 || !self.repository.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "recovery requires a ledger with no committed commands".to_string(),
            ));
        }

        info!("journal replay started");
        self.mode = ExecutionMode::Replay;
        let result = journal
            .into_iter()
            .try_for_each(|command| self.execute_any(command).map(|_| ()));
        self.mode = ExecutionMode::Live;
        result?;

        info!(commands = self.committed, "journal replay finished");
        Ok(self.committed)
    }

    /// Fresh ledger rebuilt from a journal.
    pub fn replay<I>(config: LedgerConfig, journal: I) -> Result<Ledger, LedgerError>
    where
        I: IntoIterator<Item = LedgerCommand>,
    {
        let mut ledger = Ledger::try_new(config)?;
        ledger.recover(journal)?;
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ChangeBalance, CreateAccount};
    use rust_decimal_macros::dec;

    #[test]
    fn recover_refuses_used_ledger() {
        let mut ledger = Ledger::default();
        ledger.execute(CreateAccount::new("USD", dec!(1))).unwrap();
        let journal = ledger.journal().to_vec();

        assert!(matches!(
            ledger.recover(journal),
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn mode_returns_to_live_after_failed_replay() {
        let journal = vec![LedgerCommand::from(ChangeBalance::new(
            crate::types::AccountId(1),
            dec!(1),
        ))];
        let mut ledger = Ledger::default();
        assert!(ledger.recover(journal).is_err());
        assert_eq!(ledger.mode(), ExecutionMode::Live);
    }
}
