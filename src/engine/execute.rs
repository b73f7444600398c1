//! Command execution: validate, apply, commit, publish.

use super::core::Ledger;
use crate::actions::{TxAction, TxContext};
use crate::commands::{Command, CommandContext, LedgerCommand};
use crate::error::LedgerError;
use crate::view::Query;
use tracing::{debug, error, warn};

impl Ledger {
    /// Validate and apply one command. Creating commands return the new id.
    pub fn execute<C: Command>(&mut self, command: C) -> Result<C::Output, LedgerError> {
        let entry: LedgerCommand = command.clone().into();
        let (output, actions) = self.validate_with(entry.name(), |ctx| command.validate(ctx))?;
        self.commit(entry, actions)?;
        Ok(output)
    }

    /// Same as [`Ledger::execute`] for a command of any type.
    pub fn execute_any(&mut self, command: LedgerCommand) -> Result<Option<u64>, LedgerError> {
        let (created, actions) = self.validate_with(command.name(), |ctx| command.validate(ctx))?;
        self.commit(command, actions)?;
        Ok(created)
    }

    fn validate_with<T, F>(&mut self, name: &'static str, validate: F) -> Result<(T, Vec<TxAction>), LedgerError>
    where
        F: FnOnce(&mut CommandContext<'_>) -> Result<T, LedgerError>,
    {
        if self.poisoned {
            return Err(LedgerError::Poisoned);
        }

        let mut ctx = CommandContext::new(&self.repository, &mut self.ids);
        match validate(&mut ctx) {
            Ok(output) => Ok((output, ctx.into_actions())),
            Err(err) => {
                warn!(command = name, error = %err, mode = ?self.mode, "command rejected");
                Err(err)
            }
        }
    }

    /// Apply the actions in order. A failing action poisons the ledger: state
    /// may be half applied and nothing here rolls it back.
    fn commit(&mut self, command: LedgerCommand, actions: Vec<TxAction>) -> Result<(), LedgerError> {
        let mut raised = Vec::new();
        let mut ctx = TxContext::new(&mut self.repository, &mut raised, self.mode);
        for action in &actions {
            if let Err(source) = action.apply(&mut ctx) {
                self.poisoned = true;
                error!(
                    command = command.name(),
                    action = action.name(),
                    error = %source,
                    "transaction action failed, ledger poisoned"
                );
                return Err(LedgerError::Corrupted {
                    action: action.name(),
                    source: Box::new(source),
                });
            }
        }

        self.committed += 1;
        debug!(
            command = command.name(),
            actions = actions.len(),
            seq = self.committed,
            "command committed"
        );
        if self.config.journal {
            self.journal.push(command);
        }

        let query = Query::new(&self.repository);
        self.events.publish(&raised, self.mode, &query);
        Ok(())
    }
}
