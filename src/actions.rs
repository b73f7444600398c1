// 5.0: transaction actions. the only code allowed to mutate the repository.
// each applier is deterministic: no clock, no randomness, no I/O, because the
// same action sequence is re-applied during recovery. appliers do not
// re-validate; a failure here means a validator let something through.

use crate::account::TradeAccount;
use crate::error::LedgerError;
use crate::events::{ExecutionMode, LedgerEvent};
use crate::fixed::Fixed;
use crate::order::Order;
use crate::repository::Repository;
use crate::types::{AccountId, OrderId};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Mutation handle given to appliers for the duration of one command.
pub struct TxContext<'a> {
    repo: &'a mut Repository,
    events: &'a mut Vec<LedgerEvent>,
    mode: ExecutionMode,
}

impl<'a> TxContext<'a> {
    pub fn new(repo: &'a mut Repository, events: &'a mut Vec<LedgerEvent>, mode: ExecutionMode) -> Self {
        Self { repo, events, mode }
    }

    pub fn repo(&mut self) -> &mut Repository {
        self.repo
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Buffered until the whole command has committed.
    pub fn publish(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxAction {
    CreateAccount {
        id: AccountId,
        currency: String,
    },
    ChangeBalance {
        account_id: AccountId,
        amount: Fixed,
    },
    MakeOrder {
        order_id: OrderId,
        account_id: AccountId,
        symbol: String,
        size: u64,
        price: Fixed,
    },
    CancelOrder {
        order_id: OrderId,
    },
    AdjustOrder {
        order_id: OrderId,
        size: u64,
        price: Fixed,
    },
}

impl TxAction {
    pub fn name(&self) -> &'static str {
        match self {
            TxAction::CreateAccount { .. } => "CreateAccount",
            TxAction::ChangeBalance { .. } => "ChangeBalance",
            TxAction::MakeOrder { .. } => "MakeOrder",
            TxAction::CancelOrder { .. } => "CancelOrder",
            TxAction::AdjustOrder { .. } => "AdjustOrder",
        }
    }

    pub fn apply(&self, ctx: &mut TxContext<'_>) -> Result<(), LedgerError> {
        trace!(action = self.name(), mode = ?ctx.mode(), "applying");
        match self {
            TxAction::CreateAccount { id, currency } => create_account(ctx, *id, currency),
            TxAction::ChangeBalance { account_id, amount } => change_balance(ctx, *account_id, *amount),
            TxAction::MakeOrder {
                order_id,
                account_id,
                symbol,
                size,
                price,
            } => make_order(ctx, Order::new(*order_id, *account_id, symbol.clone(), *size, *price)),
            TxAction::CancelOrder { order_id } => cancel_order(ctx, *order_id),
            TxAction::AdjustOrder {
                order_id,
                size,
                price,
            } => adjust_order(ctx, *order_id, *size, *price),
        }
    }
}

fn create_account(ctx: &mut TxContext<'_>, id: AccountId, currency: &str) -> Result<(), LedgerError> {
    ctx.repo().store(id, TradeAccount::new(id, currency))?;
    ctx.publish(LedgerEvent::AccountCreated { account_id: id });
    Ok(())
}

fn change_balance(ctx: &mut TxContext<'_>, account_id: AccountId, amount: Fixed) -> Result<(), LedgerError> {
    ctx.repo().remap::<TradeAccount, _>(account_id, |id, account| {
        account
            .with_balance_change(amount)
            .ok_or_else(|| LedgerError::InvalidArgument(format!("balance of {id} overflows")))
    })?;
    ctx.publish(LedgerEvent::BalanceChanged { account_id, amount });
    Ok(())
}

fn make_order(ctx: &mut TxContext<'_>, order: Order) -> Result<(), LedgerError> {
    let order_id = order.id;
    let account_id = order.account_id;
    ctx.repo().store(order_id, order)?;
    ctx.repo()
        .remap::<TradeAccount, _>(account_id, |_, account| Ok(account.with_order(order_id)))?;
    ctx.publish(LedgerEvent::OrderPlaced { order_id, account_id });
    Ok(())
}

fn cancel_order(ctx: &mut TxContext<'_>, order_id: OrderId) -> Result<(), LedgerError> {
    let order = ctx.repo().remove::<Order>(order_id)?;
    ctx.repo()
        .remap::<TradeAccount, _>(order.account_id, |_, account| Ok(account.without_order(order_id)))?;
    ctx.publish(LedgerEvent::OrderCancelled {
        order_id,
        account_id: order.account_id,
    });
    Ok(())
}

fn adjust_order(ctx: &mut TxContext<'_>, order_id: OrderId, size: u64, price: Fixed) -> Result<(), LedgerError> {
    ctx.repo()
        .remap::<Order, _>(order_id, |_, order| Ok(order.adjusted(size, price)))?;
    ctx.publish(LedgerEvent::OrderAdjusted { order_id });
    Ok(())
}
