//! Commands and their validators.
//!
//! A validator reads the repository, rejects the command or emits the ordered
//! transaction actions that carry its effect. It never mutates the repository.
//! Decimal inputs are converted to [`Fixed`] here and nowhere else. Ids are
//! allocated only after every precondition has passed, so a rejected command
//! leaves the id sequence untouched and replay stays reproducible.

use crate::account::TradeAccount;
use crate::actions::TxAction;
use crate::error::LedgerError;
use crate::fixed::Fixed;
use crate::ids::IdGenerator;
use crate::order::Order;
use crate::repository::{Entity, Repository};
use crate::types::{AccountId, OrderId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Read capability plus id allocation and an action sink, for one command.
pub struct CommandContext<'a> {
    repo: &'a Repository,
    ids: &'a mut dyn IdGenerator,
    actions: Vec<TxAction>,
}

impl<'a> CommandContext<'a> {
    pub fn new(repo: &'a Repository, ids: &'a mut dyn IdGenerator) -> Self {
        Self {
            repo,
            ids,
            actions: Vec::new(),
        }
    }

    pub fn repo(&self) -> &'a Repository {
        self.repo
    }

    pub fn next_id<E: Entity>(&mut self) -> E::Id {
        self.ids.next_id(E::KIND).into()
    }

    /// Actions apply in the order they are emitted.
    pub fn emit(&mut self, action: TxAction) {
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[TxAction] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<TxAction> {
        self.actions
    }
}

pub trait Command: Clone + Into<LedgerCommand> {
    type Output;

    fn validate(&self, ctx: &mut CommandContext<'_>) -> Result<Self::Output, LedgerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccount {
    pub currency: String,
    pub initial_balance: Decimal,
}

impl CreateAccount {
    pub fn new(currency: impl Into<String>, initial_balance: Decimal) -> Self {
        Self {
            currency: currency.into(),
            initial_balance,
        }
    }
}

impl Command for CreateAccount {
    type Output = AccountId;

    fn validate(&self, ctx: &mut CommandContext<'_>) -> Result<AccountId, LedgerError> {
        let initial = Fixed::from_decimal(self.initial_balance)?;
        let id = ctx.next_id::<TradeAccount>();
        ctx.emit(TxAction::CreateAccount {
            id,
            currency: self.currency.clone(),
        });
        // non-positive openings leave the account at zero
        if initial > Fixed::ZERO {
            ctx.emit(TxAction::ChangeBalance {
                account_id: id,
                amount: initial,
            });
        }
        Ok(id)
    }
}

/// Deposit (positive) or withdrawal (negative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBalance {
    pub account_id: AccountId,
    pub amount: Decimal,
}

impl ChangeBalance {
    pub fn new(account_id: AccountId, amount: Decimal) -> Self {
        Self { account_id, amount }
    }
}

impl Command for ChangeBalance {
    type Output = ();

    fn validate(&self, ctx: &mut CommandContext<'_>) -> Result<(), LedgerError> {
        let amount = Fixed::from_decimal(self.amount)?;
        let account = ctx.repo().get::<TradeAccount>(self.account_id)?;
        ensure_can_debit(account, amount)?;
        ensure_no_overflow(account, amount)?;
        ctx.emit(TxAction::ChangeBalance {
            account_id: self.account_id,
            amount,
        });
        Ok(())
    }
}

/// New order; a negative price is a buy and must be covered by the balance.
///
/// An unknown owning account is reported as `NotFound` like every other
/// missing entity, not as `InvalidArgument`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeOrder {
    pub account_id: AccountId,
    pub symbol: String,
    pub size: i64,
    pub price: Decimal,
}

impl MakeOrder {
    pub fn new(account_id: AccountId, symbol: impl Into<String>, size: i64, price: Decimal) -> Self {
        Self {
            account_id,
            symbol: symbol.into(),
            size,
            price,
        }
    }
}

impl Command for MakeOrder {
    type Output = OrderId;

    fn validate(&self, ctx: &mut CommandContext<'_>) -> Result<OrderId, LedgerError> {
        let size = positive_size(self.size)?;
        let price = Fixed::from_decimal(self.price)?;
        if price.is_zero() {
            return Err(LedgerError::InvalidArgument(format!(
                "order price {} rounds to zero",
                self.price
            )));
        }

        let account = ctx.repo().get::<TradeAccount>(self.account_id)?;
        ensure_can_debit(account, price)?;

        let order_id = ctx.next_id::<Order>();
        ctx.emit(TxAction::MakeOrder {
            order_id,
            account_id: self.account_id,
            symbol: self.symbol.clone(),
            size,
            price,
        });
        Ok(order_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
}

impl CancelOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

impl Command for CancelOrder {
    type Output = ();

    fn validate(&self, ctx: &mut CommandContext<'_>) -> Result<(), LedgerError> {
        ensure_order(ctx.repo(), self.order_id)?;
        ctx.emit(TxAction::CancelOrder {
            order_id: self.order_id,
        });
        Ok(())
    }
}

/// Replace size and price. A non-positive size cancels the order instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustOrder {
    pub order_id: OrderId,
    pub new_size: i64,
    pub new_price: Decimal,
}

impl AdjustOrder {
    pub fn new(order_id: OrderId, new_size: i64, new_price: Decimal) -> Self {
        Self {
            order_id,
            new_size,
            new_price,
        }
    }
}

impl Command for AdjustOrder {
    type Output = ();

    fn validate(&self, ctx: &mut CommandContext<'_>) -> Result<(), LedgerError> {
        ensure_order(ctx.repo(), self.order_id)?;
        if self.new_size <= 0 {
            ctx.emit(TxAction::CancelOrder {
                order_id: self.order_id,
            });
            return Ok(());
        }
        let size = positive_size(self.new_size)?;
        let price = Fixed::from_decimal(self.new_price)?;
        ctx.emit(TxAction::AdjustOrder {
            order_id: self.order_id,
            size,
            price,
        });
        Ok(())
    }
}

/// Settle an order: debit its scaled price from the owner, then remove it.
/// The debit is not checked against the balance and may leave it negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteOrder {
    pub order_id: OrderId,
}

impl ExecuteOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }
}

impl Command for ExecuteOrder {
    type Output = ();

    fn validate(&self, ctx: &mut CommandContext<'_>) -> Result<(), LedgerError> {
        let order = ctx.repo().get::<Order>(self.order_id)?;
        let debit = order.price.checked_neg().ok_or_else(|| {
            LedgerError::InvalidArgument(format!("price of {} cannot be negated", self.order_id))
        })?;
        let account = ctx.repo().get::<TradeAccount>(order.account_id)?;
        ensure_no_overflow(account, debit)?;

        ctx.emit(TxAction::ChangeBalance {
            account_id: order.account_id,
            amount: debit,
        });
        ctx.emit(TxAction::CancelOrder {
            order_id: self.order_id,
        });
        Ok(())
    }
}

fn positive_size(size: i64) -> Result<u64, LedgerError> {
    u64::try_from(size)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| LedgerError::InvalidArgument(format!("order size must be positive, got {size}")))
}

fn ensure_order(repo: &Repository, order_id: OrderId) -> Result<(), LedgerError> {
    if repo.has::<Order>(order_id) {
        Ok(())
    } else {
        Err(LedgerError::not_found(Order::KIND, order_id))
    }
}

// only negative amounts are debits
fn ensure_can_debit(account: &TradeAccount, amount: Fixed) -> Result<(), LedgerError> {
    if amount.is_negative() && !account.can_cover(amount) {
        return Err(LedgerError::InsufficientFunds {
            requested: amount.abs(),
            available: account.balance,
        });
    }
    Ok(())
}

fn ensure_no_overflow(account: &TradeAccount, amount: Fixed) -> Result<(), LedgerError> {
    account.balance.checked_add(amount).map(|_| ()).ok_or_else(|| {
        LedgerError::InvalidArgument(format!("balance of {} would overflow", account.id))
    })
}

/// Closed set of commands, used to journal and re-drive them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    CreateAccount(CreateAccount),
    ChangeBalance(ChangeBalance),
    MakeOrder(MakeOrder),
    CancelOrder(CancelOrder),
    AdjustOrder(AdjustOrder),
    ExecuteOrder(ExecuteOrder),
}

impl LedgerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerCommand::CreateAccount(_) => "CreateAccount",
            LedgerCommand::ChangeBalance(_) => "ChangeBalance",
            LedgerCommand::MakeOrder(_) => "MakeOrder",
            LedgerCommand::CancelOrder(_) => "CancelOrder",
            LedgerCommand::AdjustOrder(_) => "AdjustOrder",
            LedgerCommand::ExecuteOrder(_) => "ExecuteOrder",
        }
    }

    /// Dispatch to the command's validator. Returns the created id, if any.
    pub fn validate(&self, ctx: &mut CommandContext<'_>) -> Result<Option<u64>, LedgerError> {
        match self {
            LedgerCommand::CreateAccount(c) => c.validate(ctx).map(|id| Some(id.into())),
            LedgerCommand::ChangeBalance(c) => c.validate(ctx).map(|_| None),
            LedgerCommand::MakeOrder(c) => c.validate(ctx).map(|id| Some(id.into())),
            LedgerCommand::CancelOrder(c) => c.validate(ctx).map(|_| None),
            LedgerCommand::AdjustOrder(c) => c.validate(ctx).map(|_| None),
            LedgerCommand::ExecuteOrder(c) => c.validate(ctx).map(|_| None),
        }
    }
}

impl From<CreateAccount> for LedgerCommand {
    fn from(c: CreateAccount) -> Self {
        LedgerCommand::CreateAccount(c)
    }
}

impl From<ChangeBalance> for LedgerCommand {
    fn from(c: ChangeBalance) -> Self {
        LedgerCommand::ChangeBalance(c)
    }
}

impl From<MakeOrder> for LedgerCommand {
    fn from(c: MakeOrder) -> Self {
        LedgerCommand::MakeOrder(c)
    }
}

impl From<CancelOrder> for LedgerCommand {
    fn from(c: CancelOrder) -> Self {
        LedgerCommand::CancelOrder(c)
    }
}

impl From<AdjustOrder> for LedgerCommand {
    fn from(c: AdjustOrder) -> Self {
        LedgerCommand::AdjustOrder(c)
    }
}

impl From<ExecuteOrder> for LedgerCommand {
    fn from(c: ExecuteOrder) -> Self {
        LedgerCommand::ExecuteOrder(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use rust_decimal_macros::dec;

    fn repo_with_account(balance: i64) -> Repository {
        let mut repo = Repository::new();
        let account = TradeAccount::new(AccountId(1), "USD")
            .with_balance_change(Fixed::from_raw(balance))
            .unwrap();
        repo.store(AccountId(1), account).unwrap();
        repo
    }

    fn run<C: Command>(repo: &Repository, cmd: &C) -> Result<(C::Output, Vec<TxAction>), LedgerError> {
        let mut ids = SequentialIds::default();
        let mut ctx = CommandContext::new(repo, &mut ids);
        let out = cmd.validate(&mut ctx)?;
        Ok((out, ctx.into_actions()))
    }

    #[test]
    fn create_account_with_balance_emits_two_actions() {
        let repo = Repository::new();
        let (id, actions) = run(&repo, &CreateAccount::new("USD", dec!(5.15))).unwrap();

        assert_eq!(id, AccountId(1));
        assert_eq!(
            actions,
            vec![
                TxAction::CreateAccount {
                    id,
                    currency: "USD".into()
                },
                TxAction::ChangeBalance {
                    account_id: id,
                    amount: Fixed::from_raw(5150)
                },
            ]
        );
    }

    #[test]
    fn create_account_without_balance_emits_one_action() {
        let repo = Repository::new();
        let (_, actions) = run(&repo, &CreateAccount::new("USD", dec!(0))).unwrap();
        assert_eq!(actions.len(), 1);

        let (_, actions) = run(&repo, &CreateAccount::new("USD", dec!(-3))).unwrap();
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn withdrawal_beyond_balance_is_rejected() {
        let repo = repo_with_account(5150);
        let err = run(&repo, &ChangeBalance::new(AccountId(1), dec!(-5.151))).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                requested: Fixed::from_raw(5151),
                available: Fixed::from_raw(5150),
            }
        );

        assert!(run(&repo, &ChangeBalance::new(AccountId(1), dec!(-5.15))).is_ok());
    }

    #[test]
    fn change_balance_on_missing_account() {
        let repo = Repository::new();
        let err = run(&repo, &ChangeBalance::new(AccountId(4), dec!(1))).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { id: 4, .. }));
    }

    #[test]
    fn make_order_argument_checks() {
        let repo = repo_with_account(5150);

        let zero_size = MakeOrder::new(AccountId(1), "EUR/USD", 0, dec!(1.2));
        assert!(matches!(run(&repo, &zero_size), Err(LedgerError::InvalidArgument(_))));

        let zero_price = MakeOrder::new(AccountId(1), "EUR/USD", 1, dec!(0));
        assert!(matches!(run(&repo, &zero_price), Err(LedgerError::InvalidArgument(_))));

        let tiny_price = MakeOrder::new(AccountId(1), "EUR/USD", 1, dec!(0.0001));
        assert!(matches!(run(&repo, &tiny_price), Err(LedgerError::InvalidArgument(_))));

        let no_account = MakeOrder::new(AccountId(2), "EUR/USD", 1, dec!(1.2));
        assert!(matches!(run(&repo, &no_account), Err(LedgerError::NotFound { .. })));
    }

    #[test]
    fn buy_order_needs_cover() {
        let repo = repo_with_account(1000);
        let too_big = MakeOrder::new(AccountId(1), "EUR/USD", 1, dec!(-1.001));
        assert!(matches!(
            run(&repo, &too_big),
            Err(LedgerError::InsufficientFunds { .. })
        ));

        let (id, actions) = run(&repo, &MakeOrder::new(AccountId(1), "EUR/USD", 1, dec!(-1))).unwrap();
        assert_eq!(id, OrderId(1));
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn rejected_command_allocates_no_id() {
        let repo = repo_with_account(0);
        let mut ids = SequentialIds::default();
        let mut ctx = CommandContext::new(&repo, &mut ids);
        let bad = MakeOrder::new(AccountId(1), "EUR/USD", -1, dec!(1));
        assert!(bad.validate(&mut ctx).is_err());
        assert!(ctx.actions().is_empty());
        drop(ctx);
        assert_eq!(ids.peek(Order::KIND), 1);
    }

    #[test]
    fn adjust_to_zero_becomes_cancel() {
        let mut repo = repo_with_account(5150);
        repo.store(
            OrderId(1),
            Order::new(OrderId(1), AccountId(1), "EUR/USD", 1, Fixed::from_raw(1213)),
        )
        .unwrap();

        let (_, actions) = run(&repo, &AdjustOrder::new(OrderId(1), 0, dec!(9))).unwrap();
        assert_eq!(actions, vec![TxAction::CancelOrder { order_id: OrderId(1) }]);

        let (_, actions) = run(&repo, &AdjustOrder::new(OrderId(1), 2, dec!(1.5))).unwrap();
        assert_eq!(
            actions,
            vec![TxAction::AdjustOrder {
                order_id: OrderId(1),
                size: 2,
                price: Fixed::from_raw(1500)
            }]
        );
    }

    #[test]
    fn execute_debits_before_removal() {
        let mut repo = repo_with_account(5150);
        repo.store(
            OrderId(1),
            Order::new(OrderId(1), AccountId(1), "EUR/USD", 1, Fixed::from_raw(1213)),
        )
        .unwrap();

        let (_, actions) = run(&repo, &ExecuteOrder::new(OrderId(1))).unwrap();
        assert_eq!(
            actions,
            vec![
                TxAction::ChangeBalance {
                    account_id: AccountId(1),
                    amount: Fixed::from_raw(-1213)
                },
                TxAction::CancelOrder { order_id: OrderId(1) },
            ]
        );
    }

    #[test]
    fn execute_beyond_balance_debits_in_full() {
        let mut repo = repo_with_account(1000);
        repo.store(
            OrderId(1),
            Order::new(OrderId(1), AccountId(1), "EUR/USD", 1, Fixed::from_raw(1213)),
        )
        .unwrap();
        let (_, actions) = run(&repo, &ExecuteOrder::new(OrderId(1))).unwrap();
        assert_eq!(
            actions,
            vec![
                TxAction::ChangeBalance {
                    account_id: AccountId(1),
                    amount: Fixed::from_raw(-1213),
                },
                TxAction::CancelOrder { order_id: OrderId(1) },
            ]
        );
    }

    #[test]
    fn missing_order_is_not_found() {
        let repo = repo_with_account(0);
        for cmd in [
            LedgerCommand::from(CancelOrder::new(OrderId(3))),
            LedgerCommand::from(AdjustOrder::new(OrderId(3), 1, dec!(1))),
            LedgerCommand::from(ExecuteOrder::new(OrderId(3))),
        ] {
            let mut ids = SequentialIds::default();
            let mut ctx = CommandContext::new(&repo, &mut ids);
            assert!(matches!(
                cmd.validate(&mut ctx),
                Err(LedgerError::NotFound { id: 3, .. })
            ));
        }
    }

    #[test]
    fn ledger_command_dispatch_returns_created_ids() {
        let repo = repo_with_account(0);
        let mut ids = SequentialIds::new(10);
        let mut ctx = CommandContext::new(&repo, &mut ids);

        let created = LedgerCommand::from(CreateAccount::new("EUR", dec!(1)))
            .validate(&mut ctx)
            .unwrap();
        assert_eq!(created, Some(10));
        assert_eq!(LedgerCommand::from(CancelOrder::new(OrderId(1))).name(), "CancelOrder");
    }
}
