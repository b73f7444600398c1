//! Trade ledger simulation.
//!
//! Walks an account through order placement, execution and cancellation,
//! shows cyclic view resolution, then rebuilds the ledger from its journal.

use rust_decimal_macros::dec;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;
use trade_ledger::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), LedgerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    println!("Trade Ledger Simulation\n");

    let config = match std::env::var("LEDGER_CONFIG") {
        Ok(raw) => LedgerConfig::from_json(&raw)?,
        Err(_) => LedgerConfig::default(),
    };
    let mut ledger = Ledger::try_new(config)?;
    let notified = watch_balances(&mut ledger);

    scenario_1_order_lifecycle(&mut ledger)?;
    scenario_2_sustained_deposits(&mut ledger)?;
    println!("  Balance notifications so far: {}\n", notified.get());
    scenario_3_recovery(&ledger)?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

// live-only: replay must leave the counter untouched
fn watch_balances(ledger: &mut Ledger) -> Rc<Cell<u64>> {
    let notified = Rc::new(Cell::new(0));
    let counter = Rc::clone(&notified);
    ledger.subscribe(EventKind::BalanceChanged, move |event, _, query| {
        if let LedgerEvent::BalanceChanged { account_id, .. } = event {
            if let Ok(account) = query.find::<TradeAccountView>(*account_id) {
                debug!(account = %account_id, balance = %account.balance, "balance changed");
            }
        }
        counter.set(counter.get() + 1);
    });
    notified
}

/// Create, place, execute, cancel; read everything back through views.
fn scenario_1_order_lifecycle(ledger: &mut Ledger) -> Result<(), LedgerError> {
    println!("Scenario 1: Order Lifecycle\n");

    let account_id = ledger.execute(CreateAccount::new("USD", dec!(5.15)))?;
    let order_id = ledger.execute(MakeOrder::new(account_id, "EUR/USD", 1, dec!(1.213)))?;

    {
        let query = ledger.query();
        let account = query.find::<TradeAccountView>(account_id)?;
        if let Some(order) = account.orders.first() {
            // cyclic reference: account -> order -> account
            println!("  Balance via order back-reference: {}", order.account()?.balance);
        }
    }

    ledger.execute(ExecuteOrder::new(order_id))?;
    let balance = ledger.query().find::<TradeAccountView>(account_id)?.balance;
    println!("  Balance after executing {}: {}", order_id, balance);

    let first = ledger.execute(MakeOrder::new(account_id, "RUB/GPB", 3, dec!(0.0096)))?;
    let second = ledger.execute(MakeOrder::new(account_id, "EUR/USD", 1, dec!(1.314)))?;
    let open = ledger.query().find::<TradeAccountView>(account_id)?.orders.len();
    println!("  Open orders: {}", open);

    ledger.execute(CancelOrder::new(first))?;

    let query = ledger.query();
    match query.find::<OrderView>(first) {
        Ok(_) => println!("  {} still present", first),
        Err(err) => println!("  Cancelled {}: {}", first, err),
    }
    println!("  {} price: {}\n", second, query.find::<OrderView>(second)?.price);

    Ok(())
}

/// Many small deposits; the scaled-integer sum stays exact.
fn scenario_2_sustained_deposits(ledger: &mut Ledger) -> Result<(), LedgerError> {
    println!("Scenario 2: Sustained Deposits\n");

    let account_id = ledger.execute(CreateAccount::new("EUR", dec!(0)))?;
    let rounds: u32 = 10_000;
    let started = Instant::now();
    for _ in 0..rounds {
        ledger.execute(ChangeBalance::new(account_id, dec!(0.001)))?;
    }
    let elapsed = started.elapsed();

    let balance = ledger.query().find::<TradeAccountView>(account_id)?.balance;
    println!("  {} deposits of 0.001 -> balance {}", rounds, balance);
    println!("  {:.0} commands/sec\n", f64::from(rounds) / elapsed.as_secs_f64());

    Ok(())
}

/// Rebuild a second ledger from the journal and compare state. Returns
/// whether the states agree, or `None` when there is no journal to replay.
fn scenario_3_recovery(ledger: &Ledger) -> Result<Option<bool>, LedgerError> {
    println!("Scenario 3: Journal Recovery\n");

    if !ledger.config().journal {
        println!("  Journaling disabled, nothing to replay");
        return Ok(None);
    }

    let mut recovered = Ledger::try_new(ledger.config().clone())?;
    let notified = watch_balances(&mut recovered);
    let replayed = recovered.recover(ledger.journal().to_vec())?;
    let identical = recovered.repository() == ledger.repository();

    println!("  Replayed {} commands", replayed);
    println!("  Live notifications during replay: {}", notified.get());
    println!("  State identical: {}", identical);

    Ok(Some(identical))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(journal: bool) -> Ledger {
        let config = LedgerConfig {
            journal,
            ..LedgerConfig::default()
        };
        let mut ledger = Ledger::try_new(config).unwrap();
        scenario_1_order_lifecycle(&mut ledger).unwrap();
        ledger
    }

    #[test]
    fn recovery_matches_when_journaled() {
        assert_eq!(scenario_3_recovery(&ledger_with(true)).unwrap(), Some(true));
    }

    #[test]
    fn recovery_skipped_without_journal() {
        assert_eq!(scenario_3_recovery(&ledger_with(false)).unwrap(), None);
    }
}
