//! Harvest engine: profit realization, fee split and the rolling harvest log.

use multipool_common::{
    math::{bps_of, mul_div_floor, to_underlying, BPS_DENOMINATOR, SECONDS_PER_YEAR},
    Error, HarvestLogEntry, PoolId, StrategyState,
};
use soroban_sdk::{log, token, Address, Env, Map};

use crate::{adapter::PoolAdapter, events, ledger, oracle, rebalance, registry, storage};

/// Fee amounts paid out of one harvest.
pub(crate) struct FeeSplit {
    pub call_fee: i128,
    pub treasury_fee: i128,
    pub strategist_fee: i128,
}

impl FeeSplit {
    pub(crate) fn of(env: &Env, profit: i128) -> Result<Self, Error> {
        let fees = storage::fees(env)?;
        Ok(Self {
            call_fee: bps_of(profit, fees.call_fee_bps)?,
            treasury_fee: bps_of(profit, fees.treasury_fee_bps)?,
            strategist_fee: bps_of(profit, fees.strategist_fee_bps)?,
        })
    }

    pub(crate) fn total(&self) -> i128 {
        self.call_fee + self.treasury_fee + self.strategist_fee
    }
}

/// Realizes profit since the last harvest and pays fees out of it.
///
/// Profit is the balance gained by the capture step (rate refresh plus yield
/// claims) together with any gain that earlier refreshes booked. What is left
/// of the claimed yield after fees goes back into the pools that paid it.
/// Returns the realized profit, zero when there was none.
pub(crate) fn harvest(env: &Env, caller: &Address) -> Result<i128, Error> {
    match storage::state(env)? {
        StrategyState::Active => {}
        StrategyState::Retired => return Err(Error::StrategyRetired),
        StrategyState::Paused | StrategyState::Panicked => {
            log!(env, "harvest blocked while paused or panicked");
            return Err(Error::StrategyPaused);
        }
    }

    let carried = storage::pending_gain(env);
    let balance_before = ledger::gross_balance(env);
    let claims = capture(env)?;
    let balance_captured = ledger::gross_balance(env);
    storage::set_pending_gain(env, 0);

    let profit = balance_captured - balance_before + carried;
    let now = env.ledger().timestamp();
    if profit <= 0 {
        record(env, HarvestLogEntry {
            timestamp: now,
            realized_profit: 0,
            total_balance_before: balance_captured,
            total_balance_after: balance_captured,
        });
        events::harvested(env, caller, 0, 0);
        return Ok(0);
    }

    let split = FeeSplit::of(env, profit)?;
    if split.total() > 0 {
        rebalance::free_want(env, split.total())?;
        let want = token::Client::new(env, &storage::want(env)?);
        let strategy = env.current_contract_address();
        for (recipient, amount) in [
            (caller.clone(), split.call_fee),
            (storage::treasury(env)?, split.treasury_fee),
            (storage::strategist(env)?, split.strategist_fee),
        ] {
            if amount > 0 {
                want.transfer(&strategy, &recipient, &amount);
            }
        }
    }
    reinvest(env, &claims, split.total())?;

    record(env, HarvestLogEntry {
        timestamp: now,
        realized_profit: profit,
        total_balance_before: balance_captured - profit,
        total_balance_after: ledger::gross_balance(env),
    });
    events::harvested(env, caller, profit, split.call_fee);
    Ok(profit)
}

/// Refreshes every in-use pool's rate and claims its yield into idle balance.
/// Returns what each pool paid, for pools that paid anything.
fn capture(env: &Env) -> Result<Map<PoolId, i128>, Error> {
    let mut claims = Map::new(env);
    for id in registry::used_pools(env).iter() {
        oracle::refresh(env, &id)?;
        let record = registry::in_use_record(env, &id)?;
        let claimed = PoolAdapter::for_record(env, &id, &record)?.claim_yield()?;
        if claimed > 0 {
            claims.set(id, claimed);
        }
    }
    Ok(claims)
}

/// Supplies claimed yield net of `fees` back to the pools that paid it, pro
/// rata to each pool's claim. The last pool takes the rounding remainder.
fn reinvest(env: &Env, claims: &Map<PoolId, i128>, fees: i128) -> Result<(), Error> {
    let mut claimed: i128 = 0;
    for (_, amount) in claims.iter() {
        claimed += amount;
    }
    let retained = claimed - fees;
    if retained <= 0 {
        return Ok(());
    }

    let mut remaining = retained;
    let last = claims.len() - 1;
    for (i, (id, paid)) in claims.iter().enumerate() {
        let share = if i as u32 == last {
            remaining
        } else {
            mul_div_floor(retained, paid, claimed)?
        };
        if share > 0 {
            rebalance::supply(env, &id, share)?;
            remaining -= share;
        }
    }
    Ok(())
}

/// Dry run of `harvest` against live rates and pending yield.
/// Returns `(profit, call_fee)`.
pub(crate) fn estimate(env: &Env) -> Result<(i128, i128), Error> {
    let mut profit = storage::pending_gain(env);
    for id in registry::used_pools(env).iter() {
        let Some(record) = registry::record(env, &id) else {
            continue;
        };
        let adapter = PoolAdapter::for_record(env, &id, &record)?;
        let receipts = ledger::receipts(env, &id);
        if receipts > 0 {
            let live = adapter.exchange_rate().unwrap_or(record.exchange_rate);
            profit += to_underlying(receipts, live) - to_underlying(receipts, record.exchange_rate);
        }
        profit += adapter.pending_yield();
    }

    if profit <= 0 {
        return Ok((0, 0));
    }
    let call_fee = FeeSplit::of(env, profit)?.call_fee;
    Ok((profit, call_fee))
}

/// Appends `entry`, or folds it into the latest entry when it lands inside the
/// cadence window. A folded entry accumulates profit, moves its timestamp
/// forward and takes the new closing balance.
pub(crate) fn record(env: &Env, entry: HarvestLogEntry) {
    let len = storage::harvest_log_len(env);
    if len > 0 {
        if let Some(mut last) = storage::harvest_log_entry(env, len - 1) {
            let window_end = last
                .timestamp
                .saturating_add(storage::harvest_log_cadence(env));
            if entry.timestamp <= last.timestamp || entry.timestamp < window_end {
                last.realized_profit += entry.realized_profit;
                last.timestamp = last.timestamp.max(entry.timestamp);
                last.total_balance_after = entry.total_balance_after;
                storage::write_harvest_log_entry(env, len - 1, &last);
                return;
            }
        }
    }
    storage::write_harvest_log_entry(env, len, &entry);
}

/// Mean annualized yield, in basis points, over the last `n` log entries.
///
/// Each entry that has a predecessor contributes its profit over its opening
/// balance, scaled to a year by the time since that predecessor.
pub(crate) fn average_yield_rate(env: &Env, n: u32) -> i128 {
    let len = storage::harvest_log_len(env);
    let window = n.min(len);
    if window == 0 {
        return 0;
    }

    let mut sum: i128 = 0;
    let mut counted: i128 = 0;
    for index in (len - window)..len {
        if index == 0 {
            continue;
        }
        let (Some(previous), Some(entry)) = (
            storage::harvest_log_entry(env, index - 1),
            storage::harvest_log_entry(env, index),
        ) else {
            continue;
        };
        let elapsed = entry.timestamp.saturating_sub(previous.timestamp) as i128;
        if elapsed == 0 || entry.total_balance_before <= 0 {
            continue;
        }
        let yearly = match mul_div_floor(entry.realized_profit, SECONDS_PER_YEAR, elapsed) {
            Ok(yearly) => yearly,
            Err(_) => continue,
        };
        if let Ok(rate) = mul_div_floor(yearly, BPS_DENOMINATOR, entry.total_balance_before) {
            sum = sum.saturating_add(rate);
            counted += 1;
        }
    }

    if counted == 0 {
        0
    } else {
        sum / counted
    }
}
