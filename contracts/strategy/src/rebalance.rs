//! Rebalancer and liquidation paths.

use multipool_common::{
    math::{receipts_for, to_underlying},
    Allocation, Error, PoolId, StrategyState,
};
use soroban_sdk::{log, Env, Map, Vec};

use crate::{adapter::PoolAdapter, ledger, oracle, registry, storage};

/// Allocation changes are allowed while active or paused.
pub(crate) fn require_allocatable(env: &Env) -> Result<(), Error> {
    match storage::state(env)? {
        StrategyState::Active | StrategyState::Paused => Ok(()),
        StrategyState::Panicked => {
            log!(env, "allocation blocked: strategy panicked");
            Err(Error::StrategyPaused)
        }
        StrategyState::Retired => {
            log!(env, "allocation blocked: strategy retired");
            Err(Error::StrategyRetired)
        }
    }
}

pub(crate) fn require_not_retired(env: &Env) -> Result<(), Error> {
    if storage::state(env)? == StrategyState::Retired {
        return Err(Error::StrategyRetired);
    }
    Ok(())
}

/// Moves the ledger to `targets`.
///
/// The batch is checked as a whole against idle balance plus whatever the
/// shrinking pools release, using live rates, before anything moves. Then all
/// withdrawals run, then all deposits. A pool named twice takes its last target.
pub(crate) fn rebalance(env: &Env, targets: &Vec<Allocation>) -> Result<(), Error> {
    require_allocatable(env)?;

    let mut plan: Map<PoolId, i128> = Map::new(env);
    for target in targets.iter() {
        if target.amount < 0 {
            log!(
                env,
                "negative allocation",
                target.pool.router_kind,
                target.pool.index,
                target.amount
            );
            return Err(Error::NegativeAmount);
        }
        registry::in_use_record(env, &target.pool)?;
        plan.set(target.pool, target.amount);
    }

    let mut withdrawals: Vec<Allocation> = Vec::new(env);
    let mut deposits: Vec<Allocation> = Vec::new(env);
    let mut released: i128 = 0;
    let mut required: i128 = 0;
    for (id, target) in plan.iter() {
        let record = registry::in_use_record(env, &id)?;
        let rate = PoolAdapter::for_record(env, &id, &record)?.exchange_rate()?;
        let current = to_underlying(ledger::receipts(env, &id), rate);
        if target > current {
            required = required
                .checked_add(target - current)
                .ok_or(Error::ArithmeticOverflow)?;
            deposits.push_back(Allocation {
                pool: id,
                amount: target - current,
            });
        } else if target < current {
            released += current - target;
            withdrawals.push_back(Allocation {
                pool: id,
                amount: target,
            });
        }
    }

    let available = ledger::idle(env) + released;
    if required > available {
        log!(env, "rebalance exceeds available balance", required, available);
        return Err(Error::InsufficientIdleBalance);
    }

    for withdrawal in withdrawals.iter() {
        shrink_to(env, &withdrawal.pool, withdrawal.amount)?;
    }
    for deposit in deposits.iter() {
        supply(env, &deposit.pool, deposit.amount)?;
    }
    Ok(())
}

/// Commits `amount` of idle want to an in-use pool.
pub(crate) fn supply(env: &Env, id: &PoolId, amount: i128) -> Result<(), Error> {
    let idle = ledger::idle(env);
    if amount > idle {
        log!(
            env,
            "idle balance cannot cover supply",
            id.router_kind,
            id.index,
            amount,
            idle
        );
        return Err(Error::InsufficientIdleBalance);
    }
    oracle::refresh(env, id)?;
    let record = registry::in_use_record(env, id)?;
    let credited = PoolAdapter::for_record(env, id, &record)?.supply(amount)?;

    let mut allocations = storage::allocations(env);
    let held = allocations.get(id.clone()).unwrap_or(0);
    allocations.set(id.clone(), held + credited);
    storage::set_allocations(env, &allocations);
    Ok(())
}

/// Redeems receipts until the pool's committed amount is at most `target`.
/// A zero target redeems every receipt.
fn shrink_to(env: &Env, id: &PoolId, target: i128) -> Result<i128, Error> {
    if target == 0 {
        return release(env, id, None);
    }
    oracle::refresh(env, id)?;
    let current = ledger::committed(env, id);
    if current <= target {
        return Ok(0);
    }
    release(env, id, Some(current - target))
}

/// Redeems enough receipts from `id` to free `amount` underlying, or the whole
/// position when `amount` is `None` or covers it. Returns the underlying freed.
pub(crate) fn release(env: &Env, id: &PoolId, amount: Option<i128>) -> Result<i128, Error> {
    oracle::refresh(env, id)?;
    let record = registry::in_use_record(env, id)?;
    let held = ledger::receipts(env, id);
    if held == 0 {
        return Ok(0);
    }

    let receipts = match amount {
        Some(amount) if to_underlying(held, record.exchange_rate) > amount => {
            receipts_for(amount, record.exchange_rate)?.min(held)
        }
        _ => held,
    };
    let freed = PoolAdapter::for_record(env, id, &record)?.redeem(receipts)?;

    let mut allocations = storage::allocations(env);
    allocations.set(id.clone(), held - receipts);
    storage::set_allocations(env, &allocations);
    Ok(freed)
}

/// Redeems one pool entirely; it stays in use.
pub(crate) fn withdraw_from_pool(env: &Env, id: &PoolId) -> Result<i128, Error> {
    require_not_retired(env)?;
    registry::in_use_record(env, id)?;
    release(env, id, None)
}

/// Redeems every pool back to idle. Any pool that cannot pay out fails the call.
pub(crate) fn reclaim_all(env: &Env) -> Result<i128, Error> {
    let mut freed: i128 = 0;
    for id in registry::used_pools(env).iter() {
        if ledger::receipts(env, &id) != 0 {
            freed += release(env, &id, None)?;
        }
    }
    Ok(freed)
}

/// Makes idle balance cover `amount`, liquidating the largest committed pools
/// first. Pools that cannot pay out are skipped.
pub(crate) fn free_want(env: &Env, amount: i128) -> Result<(), Error> {
    let mut idle = ledger::idle(env);
    if idle >= amount {
        return Ok(());
    }

    let mut candidates: Vec<PoolId> = Vec::new(env);
    for id in registry::used_pools(env).iter() {
        if ledger::receipts(env, &id) > 0 {
            candidates.push_back(id);
        }
    }

    while idle < amount && !candidates.is_empty() {
        let mut largest: u32 = 0;
        let mut largest_value: i128 = -1;
        for (i, id) in candidates.iter().enumerate() {
            let value = ledger::committed(env, &id);
            if value > largest_value {
                largest = i as u32;
                largest_value = value;
            }
        }
        let Some(id) = candidates.get(largest) else {
            break;
        };
        candidates.remove(largest);

        match release(env, &id, Some(amount - idle)) {
            Ok(_) => {}
            Err(Error::InsufficientLiquidity) => {
                log!(env, "skipping illiquid pool", id.router_kind, id.index);
            }
            Err(error) => return Err(error),
        }
        idle = ledger::idle(env);
    }

    if idle < amount {
        log!(env, "pools cannot cover payout", amount, idle);
        return Err(Error::InsufficientLiquidity);
    }
    Ok(())
}
