//! Allocation ledger reads.

use multipool_common::{math::to_underlying, PoolBalance, PoolId, StrategyState};
use soroban_sdk::{token, Env, Vec};

use crate::{harvest::FeeSplit, registry, storage};

/// Want held by the strategy and not committed to any pool.
pub(crate) fn idle(env: &Env) -> i128 {
    match storage::want(env) {
        Ok(want) => token::Client::new(env, &want).balance(&env.current_contract_address()),
        Err(_) => 0,
    }
}

pub(crate) fn receipts(env: &Env, id: &PoolId) -> i128 {
    storage::allocations(env).get(id.clone()).unwrap_or(0)
}

/// Committed amount of one pool in underlying units at the cached rate.
pub(crate) fn committed(env: &Env, id: &PoolId) -> i128 {
    match registry::record(env, id) {
        Some(record) => to_underlying(receipts(env, id), record.exchange_rate),
        None => 0,
    }
}

pub(crate) fn pools_balance(env: &Env) -> i128 {
    let pools = storage::pools(env);
    let mut total: i128 = 0;
    for (id, receipts) in storage::allocations(env).iter() {
        if let Some(record) = pools.get(id) {
            total = total.saturating_add(to_underlying(receipts, record.exchange_rate));
        }
    }
    total
}

/// Idle plus committed balance, before fees owed on booked gain.
pub(crate) fn gross_balance(env: &Env) -> i128 {
    idle(env).saturating_add(pools_balance(env))
}

/// Harvest fees the next harvest will pay out of gain already booked by
/// rate refreshes.
fn owed_fees(env: &Env) -> i128 {
    let pending = storage::pending_gain(env);
    if pending <= 0 {
        return 0;
    }
    match FeeSplit::of(env, pending) {
        Ok(split) => split.total(),
        Err(_) => 0,
    }
}

/// Balance the vault can count on: gross balance less the fees owed on
/// booked gain, so realizing that gain leaves it unchanged. A retired
/// strategy manages nothing.
pub(crate) fn total_balance(env: &Env) -> i128 {
    if matches!(storage::state(env), Ok(StrategyState::Retired)) {
        return 0;
    }
    gross_balance(env).saturating_sub(owed_fees(env)).max(0)
}

pub(crate) fn pool_balances(env: &Env) -> Vec<PoolBalance> {
    let mut balances = Vec::new(env);
    for id in registry::used_pools(env).iter() {
        if let Some(record) = registry::record(env, &id) {
            balances.push_back(PoolBalance {
                allocation: to_underlying(receipts(env, &id), record.exchange_rate),
                address: record.address,
                pool: id,
            });
        }
    }
    balances
}
