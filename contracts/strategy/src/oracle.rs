//! Exchange-rate cache.
//!
//! Valuations read the cached rate, so a refresh is what moves `balance()`.
//! Whatever a refresh adds to (or takes from) the value of receipts already
//! held is booked as pending gain and realized by the next harvest.

use multipool_common::{math::to_underlying, Error, PoolId};
use soroban_sdk::Env;

use crate::{adapter::PoolAdapter, ledger, registry, storage};

/// Refreshes the cached rate of one in-use pool.
pub(crate) fn refresh(env: &Env, id: &PoolId) -> Result<(), Error> {
    let mut record = registry::in_use_record(env, id)?;
    let rate = PoolAdapter::for_record(env, id, &record)?.exchange_rate()?;
    if rate != record.exchange_rate {
        let receipts = ledger::receipts(env, id);
        let gain = to_underlying(receipts, rate) - to_underlying(receipts, record.exchange_rate);
        if gain != 0 {
            storage::set_pending_gain(env, storage::pending_gain(env) + gain);
        }
    }
    record.exchange_rate = rate;
    record.rate_updated_at = env.ledger().timestamp();

    let mut pools = storage::pools(env);
    pools.set(id.clone(), record);
    storage::set_pools(env, &pools);
    Ok(())
}

pub(crate) fn update_exchange_rates(env: &Env) -> Result<(), Error> {
    for id in registry::used_pools(env).iter() {
        refresh(env, &id)?;
    }
    Ok(())
}
