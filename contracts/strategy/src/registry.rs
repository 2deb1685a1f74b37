//! Pool registry: which pools are in use and where they live.

use multipool_common::{Error, PoolId, PoolRecord, RouterClient, RouterKind};
use soroban_sdk::{log, Env, Vec};

use crate::{adapter::PoolAdapter, storage};

pub(crate) fn record(env: &Env, id: &PoolId) -> Option<PoolRecord> {
    storage::pools(env).get(id.clone())
}

/// Registry entry of a pool that is currently in use.
pub(crate) fn in_use_record(env: &Env, id: &PoolId) -> Result<PoolRecord, Error> {
    match record(env, id) {
        Some(record) if record.in_use => Ok(record),
        _ => {
            log!(env, "pool not registered", id.router_kind, id.index);
            Err(Error::PoolNotRegistered)
        }
    }
}

pub(crate) fn used_pools(env: &Env) -> Vec<PoolId> {
    let mut used = Vec::new(env);
    for (id, record) in storage::pools(env).iter() {
        if record.in_use {
            used.push_back(id);
        }
    }
    used
}

/// Resolves and marks each entry as in use, returning the pools newly added.
///
/// Entries already in use are skipped. Nothing is written unless every entry
/// resolves.
pub(crate) fn add_used_pools(env: &Env, entries: &Vec<PoolId>) -> Result<Vec<PoolId>, Error> {
    let routers = storage::routers(env)?;
    let mut pools = storage::pools(env);
    let mut added = Vec::new(env);
    let now = env.ledger().timestamp();

    for id in entries.iter() {
        if RouterKind::from_tag(id.router_kind).is_err() {
            log!(env, "unrecognized router kind", id.router_kind, id.index);
            return Err(Error::InvalidPool);
        }
        if matches!(pools.get(id.clone()), Some(existing) if existing.in_use) {
            continue;
        }

        let Some(router) = routers.get(id.router_kind) else {
            log!(env, "no router configured for kind", id.router_kind);
            return Err(Error::InvalidPool);
        };
        let address = match RouterClient::new(env, &router).try_pool(&id.index) {
            Ok(Ok(Some(address))) => address,
            _ => {
                log!(env, "router has no pool at index", id.router_kind, id.index);
                return Err(Error::InvalidPool);
            }
        };

        let exchange_rate = PoolAdapter::new(env, &id, &address)?.exchange_rate()?;
        pools.set(
            id.clone(),
            PoolRecord {
                address,
                in_use: true,
                exchange_rate,
                rate_updated_at: now,
            },
        );
        added.push_back(id);
    }

    storage::set_pools(env, &pools);
    Ok(added)
}

/// Takes every listed pool out of use and drops its ledger entry.
///
/// All members are checked before any is removed; the first pool that is
/// unknown or still holds receipts fails the whole call.
pub(crate) fn remove_used_pools(env: &Env, list: &Vec<PoolId>) -> Result<(), Error> {
    let mut pools = storage::pools(env);
    let mut allocations = storage::allocations(env);

    for id in list.iter() {
        in_use_record(env, &id)?;
        let receipts = allocations.get(id.clone()).unwrap_or(0);
        if receipts != 0 {
            log!(env, "pool not empty", id.router_kind, id.index, receipts);
            return Err(Error::PoolNotEmpty);
        }
    }

    for id in list.iter() {
        if let Some(mut record) = pools.get(id.clone()) {
            record.in_use = false;
            pools.set(id.clone(), record);
        }
        allocations.remove(id);
    }

    storage::set_pools(env, &pools);
    storage::set_allocations(env, &allocations);
    Ok(())
}
