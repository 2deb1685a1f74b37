use multipool_common::{Error, FeeConfig, HarvestLogEntry, PoolId, PoolRecord, StrategyState};
use soroban_sdk::{contracttype, Address, Env, Map};

pub(crate) const DAY_IN_LEDGERS: u32 = 17_280;
pub(crate) const BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
pub(crate) const LIFETIME_THRESHOLD: u32 = BUMP_AMOUNT - DAY_IN_LEDGERS;

pub(crate) const DEFAULT_HARVEST_LOG_CADENCE: u64 = 3_600;

/// Storage keys for strategy state.
///
/// Configuration, the pool registry and the allocation ledger live in instance
/// storage; harvest log entries are persistent, one entry per index.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Vault,
    Want,
    Admin,
    Treasury,
    Strategist,
    /// Router contract per router kind tag
    Routers,
    Fees,
    State,
    /// Registry: every pool ever added, keyed by identity
    Pools,
    /// Ledger: receipts held per in-use pool
    Allocations,
    /// Revaluation booked by rate refreshes since the last harvest
    PendingGain,
    HarvestLogCadence,
    HarvestLogLen,
    HarvestLog(u32),
    /// Held for the duration of a mutating call
    Locked,
}

pub(crate) fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(LIFETIME_THRESHOLD, BUMP_AMOUNT);
}

pub(crate) fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Vault)
}

fn read_address(env: &Env, key: &DataKey) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(key)
        .ok_or(Error::NotInitialized)
}

pub(crate) fn vault(env: &Env) -> Result<Address, Error> {
    read_address(env, &DataKey::Vault)
}

pub(crate) fn want(env: &Env) -> Result<Address, Error> {
    read_address(env, &DataKey::Want)
}

pub(crate) fn admin(env: &Env) -> Result<Address, Error> {
    read_address(env, &DataKey::Admin)
}

pub(crate) fn treasury(env: &Env) -> Result<Address, Error> {
    read_address(env, &DataKey::Treasury)
}

pub(crate) fn strategist(env: &Env) -> Result<Address, Error> {
    read_address(env, &DataKey::Strategist)
}

pub(crate) fn require_admin(env: &Env) -> Result<(), Error> {
    admin(env)?.require_auth();
    Ok(())
}

pub(crate) fn routers(env: &Env) -> Result<Map<u32, Address>, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Routers)
        .ok_or(Error::NotInitialized)
}

pub(crate) fn fees(env: &Env) -> Result<FeeConfig, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Fees)
        .ok_or(Error::NotInitialized)
}

pub(crate) fn set_fees(env: &Env, fees: &FeeConfig) {
    env.storage().instance().set(&DataKey::Fees, fees);
}

pub(crate) fn state(env: &Env) -> Result<StrategyState, Error> {
    env.storage()
        .instance()
        .get(&DataKey::State)
        .ok_or(Error::NotInitialized)
}

pub(crate) fn set_state(env: &Env, state: StrategyState) {
    env.storage().instance().set(&DataKey::State, &state);
}

pub(crate) fn pools(env: &Env) -> Map<PoolId, PoolRecord> {
    env.storage()
        .instance()
        .get(&DataKey::Pools)
        .unwrap_or(Map::new(env))
}

pub(crate) fn set_pools(env: &Env, pools: &Map<PoolId, PoolRecord>) {
    env.storage().instance().set(&DataKey::Pools, pools);
}

pub(crate) fn allocations(env: &Env) -> Map<PoolId, i128> {
    env.storage()
        .instance()
        .get(&DataKey::Allocations)
        .unwrap_or(Map::new(env))
}

pub(crate) fn set_allocations(env: &Env, allocations: &Map<PoolId, i128>) {
    env.storage()
        .instance()
        .set(&DataKey::Allocations, allocations);
}

pub(crate) fn pending_gain(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::PendingGain)
        .unwrap_or(0)
}

pub(crate) fn set_pending_gain(env: &Env, gain: i128) {
    env.storage().instance().set(&DataKey::PendingGain, &gain);
}

pub(crate) fn harvest_log_cadence(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::HarvestLogCadence)
        .unwrap_or(DEFAULT_HARVEST_LOG_CADENCE)
}

pub(crate) fn set_harvest_log_cadence(env: &Env, seconds: u64) {
    env.storage()
        .instance()
        .set(&DataKey::HarvestLogCadence, &seconds);
}

pub(crate) fn harvest_log_len(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&DataKey::HarvestLogLen)
        .unwrap_or(0)
}

pub(crate) fn harvest_log_entry(env: &Env, index: u32) -> Option<HarvestLogEntry> {
    let key = DataKey::HarvestLog(index);
    let entry = env.storage().persistent().get(&key);
    if entry.is_some() {
        env.storage()
            .persistent()
            .extend_ttl(&key, LIFETIME_THRESHOLD, BUMP_AMOUNT);
    }
    entry
}

/// Writes `entry` at `index`, growing the log when `index` is one past the end.
pub(crate) fn write_harvest_log_entry(env: &Env, index: u32, entry: &HarvestLogEntry) {
    let key = DataKey::HarvestLog(index);
    env.storage().persistent().set(&key, entry);
    env.storage()
        .persistent()
        .extend_ttl(&key, LIFETIME_THRESHOLD, BUMP_AMOUNT);
    if index >= harvest_log_len(env) {
        env.storage()
            .instance()
            .set(&DataKey::HarvestLogLen, &(index + 1));
    }
}

/// Runs `op` holding the operation lock. A mutating call that finds the lock
/// held fails with `Reentrant`.
pub(crate) fn guarded<T>(env: &Env, op: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
    let instance = env.storage().instance();
    if instance.get(&DataKey::Locked).unwrap_or(false) {
        return Err(Error::Reentrant);
    }
    instance.set(&DataKey::Locked, &true);
    let result = op();
    instance.remove(&DataKey::Locked);
    bump_instance(env);
    result
}
