//! # Multi-pool Lending Strategy
//!
//! The capital-allocating half of the fund. The vault hands deposits to this
//! contract and asks it for funds on withdrawal; everything between those two
//! calls happens here: which pools are in use, how much sits in each, what the
//! receipts are worth, and when accrued yield is realized and split into fees.
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌──────────────┐
//!  Vault ───────► │   Strategy   │ ◄──────── admin / keepers
//!  deposit        │              │           rebalance, harvest,
//!  withdraw       │  registry    │           pause, panic, retire
//!  balance        │  rate cache  │
//!                 │  ledger      │
//!                 │  harvest log │
//!                 └──────┬───────┘
//!                        │ PoolAdapter (per router kind)
//!             ┌──────────┴──────────┐
//!       Appreciating pools    Distributing pools
//! ```
//!
//! ## Accounting Model
//!
//! - Idle balance is the want token held by this contract.
//! - Each in-use pool carries a receipt balance; its committed amount is the
//!   receipts valued at the cached exchange rate, truncated.
//! - `balance()` is idle plus every committed amount, less the harvest fees
//!   owed on gain that rate refreshes have booked but no harvest has realized.
//! - Rate refreshes book any revaluation as pending gain, which the next
//!   harvest realizes together with freshly claimed yield. Claimed yield left
//!   after fees goes back into the pools that paid it.
//!
//! ## Atomicity
//!
//! Each entry point is one serialized operation. Inputs are validated before
//! the ledger is written, mutating calls hold an operation lock, and the host
//! discards every write (token transfers included) of a call that returns an
//! error.

#![no_std]

mod adapter;
mod events;
mod harvest;
mod ledger;
mod lifecycle;
mod oracle;
mod rebalance;
mod registry;
mod storage;

use multipool_common::{
    Allocation, Error, FeeConfig, HarvestLogEntry, PoolBalance, PoolId, PoolRecord,
    RouterKind, StrategyInterface, StrategyParams, StrategyState,
};
use soroban_sdk::{contract, contractimpl, log, token, Address, Env, Vec};

use crate::storage::DataKey;

#[contract]
pub struct MultiPoolStrategy;

#[contractimpl]
impl MultiPoolStrategy {
    // ==========================================================================
    // INITIALIZATION
    // ==========================================================================

    /// Initializes the strategy with its collaborators and fee split.
    ///
    /// # Arguments
    /// * `env` - The Soroban environment
    /// * `params` - Vault, want token, admin, fee recipients, the router
    ///   contract for each router kind, and the harvest fee split
    ///
    /// # Errors
    /// - `AlreadyInitialized` on a second call
    /// - `Configuration` if the fee split does not sum to 10_000 bps or a
    ///   router is registered under an unknown router kind
    ///
    /// # Security
    /// - The admin must authorize initialization
    pub fn initialize(env: Env, params: StrategyParams) -> Result<(), Error> {
        if storage::is_initialized(&env) {
            return Err(Error::AlreadyInitialized);
        }
        params.admin.require_auth();
        params.fees.validate()?;
        for kind in params.routers.keys().iter() {
            if RouterKind::from_tag(kind).is_err() {
                log!(&env, "router registered for unknown kind", kind);
                return Err(Error::Configuration);
            }
        }

        let instance = env.storage().instance();
        instance.set(&DataKey::Vault, &params.vault);
        instance.set(&DataKey::Want, &params.want);
        instance.set(&DataKey::Admin, &params.admin);
        instance.set(&DataKey::Treasury, &params.treasury);
        instance.set(&DataKey::Strategist, &params.strategist);
        instance.set(&DataKey::Routers, &params.routers);
        storage::set_fees(&env, &params.fees);
        storage::set_state(&env, StrategyState::Active);
        storage::set_harvest_log_cadence(&env, storage::DEFAULT_HARVEST_LOG_CADENCE);
        storage::bump_instance(&env);
        Ok(())
    }

    // ==========================================================================
    // POOL REGISTRY
    // ==========================================================================

    /// Marks pools as in use, resolving each through its router.
    ///
    /// Pools already in use are left as they are. Newly added pools get their
    /// exchange rate cached immediately.
    ///
    /// # Errors
    /// - `InvalidPool` if an entry's router kind is unknown or unconfigured, or
    ///   the router has no pool at that index. No entry is added in that case.
    ///
    /// # Events
    /// Emits `pool_add` with the pools newly marked in use
    pub fn add_used_pools(env: Env, pools: Vec<PoolId>) -> Result<(), Error> {
        storage::require_admin(&env)?;
        storage::guarded(&env, || {
            rebalance::require_not_retired(&env)?;
            let added = registry::add_used_pools(&env, &pools)?;
            events::pools_added(&env, added);
            Ok(())
        })
    }

    /// Takes an empty pool out of use and drops it from the ledger.
    ///
    /// # Errors
    /// - `PoolNotRegistered` if the pool is not in use
    /// - `PoolNotEmpty` if the pool still holds receipts; call
    ///   `withdraw_from_pool` first
    pub fn remove_used_pool(env: Env, pool: PoolId) -> Result<(), Error> {
        let list = Vec::from_array(&env, [pool]);
        Self::remove_used_pools(env, list)
    }

    /// Bulk form of `remove_used_pool`. Either every listed pool is removed
    /// or none is; the blocking pool is named in the diagnostic log.
    pub fn remove_used_pools(env: Env, pools: Vec<PoolId>) -> Result<(), Error> {
        storage::require_admin(&env)?;
        storage::guarded(&env, || {
            registry::remove_used_pools(&env, &pools)?;
            events::pools_removed(&env, pools.clone());
            Ok(())
        })
    }

    pub fn used_pools(env: Env) -> Vec<PoolId> {
        registry::used_pools(&env)
    }

    /// Registry entry for `pool`, in use or not.
    pub fn pool_record(env: Env, pool: PoolId) -> Option<PoolRecord> {
        registry::record(&env, &pool)
    }

    // ==========================================================================
    // EXCHANGE RATES & BALANCES
    // ==========================================================================

    /// Refreshes the cached exchange rate of every in-use pool.
    ///
    /// Permissionless. Revaluation of receipts already held is booked as gain
    /// for the next harvest. Calling it twice with no pool activity in between
    /// leaves `balance()` unchanged.
    ///
    /// # Events
    /// Emits `rates` with the resulting balance
    pub fn update_exchange_rates(env: Env) -> Result<(), Error> {
        storage::guarded(&env, || {
            oracle::update_exchange_rates(&env)?;
            events::rates_updated(&env, ledger::total_balance(&env));
            Ok(())
        })
    }

    /// Committed amount of `pool` in underlying units; zero for unknown pools.
    pub fn want_supplied_to_pool(env: Env, pool: PoolId) -> i128 {
        ledger::committed(&env, &pool)
    }

    pub fn get_pool_balances(env: Env) -> Vec<PoolBalance> {
        ledger::pool_balances(&env)
    }

    /// Idle want held by the strategy.
    pub fn balance_of_want(env: Env) -> i128 {
        ledger::idle(&env)
    }

    pub fn balance_of_pools(env: Env) -> i128 {
        ledger::pools_balance(&env)
    }

    // ==========================================================================
    // REBALANCER
    // ==========================================================================

    /// Moves committed capital to the target allocation.
    ///
    /// Each named pool ends up with (approximately, within rate truncation)
    /// `amount` underlying committed. Pools not named are untouched. All
    /// withdrawals run before any deposit, so capital freed from one pool can
    /// fund another within the same call.
    ///
    /// # Arguments
    /// * `env` - The Soroban environment
    /// * `allocations` - Target committed amount per pool, in underlying units
    ///
    /// # Errors
    /// - `PoolNotRegistered` if a named pool is not in use
    /// - `NegativeAmount` for a negative target
    /// - `InsufficientIdleBalance` if the deposits in the batch exceed idle
    ///   balance plus what the batch's withdrawals free
    /// - `StrategyPaused` when panicked, `StrategyRetired` when retired
    ///
    /// # Events
    /// Emits `rebalance` with the resulting idle and committed totals
    pub fn rebalance(env: Env, allocations: Vec<Allocation>) -> Result<(), Error> {
        storage::require_admin(&env)?;
        storage::guarded(&env, || {
            rebalance::rebalance(&env, &allocations)?;
            events::rebalanced(&env, ledger::idle(&env), ledger::pools_balance(&env));
            Ok(())
        })
    }

    /// Redeems a pool's entire position back to idle. The pool stays in use.
    ///
    /// # Errors
    /// - `PoolNotRegistered` if the pool is not in use
    /// - `InsufficientLiquidity` if the pool cannot pay out
    pub fn withdraw_from_pool(env: Env, pool: PoolId) -> Result<i128, Error> {
        storage::require_admin(&env)?;
        storage::guarded(&env, || {
            let freed = rebalance::withdraw_from_pool(&env, &pool)?;
            events::reclaimed(&env, freed, ledger::total_balance(&env));
            Ok(freed)
        })
    }

    /// Redeems every pool back to idle without changing the lifecycle state.
    /// Used ahead of `retire_strat`.
    pub fn reclaim_want(env: Env) -> Result<i128, Error> {
        storage::require_admin(&env)?;
        storage::guarded(&env, || {
            rebalance::require_not_retired(&env)?;
            let freed = rebalance::reclaim_all(&env)?;
            events::reclaimed(&env, freed, ledger::total_balance(&env));
            Ok(freed)
        })
    }

    // ==========================================================================
    // HARVEST
    // ==========================================================================

    /// Realizes profit since the last harvest and splits it into fees.
    ///
    /// Anyone may harvest; the caller is paid the call fee as an incentive.
    /// Treasury and strategist fees go to the configured recipients and the
    /// rest stays in the strategy as principal.
    ///
    /// # Arguments
    /// * `env` - The Soroban environment
    /// * `caller` - Harvester receiving the call fee (must authorize)
    ///
    /// # Returns
    /// The realized profit, zero if there was none
    ///
    /// # Errors
    /// - `StrategyPaused` unless the strategy is active
    /// - `InsufficientLiquidity` if fees cannot be paid out of pools
    ///
    /// # Events
    /// Emits `harvest` with the caller, profit and call fee
    pub fn harvest(env: Env, caller: Address) -> Result<i128, Error> {
        caller.require_auth();
        storage::guarded(&env, || harvest::harvest(&env, &caller))
    }

    /// Read-only dry run of `harvest`. Returns `(profit, call_fee)`.
    pub fn estimate_harvest(env: Env) -> Result<(i128, i128), Error> {
        harvest::estimate(&env)
    }

    /// Average annualized yield in basis points across the last `n` harvests.
    pub fn average_yield_rate(env: Env, n: u32) -> i128 {
        harvest::average_yield_rate(&env, n)
    }

    /// Sets the minimum spacing between distinct harvest log entries.
    pub fn update_harvest_log_cadence(env: Env, seconds: u64) -> Result<(), Error> {
        storage::require_admin(&env)?;
        storage::guarded(&env, || {
            storage::set_harvest_log_cadence(&env, seconds);
            Ok(())
        })
    }

    pub fn harvest_log_cadence(env: Env) -> u64 {
        storage::harvest_log_cadence(&env)
    }

    pub fn harvest_log_len(env: Env) -> u32 {
        storage::harvest_log_len(&env)
    }

    pub fn harvest_log_entry(env: Env, index: u32) -> Option<HarvestLogEntry> {
        storage::harvest_log_entry(&env, index)
    }

    /// Timestamp of the latest harvest log entry, zero before the first harvest.
    pub fn last_harvest_timestamp(env: Env) -> u64 {
        match storage::harvest_log_len(&env) {
            0 => 0,
            len => storage::harvest_log_entry(&env, len - 1)
                .map(|entry| entry.timestamp)
                .unwrap_or(0),
        }
    }

    /// Replaces the harvest fee split.
    ///
    /// # Errors
    /// - `Configuration` if the four parts do not sum to 10_000 bps
    pub fn update_fees(env: Env, fees: FeeConfig) -> Result<(), Error> {
        storage::require_admin(&env)?;
        fees.validate()?;
        storage::guarded(&env, || {
            storage::set_fees(&env, &fees);
            Ok(())
        })
    }

    pub fn fees(env: Env) -> Result<FeeConfig, Error> {
        storage::fees(&env)
    }

    // ==========================================================================
    // LIFECYCLE
    // ==========================================================================

    /// Stops deposits. Withdrawals and rebalances continue.
    ///
    /// # Errors
    /// - `InvalidStateTransition` unless active
    pub fn pause(env: Env) -> Result<(), Error> {
        storage::require_admin(&env)?;
        storage::guarded(&env, || lifecycle::pause(&env))
    }

    /// # Errors
    /// - `InvalidStateTransition` unless paused
    pub fn unpause(env: Env) -> Result<(), Error> {
        storage::require_admin(&env)?;
        storage::guarded(&env, || lifecycle::unpause(&env))
    }

    /// Emergency exit: redeems every pool to idle and blocks deposits and
    /// rebalances. Holders can still withdraw. Not reversible; a panicked
    /// strategy can only be retired.
    ///
    /// # Errors
    /// - `InvalidStateTransition` unless active or paused
    /// - `InsufficientLiquidity` if any pool cannot pay out, in which case
    ///   nothing changes
    pub fn panic(env: Env) -> Result<i128, Error> {
        storage::require_admin(&env)?;
        storage::guarded(&env, || lifecycle::panic(&env))
    }

    /// Decommissions the strategy and returns idle want to the vault.
    ///
    /// # Errors
    /// - `NonZeroBalance` while any pool holds receipts
    /// - `InvalidStateTransition` if already retired
    pub fn retire_strat(env: Env) -> Result<i128, Error> {
        storage::require_admin(&env)?;
        storage::guarded(&env, || lifecycle::retire(&env))
    }

    pub fn vault(env: Env) -> Result<Address, Error> {
        storage::vault(&env)
    }
}

#[contractimpl]
impl StrategyInterface for MultiPoolStrategy {
    fn want(env: Env) -> Result<Address, Error> {
        storage::want(&env)
    }

    fn state(env: Env) -> Result<StrategyState, Error> {
        storage::state(&env)
    }

    /// Idle plus committed balance at cached rates, net of fees owed on booked
    /// gain; zero once retired.
    fn balance(env: Env) -> i128 {
        ledger::total_balance(&env)
    }

    /// Accepts want the vault has already transferred in.
    ///
    /// # Errors
    /// - `ZeroAmount` for a non-positive amount
    /// - `StrategyPaused` unless active
    fn deposit(env: Env, amount: i128) -> Result<(), Error> {
        storage::vault(&env)?.require_auth();
        storage::guarded(&env, || {
            if amount <= 0 {
                return Err(Error::ZeroAmount);
            }
            let state = storage::state(&env)?;
            if state != StrategyState::Active {
                log!(&env, "deposit rejected: strategy not active", amount);
                return Err(Error::StrategyPaused);
            }
            events::deposited(&env, amount, ledger::total_balance(&env));
            Ok(())
        })
    }

    /// Sends `amount` of want to the vault, liquidating pools largest-first
    /// when idle balance is short. Allowed in every state.
    ///
    /// # Errors
    /// - `ZeroAmount` for a non-positive amount
    /// - `InsufficientLiquidity` if the pools cannot free enough
    fn withdraw(env: Env, amount: i128) -> Result<i128, Error> {
        let vault = storage::vault(&env)?;
        vault.require_auth();
        storage::guarded(&env, || {
            if amount <= 0 {
                return Err(Error::ZeroAmount);
            }
            rebalance::free_want(&env, amount)?;
            token::Client::new(&env, &storage::want(&env)?).transfer(
                &env.current_contract_address(),
                &vault,
                &amount,
            );
            events::withdrawn(&env, amount, ledger::total_balance(&env));
            Ok(amount)
        })
    }
}
