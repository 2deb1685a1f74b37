//! # Multi-pool Vault Contract
//!
//! The share-accounting half of the fund. Holders deposit the want token and
//! receive vault shares; the capital itself is handed to a single strategy
//! contract that spreads it across lending pools and harvests the yield.
//!
//! ## Architecture Overview
//!
//! The vault never talks to pools. It asks the strategy for its balance to
//! price shares, forwards deposits to it, and asks it for funds when a
//! withdrawal exceeds what the vault holds itself.
//!
//! ## Share Accounting Model
//!
//! - `balance()` is the want held by the vault plus `strategy.balance()`
//! - `price_per_share = balance * 1e18 / total_supply`, 1e18 when no shares exist
//! - The first deposit mints shares 1:1 with the net amount
//! - Later deposits mint `net * total_supply / balance_before`
//! - Withdrawals pay `balance * shares / total_supply`
//!
//! All conversions truncate, so rounding always favours remaining holders and
//! the share price never falls through deposits or withdrawals.
//!
//! ## Asset Flow
//!
//! ```text
//! Deposit Flow:
//! User → [want] → [Vault] ─ fee stays in vault
//!                    │
//!                    └─ net → [Strategy idle balance]
//!                          shares minted, `deposit` emitted
//!
//! Withdraw Flow:
//! User → [Vault.withdraw(shares)] → vault-held want first
//!                                   → shortfall from [Strategy.withdraw]
//!                                     (pools liquidated largest first)
//!         shares burned, `withdraw` emitted
//! ```
//!
//! ## Storage Layout
//!
//! ### Instance Storage
//! - `Admin`: Address allowed to configure the vault
//! - `Want`: The accepted token
//! - `Strategy`: The strategy currently managing capital
//! - `DepositFeeBps`: Share of each deposit retained for existing holders
//! - `TvlCap`: Maximum managed balance, zero for no cap
//! - `TotalSupply`: Outstanding shares
//!
//! ### Persistent Storage
//! - `Shares(holder)`: Share balance of each holder
//!
//! # Examples
//!
//! ## Deposit
//! ```ignore
//! let shares = vault_client.deposit(&user, &amount);
//! ```
//!
//! ## Withdraw everything
//! ```ignore
//! let amount = vault_client.withdraw_all(&user);
//! ```

#![no_std]

use multipool_common::{
    math::{bps_of, mul_div_floor, BPS_DENOMINATOR, WAD},
    settle, Error, StrategyClient, StrategyState, VaultParams,
};
use soroban_sdk::{
    contract, contractimpl, contracttype, log, symbol_short, token, Address, Env,
};

const DAY_IN_LEDGERS: u32 = 17_280;
const BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const LIFETIME_THRESHOLD: u32 = BUMP_AMOUNT - DAY_IN_LEDGERS;

// ============================================================================
// STORAGE KEYS
// ============================================================================

/// Storage keys for vault state.
///
/// Configuration and the share supply live in instance storage; per-holder
/// share balances are persistent, one entry per holder.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    /// Administrator for configuration and strategy changes
    Admin,
    /// The token the vault accepts and pays out
    Want,
    /// Strategy currently managing the vault's capital
    Strategy,
    /// Deposit fee in basis points, retained by the vault
    DepositFeeBps,
    /// Maximum managed balance; zero means uncapped
    TvlCap,
    /// Outstanding shares
    TotalSupply,
    /// Share balance of one holder (persistent)
    Shares(Address),
    /// Held for the duration of a mutating call
    Locked,
}

// ============================================================================
// EVENTS
// ============================================================================

/// Emitted when a holder deposits.
///
/// # Topics
/// - `SymbolShort("deposit")`
#[contracttype]
pub struct DepositEvent {
    pub user: Address,
    /// Want taken from the user, fee included
    pub amount: i128,
    /// Part of `amount` retained by the vault
    pub fee: i128,
    pub shares: i128,
}

/// Emitted when a holder redeems shares.
///
/// # Topics
/// - `SymbolShort("withdraw")`
#[contracttype]
pub struct WithdrawEvent {
    pub user: Address,
    pub shares: i128,
    /// Want paid to the user
    pub amount: i128,
}

/// Emitted when the vault is attached to a strategy or moved to a new one.
///
/// # Topics
/// - `SymbolShort("strat_set")`
#[contracttype]
pub struct StrategyEvent {
    pub previous: Option<Address>,
    pub strategy: Address,
}

/// # Topics
/// - `SymbolShort("fees_set")`
#[contracttype]
pub struct DepositFeeEvent {
    pub deposit_fee_bps: u32,
}

/// # Topics
/// - `SymbolShort("cap_set")`
#[contracttype]
pub struct TvlCapEvent {
    pub tvl_cap: i128,
}

// ============================================================================
// CONTRACT
// ============================================================================

/// Multi-pool Vault - share ledger in front of a lending strategy
///
/// # Security Model
///
/// - Holders can only deposit from and withdraw to their own account
///   (`require_auth()` on the holder)
/// - Only the admin configures fees, caps and the strategy
/// - Withdrawals are never blocked by the strategy's lifecycle state
#[contract]
pub struct MultiPoolVault;

#[contractimpl]
impl MultiPoolVault {
    // ==========================================================================
    // INITIALIZATION
    // ==========================================================================

    /// Sets up the vault's configuration.
    ///
    /// Must be called once after deployment, followed by `initialize` to
    /// attach the strategy.
    ///
    /// # Arguments
    /// * `env` - The Soroban environment
    /// * `params` - Admin, want token, deposit fee (bps) and TVL cap
    ///
    /// # Errors
    /// - `AlreadyInitialized` on a second call
    /// - `Configuration` if the fee exceeds 10_000 bps or the cap is negative
    ///
    /// # Security
    /// - The admin must authorize the call
    pub fn init_vault(env: Env, params: VaultParams) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        params.admin.require_auth();
        Self::require_valid_fee(&env, params.deposit_fee_bps)?;
        Self::require_valid_cap(&env, params.tvl_cap)?;

        let instance = env.storage().instance();
        instance.set(&DataKey::Admin, &params.admin);
        instance.set(&DataKey::Want, &params.want);
        instance.set(&DataKey::DepositFeeBps, &params.deposit_fee_bps);
        instance.set(&DataKey::TvlCap, &params.tvl_cap);
        instance.set(&DataKey::TotalSupply, &0_i128);
        instance.extend_ttl(LIFETIME_THRESHOLD, BUMP_AMOUNT);
        Ok(())
    }

    /// Attaches the strategy that will manage deposits.
    ///
    /// # Arguments
    /// * `env` - The Soroban environment
    /// * `strategy` - Address of an initialized strategy contract
    ///
    /// # Errors
    /// - `NotInitialized` before `init_vault`
    /// - `AlreadyInitialized` if a strategy is already attached
    /// - `Configuration` if the strategy manages a different token
    ///
    /// # Events
    /// Emits `StrategyEvent` with no previous strategy
    pub fn initialize(env: Env, strategy: Address) -> Result<(), Error> {
        Self::require_admin(&env)?;
        Self::guarded(&env, || {
            if env.storage().instance().has(&DataKey::Strategy) {
                return Err(Error::AlreadyInitialized);
            }
            Self::require_same_want(&env, &strategy)?;
            env.storage().instance().set(&DataKey::Strategy, &strategy);

            env.events().publish(
                (symbol_short!("strat_set"),),
                StrategyEvent { previous: None, strategy },
            );
            Ok(())
        })
    }

    // ==========================================================================
    // CORE LIFECYCLE - DEPOSIT
    // ==========================================================================

    /// Deposits want and mints shares to the depositor.
    ///
    /// The deposit fee, if any, stays in the vault and accrues to holders
    /// already in it. The rest is forwarded to the strategy's idle balance.
    ///
    /// # Arguments
    /// * `env` - The Soroban environment
    /// * `user` - The depositor (must authorize)
    /// * `amount` - Want to deposit, fee included
    ///
    /// # Returns
    /// Shares minted
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount` is not positive, mints no shares, or the
    ///   outstanding shares have nothing left backing them
    /// - `NotInitialized` before a strategy is attached
    /// - `StrategyPaused` unless the strategy is active
    /// - `TvlCapExceeded` if the managed balance would pass the cap
    ///
    /// # Events
    /// Emits `DepositEvent`
    ///
    /// # Security
    /// - `user.require_auth()` ensures funds only move from the caller
    /// - Shares are priced against the balance before the transfer
    pub fn deposit(env: Env, user: Address, amount: i128) -> Result<i128, Error> {
        user.require_auth();
        Self::guarded(&env, || {
            if amount <= 0 {
                return Err(Error::ZeroAmount);
            }
            let strategy = Self::strategy_client(&env)?;
            let state = settle(strategy.try_state(), Error::NotInitialized)?;
            if state != StrategyState::Active {
                log!(&env, "deposit rejected: strategy not active", amount);
                return Err(Error::StrategyPaused);
            }

            let pool = Self::balance(env.clone());
            let cap = Self::tvl_cap(env.clone());
            if cap > 0 && pool.saturating_add(amount) > cap {
                log!(&env, "deposit exceeds tvl cap", amount, pool, cap);
                return Err(Error::TvlCapExceeded);
            }

            let fee = bps_of(amount, Self::deposit_fee(env.clone()))?;
            let net = amount - fee;
            let supply = Self::total_supply(env.clone());
            let shares = if supply == 0 {
                net
            } else if pool <= 0 {
                log!(&env, "outstanding shares have no backing", supply);
                return Err(Error::ZeroAmount);
            } else {
                mul_div_floor(net, supply, pool)?
            };
            if shares <= 0 {
                log!(&env, "deposit too small to mint shares", amount);
                return Err(Error::ZeroAmount);
            }

            let vault = env.current_contract_address();
            let want = Self::want_client(&env)?;
            want.transfer(&user, &vault, &amount);
            if net > 0 {
                want.transfer(&vault, &strategy.address, &net);
                settle(strategy.try_deposit(&net), Error::StrategyPaused)?;
            }

            Self::write_shares(&env, &user, Self::balance_of(env.clone(), user.clone()) + shares);
            Self::write_total_supply(&env, supply + shares);

            env.events().publish(
                (symbol_short!("deposit"),),
                DepositEvent { user, amount, fee, shares },
            );
            Ok(shares)
        })
    }

    /// Deposits the caller's entire want balance.
    pub fn deposit_all(env: Env, user: Address) -> Result<i128, Error> {
        let amount = Self::want_client(&env)?.balance(&user);
        Self::deposit(env, user, amount)
    }

    // ==========================================================================
    // CORE LIFECYCLE - WITHDRAW
    // ==========================================================================

    /// Burns shares and pays out their share of the managed balance.
    ///
    /// Want held by the vault is used first; any shortfall is requested from
    /// the strategy, which liquidates pools largest first.
    ///
    /// # Arguments
    /// * `env` - The Soroban environment
    /// * `user` - The holder redeeming (must authorize)
    /// * `shares` - Shares to burn
    ///
    /// # Returns
    /// Want paid to `user`
    ///
    /// # Errors
    /// - `ZeroAmount` if `shares` is not positive
    /// - `InsufficientShares` if `user` holds fewer shares
    /// - `InsufficientLiquidity` if the strategy's pools cannot pay out
    ///
    /// # Events
    /// Emits `WithdrawEvent`
    ///
    /// # Security
    /// - Allowed in every strategy state so holders can always exit
    pub fn withdraw(env: Env, user: Address, shares: i128) -> Result<i128, Error> {
        user.require_auth();
        Self::guarded(&env, || {
            if shares <= 0 {
                return Err(Error::ZeroAmount);
            }
            let held = Self::balance_of(env.clone(), user.clone());
            if shares > held {
                log!(&env, "withdraw exceeds shares held", shares, held);
                return Err(Error::InsufficientShares);
            }

            let supply = Self::total_supply(env.clone());
            let amount = mul_div_floor(Self::balance(env.clone()), shares, supply)?;
            Self::write_shares(&env, &user, held - shares);
            Self::write_total_supply(&env, supply - shares);

            let available = Self::available(env.clone());
            if amount > available {
                let strategy = Self::strategy_client(&env)?;
                settle(
                    strategy.try_withdraw(&(amount - available)),
                    Error::InsufficientLiquidity,
                )?;
            }
            if amount > 0 {
                Self::want_client(&env)?.transfer(&env.current_contract_address(), &user, &amount);
            }

            env.events().publish(
                (symbol_short!("withdraw"),),
                WithdrawEvent { user, shares, amount },
            );
            Ok(amount)
        })
    }

    /// Redeems every share the caller holds.
    pub fn withdraw_all(env: Env, user: Address) -> Result<i128, Error> {
        let shares = Self::balance_of(env.clone(), user.clone());
        Self::withdraw(env, user, shares)
    }

    // ==========================================================================
    // ADMINISTRATIVE - STRATEGY
    // ==========================================================================

    /// Points the vault at a new strategy once the current one is retired.
    ///
    /// Funds the retired strategy returned stay in the vault and keep backing
    /// existing shares.
    ///
    /// # Arguments
    /// * `env` - The Soroban environment
    /// * `strategy` - Address of the replacement strategy
    ///
    /// # Errors
    /// - `NotInitialized` if no strategy was ever attached
    /// - `InvalidStateTransition` unless the current strategy is retired
    /// - `Configuration` if the replacement manages a different token
    ///
    /// # Events
    /// Emits `StrategyEvent` naming the previous strategy
    pub fn replace_strategy(env: Env, strategy: Address) -> Result<(), Error> {
        Self::require_admin(&env)?;
        Self::guarded(&env, || {
            let current = Self::strategy_client(&env)?;
            let state = settle(current.try_state(), Error::NotInitialized)?;
            if state != StrategyState::Retired {
                log!(&env, "current strategy must be retired first");
                return Err(Error::InvalidStateTransition);
            }
            Self::require_same_want(&env, &strategy)?;
            env.storage().instance().set(&DataKey::Strategy, &strategy);

            env.events().publish(
                (symbol_short!("strat_set"),),
                StrategyEvent {
                    previous: Some(current.address),
                    strategy,
                },
            );
            Ok(())
        })
    }

    // ==========================================================================
    // ADMINISTRATIVE - CONFIGURATION
    // ==========================================================================

    /// Sets the deposit fee in basis points.
    ///
    /// # Errors
    /// - `Configuration` above 10_000 bps
    ///
    /// # Events
    /// Emits `DepositFeeEvent`
    pub fn set_deposit_fee(env: Env, deposit_fee_bps: u32) -> Result<(), Error> {
        Self::require_admin(&env)?;
        Self::require_valid_fee(&env, deposit_fee_bps)?;
        Self::guarded(&env, || {
            env.storage()
                .instance()
                .set(&DataKey::DepositFeeBps, &deposit_fee_bps);
            env.events().publish(
                (symbol_short!("fees_set"),),
                DepositFeeEvent { deposit_fee_bps },
            );
            Ok(())
        })
    }

    /// Sets the TVL cap. Zero removes the cap; lowering it below the current
    /// balance only blocks further deposits.
    ///
    /// # Errors
    /// - `Configuration` for a negative cap
    ///
    /// # Events
    /// Emits `TvlCapEvent`
    pub fn set_tvl_cap(env: Env, tvl_cap: i128) -> Result<(), Error> {
        Self::require_admin(&env)?;
        Self::require_valid_cap(&env, tvl_cap)?;
        Self::guarded(&env, || {
            env.storage().instance().set(&DataKey::TvlCap, &tvl_cap);
            env.events()
                .publish((symbol_short!("cap_set"),), TvlCapEvent { tvl_cap });
            Ok(())
        })
    }

    // ==========================================================================
    // READ FUNCTIONS
    // ==========================================================================

    /// Total want backing the shares: held by the vault plus managed by the
    /// strategy.
    pub fn balance(env: Env) -> i128 {
        let held = Self::available(env.clone());
        match Self::strategy(env.clone()) {
            Some(strategy) => held.saturating_add(StrategyClient::new(&env, &strategy).balance()),
            None => held,
        }
    }

    /// Want held by the vault itself.
    pub fn available(env: Env) -> i128 {
        match Self::want_client(&env) {
            Ok(want) => want.balance(&env.current_contract_address()),
            Err(_) => 0,
        }
    }

    /// Value of one share, WAD scaled. 1.0 while no shares exist.
    ///
    /// # Errors
    /// - `ArithmeticOverflow` if the balance is too large to scale
    pub fn get_price_per_full_share(env: Env) -> Result<i128, Error> {
        let supply = Self::total_supply(env.clone());
        if supply == 0 {
            return Ok(WAD);
        }
        mul_div_floor(Self::balance(env), WAD, supply)
    }

    /// Share balance of `user`.
    pub fn balance_of(env: Env, user: Address) -> i128 {
        let key = DataKey::Shares(user);
        let shares: Option<i128> = env.storage().persistent().get(&key);
        match shares {
            Some(shares) => {
                env.storage()
                    .persistent()
                    .extend_ttl(&key, LIFETIME_THRESHOLD, BUMP_AMOUNT);
                shares
            }
            None => 0,
        }
    }

    pub fn total_supply(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::TotalSupply)
            .unwrap_or(0)
    }

    pub fn strategy(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Strategy)
    }

    pub fn want(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::Want)
            .ok_or(Error::NotInitialized)
    }

    /// Deposit fee in basis points.
    pub fn deposit_fee(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::DepositFeeBps)
            .unwrap_or(0)
    }

    /// TVL cap, zero if uncapped.
    pub fn tvl_cap(env: Env) -> i128 {
        env.storage().instance().get(&DataKey::TvlCap).unwrap_or(0)
    }

    // ==========================================================================
    // INTERNAL HELPERS
    // ==========================================================================

    /// Runs `op` holding the operation lock and refreshes the instance TTL.
    fn guarded<T>(env: &Env, op: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
        let instance = env.storage().instance();
        if instance.get(&DataKey::Locked).unwrap_or(false) {
            return Err(Error::Reentrant);
        }
        instance.set(&DataKey::Locked, &true);
        let result = op();
        instance.remove(&DataKey::Locked);
        instance.extend_ttl(LIFETIME_THRESHOLD, BUMP_AMOUNT);
        result
    }

    #[inline]
    fn require_admin(env: &Env) -> Result<(), Error> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(Error::NotInitialized)?;
        admin.require_auth();
        Ok(())
    }

    #[inline]
    fn require_valid_fee(env: &Env, deposit_fee_bps: u32) -> Result<(), Error> {
        if deposit_fee_bps as i128 > BPS_DENOMINATOR {
            log!(env, "deposit fee above 100%", deposit_fee_bps);
            return Err(Error::Configuration);
        }
        Ok(())
    }

    #[inline]
    fn require_valid_cap(env: &Env, tvl_cap: i128) -> Result<(), Error> {
        if tvl_cap < 0 {
            log!(env, "negative tvl cap", tvl_cap);
            return Err(Error::Configuration);
        }
        Ok(())
    }

    /// Fails with `Configuration` unless `strategy` manages the vault's token.
    fn require_same_want(env: &Env, strategy: &Address) -> Result<(), Error> {
        let want = Self::want(env.clone())?;
        let managed = settle(
            StrategyClient::new(env, strategy).try_want(),
            Error::Configuration,
        )?;
        if managed != want {
            log!(env, "strategy manages a different token", strategy);
            return Err(Error::Configuration);
        }
        Ok(())
    }

    fn strategy_client(env: &Env) -> Result<StrategyClient<'_>, Error> {
        let strategy = Self::strategy(env.clone()).ok_or(Error::NotInitialized)?;
        Ok(StrategyClient::new(env, &strategy))
    }

    fn want_client(env: &Env) -> Result<token::Client<'_>, Error> {
        Ok(token::Client::new(env, &Self::want(env.clone())?))
    }

    fn write_shares(env: &Env, user: &Address, shares: i128) {
        let key = DataKey::Shares(user.clone());
        if shares == 0 {
            env.storage().persistent().remove(&key);
            return;
        }
        env.storage().persistent().set(&key, &shares);
        env.storage()
            .persistent()
            .extend_ttl(&key, LIFETIME_THRESHOLD, BUMP_AMOUNT);
    }

    fn write_total_supply(env: &Env, supply: i128) {
        env.storage().instance().set(&DataKey::TotalSupply, &supply);
    }
}

#[cfg(test)]
mod test;
