//! Client interfaces for the contracts the vault and strategy call into.

use soroban_sdk::{contractclient, Address, Env};

use crate::{Error, StrategyState};

/// What the vault needs from its strategy.
#[contractclient(name = "StrategyClient")]
pub trait StrategyInterface {
    fn want(env: Env) -> Result<Address, Error>;

    fn state(env: Env) -> Result<StrategyState, Error>;

    /// Total underlying managed by the strategy, truncated.
    fn balance(env: Env) -> i128;

    /// Takes `amount` of want, already transferred by the vault, into idle balance.
    fn deposit(env: Env, amount: i128) -> Result<(), Error>;

    /// Frees `amount` of want (liquidating pools if needed) and sends it to the vault.
    fn withdraw(env: Env, amount: i128) -> Result<i128, Error>;
}

/// External yield-bearing pool. The caller transfers the underlying before
/// calling `supply`; the pool pays out directly on `redeem` and `claim_yield`.
#[contractclient(name = "PoolClient")]
pub trait PoolInterface {
    fn supply(env: Env, from: Address, amount: i128) -> i128;

    fn redeem(env: Env, to: Address, receipts: i128) -> i128;

    /// Receipt-to-underlying rate, WAD scaled.
    fn exchange_rate(env: Env) -> i128;

    fn claim_yield(env: Env, to: Address) -> i128;

    fn pending_yield(env: Env, holder: Address) -> i128;
}

/// Resolves pool indexes for one router kind.
#[contractclient(name = "RouterClient")]
pub trait RouterInterface {
    fn pool(env: Env, index: u32) -> Option<Address>;
}

/// Collapses the nested result of a generated `try_` call onto [`Error`].
///
/// A contract error raised by the callee is passed through unchanged; host
/// failures and conversion failures become `fallback`.
pub fn settle<T, C, I>(
    result: Result<Result<T, C>, Result<Error, I>>,
    fallback: Error,
) -> Result<T, Error> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Err(Ok(error)) => Err(error),
        _ => Err(fallback),
    }
}
