//! Pause / panic / retire state machine.
//!
//! ```text
//! Active <-> Paused
//! Active | Paused -> Panicked      (every pool redeemed to idle)
//! Active | Paused | Panicked -> Retired   (no receipts left; idle sent to vault)
//! ```

use multipool_common::{Error, StrategyState};
use soroban_sdk::{log, token, Env};

use crate::{events, ledger, rebalance, storage};

fn transition(
    env: &Env,
    from: &[StrategyState],
    to: StrategyState,
) -> Result<StrategyState, Error> {
    let current = storage::state(env)?;
    if !from.contains(&current) {
        log!(env, "invalid strategy state transition");
        return Err(Error::InvalidStateTransition);
    }
    storage::set_state(env, to);
    Ok(current)
}

pub(crate) fn pause(env: &Env) -> Result<(), Error> {
    let from = transition(env, &[StrategyState::Active], StrategyState::Paused)?;
    events::state_changed(env, from, StrategyState::Paused, 0);
    Ok(())
}

pub(crate) fn unpause(env: &Env) -> Result<(), Error> {
    let from = transition(env, &[StrategyState::Paused], StrategyState::Active)?;
    events::state_changed(env, from, StrategyState::Active, 0);
    Ok(())
}

/// Emergency exit: every pool is redeemed to idle and the strategy stops
/// taking deposits or allocation changes. Returns the underlying freed.
pub(crate) fn panic(env: &Env) -> Result<i128, Error> {
    let from = transition(
        env,
        &[StrategyState::Active, StrategyState::Paused],
        StrategyState::Panicked,
    )?;
    let freed = rebalance::reclaim_all(env)?;
    events::state_changed(env, from, StrategyState::Panicked, freed);
    Ok(freed)
}

/// Terminal decommissioning. Requires every pool to be empty; idle want goes
/// back to the vault. Returns the amount returned.
pub(crate) fn retire(env: &Env) -> Result<i128, Error> {
    let from = storage::state(env)?;
    if from == StrategyState::Retired {
        return Err(Error::InvalidStateTransition);
    }
    let allocations = storage::allocations(env);
    for (id, receipts) in allocations.iter() {
        if receipts != 0 {
            log!(env, "cannot retire with committed balance", id.router_kind, id.index, receipts);
            return Err(Error::NonZeroBalance);
        }
    }

    let returned = ledger::idle(env);
    if returned > 0 {
        token::Client::new(env, &storage::want(env)?).transfer(
            &env.current_contract_address(),
            &storage::vault(env)?,
            &returned,
        );
    }
    storage::set_state(env, StrategyState::Retired);
    events::state_changed(env, from, StrategyState::Retired, returned);
    Ok(returned)
}
