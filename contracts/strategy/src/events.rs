use multipool_common::{PoolId, StrategyState};
use soroban_sdk::{contracttype, symbol_short, Address, Env, Vec};

#[contracttype]
pub struct CapitalEvent {
    pub amount: i128,
    pub balance: i128,
}

#[contracttype]
pub struct PoolsEvent {
    pub pools: Vec<PoolId>,
}

#[contracttype]
pub struct RebalanceEvent {
    pub idle: i128,
    pub committed: i128,
}

#[contracttype]
pub struct HarvestEvent {
    pub caller: Address,
    pub profit: i128,
    pub call_fee: i128,
}

#[contracttype]
pub struct StateEvent {
    pub from: StrategyState,
    pub to: StrategyState,
    pub amount: i128,
}

pub(crate) fn deposited(env: &Env, amount: i128, balance: i128) {
    env.events()
        .publish((symbol_short!("deposit"),), CapitalEvent { amount, balance });
}

pub(crate) fn withdrawn(env: &Env, amount: i128, balance: i128) {
    env.events()
        .publish((symbol_short!("withdraw"),), CapitalEvent { amount, balance });
}

pub(crate) fn pools_added(env: &Env, pools: Vec<PoolId>) {
    env.events()
        .publish((symbol_short!("pool_add"),), PoolsEvent { pools });
}

pub(crate) fn pools_removed(env: &Env, pools: Vec<PoolId>) {
    env.events()
        .publish((symbol_short!("pool_rm"),), PoolsEvent { pools });
}

pub(crate) fn rebalanced(env: &Env, idle: i128, committed: i128) {
    env.events()
        .publish((symbol_short!("rebalance"),), RebalanceEvent { idle, committed });
}

pub(crate) fn rates_updated(env: &Env, balance: i128) {
    env.events()
        .publish((symbol_short!("rates"),), CapitalEvent { amount: 0, balance });
}

pub(crate) fn reclaimed(env: &Env, amount: i128, balance: i128) {
    env.events()
        .publish((symbol_short!("reclaim"),), CapitalEvent { amount, balance });
}

pub(crate) fn harvested(env: &Env, caller: &Address, profit: i128, call_fee: i128) {
    env.events().publish(
        (symbol_short!("harvest"),),
        HarvestEvent {
            caller: caller.clone(),
            profit,
            call_fee,
        },
    );
}

pub(crate) fn state_changed(env: &Env, from: StrategyState, to: StrategyState, amount: i128) {
    let topic = match to {
        StrategyState::Active => symbol_short!("unpause"),
        StrategyState::Paused => symbol_short!("pause"),
        StrategyState::Panicked => symbol_short!("panic"),
        StrategyState::Retired => symbol_short!("retire"),
    };
    env.events()
        .publish((topic,), StateEvent { from, to, amount });
}
