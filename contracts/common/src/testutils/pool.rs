use soroban_sdk::{contract, contractimpl, contracttype, token, Address, Env};

use crate::math::{mul_div_floor, to_underlying, WAD};

#[contracttype]
enum PoolKey {
    Token,
    Rate,
    Frozen,
    Receipts(Address),
    Pending(Address),
}

/// Lending-style pool with a settable exchange rate, claimable yield and a
/// freeze switch that makes redemptions fail.
///
/// Yield and appreciation are bookkeeping only: tests mint the matching
/// underlying to the pool address themselves.
#[contract]
pub struct MockPool;

#[contractimpl]
impl MockPool {
    pub fn setup(env: Env, token: Address, rate: i128) {
        env.storage().instance().set(&PoolKey::Token, &token);
        env.storage().instance().set(&PoolKey::Rate, &rate);
        env.storage().instance().set(&PoolKey::Frozen, &false);
    }

    pub fn set_exchange_rate(env: Env, rate: i128) {
        env.storage().instance().set(&PoolKey::Rate, &rate);
    }

    pub fn accrue_yield(env: Env, holder: Address, amount: i128) {
        let pending = Self::pending_yield(env.clone(), holder.clone());
        env.storage()
            .instance()
            .set(&PoolKey::Pending(holder), &(pending + amount));
    }

    pub fn set_frozen(env: Env, frozen: bool) {
        env.storage().instance().set(&PoolKey::Frozen, &frozen);
    }

    pub fn receipts_of(env: Env, holder: Address) -> i128 {
        env.storage()
            .instance()
            .get(&PoolKey::Receipts(holder))
            .unwrap_or(0)
    }

    pub fn supply(env: Env, from: Address, amount: i128) -> i128 {
        from.require_auth();
        let receipts = mul_div_floor(amount, WAD, Self::exchange_rate(env.clone())).unwrap();
        let held = Self::receipts_of(env.clone(), from.clone());
        env.storage()
            .instance()
            .set(&PoolKey::Receipts(from), &(held + receipts));
        receipts
    }

    pub fn redeem(env: Env, to: Address, receipts: i128) -> i128 {
        to.require_auth();
        let frozen: bool = env.storage().instance().get(&PoolKey::Frozen).unwrap_or(false);
        if frozen {
            panic!("pool frozen");
        }
        let held = Self::receipts_of(env.clone(), to.clone());
        assert!(receipts <= held, "redeem exceeds receipts");

        let underlying = to_underlying(receipts, Self::exchange_rate(env.clone()));
        env.storage()
            .instance()
            .set(&PoolKey::Receipts(to.clone()), &(held - receipts));
        Self::token(&env).transfer(&env.current_contract_address(), &to, &underlying);
        underlying
    }

    pub fn exchange_rate(env: Env) -> i128 {
        env.storage().instance().get(&PoolKey::Rate).unwrap_or(WAD)
    }

    pub fn claim_yield(env: Env, to: Address) -> i128 {
        to.require_auth();
        let amount = Self::pending_yield(env.clone(), to.clone());
        if amount > 0 {
            env.storage().instance().remove(&PoolKey::Pending(to.clone()));
            Self::token(&env).transfer(&env.current_contract_address(), &to, &amount);
        }
        amount
    }

    pub fn pending_yield(env: Env, holder: Address) -> i128 {
        env.storage()
            .instance()
            .get(&PoolKey::Pending(holder))
            .unwrap_or(0)
    }

    fn token(env: &Env) -> token::Client<'_> {
        let address: Address = env.storage().instance().get(&PoolKey::Token).unwrap();
        token::Client::new(env, &address)
    }
}
