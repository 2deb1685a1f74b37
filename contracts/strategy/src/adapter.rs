//! Pool adapters, one variant per router kind.

use multipool_common::{math::WAD, Error, PoolClient, PoolId, PoolRecord, RouterKind};
use soroban_sdk::{log, token, Address, Env};

use crate::storage;

/// Capability set the allocator needs from a pool: `supply`, `redeem`,
/// `exchange_rate` and `claim_yield`, dispatched on the pool's router kind.
pub(crate) struct PoolAdapter<'a> {
    env: &'a Env,
    kind: RouterKind,
    address: Address,
    pool: PoolClient<'a>,
}

impl<'a> PoolAdapter<'a> {
    pub(crate) fn new(env: &'a Env, id: &PoolId, address: &Address) -> Result<Self, Error> {
        Ok(Self {
            env,
            kind: RouterKind::from_tag(id.router_kind)?,
            address: address.clone(),
            pool: PoolClient::new(env, address),
        })
    }

    pub(crate) fn for_record(
        env: &'a Env,
        id: &PoolId,
        record: &PoolRecord,
    ) -> Result<Self, Error> {
        Self::new(env, id, &record.address)
    }

    /// Moves `amount` of want into the pool, returning the receipts credited.
    pub(crate) fn supply(&self, amount: i128) -> Result<i128, Error> {
        let strategy = self.env.current_contract_address();
        let want = token::Client::new(self.env, &storage::want(self.env)?);
        want.transfer(&strategy, &self.address, &amount);

        match self.pool.try_supply(&strategy, &amount) {
            Ok(Ok(receipts)) if receipts >= 0 => Ok(receipts),
            _ => {
                log!(self.env, "pool rejected supply", self.address, amount);
                Err(Error::InvalidPool)
            }
        }
    }

    /// Burns `receipts`, returning the underlying paid back to the strategy.
    pub(crate) fn redeem(&self, receipts: i128) -> Result<i128, Error> {
        let strategy = self.env.current_contract_address();
        match self.pool.try_redeem(&strategy, &receipts) {
            Ok(Ok(underlying)) => Ok(underlying),
            _ => {
                log!(self.env, "pool could not redeem", self.address, receipts);
                Err(Error::InsufficientLiquidity)
            }
        }
    }

    /// Current receipt-to-underlying rate, WAD scaled.
    pub(crate) fn exchange_rate(&self) -> Result<i128, Error> {
        match self.kind {
            RouterKind::Appreciating => match self.pool.try_exchange_rate() {
                Ok(Ok(rate)) if rate > 0 => Ok(rate),
                _ => {
                    log!(self.env, "pool reported no usable rate", self.address);
                    Err(Error::InvalidPool)
                }
            },
            RouterKind::Distributing => Ok(WAD),
        }
    }

    /// Pulls accrued yield into the strategy's idle balance.
    pub(crate) fn claim_yield(&self) -> Result<i128, Error> {
        match self.kind {
            RouterKind::Appreciating => Ok(0),
            RouterKind::Distributing => {
                let strategy = self.env.current_contract_address();
                match self.pool.try_claim_yield(&strategy) {
                    Ok(Ok(claimed)) if claimed >= 0 => Ok(claimed),
                    _ => {
                        log!(self.env, "pool yield claim failed", self.address);
                        Err(Error::InvalidPool)
                    }
                }
            }
        }
    }

    /// Yield `claim_yield` would pay right now. Zero when the pool cannot say.
    pub(crate) fn pending_yield(&self) -> i128 {
        match self.kind {
            RouterKind::Appreciating => 0,
            RouterKind::Distributing => {
                let strategy = self.env.current_contract_address();
                match self.pool.try_pending_yield(&strategy) {
                    Ok(Ok(pending)) if pending > 0 => pending,
                    _ => 0,
                }
            }
        }
    }
}
