use soroban_sdk::{contracttype, Address, Map};

use crate::{math::BPS_DENOMINATOR, Error};

/// Identity of an external pool: the router kind that resolves and services it
/// plus its index within that router.
///
/// The kind is kept as a raw tag so an unrecognized kind reaches the registry
/// and is rejected there with `InvalidPool` instead of failing decoding.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolId {
    pub router_kind: u32,
    pub index: u32,
}

/// Adapter families the strategy knows how to talk to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum RouterKind {
    /// Receipt tokens appreciate against the underlying; yield is rate growth.
    Appreciating = 0,
    /// Receipts are 1:1 with the underlying; yield is paid out on claim.
    Distributing = 1,
}

impl RouterKind {
    pub fn from_tag(tag: u32) -> Result<Self, Error> {
        match tag {
            0 => Ok(RouterKind::Appreciating),
            1 => Ok(RouterKind::Distributing),
            _ => Err(Error::InvalidPool),
        }
    }
}

/// Registry entry for a pool the strategy has seen.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolRecord {
    pub address: Address,
    pub in_use: bool,
    /// Last observed receipt-to-underlying rate, WAD scaled.
    pub exchange_rate: i128,
    pub rate_updated_at: u64,
}

/// A rebalance target: the committed amount (underlying units) wanted in `pool`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Allocation {
    pub pool: PoolId,
    pub amount: i128,
}

/// Reported by `get_pool_balances`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolBalance {
    pub pool: PoolId,
    pub address: Address,
    pub allocation: i128,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StrategyState {
    Active,
    Paused,
    Panicked,
    Retired,
}

/// Harvest fee split in basis points. The four parts must sum to 10_000.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeConfig {
    pub call_fee_bps: u32,
    pub treasury_fee_bps: u32,
    pub strategist_fee_bps: u32,
    pub retained_bps: u32,
}

impl FeeConfig {
    pub fn validate(&self) -> Result<(), Error> {
        let total = self.call_fee_bps as i128
            + self.treasury_fee_bps as i128
            + self.strategist_fee_bps as i128
            + self.retained_bps as i128;
        if total != BPS_DENOMINATOR {
            return Err(Error::Configuration);
        }
        Ok(())
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HarvestLogEntry {
    pub timestamp: u64,
    pub realized_profit: i128,
    pub total_balance_before: i128,
    pub total_balance_after: i128,
}

/// Constructor input for the strategy.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StrategyParams {
    pub vault: Address,
    pub want: Address,
    pub admin: Address,
    /// Receives the treasury share of harvest profit.
    pub treasury: Address,
    /// Receives the strategist share of harvest profit. Holds no privileges.
    pub strategist: Address,
    /// Router contract per router kind tag.
    pub routers: Map<u32, Address>,
    pub fees: FeeConfig,
}

/// Constructor input for the vault.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VaultParams {
    pub admin: Address,
    pub want: Address,
    /// Share of each deposit kept by the vault for existing holders.
    pub deposit_fee_bps: u32,
    /// Zero means uncapped.
    pub tvl_cap: i128,
}
