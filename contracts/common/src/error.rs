use soroban_sdk::contracterror;

/// Failure kinds shared by the vault and the strategy.
///
/// Every variant is a local condition the caller can recover from. The host
/// discards all state changes of an invocation that returns one of these, so a
/// failed call never leaves the ledger half-updated.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    /// Router kind not recognized, no router configured for it, or the router
    /// has no pool at the requested index.
    InvalidPool = 3,
    /// The pool still holds receipts.
    PoolNotEmpty = 4,
    /// The pool is not in the used set.
    PoolNotRegistered = 5,
    /// A rebalance asks for more capital than idle plus freed balance covers.
    InsufficientIdleBalance = 6,
    /// Pools cannot release enough underlying to cover a payout.
    InsufficientLiquidity = 7,
    /// The strategy state does not allow the operation.
    StrategyPaused = 8,
    /// Retirement attempted while pools still hold capital.
    NonZeroBalance = 9,
    TvlCapExceeded = 10,
    ZeroAmount = 11,
    /// Fee fractions do not sum to 1.0, or another parameter is out of range.
    Configuration = 12,
    InvalidStateTransition = 13,
    StrategyRetired = 14,
    InsufficientShares = 15,
    NegativeAmount = 16,
    ArithmeticOverflow = 17,
    Reentrant = 18,
}
