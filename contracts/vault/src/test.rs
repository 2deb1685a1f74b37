#![cfg(test)]

use super::*;
use multipool_common::{
    testutils::{MockPool, MockPoolClient, MockRouter, MockRouterClient},
    Allocation, FeeConfig, PoolId, StrategyParams,
};
use multipool_strategy::{MultiPoolStrategy, MultiPoolStrategyClient};
use soroban_sdk::{
    testutils::{Address as _, Events},
    token::{StellarAssetClient, TokenClient},
    vec, Address, Env, IntoVal, Map, TryFromVal, Val, Vec,
};

const APPRECIATING: u32 = 0;
const DISTRIBUTING: u32 = 1;

struct Setup<'a> {
    env: Env,
    vault: MultiPoolVaultClient<'a>,
    strategy: MultiPoolStrategyClient<'a>,
    token: TokenClient<'a>,
    minter: StellarAssetClient<'a>,
    router: MockRouterClient<'a>,
    appreciating: MockRouterClient<'a>,
    admin: Address,
}

fn setup_vault<'a>(deposit_fee_bps: u32, tvl_cap: i128) -> Setup<'a> {
    let env = Env::default();
    env.mock_all_auths();

    let admin = Address::generate(&env);
    let want = env.register_stellar_asset_contract(Address::generate(&env));
    let token = TokenClient::new(&env, &want);
    let minter = StellarAssetClient::new(&env, &want);
    let router = MockRouterClient::new(&env, &env.register_contract(None, MockRouter));
    let appreciating = MockRouterClient::new(&env, &env.register_contract(None, MockRouter));

    let vault = MultiPoolVaultClient::new(&env, &env.register_contract(None, MultiPoolVault));
    vault.init_vault(&VaultParams {
        admin: admin.clone(),
        want: want.clone(),
        deposit_fee_bps,
        tvl_cap,
    });

    let mut routers = Map::new(&env);
    routers.set(APPRECIATING, appreciating.address.clone());
    routers.set(DISTRIBUTING, router.address.clone());
    let strategy = deploy_strategy(&env, &vault.address, &want, &admin, &routers);
    vault.initialize(&strategy.address);

    Setup {
        env,
        vault,
        strategy,
        token,
        minter,
        router,
        appreciating,
        admin,
    }
}

fn deploy_strategy<'a>(
    env: &Env,
    vault: &Address,
    want: &Address,
    admin: &Address,
    routers: &Map<u32, Address>,
) -> MultiPoolStrategyClient<'a> {
    let strategy_id = env.register_contract(None, MultiPoolStrategy);
    let strategy = MultiPoolStrategyClient::new(env, &strategy_id);
    strategy.initialize(&StrategyParams {
        vault: vault.clone(),
        want: want.clone(),
        admin: admin.clone(),
        treasury: Address::generate(env),
        strategist: Address::generate(env),
        routers: routers.clone(),
        fees: FeeConfig {
            call_fee_bps: 100,
            treasury_fee_bps: 500,
            strategist_fee_bps: 200,
            retained_bps: 9_200,
        },
    });
    strategy
}

impl<'a> Setup<'a> {
    fn user_with(&self, amount: i128) -> Address {
        let user = Address::generate(&self.env);
        self.minter.mint(&user, &amount);
        user
    }

    fn routers(&self) -> Map<u32, Address> {
        let mut routers = Map::new(&self.env);
        routers.set(APPRECIATING, self.appreciating.address.clone());
        routers.set(DISTRIBUTING, self.router.address.clone());
        routers
    }

    /// Registers a pool of `kind` with the strategy at a rate of 1.0.
    fn add_pool(&self, kind: u32, index: u32) -> (PoolId, MockPoolClient<'a>) {
        let pool = MockPoolClient::new(&self.env, &self.env.register_contract(None, MockPool));
        pool.setup(&self.token.address, &WAD);
        let router = if kind == APPRECIATING {
            &self.appreciating
        } else {
            &self.router
        };
        router.register_pool(&index, &pool.address);

        let id = PoolId {
            router_kind: kind,
            index,
        };
        self.strategy.add_used_pools(&vec![&self.env, id.clone()]);
        (id, pool)
    }

    /// Adds a distributing pool to the strategy and commits `amount` to it.
    fn commit_to_pool(&self, index: u32, amount: i128) -> (PoolId, MockPoolClient<'a>) {
        let (id, pool) = self.add_pool(DISTRIBUTING, index);
        self.strategy.rebalance(&vec![
            &self.env,
            Allocation {
                pool: id.clone(),
                amount,
            },
        ]);
        (id, pool)
    }

    fn pps(&self) -> i128 {
        self.vault.get_price_per_full_share()
    }
}

// ============================================================================
// INITIALIZATION
// ============================================================================

#[test]
fn test_empty_vault_prices_share_at_one() {
    let s = setup_vault(0, 0);
    assert_eq!(s.pps(), WAD);
    assert_eq!(s.vault.balance(), 0);
    assert_eq!(s.vault.total_supply(), 0);
    assert_eq!(s.vault.strategy(), Some(s.strategy.address.clone()));
    assert_eq!(s.vault.want(), s.token.address);
}

#[test]
fn test_init_vault_twice_fails() {
    let s = setup_vault(0, 0);
    let params = VaultParams {
        admin: s.admin.clone(),
        want: s.token.address.clone(),
        deposit_fee_bps: 0,
        tvl_cap: 0,
    };
    assert_eq!(s.vault.try_init_vault(&params), Err(Ok(Error::AlreadyInitialized)));
    assert_eq!(
        s.vault.try_initialize(&s.strategy.address),
        Err(Ok(Error::AlreadyInitialized))
    );
}

#[test]
fn test_init_vault_rejects_bad_configuration() {
    let env = Env::default();
    env.mock_all_auths();
    let vault = MultiPoolVaultClient::new(&env, &env.register_contract(None, MultiPoolVault));
    let mut params = VaultParams {
        admin: Address::generate(&env),
        want: Address::generate(&env),
        deposit_fee_bps: 10_001,
        tvl_cap: 0,
    };
    assert_eq!(vault.try_init_vault(&params), Err(Ok(Error::Configuration)));

    params.deposit_fee_bps = 0;
    params.tvl_cap = -1;
    assert_eq!(vault.try_init_vault(&params), Err(Ok(Error::Configuration)));
}

#[test]
fn test_initialize_rejects_strategy_for_other_token() {
    let env = Env::default();
    env.mock_all_auths();
    let admin = Address::generate(&env);
    let want = env.register_stellar_asset_contract(Address::generate(&env));
    let other = env.register_stellar_asset_contract(Address::generate(&env));
    let router = env.register_contract(None, MockRouter);

    let vault = MultiPoolVaultClient::new(&env, &env.register_contract(None, MultiPoolVault));
    vault.init_vault(&VaultParams {
        admin: admin.clone(),
        want,
        deposit_fee_bps: 0,
        tvl_cap: 0,
    });
    let mut routers = Map::new(&env);
    routers.set(DISTRIBUTING, router);
    let strategy = deploy_strategy(&env, &vault.address, &other, &admin, &routers);

    assert_eq!(
        vault.try_initialize(&strategy.address),
        Err(Ok(Error::Configuration))
    );
    assert_eq!(vault.strategy(), None);
}

// ============================================================================
// DEPOSIT
// ============================================================================

#[test]
fn test_first_deposit_mints_one_to_one() {
    let s = setup_vault(0, 0);
    let user = s.user_with(1_000);

    assert_eq!(s.vault.deposit(&user, &1_000), 1_000);
    assert_eq!(s.vault.balance_of(&user), 1_000);
    assert_eq!(s.vault.total_supply(), 1_000);
    assert_eq!(s.pps(), WAD);

    assert_eq!(s.strategy.balance(), 1_000);
    assert_eq!(s.strategy.balance_of_want(), 1_000);
    assert_eq!(s.vault.available(), 0);
    assert_eq!(s.token.balance(&user), 0);

    let (_, _, data) = s.env.events().all().last().unwrap();
    let event = DepositEvent::try_from_val(&s.env, &data).unwrap();
    assert_eq!(event.user, user);
    assert_eq!(event.amount, 1_000);
    assert_eq!(event.fee, 0);
    assert_eq!(event.shares, 1_000);
}

#[test]
fn test_deposit_fee_stays_with_holders() {
    let s = setup_vault(100, 0);
    let first = s.user_with(1_000);
    let second = s.user_with(1_000);

    assert_eq!(s.vault.deposit(&first, &1_000), 990);
    assert_eq!(s.vault.available(), 10);
    assert_eq!(s.strategy.balance(), 990);
    let after_first = s.pps();
    assert!(after_first > WAD);

    // 990 net at a balance of 1_000 over 990 shares
    assert_eq!(s.vault.deposit(&second, &1_000), 980);
    assert!(s.pps() >= after_first);

    let returned = s.vault.withdraw_all(&second);
    assert!(returned <= 1_000);
    assert!(1_000 - returned <= 10);
    assert_eq!(s.vault.balance_of(&second), 0);
}

#[test]
fn test_deposit_all_uses_whole_balance() {
    let s = setup_vault(0, 0);
    let user = s.user_with(750);

    assert_eq!(s.vault.deposit_all(&user), 750);
    assert_eq!(s.token.balance(&user), 0);
    assert_eq!(s.vault.balance(), 750);
}

#[test]
fn test_deposit_rejects_zero_amount() {
    let s = setup_vault(0, 0);
    let user = s.user_with(10);
    assert_eq!(s.vault.try_deposit(&user, &0), Err(Ok(Error::ZeroAmount)));
    assert_eq!(s.vault.try_deposit(&user, &-5), Err(Ok(Error::ZeroAmount)));
}

#[test]
fn test_deposit_respects_tvl_cap() {
    let s = setup_vault(0, 1_500);
    let user = s.user_with(2_100);

    s.vault.deposit(&user, &1_000);
    assert_eq!(
        s.vault.try_deposit(&user, &600),
        Err(Ok(Error::TvlCapExceeded))
    );
    assert_eq!(s.token.balance(&user), 1_100);

    s.vault.deposit(&user, &500);
    assert_eq!(s.vault.balance(), 1_500);

    s.vault.set_tvl_cap(&0);
    s.vault.deposit(&user, &600);
    assert_eq!(s.vault.balance(), 2_100);
}

#[test]
fn test_deposit_blocked_while_strategy_paused() {
    let s = setup_vault(0, 0);
    let user = s.user_with(1_000);
    s.strategy.pause();

    assert_eq!(
        s.vault.try_deposit(&user, &1_000),
        Err(Ok(Error::StrategyPaused))
    );
    assert_eq!(s.token.balance(&user), 1_000);
    assert_eq!(s.vault.total_supply(), 0);

    s.strategy.unpause();
    assert_eq!(s.vault.deposit(&user, &1_000), 1_000);
}

#[test]
fn test_deposit_rejected_when_shares_have_no_backing() {
    let s = setup_vault(0, 0);
    let user = s.user_with(1_000);
    s.vault.deposit(&user, &1_000);
    let (id, pool) = s.add_pool(APPRECIATING, 1);
    s.strategy.rebalance(&vec![
        &s.env,
        Allocation {
            pool: id,
            amount: 1_000,
        },
    ]);

    // receipts written down to nothing
    pool.set_exchange_rate(&1);
    s.strategy.update_exchange_rates();
    assert_eq!(s.vault.balance(), 0);

    let late = s.user_with(500);
    assert_eq!(s.vault.try_deposit(&late, &500), Err(Ok(Error::ZeroAmount)));
    assert_eq!(s.vault.total_supply(), 1_000);
    assert_eq!(s.token.balance(&late), 500);
}

// ============================================================================
// WITHDRAW
// ============================================================================

#[test]
fn test_withdraw_liquidates_pool_shortfall() {
    let s = setup_vault(0, 0);
    let user = s.user_with(1_000);
    s.vault.deposit(&user, &1_000);
    let (id, _) = s.commit_to_pool(1, 800);

    assert_eq!(s.vault.withdraw(&user, &500), 500);
    assert_eq!(s.token.balance(&user), 500);
    assert_eq!(s.vault.balance_of(&user), 500);
    assert_eq!(s.strategy.want_supplied_to_pool(&id), 500);
    assert_eq!(s.strategy.balance_of_want(), 0);
    assert_eq!(s.pps(), WAD);
}

#[test]
fn test_withdraw_rejects_more_than_held() {
    let s = setup_vault(0, 0);
    let user = s.user_with(100);
    s.vault.deposit(&user, &100);

    assert_eq!(
        s.vault.try_withdraw(&user, &101),
        Err(Ok(Error::InsufficientShares))
    );
    assert_eq!(s.vault.try_withdraw(&user, &0), Err(Ok(Error::ZeroAmount)));
}

#[test]
fn test_withdraw_from_illiquid_pool_changes_nothing() {
    let s = setup_vault(0, 0);
    let user = s.user_with(1_000);
    s.vault.deposit(&user, &1_000);
    let (_, pool) = s.commit_to_pool(1, 1_000);
    pool.set_frozen(&true);

    assert_eq!(
        s.vault.try_withdraw_all(&user),
        Err(Ok(Error::InsufficientLiquidity))
    );
    assert_eq!(s.vault.balance_of(&user), 1_000);
    assert_eq!(s.vault.total_supply(), 1_000);
    assert_eq!(s.token.balance(&user), 0);
}

#[test]
fn test_withdraw_allowed_while_strategy_panicked() {
    let s = setup_vault(0, 0);
    let user = s.user_with(1_000);
    s.vault.deposit(&user, &1_000);
    s.commit_to_pool(1, 600);

    s.strategy.panic();
    assert_eq!(s.vault.withdraw_all(&user), 1_000);
    assert_eq!(s.token.balance(&user), 1_000);
    assert_eq!(s.vault.total_supply(), 0);
    assert_eq!(s.pps(), WAD);
}

#[test]
fn test_harvest_raises_share_price() {
    let s = setup_vault(0, 0);
    let user = s.user_with(1_000);
    let keeper = Address::generate(&s.env);
    s.vault.deposit(&user, &1_000);
    let (_, pool) = s.commit_to_pool(1, 1_000);

    pool.accrue_yield(&s.strategy.address, &100);
    s.minter.mint(&pool.address, &100);
    let before = s.pps();
    assert_eq!(s.strategy.harvest(&keeper), 100);

    // 100 profit minus 8 in fees stays with the single holder
    assert_eq!(s.vault.balance(), 1_092);
    assert!(s.pps() > before);
    assert_eq!(s.pps(), WAD + WAD * 92 / 1_000);
    assert_eq!(s.vault.withdraw_all(&user), 1_092);
}

#[test]
fn test_share_price_holds_when_refreshed_gain_is_harvested() {
    let s = setup_vault(0, 0);
    let alice = s.user_with(1_000);
    let bob = s.user_with(1_000);
    let keeper = Address::generate(&s.env);
    s.vault.deposit(&alice, &1_000);
    s.vault.deposit(&bob, &1_000);
    let (id, pool) = s.add_pool(APPRECIATING, 1);
    s.strategy.rebalance(&vec![
        &s.env,
        Allocation {
            pool: id,
            amount: 2_000,
        },
    ]);

    pool.set_exchange_rate(&(WAD + WAD / 2));
    s.minter.mint(&pool.address, &1_000);
    let before = s.pps();
    assert_eq!(before, WAD);

    // the partial withdraw refreshes the pool rate and books the gain
    assert_eq!(s.vault.withdraw(&alice, &100), 100);
    let after_withdraw = s.pps();
    assert!(after_withdraw >= before);
    // 2_899 committed less the 80 in fees the booked gain still owes
    assert_eq!(s.vault.balance(), 2_819);

    assert_eq!(s.strategy.harvest(&keeper), 1_000);
    assert!(s.pps() >= after_withdraw);
    assert_eq!(s.vault.balance(), 2_819);
}

// ============================================================================
// STRATEGY REPLACEMENT
// ============================================================================

#[test]
fn test_retired_strategy_funds_stay_withdrawable() {
    let s = setup_vault(0, 0);
    let user = s.user_with(1_000);
    s.vault.deposit(&user, &1_000);
    s.commit_to_pool(1, 400);

    s.strategy.reclaim_want();
    assert_eq!(s.strategy.retire_strat(), 1_000);
    assert_eq!(s.vault.available(), 1_000);
    assert_eq!(s.vault.balance(), 1_000);
    assert_eq!(s.pps(), WAD);

    let late = s.user_with(10);
    assert_eq!(
        s.vault.try_deposit(&late, &10),
        Err(Ok(Error::StrategyPaused))
    );
    assert_eq!(s.vault.withdraw(&user, &250), 250);
    assert_eq!(s.vault.withdraw_all(&user), 750);
}

#[test]
fn test_replace_strategy_requires_retired_current() {
    let s = setup_vault(0, 0);
    let user = s.user_with(1_500);
    s.vault.deposit(&user, &1_000);

    let replacement = deploy_strategy(
        &s.env,
        &s.vault.address,
        &s.token.address,
        &s.admin,
        &s.routers(),
    );
    assert_eq!(
        s.vault.try_replace_strategy(&replacement.address),
        Err(Ok(Error::InvalidStateTransition))
    );

    s.strategy.retire_strat();
    s.vault.replace_strategy(&replacement.address);
    assert_eq!(s.vault.strategy(), Some(replacement.address.clone()));

    let topics: Vec<Val> = (symbol_short!("strat_set"),).into_val(&s.env);
    let (_, last_topics, data) = s.env.events().all().last().unwrap();
    assert_eq!(last_topics, topics);
    let event = StrategyEvent::try_from_val(&s.env, &data).unwrap();
    assert_eq!(event.previous, Some(s.strategy.address.clone()));

    // returned funds keep backing the existing shares
    assert_eq!(s.vault.deposit(&user, &500), 500);
    assert_eq!(replacement.balance(), 500);
    assert_eq!(s.vault.balance(), 1_500);
    assert_eq!(s.pps(), WAD);
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_setters_validate_input() {
    let s = setup_vault(0, 0);

    assert_eq!(
        s.vault.try_set_deposit_fee(&10_001),
        Err(Ok(Error::Configuration))
    );
    s.vault.set_deposit_fee(&250);
    assert_eq!(s.vault.deposit_fee(), 250);

    assert_eq!(s.vault.try_set_tvl_cap(&-1), Err(Ok(Error::Configuration)));
    s.vault.set_tvl_cap(&5_000);
    assert_eq!(s.vault.tvl_cap(), 5_000);
}

#[test]
fn test_share_price_never_falls_across_deposits_and_withdrawals() {
    let s = setup_vault(37, 0);
    let alice = s.user_with(10_000);
    let bob = s.user_with(10_000);
    s.vault.deposit(&alice, &777);
    s.commit_to_pool(1, 500);

    let mut last = s.pps();
    for step in 0..6_i128 {
        if step % 2 == 0 {
            s.vault.deposit(&bob, &(313 + step));
        } else {
            s.vault.withdraw(&alice, &(41 + step));
        }
        let now = s.pps();
        assert!(now >= last);
        last = now;
    }
}
