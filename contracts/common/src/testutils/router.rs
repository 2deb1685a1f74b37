use soroban_sdk::{contract, contractimpl, contracttype, Address, Env};

#[contracttype]
enum RouterKey {
    Pool(u32),
}

/// Index-to-pool lookup table.
#[contract]
pub struct MockRouter;

#[contractimpl]
impl MockRouter {
    pub fn register_pool(env: Env, index: u32, pool: Address) {
        env.storage().instance().set(&RouterKey::Pool(index), &pool);
    }

    pub fn pool(env: Env, index: u32) -> Option<Address> {
        env.storage().instance().get(&RouterKey::Pool(index))
    }
}
