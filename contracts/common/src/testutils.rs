//! Mock collaborators for contract tests.

mod pool;
mod router;

pub use pool::{MockPool, MockPoolClient};
pub use router::{MockRouter, MockRouterClient};
