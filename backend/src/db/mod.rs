pub mod ledger_store;
pub mod memory;
pub mod portfolio_queries;
pub mod transaction_queries;

pub use ledger_store::{LedgerStore, PgLedgerStore};
pub use memory::InMemoryLedgerStore;
