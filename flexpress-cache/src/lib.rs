pub mod ledger;
pub mod local;
pub mod store;

pub use ledger::CreditLedger;
pub use local::{LocalStores, MemoryStorage, StorageBackend};
pub use store::QueryCache;
