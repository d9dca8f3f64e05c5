pub mod ledger;
pub mod store;

pub use ledger::{ActivityLedger, ActivityRecord};
pub use store::SnapshotStore;
