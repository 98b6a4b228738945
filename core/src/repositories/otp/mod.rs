pub mod r#trait {
    pub use super::trait_::*;
}
#[path = "trait.rs"]
mod trait_;
pub mod failover;
pub mod memory;

pub use failover::{FailoverController, FailoverStore, StorageBackend};
pub use memory::InMemoryOtpStore;
pub use r#trait::{OtpStore, RecordChange};

#[cfg(test)]
pub mod mock;
#[cfg(test)]
pub use mock::MockDurableStore;
