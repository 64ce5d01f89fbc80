//! Client-side mirror of a user's threads and of the selected thread's messages.
//!
//! [`ThreadSync`] fetches the initial view from a [`PersistenceClient`] and then
//! keeps it current with two push subscriptions: one over the user's threads and
//! one over the messages of whichever thread is selected.
//!
//! [`PersistenceClient`]: nova_persist::PersistenceClient

pub mod error;
pub mod state;
pub mod sync;

pub use error::{Result, SyncError};
pub use state::SyncState;
pub use sync::ThreadSync;
