//! Backend contracts for the payment-to-seal pipeline.
//!
//! The pipeline runs on stateless, independently scheduled request handlers that share no process memory, so every
//! cross-request coordination point lives behind these traits in an external store with atomic primitives:
//!
//! * [`CommitStore`] is the key-value backend. It provides single-key reads and writes, a conditional write keyed on
//!   an opaque [`ConcurrencyToken`] (the optimistic-concurrency substitute for a row lock), and one all-or-nothing
//!   multi-path batch write ([`CommitStore::commit_seal`]) that is the closest thing to a transaction the backend
//!   offers.
//! * [`RateCounterStore`] is the shared counter service: atomic increment-with-expiry, used to enforce global rate
//!   limits across handler instances.
//!
//! No handler ever performs an unconditional read-then-write across the network; everything mutable goes through the
//! primitives defined here.

mod commit_store;
mod data_objects;
mod rate_counter;

pub use commit_store::{CommitStore, StorageError};
pub use data_objects::{ConcurrencyToken, SealCommit};
pub use rate_counter::{CounterError, RateCounterStore};
