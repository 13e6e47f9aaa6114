//! Persistence for the Hegemony coordinator (`PostgreSQL` + `Dragonfly`).
//!
//! The coordinator never talks to a database directly. It reads map
//! snapshots from and stages writes into a [`StoreAdapter`], which sits in
//! front of any [`StateStore`] backend.
//!
//! # Architecture
//!
//! ```text
//! Coordinator
//!     |
//!     +-- snapshot() ---------> StoreAdapter cache --(TTL miss)--> StateStore
//!     |
//!     +-- stage_*() + flush() -> StoreAdapter (single writer, retry/backoff)
//!                                   |-- PostgresStore | MemoryStore
//!                                   +-- DragonflyPool (last good snapshot)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- the [`StateStore`] trait
//! - [`adapter`] -- cached reads, batched writes, health
//! - [`memory`] -- in-process backend
//! - [`postgres`] -- `PostgreSQL` pool and backend
//! - [`dragonfly`] -- `Dragonfly` hot snapshot mirror
//! - [`error`] -- shared error type

pub mod adapter;
pub mod dragonfly;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use adapter::{
    FlushReport, InitialState, PendingBatch, SnapshotSource, StoreAdapter, StoreConfig,
    StoreHealth,
};
pub use dragonfly::DragonflyPool;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresPool, PostgresStore};
pub use store::StateStore;
