//! Persistence collaborator for the order saga system.
//!
//! Every mutation happens inside a [`UnitOfWork`]: writes become visible to
//! other units of work only on [`UnitOfWork::commit`], and any exclusive row
//! lock taken through a `lock_*` method is held until the unit of work is
//! committed, rolled back or dropped.

use std::time::Duration;

pub mod error;
mod lock;
pub mod memory;
pub mod postgres;
pub mod store;
mod trace;

pub use error::{Result, StoreError};
pub use lock::RowKey;
pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use postgres::{PostgresStore, PostgresUnitOfWork};
pub use store::{Store, StoreExt, UnitOfWork, settle};

/// How long a `lock_*` call waits for a row held by another unit of work.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(3);
