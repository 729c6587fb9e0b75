//! Result store
//!
//! Persists predicted delivery times in PostgreSQL:
//!
//! - `PostgresConfig`: connection settings and the connect deadline
//! - `ResultStore`: connect-with-retry, then point lookup and insert
//! - `ResultRepository`: the lookup/insert seam shared by the store, the
//!   consumer-side handler and the HTTP layer
//!
//! The store expects a table such as:
//!
//! ```sql
//! CREATE TABLE results (
//!     id            TEXT PRIMARY KEY,
//!     delivery_time DOUBLE PRECISION NOT NULL
//! );
//! ```
//!
//! Connection establishment tolerates a database that is still booting: an
//! attempt is made every `retry_interval` until `timeout` elapses.

pub mod connection;
pub mod error;
pub mod memory;
pub mod store;

pub use connection::{connect_with_retry, PostgresConfig};
pub use error::{Result, StorageError};
pub use memory::InMemoryResults;
pub use store::{ResultRepository, ResultStore};
