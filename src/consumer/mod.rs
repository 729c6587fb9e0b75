//! Consumer-group runner
//!
//! This module provides:
//! - `GroupRunner`: keeps a group subscription alive until cancelled
//! - `GroupSession`: the group membership capability the runner drives,
//!   implemented for Kafka by `KafkaGroupSession`
//! - `ConsumerGroupHandler`: per-generation setup/cleanup and per-record
//!   processing supplied by the caller
//! - `ResultHandler`: stores delivery-time results read from the topic
//!
//! # Lifecycle
//!
//! 1. **Connect**: `GroupRunner::new` creates the client and waits for broker
//!    metadata; an unreachable cluster fails construction
//! 2. **Consume**: each `consume` call lasts one group generation
//! 3. **Rejoin**: after a rebalance the loop re-enters at once; after an
//!    error it waits with exponential backoff
//! 4. **Stop**: cancellation is observed between records and between calls;
//!    the runner's task finishes after the in-flight call returns
//!
//! Offsets are stored after the handler accepts a record and committed
//! automatically every second, so delivery is at-least-once.

pub mod backoff;
pub mod config;
pub mod error;
pub mod handler;
pub mod results;
pub mod runner;
pub mod session;

pub use backoff::RetryPolicy;
pub use config::{ConsumerGroupConfig, InitialOffset};
pub use error::{ConsumerError, HandlerError, Result};
pub use handler::{Assignment, ConsumerGroupHandler, Record};
pub use results::ResultHandler;
pub use runner::{GroupRunner, RunnerHandle, RunnerState};
pub use session::{GroupSession, KafkaGroupSession};
