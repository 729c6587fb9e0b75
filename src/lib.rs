// HTTP query API
pub mod handlers;
pub mod models;
pub mod routes;

// Gateway configuration
pub mod config;

// Consumer-group runner
pub mod consumer;

// Result store
pub mod storage;

// Signal handling
pub mod shutdown;
