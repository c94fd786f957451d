// Peppered key digests
pub mod digest;

// Key-value store seam and backends
pub mod store;

// Secret issuance and verification
pub mod secrets;

// Settings blob storage
pub mod settings;

// HTTP API: settings sync, OAuth exchange, liveness
pub mod api;

// Configuration loading and validation
pub mod config;
