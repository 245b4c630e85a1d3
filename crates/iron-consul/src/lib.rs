//! Consul HTTP client implementing the store and catalog boundaries of `iron-core`.
//!
//! Only the endpoints the supervisor needs are covered: recursive KV listing with
//! blocking queries, single-key writes, and the health-filtered service lookup.
mod client;
pub use client::ConsulClient;

mod config;
pub use config::ConsulConfig;

mod convert;

mod error;
pub use error::ConsulError;

mod health;
mod kv;
