//! The Event Registry, Lottery Engine, Cascade Manager, and Notification
//! Broadcaster (§4.3–§4.6), sharing one `Engine` handle over the Store
//! Abstraction — the teacher's pattern of a single `Client` struct with its
//! `impl` blocks spread across one file per responsibility
//! (`rostra-client`'s `client.rs`/`net.rs`/`id.rs`, all `impl Client`).

pub mod broadcast;
pub mod cascade;
mod config;
mod error;
pub mod lottery;
pub mod registry;
#[cfg(test)]
mod test_support;

use lottery_store::Store;

pub use config::Config;
pub use error::{EngineError, EngineResult};

const LOG_TARGET: &str = "lottery::engine";

/// The single dependency-injected service the core exposes (§9 "Singletons
/// ... replace with explicit dependency-injected services, constructed once
/// at process start and passed by reference"). Cheap to clone: `Store`
/// wraps an `Arc`.
#[derive(Debug, Clone)]
pub struct Engine {
    store: Store,
    config: Config,
}

impl Engine {
    pub fn new(store: Store, config: Config) -> Self {
        Self { store, config }
    }

    pub fn with_default_config(store: Store) -> Self {
        Self::new(store, Config::default())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
