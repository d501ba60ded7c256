//! Shared bootstrap utilities for embedding the randomizer in a host game.
//!
//! Provides configuration loading, runtime assembly, and logging setup that
//! game integrations and test harnesses reuse.
pub mod builder;
pub mod config;
pub mod logging;

pub use builder::{Randolink, RandolinkBuilder, UnconfiguredTransport};
pub use config::BootstrapConfig;
