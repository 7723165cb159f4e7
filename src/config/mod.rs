//! Client configuration
//!
//! Configuration is merged from up to four layers, later layers winning:
//! 1. Built-in defaults
//! 2. User config (e.g. `~/.config/zync/config.toml`)
//! 3. Project config (e.g. `<project>/.zync.toml`)
//! 4. Explicit overrides supplied by the embedding application

mod client;
mod defaults;
mod effective;
mod merge;

pub use client::{ClientConfig, HostApp};
pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};
