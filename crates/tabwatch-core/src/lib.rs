//! Core library for tabwatch.
//!
//! - [`page`]: capability traits over the watched page (locator + visual surface)
//! - [`monitor`]: the per-page state machine and its tokio runner
//! - [`relay`]: notification-id → tab-id bookkeeping and click-to-focus handling
//! - [`config`]: CLI arguments and TOML settings

pub mod config;
pub mod monitor;
pub mod page;
pub mod relay;
