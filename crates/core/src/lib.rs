//! In-process name registry and multi-transport notification dispatcher.
//!
//! `Registry` is the engine: a name table, a client table with stable id
//! recycling, a hierarchical access controller, and a delivery dispatcher,
//! all composed under a single lock per instance.

pub mod access;
pub mod client;
pub mod dispatch;
pub mod error;
mod name;
mod registry;
mod table;

pub use access::{AccessMode, Class, Request};
pub use client::ClientId;
pub use dispatch::PortSink;
pub use error::{Result, Status};
pub use name::CheckAddr;
pub use registry::Registry;

/// Construction-time configuration for a `Registry`.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Config {
    /// When `false`, lock acquisition is a no-op; only safe when the
    /// registry is never shared across threads.
    pub use_locks: bool,
    /// Initial bucket count for both tables.
    pub table_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { use_locks: true, table_capacity: 8192 }
    }
}
