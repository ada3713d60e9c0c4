pub mod config;
pub mod logger;

use self::config::Config;

/// Constructs the registry engine from a loaded configuration.
///
/// Wiring an RPC front-end onto the returned `Registry` is out of scope
/// here; callers that need one supply it themselves.
pub fn startup(config: &Config) -> anyhow::Result<registry::Registry> {
    log::info!(
        "starting notifyd registry (table-capacity={}, use-locks={})",
        config.registry.table_capacity,
        config.registry.use_locks
    );

    Ok(registry::Registry::new(registry::Config {
        use_locks: config.registry.use_locks,
        table_capacity: config.registry.table_capacity,
    }))
}
