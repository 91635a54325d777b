//! Local Persist - lifecycle-driven localStorage persistence for UI components
//!
//! Core modules:
//! - `platform`: Storage backends and the process termination signal
//! - `probe`: One-shot storage capability detection
//! - `config`: Per-instance key and state filter configuration
//! - `resolve`: Storage key and filter key resolution
//! - `persistence`: Restore/save pipeline gated on capability and load state
//! - `binding`: Activate/deactivate lifecycle wiring with unload fallback

#[macro_use]
pub mod warning;

pub mod binding;
pub mod component;
pub mod config;
pub mod persistence;
pub mod platform;
pub mod probe;
pub mod resolve;

pub use binding::{Lifecycle, LocalStorageBinding, Phase};
pub use component::{ComponentState, Persistent, State};
pub use config::{KeySource, PersistConfig, StateFilter, StorageKey};
pub use persistence::{PersistSlot, Persistence, RestoreOutcome, SaveOutcome};
pub use platform::{
    KeyValueStore, MemoryStore, StorageError, SubscriptionId, TerminationSignal, UnloadRegistry,
};
pub use probe::StorageCapability;

/// Crate-wide constants
pub mod consts {
    /// Reserved key written and removed by the capability probe
    pub const PROBE_KEY: &str = "local-persist.test-key";
    /// Sentinel value written by the capability probe
    pub const PROBE_VALUE: &str = "foo";
    /// Storage key for instances with no configured key and no display name
    pub const DEFAULT_STORAGE_KEY: &str = "local-persist";
}

/// Install the platform logger (console on web, env_logger on native)
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("Logger already installed");
    }
}

/// Install the platform logger (console on web, env_logger on native)
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
