//! Developer-facing warnings
//!
//! Like an assertion that only logs: `warning!(condition, ...)` emits a
//! `log::warn!` record when `condition` is false. Debug builds always emit;
//! release builds compile the check away unless the `release-diagnostics`
//! feature is enabled, so the same code paths run either way.

use std::fmt;

/// Whether warnings are emitted in this build configuration
pub const ENABLED: bool = cfg!(any(debug_assertions, feature = "release-diagnostics"));

/// Emit a warning record if `enabled`
pub fn emit(enabled: bool, args: fmt::Arguments<'_>) {
    if enabled {
        log::warn!("Warning: {}", args);
    }
}

/// Log a warning when `condition` does not hold
///
/// ```
/// use local_persist::warning;
///
/// let available = false;
/// warning!(available, "storage unavailable for {}", "settings");
/// ```
#[macro_export]
macro_rules! warning {
    ($condition:expr, $($arg:tt)+) => {{
        if !$condition {
            $crate::warning::emit($crate::warning::ENABLED, format_args!($($arg)+));
        }
    }};
}
