// Switchboard - runtime feature switches for Rust
//
// This library evaluates hierarchical feature switches against pluggable
// condition sets and records every switch write.

// Re-export core functionality
pub use switchboard_core::*;

// Re-export optional crates
#[cfg(feature = "audit")]
pub use switchboard_audit;

#[cfg(feature = "config")]
pub use switchboard_config;

#[cfg(feature = "log")]
pub use switchboard_log;

#[cfg(feature = "config")]
pub use switchboard_config::Settings;

/// Create a manager builder from settings.
///
/// Registers the builtin condition sets when enabled, applies the delimiter
/// and auto-create options and, with the `audit` feature, attaches a
/// file-backed versioner when `versioning` is on and `version_log` is set.
///
/// # Examples
///
/// ```
/// use switchboard::prelude::*;
///
/// let settings = Settings {
///     delimiter: '.',
///     ..Settings::default()
/// };
/// let manager = switchboard::configure(&settings, MemoryStore::new()).build();
///
/// assert_eq!(manager.delimiter(), '.');
/// assert!(manager.registry().get_by_namespace("user").is_some());
/// ```
#[cfg(feature = "config")]
pub fn configure(settings: &Settings, store: impl SwitchStore + 'static) -> SwitchManagerBuilder {
    let registry = ConditionRegistry::new();
    if settings.register_builtins {
        register_builtins(&registry);
    }

    let builder = SwitchManager::builder(store)
        .registry(registry)
        .delimiter(settings.delimiter)
        .auto_create(settings.auto_create);

    #[cfg(feature = "audit")]
    let builder = match (&settings.version_log, settings.versioning) {
        (Some(path), true) => {
            tracing::debug!(path = path.as_str(), "Recording switch versions");
            builder.hook(
                switchboard_audit::SwitchVersioner::builder()
                    .backend(switchboard_audit::FileBackend::new(path))
                    .build(),
            )
        }
        _ => builder,
    };

    builder
}

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AmbientContext, ConditionError, ConditionMode, ConditionRegistry, ConditionSet, Field,
        Instance, Instances, MemoryStore, RequestInfo, Switch, SwitchError, SwitchManager,
        SwitchStatus, SwitchStore, User, Vote, instance, register_builtins,
    };

    #[cfg(feature = "audit")]
    pub use switchboard_audit::{SwitchVersion, SwitchVersioner, VersionDelta};

    #[cfg(feature = "config")]
    pub use crate::Settings;

    #[cfg(feature = "config")]
    pub use switchboard_config::ConfigManager;
}
