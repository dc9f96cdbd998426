//! Feature Switches for Switchboard
//!
//! Runtime feature switches with hierarchical keys, tri-state condition
//! voting and pluggable condition sets.
//!
//! # Features
//!
//! - **Hierarchical keys** - `parent:child` switches inherit from their ancestors
//! - **Statuses** - `Disabled`, `Selective`, `Global` and `Inherit`
//! - **Condition sets** - Pluggable evaluators registered per namespace
//! - **Veto voting** - Any namespace voting inactive disables the switch
//! - **Fail-safe** - Evaluation errors resolve to inactive, never to an error
//! - **Versioning hooks** - Every write is reported for auditing
//!
//! # Quick Start
//!
//! ```
//! use switchboard_core::*;
//!
//! # async fn example() -> Result<()> {
//! let registry = ConditionRegistry::new();
//! register_builtins(&registry);
//!
//! let manager = SwitchManager::new(MemoryStore::new(), registry);
//! let admin = AmbientContext::new().with_user(User::new("1", "admin"));
//!
//! let switch = Switch::new("beta")
//!     .with_status(SwitchStatus::Selective)
//!     .with_condition("user", "username", "alice", ConditionMode::Include)?;
//! manager.save(switch, &admin).await?;
//!
//! let alice = instance(User::new("2", "alice"));
//! assert!(manager.is_active("beta", &[alice]).await);
//! assert!(!manager.is_active("beta", &[]).await);
//! # Ok(())
//! # }
//! ```
//!
//! # Hierarchy
//!
//! ```
//! use switchboard_core::*;
//!
//! # async fn example() {
//! let store = MemoryStore::with_switches(vec![
//!     Switch::new("checkout").with_status(SwitchStatus::Disabled),
//!     Switch::new("checkout:express").with_status(SwitchStatus::Global),
//! ]);
//! let manager = SwitchManager::new(store, ConditionRegistry::new());
//!
//! // A disabled parent vetoes its children
//! assert!(!manager.is_active("checkout:express", &[]).await);
//! # }
//! ```

pub mod builtins;
pub mod condition;
pub mod context;
pub mod error;
pub mod manager;
pub mod registry;
pub mod store;
pub mod switch;
pub mod versioning;

pub use builtins::{
    HostConditionSet, IpAddressConditionSet, QueryStringConditionSet, UserConditionSet,
    register_builtins,
};
pub use condition::{
    ConditionMode, ConditionSet, Field, FieldConditions, FieldKind, Operator, Vote,
    evaluate_field_conditions, percent_bucket,
};
pub use context::{AmbientContext, Instance, Instances, RequestInfo, User, instance};
pub use error::{
    ConditionError, RegistryError, Result, StoreError, StoreResult, SwitchError, VersioningError,
};
pub use manager::{
    DEFAULT_DELIMITER, Resolution, ScopedSwitches, SwitchManager, SwitchManagerBuilder,
};
pub use registry::{ConditionDescriptor, ConditionRegistry};
pub use store::{MemoryStore, SwitchStore};
pub use switch::{Conditions, Switch, SwitchStatus};
pub use versioning::{SwitchChange, VersioningHook};
