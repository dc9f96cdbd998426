//! Versioning hook contract
//!
//! Every successful switch write is reported to the registered hooks. Hook
//! failures are logged by the manager and never fail the write.

use crate::context::AmbientContext;
use crate::error::VersioningError;
use crate::switch::Switch;
use async_trait::async_trait;

/// A write applied to a switch record.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchChange {
    Created(Switch),
    Updated { previous: Switch, current: Switch },
    Deleted(Switch),
}

impl SwitchChange {
    /// Key of the affected switch
    pub fn key(&self) -> &str {
        match self {
            SwitchChange::Created(switch) => &switch.key,
            SwitchChange::Updated { current, .. } => &current.key,
            SwitchChange::Deleted(switch) => &switch.key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SwitchChange::Created(_) => "created",
            SwitchChange::Updated { .. } => "updated",
            SwitchChange::Deleted(_) => "deleted",
        }
    }
}

/// Receives switch writes for auditing.
#[async_trait]
pub trait VersioningHook: Send + Sync {
    /// Record a change. `context` is the ambient context of the writer.
    async fn record(
        &self,
        change: &SwitchChange,
        context: &AmbientContext,
    ) -> Result<(), VersioningError>;
}
