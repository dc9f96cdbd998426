//! Switch version history for Switchboard
//!
//! This crate records every switch write as an immutable version record.
//!
//! # Features
//!
//! - **Version Records** - Full record on create, field diff on update, marker on delete
//! - **Acting User** - Resolved from the writer's ambient context
//! - **Multiple Backends** - In-memory and JSON-lines file storage
//!
//! # Quick Start
//!
//! ```no_run
//! use switchboard_audit::*;
//! use switchboard_core::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let versioner = SwitchVersioner::builder()
//!     .backend(FileBackend::new("switch_versions.jsonl"))
//!     .build();
//!
//! let manager = SwitchManager::builder(MemoryStore::new())
//!     .hook(versioner.clone())
//!     .build();
//!
//! let admin = AmbientContext::new().with_user(User::new("1", "admin"));
//! manager.save(Switch::new("checkout"), &admin).await?;
//!
//! let history = versioner.history("checkout").await?;
//! assert_eq!(history[0].username, "admin");
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod version;
pub mod versioner;

pub use backend::*;
pub use version::*;
pub use versioner::*;
