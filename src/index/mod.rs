//! Content index subsystem.
//!
//! # Data Flow
//! ```text
//! persistence (external)
//!     → events.rs (ContentStore: bulk load + change channel)
//!     → store.rs (ResourceIndex: idempotent apply, snapshots)
//!     → queried by routing and URL generation
//! ```
//!
//! # Design Decisions
//! - The index is the only holder of resource state in this process
//! - Events arrive on one channel with one consumer: per-id ordering
//!   without locks
//! - Duplicate or out-of-order notifications converge (idempotent
//!   upsert, no-op remove)

pub mod events;
pub mod resource;
pub mod store;

pub use events::{ContentStore, JsonContentStore, ResourceEvent, StoreError};
pub use resource::{Resource, ResourceId, ResourceKind, Status, TagRef, Visibility};
pub use store::ResourceIndex;
