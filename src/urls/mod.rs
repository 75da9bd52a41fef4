//! Canonical URL subsystem.
//!
//! # Data Flow
//! ```text
//! RouteTable (permalink-bearing matchers)
//!     → generator.rs (one UrlGenerator per matcher)
//!     → service.rs (central arbitration, reverse path map)
//!     ← ResourceIndex change notifications (recompute per resource)
//!     ← config reloads (generation bump + regeneration pass)
//! ```
//!
//! # Design Decisions
//! - Arbitration is one shared step keyed by resource id and priority
//!   rank; generators never decide ownership locally
//! - At most one canonical URL per resource at any settled state
//! - Lookups during an unsettled window answer Pending, never stale

pub mod generator;
pub mod service;

pub use generator::UrlGenerator;
pub use service::{UrlLookup, UrlService};
