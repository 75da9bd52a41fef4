//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → table.rs (priority-ordered dispatch)
//!     → route.rs (per-matcher path tests)
//!     → permalink.rs / filter.rs (pattern + filter evaluation)
//!     → context.rs (routerOptions for the render layer)
//!
//! Table compilation (at load and on reload):
//!     RoutingConfig
//!     → explicit routes → collections → taxonomies
//!     → freeze as immutable RouteTable, swap atomically
//! ```
//!
//! # Design Decisions
//! - Matchers compiled at load time, immutable at runtime
//! - No regex in the hot path (segment-walk matching only)
//! - Deterministic: same configuration and path always resolve the same
//! - First match wins (ordered by class, then declaration)

pub mod context;
pub mod filter;
pub mod permalink;
pub mod route;
pub mod table;

pub use context::{ContextType, RequestContext, RequestContextBuilder};
pub use filter::FilterExpr;
pub use permalink::{PermalinkError, PermalinkPattern};
pub use route::{MatchResult, MatcherKind, RouteHit, RouteMatcher};
pub use table::{Resolution, RouteTable, RouterManager};
