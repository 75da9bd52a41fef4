//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the site.
//! All types derive Serde traits for deserialization from config files.
//!
//! Routes, collections and taxonomies are arrays of tables rather than
//! maps: evaluation order is declaration order, and TOML maps do not
//! guarantee one.

use serde::{Deserialize, Serialize};

/// Root configuration for the site.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// Public site identity (canonical URL).
    pub site: SiteIdentity,

    /// HTTP server settings (bind address, timeouts).
    pub server: ServerConfig,

    /// Routing configuration: routes, collections, taxonomies.
    pub routing: RoutingConfig,

    /// Content listing settings.
    pub content: ContentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Public identity of the site.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteIdentity {
    /// Canonical URL of the site, including scheme
    /// (e.g., "https://example.com"). An https scheme makes the server
    /// redirect insecure requests.
    pub url: String,
}

impl Default for SiteIdentity {
    fn default() -> Self {
        Self {
            url: "http://localhost:2368".to_string(),
        }
    }
}

impl SiteIdentity {
    /// Whether the canonical URL uses https.
    pub fn is_secure(&self) -> bool {
        self.url.starts_with("https://")
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:2368").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:2368".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Content listing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Number of posts per listing page.
    pub page_size: u32,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self { page_size: 5 }
    }
}

/// Routing configuration: the ordered set of route definitions the
/// dispatch table is built from.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// Explicit routes: static pages and channels. Highest priority,
    /// evaluated in declaration order.
    pub routes: Vec<RouteDefinition>,

    /// Collections: filtered, paginated listings with entry permalinks.
    /// Evaluated after explicit routes, in declaration order.
    pub collections: Vec<CollectionDefinition>,

    /// Taxonomy routes generated per classification dimension.
    /// Lowest priority.
    pub taxonomies: Vec<TaxonomyDefinition>,
}

/// An explicit route: a static page, or a channel when `controller`
/// says so.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteDefinition {
    /// Mount path, with leading and trailing slash (e.g., "/about/").
    pub path: String,

    /// Template candidates, first match wins.
    #[serde(default)]
    pub templates: Vec<String>,

    /// Controller override. Static routes have none.
    #[serde(default)]
    pub controller: Option<ControllerKind>,

    /// Content filter expression (channels only).
    #[serde(default)]
    pub filter: Option<String>,

    /// Listing page size override.
    #[serde(default)]
    pub limit: Option<u32>,

    /// Listing order override (e.g., "published_at asc").
    #[serde(default)]
    pub order: Option<String>,

    /// Generate RSS sub-routes. Only meaningful for channels.
    #[serde(default = "default_rss")]
    pub rss: bool,

    /// Response content type override.
    #[serde(default)]
    pub content_type: Option<String>,

    /// Data-query injection and router claims.
    #[serde(default)]
    pub data: Option<DataConfig>,
}

/// A collection: a filtered listing mounted at `path` whose member
/// resources get permalinks from `permalink`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectionDefinition {
    /// Mount path, with leading and trailing slash (e.g., "/podcast/").
    pub path: String,

    /// Permalink pattern for member resources
    /// (e.g., "/podcast/:slug/").
    pub permalink: String,

    /// Content filter expression selecting member resources.
    #[serde(default)]
    pub filter: Option<String>,

    /// Template candidates for the listing pages.
    #[serde(default)]
    pub templates: Vec<String>,

    /// Listing page size override.
    #[serde(default)]
    pub limit: Option<u32>,

    /// Listing order override.
    #[serde(default)]
    pub order: Option<String>,

    /// Generate RSS sub-routes.
    #[serde(default = "default_rss")]
    pub rss: bool,

    /// Data-query injection and router claims.
    #[serde(default)]
    pub data: Option<DataConfig>,
}

/// A taxonomy route, generated per classification dimension.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaxonomyDefinition {
    /// The classification dimension this route serves.
    pub kind: TaxonomyKind,

    /// Permalink pattern (e.g., "/tag/:slug/").
    pub permalink: String,
}

/// Supported taxonomy dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Tag,
    Author,
}

impl TaxonomyKind {
    /// Resource field the taxonomy slug binds to.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::Tag => "tag",
            TaxonomyKind::Author => "author",
        }
    }
}

/// Controller kinds an explicit route may bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    Channel,
}

/// Data-query injection carried by a route definition.
///
/// `query` is opaque to the routing core: it is merged into the request
/// context and consumed by the render layer. `router` claims resources
/// for this route, optionally redirecting their generated URLs here.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DataConfig {
    /// Named content queries, passed through to the render layer.
    pub query: serde_json::Map<String, serde_json::Value>,

    /// Resource claims by kind.
    pub router: RouterClaims,
}

/// Resources a route claims from generated routes.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterClaims {
    pub tags: Vec<ResourceClaim>,
    pub authors: Vec<ResourceClaim>,
    pub posts: Vec<ResourceClaim>,
}

impl RouterClaims {
    /// True when no claims are configured.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.authors.is_empty() && self.posts.is_empty()
    }
}

/// One claimed resource.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceClaim {
    /// Slug of the claimed resource.
    pub slug: String,

    /// When true, the resource's generated URL 301s to the claiming
    /// route. When false, both URLs serve.
    #[serde(default)]
    pub redirect: bool,
}

fn default_rss() -> bool {
    true
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
