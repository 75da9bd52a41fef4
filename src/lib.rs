//! masthead: the dynamic routing core of a publishing platform.
//!
//! # Architecture Overview
//!
//! ```text
//! routing config (TOML)
//!     → config (load, validate, watch)
//!     → routing::table (priority-ordered matchers, atomic swap)
//!
//! persistence (external)
//!     → index (bulk load + change channel → ResourceIndex)
//!     → urls (per-route generators, central ownership arbitration)
//!
//! incoming request
//!     → http::server → Site::resolve
//!     → RequestContext | Redirect | NotFound
//!     → render layer (external, behind the Renderer seam)
//! ```
//!
//! The [`Site`] façade ties the subsystems together: it owns the active
//! configuration, the resource index, the route table, and the URL
//! service, and exposes `resolve` and `url_for` to the HTTP and render
//! layers.

// Core subsystems
pub mod config;
pub mod http;
pub mod index;
pub mod routing;
pub mod urls;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::SiteConfig;
use crate::index::events::{ContentStore, ResourceEvent, StoreError};
use crate::index::store::ResourceIndex;
use crate::routing::table::{BuildError, Resolution, RouteTable, RouterManager};
use crate::urls::service::{UrlLookup, UrlService};

pub use crate::config::{ConfigError, RoutingConfig};
pub use crate::http::server::{DirectiveRenderer, HttpServer, Renderer};
pub use crate::index::{JsonContentStore, Resource, ResourceKind};
pub use crate::lifecycle::Shutdown;
pub use crate::routing::RequestContext;

/// The assembled routing service.
pub struct Site {
    config: ArcSwap<SiteConfig>,
    index: ResourceIndex,
    router: RouterManager,
    urls: Arc<UrlService>,
}

impl Site {
    /// Build a site from a validated configuration. The URL service is
    /// settled (over an empty index) before this returns.
    pub fn new(config: SiteConfig) -> Result<Arc<Self>, BuildError> {
        let table = RouteTable::build(&config.routing)?;
        let index = ResourceIndex::new();
        let urls = UrlService::new(index.clone());

        let site = Arc::new(Self {
            config: ArcSwap::from_pointee(config),
            index,
            router: RouterManager::new(table),
            urls,
        });

        let generation = site.urls.install(&site.router.snapshot());
        site.urls.regenerate(generation);
        Ok(site)
    }

    /// Bulk-load content from the store and regenerate URLs. Blocks
    /// until the index and URL state are settled; startup may wait.
    pub fn load_content(&self, store: &dyn ContentStore) -> Result<(), StoreError> {
        self.index.load_from(store)?;
        self.urls.regenerate(self.urls.generation());
        Ok(())
    }

    /// Consume a change-event stream on a background task, keeping the
    /// index and URL ownership current.
    pub fn spawn_event_consumer(
        self: &Arc<Self>,
        events: tokio::sync::mpsc::UnboundedReceiver<ResourceEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let index = self.index.clone();
        let urls = self.urls.clone();
        tokio::spawn(async move {
            index.run(events, |id| urls.recompute(id)).await;
        })
    }

    /// Resolve a request path against the current table snapshot.
    pub fn resolve(&self, path: &str, host: &str, secure: bool) -> Resolution {
        let config = self.config.load();
        self.router.resolve(
            path,
            host,
            secure,
            &config.site,
            &self.index,
            self.urls.as_ref(),
        )
    }

    /// Canonical path for a resource. Answers `Pending` while a
    /// regeneration pass is in flight, never a stale value.
    pub fn url_for(&self, resource_id: &str) -> UrlLookup {
        self.urls.url_for(resource_id)
    }

    /// Absolute canonical URL against the configured site base.
    pub fn absolute_url_for(&self, resource_id: &str) -> Option<url::Url> {
        let config = self.config.load();
        self.urls.absolute_url_for(resource_id, &config.site)
    }

    /// Swap in a new configuration: the route table atomically, the URL
    /// regeneration asynchronously. Lookups for affected resources are
    /// `Pending` until the pass settles; `resolve` keeps serving from
    /// snapshots throughout.
    pub fn reload(self: &Arc<Self>, config: SiteConfig) -> Result<u64, BuildError> {
        let table = RouteTable::build(&config.routing)?;
        self.config.store(Arc::new(config));
        self.router.reload(table);

        let generation = self.urls.install(&self.router.snapshot());
        let urls = self.urls.clone();
        std::thread::spawn(move || urls.regenerate(generation));
        Ok(generation)
    }

    /// Whether the current URL generation has settled.
    pub fn is_settled(&self) -> bool {
        self.urls.is_settled()
    }

    /// Wait until the current URL generation settles.
    pub async fn wait_settled(&self) {
        self.urls.wait_settled().await;
    }

    /// The live resource index.
    pub fn index(&self) -> &ResourceIndex {
        &self.index
    }

    /// The active configuration snapshot.
    pub fn config(&self) -> Arc<SiteConfig> {
        self.config.load_full()
    }
}
