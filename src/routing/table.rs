//! The route dispatch table.
//!
//! # Data Flow
//! ```text
//! RoutingConfig
//!     → build(): compile matchers in priority order
//!         explicit routes (declaration order)
//!         → collections (declaration order)
//!         → taxonomies (tag, then author)
//!     → freeze as immutable RouteTable
//!
//! resolve(path):
//!     normalize (decode, trailing slash, protocol)
//!     → walk matchers, first match wins
//!     → claims / entry ownership checks
//!     → RequestContext | Redirect | NotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at load time, immutable at runtime
//! - Reload swaps the whole table atomically; in-flight resolutions keep
//!   the snapshot they loaded
//! - First match wins (fixed priority order), not best match
//! - Explicit NotFound rather than silent default

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::config::schema::{
    ControllerKind, RouterClaims, RoutingConfig, SiteIdentity, TaxonomyKind,
};
use crate::index::resource::{Resource, ResourceId, ResourceKind};
use crate::index::store::ResourceIndex;
use crate::routing::context::{RequestContext, RequestContextBuilder};
use crate::routing::filter::{FilterExpr, FilterParseError};
use crate::routing::permalink::{PermalinkError, PermalinkPattern};
use crate::routing::route::{MatchResult, MatcherKind, MatcherRank, RouteHit, RouteMatcher};

/// Errors compiling a routing configuration into a table. With a
/// validated configuration these do not occur; they are surfaced anyway
/// rather than unwrapped.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Permalink(#[from] PermalinkError),

    #[error(transparent)]
    Filter(#[from] FilterParseError),
}

/// What kind of resource a data-key claim addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimScope {
    Tag,
    Author,
    Post,
}

/// A route's claim on a generated URL.
#[derive(Debug, Clone)]
pub struct Claim {
    /// Mount path of the claiming route.
    pub target: String,

    /// Whether the generated URL redirects to the claiming route.
    pub redirect: bool,
}

/// The outcome of resolving a request path.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A matcher owns the path; render with this context.
    Context {
        context: RequestContext,
        /// The matched entity, for entry hits.
        resource: Option<Resource>,
    },

    /// Permanent redirect.
    Redirect { status: u16, location: String },

    /// No matcher claimed the path.
    NotFound,
}

impl Resolution {
    fn redirect(location: String) -> Self {
        Resolution::Redirect {
            status: 301,
            location,
        }
    }
}

/// Reverse lookup from canonical paths to the resources that own them.
/// Implemented by the URL service; the table stays free of URL-state
/// concerns.
pub trait EntryResolver: Send + Sync {
    /// The resource whose canonical URL is `path`, with the rank of the
    /// matcher that generated it.
    fn resource_at(&self, path: &str) -> Option<(ResourceId, MatcherRank)>;
}

/// No entries at all; for tables serving only static routes.
pub struct NoEntries;

impl EntryResolver for NoEntries {
    fn resource_at(&self, _path: &str) -> Option<(ResourceId, MatcherRank)> {
        None
    }
}

/// An immutable, priority-ordered dispatch table.
#[derive(Debug, Default)]
pub struct RouteTable {
    matchers: Vec<RouteMatcher>,
    claims: HashMap<(ClaimScope, String), Claim>,
}

impl RouteTable {
    /// Compile a routing configuration. Matcher order is the priority
    /// order: explicit routes, collections, then taxonomies (tag before
    /// author, regardless of declaration order).
    pub fn build(routing: &RoutingConfig) -> Result<Self, BuildError> {
        let mut matchers = Vec::new();
        let mut claims = HashMap::new();
        let mut rank: MatcherRank = 0;

        for route in &routing.routes {
            let kind = match route.controller {
                Some(ControllerKind::Channel) => MatcherKind::Channel,
                None => MatcherKind::Static,
            };
            let filter = route.filter.as_deref().map(FilterExpr::parse).transpose()?;

            if let Some(data) = &route.data {
                collect_claims(&mut claims, &route.path, &data.router);
            }

            matchers.push(RouteMatcher {
                rank,
                kind,
                path: route.path.clone(),
                templates: route.templates.clone(),
                filter,
                filter_raw: route.filter.clone(),
                permalink: None,
                data: route.data.clone(),
                limit: route.limit,
                order: route.order.clone(),
                rss: route.rss && kind == MatcherKind::Channel,
                content_type: route.content_type.clone(),
            });
            rank += 1;
        }

        for collection in &routing.collections {
            let filter = collection
                .filter
                .as_deref()
                .map(FilterExpr::parse)
                .transpose()?;

            if let Some(data) = &collection.data {
                collect_claims(&mut claims, &collection.path, &data.router);
            }

            matchers.push(RouteMatcher {
                rank,
                kind: MatcherKind::Collection,
                path: collection.path.clone(),
                templates: collection.templates.clone(),
                filter,
                filter_raw: collection.filter.clone(),
                permalink: Some(PermalinkPattern::compile(&collection.permalink)?),
                data: collection.data.clone(),
                limit: collection.limit,
                order: collection.order.clone(),
                rss: collection.rss,
                content_type: None,
            });
            rank += 1;
        }

        for kind in [TaxonomyKind::Tag, TaxonomyKind::Author] {
            let Some(taxonomy) = routing.taxonomies.iter().find(|t| t.kind == kind) else {
                continue;
            };
            let pattern = PermalinkPattern::compile(&taxonomy.permalink)?;
            matchers.push(RouteMatcher {
                rank,
                kind: MatcherKind::Taxonomy(kind),
                path: pattern.literal_prefix(),
                templates: Vec::new(),
                filter: None,
                filter_raw: None,
                permalink: Some(pattern),
                data: None,
                limit: None,
                order: None,
                rss: true,
                content_type: None,
            });
            rank += 1;
        }

        Ok(Self { matchers, claims })
    }

    /// Matchers in priority order.
    pub fn matchers(&self) -> &[RouteMatcher] {
        &self.matchers
    }

    /// The claim on a generated URL, if any route registered one.
    pub fn claim(&self, scope: ClaimScope, slug: &str) -> Option<&Claim> {
        self.claims.get(&(scope, slug.to_string()))
    }

    /// Resolve a request path against this table snapshot.
    ///
    /// Normalization happens first: one round of percent-decoding, then
    /// trailing-slash enforcement (asset-shaped paths excepted), then
    /// protocol canonicalization. After that, the first matcher whose
    /// `test` succeeds wins.
    pub fn resolve(
        &self,
        path: &str,
        host: &str,
        secure: bool,
        site: &SiteIdentity,
        index: &ResourceIndex,
        entries: &dyn EntryResolver,
    ) -> Resolution {
        let decoded = percent_decode(path);
        let path = if decoded.is_empty() {
            "/".to_string()
        } else {
            decoded
        };

        if !path.ends_with('/') {
            if is_asset_shaped(&path) {
                return Resolution::NotFound;
            }
            let location = format!("{path}/");
            if site.is_secure() && !secure {
                return Resolution::redirect(absolute_https(host, &location));
            }
            return Resolution::redirect(location);
        }

        if site.is_secure() && !secure {
            return Resolution::redirect(absolute_https(host, &path));
        }

        for matcher in &self.matchers {
            let Some(result) = matcher.test(&path) else {
                continue;
            };

            match self.dispatch(matcher, result, index, entries) {
                Some(resolution) => return resolution,
                // matched in shape but not in ownership; keep walking
                None => continue,
            }
        }

        Resolution::NotFound
    }

    /// Turn one matcher hit into a resolution, or `None` to fall through
    /// to the next matcher.
    fn dispatch(
        &self,
        matcher: &RouteMatcher,
        result: MatchResult,
        index: &ResourceIndex,
        entries: &dyn EntryResolver,
    ) -> Option<Resolution> {
        if let RouteHit::Redirect { location } = &result.hit {
            return Some(Resolution::redirect(location.clone()));
        }

        match matcher.kind {
            MatcherKind::Static | MatcherKind::Channel => Some(Resolution::Context {
                context: RequestContextBuilder::build(matcher, &result, None),
                resource: None,
            }),

            MatcherKind::Collection => match result.hit {
                RouteHit::Entry => self.dispatch_entry(matcher, result, index, entries),
                _ => Some(Resolution::Context {
                    context: RequestContextBuilder::build(matcher, &result, None),
                    resource: None,
                }),
            },

            MatcherKind::Taxonomy(kind) => self.dispatch_taxonomy(matcher, kind, result, index),
        }
    }

    /// A collection permalink hit. The URL service decides ownership:
    /// a path generated by a higher-priority matcher, or by no matcher,
    /// falls through.
    fn dispatch_entry(
        &self,
        matcher: &RouteMatcher,
        result: MatchResult,
        index: &ResourceIndex,
        entries: &dyn EntryResolver,
    ) -> Option<Resolution> {
        let (resource_id, rank) = entries.resource_at(&entry_path(matcher, &result))?;
        if rank != matcher.rank {
            return None;
        }

        let resource = index.get(&resource_id)?;

        if let Some(claim) = self.claim(ClaimScope::Post, &resource.slug) {
            if claim.redirect && claim.target != matcher.path {
                return Some(Resolution::redirect(claim.target.clone()));
            }
        }

        Some(Resolution::Context {
            context: RequestContextBuilder::build(matcher, &result, Some(&resource)),
            resource: Some(resource),
        })
    }

    /// A taxonomy hit: honor claims from explicit routes, require the
    /// term to exist, then build the listing context.
    fn dispatch_taxonomy(
        &self,
        matcher: &RouteMatcher,
        kind: TaxonomyKind,
        result: MatchResult,
        index: &ResourceIndex,
    ) -> Option<Resolution> {
        let slug = result.params.get("slug")?.clone();

        let scope = match kind {
            TaxonomyKind::Tag => ClaimScope::Tag,
            TaxonomyKind::Author => ClaimScope::Author,
        };
        if let Some(claim) = self.claim(scope, &slug) {
            if claim.redirect {
                let suffix = match result.hit {
                    RouteHit::Rss => "rss/".to_string(),
                    RouteHit::Page(n) => format!("page/{n}/"),
                    _ => String::new(),
                };
                return Some(Resolution::redirect(format!("{}{suffix}", claim.target)));
            }
        }

        let term_kind = match kind {
            TaxonomyKind::Tag => ResourceKind::Tag,
            TaxonomyKind::Author => ResourceKind::Author,
        };
        let exists = index
            .query(&[term_kind], None)
            .iter()
            .any(|r| r.slug == slug);
        if !exists {
            return None;
        }

        Some(Resolution::Context {
            context: RequestContextBuilder::build(matcher, &result, None),
            resource: None,
        })
    }
}

/// Reassemble the canonical path for an entry hit from the matcher's
/// permalink shape and the captured params.
fn entry_path(matcher: &RouteMatcher, result: &MatchResult) -> String {
    // the tested path already IS the canonical shape; rebuild it from
    // params so lookups are independent of raw request spelling
    let Some(pattern) = &matcher.permalink else {
        return String::new();
    };
    let mut path = String::from("/");
    for segment in pattern.as_str().split('/').filter(|s| !s.is_empty()) {
        match segment.strip_prefix(':') {
            Some(name) => {
                if let Some(value) = result.params.get(name) {
                    path.push_str(value);
                }
            }
            None => path.push_str(segment),
        }
        path.push('/');
    }
    path
}

fn collect_claims(
    claims: &mut HashMap<(ClaimScope, String), Claim>,
    target: &str,
    router: &RouterClaims,
) {
    let scoped = [
        (ClaimScope::Tag, &router.tags),
        (ClaimScope::Author, &router.authors),
        (ClaimScope::Post, &router.posts),
    ];
    for (scope, entries) in scoped {
        for claim in entries {
            // first claim wins, matching route priority order
            claims
                .entry((scope, claim.slug.clone()))
                .or_insert_with(|| Claim {
                    target: target.to_string(),
                    redirect: claim.redirect,
                });
        }
    }
}

/// Paths whose final segment has an extension are asset-shaped; they are
/// never slash-normalized and never routed.
fn is_asset_shaped(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(|s| s.contains('.'))
}

/// Decode percent-escapes once. Malformed escapes pass through verbatim.
fn percent_decode(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| path.to_string())
}

fn absolute_https(host: &str, path: &str) -> String {
    format!("https://{host}{path}")
}

/// Holds the active route table and swaps it wholesale on reload.
///
/// `resolve` is read-only and reentrant: it operates on the snapshot
/// current when it started, never on a half-built table.
pub struct RouterManager {
    table: ArcSwap<RouteTable>,
}

impl RouterManager {
    pub fn new(table: RouteTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
        }
    }

    /// The current table snapshot.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Atomically replace the table.
    pub fn reload(&self, table: RouteTable) {
        self.table.store(Arc::new(table));
        tracing::info!("route table swapped");
    }

    /// Resolve against the current snapshot.
    pub fn resolve(
        &self,
        path: &str,
        host: &str,
        secure: bool,
        site: &SiteIdentity,
        index: &ResourceIndex,
        entries: &dyn EntryResolver,
    ) -> Resolution {
        let table = self.snapshot();
        let resolution = table.resolve(path, host, secure, site, index, entries);
        record_resolution(&resolution);
        resolution
    }
}

fn record_resolution(resolution: &Resolution) {
    let outcome = match resolution {
        Resolution::Context { .. } => "context",
        Resolution::Redirect { .. } => "redirect",
        Resolution::NotFound => "not_found",
    };
    metrics::counter!("masthead_resolutions_total", "outcome" => outcome).increment(1);
}
