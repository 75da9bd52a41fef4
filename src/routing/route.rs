//! Route matchers.
//!
//! One [`RouteMatcher`] owns one configured route. Matchers are built
//! when the routing configuration loads and are immutable afterwards;
//! a reload replaces them wholesale. `test` walks the normalized request
//! path against the matcher's mount path, pagination and RSS sub-routes,
//! and (for collections and taxonomies) the permalink pattern.
//!
//! Matching is deterministic and regex-free. Redirect decisions that
//! depend only on the matcher (page-1 collapse, RSS pagination, feed
//! aliases) are reported as hits carrying the target location.

use std::collections::HashMap;

use crate::config::schema::{DataConfig, TaxonomyKind};
use crate::routing::filter::FilterExpr;
use crate::routing::permalink::PermalinkPattern;

/// Position of a matcher in the priority order; doubles as its identity
/// for URL ownership arbitration.
pub type MatcherRank = usize;

/// Route matcher kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Static,
    Collection,
    Channel,
    Taxonomy(TaxonomyKind),
}

/// A matcher derived from one route definition.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    pub rank: MatcherRank,
    pub kind: MatcherKind,

    /// Mount path with leading and trailing slash. For taxonomies this
    /// is the permalink's literal prefix (e.g. "/tag/").
    pub path: String,

    /// Template candidates configured on the route.
    pub templates: Vec<String>,

    /// Parsed content filter, when configured.
    pub filter: Option<FilterExpr>,

    /// The filter's source text, passed through to the render layer.
    pub filter_raw: Option<String>,

    /// Permalink pattern for member resources (collections, taxonomies).
    pub permalink: Option<PermalinkPattern>,

    /// Data-query injection and claims from the route definition.
    pub data: Option<DataConfig>,

    pub limit: Option<u32>,
    pub order: Option<String>,
    pub rss: bool,
    pub content_type: Option<String>,
}

/// Outcome of testing one path against one matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub hit: RouteHit,

    /// Captured permalink params (taxonomy slug, entry slug, date parts).
    pub params: HashMap<String, String>,
}

impl MatchResult {
    fn plain(hit: RouteHit) -> Self {
        Self {
            hit,
            params: HashMap::new(),
        }
    }
}

/// What part of the route a path hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteHit {
    /// The listing page (mount path, or a taxonomy term page).
    Index,

    /// Listing page `n`, `n >= 2`.
    Page(u32),

    /// The RSS sub-route.
    Rss,

    /// A resource permalink.
    Entry,

    /// A matcher-level permanent redirect (page-1 collapse, RSS
    /// pagination, feed alias).
    Redirect { location: String },
}

impl RouteMatcher {
    /// Test a normalized path (trailing slash, percent-decoded) against
    /// this matcher. First match wins at the table level, so order of
    /// checks here only decides among this matcher's own sub-routes.
    pub fn test(&self, path: &str) -> Option<MatchResult> {
        match self.kind {
            MatcherKind::Static => self.test_mount(path, false),
            MatcherKind::Collection => self
                .test_mount(path, true)
                .or_else(|| self.test_permalink(path)),
            MatcherKind::Channel => self.test_mount(path, true),
            MatcherKind::Taxonomy(_) => self.test_taxonomy(path),
        }
    }

    /// Exact mount-path hit plus, for listings, the pagination and RSS
    /// sub-routes directly under it.
    fn test_mount(&self, path: &str, listing: bool) -> Option<MatchResult> {
        if path == self.path {
            return Some(MatchResult::plain(RouteHit::Index));
        }

        if !listing {
            return None;
        }

        let rest = path.strip_prefix(self.path.as_str())?;
        self.test_sub_route(rest, &self.path)
            .map(MatchResult::plain)
    }

    /// Pagination and RSS sub-routes relative to `base`.
    fn test_sub_route(&self, rest: &str, base: &str) -> Option<RouteHit> {
        if let Some(page) = rest.strip_prefix("page/") {
            let n: u32 = page.strip_suffix('/')?.parse().ok()?;
            return match n {
                // page/0 is not a page; fall through to the next matcher
                0 => None,
                1 => Some(RouteHit::Redirect {
                    location: base.to_string(),
                }),
                _ => Some(RouteHit::Page(n)),
            };
        }

        if !self.rss {
            return None;
        }

        if rest == "rss/" {
            return Some(RouteHit::Rss);
        }

        if rest == "feed/" {
            return Some(RouteHit::Redirect {
                location: format!("{base}rss/"),
            });
        }

        if let Some(page) = rest.strip_prefix("rss/") {
            // RSS pagination is never served; any numeric page collapses
            let _: u32 = page.strip_suffix('/')?.parse().ok()?;
            return Some(RouteHit::Redirect {
                location: format!("{base}rss/"),
            });
        }

        None
    }

    /// Collection permalink hit anywhere under the pattern's shape.
    fn test_permalink(&self, path: &str) -> Option<MatchResult> {
        let params = self.permalink.as_ref()?.match_path(path)?;
        Some(MatchResult {
            hit: RouteHit::Entry,
            params,
        })
    }

    /// Taxonomy routes: the term page itself, plus pagination and RSS
    /// sub-routes under each term.
    fn test_taxonomy(&self, path: &str) -> Option<MatchResult> {
        let pattern = self.permalink.as_ref()?;

        if let Some(params) = pattern.match_path(path) {
            return Some(MatchResult {
                hit: RouteHit::Index,
                params,
            });
        }

        // Split a trailing sub-route off and re-match the base:
        // /tag/bacon/page/2/ -> base /tag/bacon/, rest page/2/
        let (base, rest) = split_sub_route(path)?;
        let params = pattern.match_path(&base)?;
        let hit = self.test_sub_route(&rest, &base)?;
        Some(MatchResult { hit, params })
    }
}

/// Split `/tag/bacon/page/2/` into (`/tag/bacon/`, `page/2/`), or
/// `/tag/bacon/rss/` into (`/tag/bacon/`, `rss/`). `None` when the path
/// carries no recognizable sub-route suffix.
fn split_sub_route(path: &str) -> Option<(String, String)> {
    let trimmed = path.strip_suffix('/')?;
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

    // Two-segment suffixes: page/<n>, rss/<n>
    if segments.len() > 2 {
        let (head, tail) = segments.split_at(segments.len() - 2);
        let numeric = !tail[1].is_empty() && tail[1].chars().all(|c| c.is_ascii_digit());
        if (tail[0] == "page" || tail[0] == "rss") && numeric {
            return Some((join_path(head), format!("{}/{}/", tail[0], tail[1])));
        }
    }

    // One-segment suffixes: rss, feed
    if segments.len() > 1 {
        let (head, tail) = segments.split_at(segments.len() - 1);
        if tail[0] == "rss" || tail[0] == "feed" {
            return Some((join_path(head), format!("{}/", tail[0])));
        }
    }

    None
}

fn join_path(segments: &[&str]) -> String {
    format!("/{}/", segments.join("/"))
}
