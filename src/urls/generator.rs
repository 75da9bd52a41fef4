//! Per-route URL generation.
//!
//! Every matcher with a permalink pattern gets one [`UrlGenerator`]: it
//! knows which resources the route can address and how to render their
//! canonical paths. Ownership between generators is decided centrally by
//! the URL service, never here.

use crate::config::schema::TaxonomyKind;
use crate::index::resource::{Resource, ResourceKind, Status, Visibility};
use crate::routing::filter::FilterExpr;
use crate::routing::permalink::{PermalinkError, PermalinkPattern};
use crate::routing::route::{MatcherKind, MatcherRank, RouteMatcher};

/// Generates canonical paths for one permalink-bearing route.
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    /// Priority rank of the owning matcher; lower wins arbitration.
    pub rank: MatcherRank,

    /// Resource kinds this route addresses.
    kinds: Vec<ResourceKind>,

    /// The route's content filter, when configured.
    filter: Option<FilterExpr>,

    pattern: PermalinkPattern,
}

impl UrlGenerator {
    /// Build a generator for a matcher, or `None` when the matcher has
    /// no permalink (static routes, channels).
    pub fn from_matcher(matcher: &RouteMatcher) -> Option<Self> {
        let pattern = matcher.permalink.clone()?;
        let kinds = match matcher.kind {
            MatcherKind::Collection => vec![ResourceKind::Post, ResourceKind::Page],
            MatcherKind::Taxonomy(TaxonomyKind::Tag) => vec![ResourceKind::Tag],
            MatcherKind::Taxonomy(TaxonomyKind::Author) => vec![ResourceKind::Author],
            MatcherKind::Static | MatcherKind::Channel => return None,
        };

        Some(Self {
            rank: matcher.rank,
            kinds,
            filter: matcher.filter.clone(),
            pattern,
        })
    }

    /// Whether this route can address the resource at all: right kind,
    /// publicly visible, published (for content), and passing the
    /// route's filter.
    pub fn wants(&self, resource: &Resource) -> bool {
        if !self.kinds.contains(&resource.kind) {
            return false;
        }
        if resource.visibility != Visibility::Public {
            return false;
        }
        if matches!(resource.kind, ResourceKind::Post | ResourceKind::Page)
            && resource.status != Status::Published
        {
            return false;
        }
        self.filter
            .as_ref()
            .map(|f| f.matches(resource))
            .unwrap_or(true)
    }

    /// Render the canonical path. [`PermalinkError::MissingField`] means
    /// the resource cannot be reached through this route.
    pub fn generate(&self, resource: &Resource) -> Result<String, PermalinkError> {
        self.pattern.generate(resource)
    }
}
