//! Request context construction.
//!
//! A resolved matcher plus its match result turn into a [`RequestContext`]:
//! the directive telling the render layer what to query and which template
//! to use. Building is a pure function; identical inputs yield identical
//! contexts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::schema::TaxonomyKind;
use crate::index::resource::{Resource, ResourceKind};
use crate::routing::route::{MatchResult, MatcherKind, RouteHit, RouteMatcher};

/// The kind of response a context describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    /// A static route.
    Custom,
    /// A collection listing page.
    Index,
    /// A single resource reached through a permalink.
    Entry,
    /// A channel listing page.
    Channel,
    /// A taxonomy term page.
    Taxonomy,
}

/// The fully specified query/template directive for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(rename = "type")]
    pub context_type: ContextType,

    /// Context names for template helpers (e.g. ["paged", "tag"]).
    pub context: Vec<String>,

    /// Template candidates in priority order.
    pub templates: Vec<String>,

    /// Fallback template when no candidate resolves.
    pub default_template: String,

    /// Content filter for listing queries, source text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Injected data queries, opaque to the routing core.
    pub data: serde_json::Map<String, serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,

    /// Channel name, when the route is a channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Response content type override; RSS responses default to
    /// `text/xml; charset=UTF-8`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Captured permalink params.
    pub params: BTreeMap<String, String>,

    /// Listing page number, absent on the first page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Whether this is an RSS sub-route.
    pub rss: bool,
}

/// Default content type stamped on RSS responses.
pub const RSS_CONTENT_TYPE: &str = "text/xml; charset=UTF-8";

/// Builds request contexts from matched routes.
pub struct RequestContextBuilder;

impl RequestContextBuilder {
    /// Build the context for a matched route. `resource` is the matched
    /// entity for entry hits; its own template list outranks the route's.
    pub fn build(
        matcher: &RouteMatcher,
        result: &MatchResult,
        resource: Option<&Resource>,
    ) -> RequestContext {
        let identifier = route_identifier(&matcher.path);
        let page = match result.hit {
            RouteHit::Page(n) => Some(n),
            _ => None,
        };
        let rss = matches!(result.hit, RouteHit::Rss);

        let context_type = match (&matcher.kind, &result.hit) {
            (MatcherKind::Static, _) => ContextType::Custom,
            (MatcherKind::Channel, _) => ContextType::Channel,
            (MatcherKind::Taxonomy(_), _) => ContextType::Taxonomy,
            (MatcherKind::Collection, RouteHit::Entry) => ContextType::Entry,
            (MatcherKind::Collection, _) => ContextType::Index,
        };

        let mut context = Vec::new();
        if page.is_some() {
            context.push("paged".to_string());
        }
        match context_type {
            ContextType::Custom | ContextType::Channel | ContextType::Index => {
                context.push(identifier.clone());
            }
            ContextType::Taxonomy => {
                if let MatcherKind::Taxonomy(kind) = matcher.kind {
                    context.push(kind.as_str().to_string());
                }
            }
            ContextType::Entry => {
                let kind = resource.map(|r| r.kind).unwrap_or(ResourceKind::Post);
                context.push(entry_context(kind).to_string());
            }
        }

        let templates = Self::templates(matcher, context_type, page, resource);
        let default_template = match context_type {
            ContextType::Custom => "default".to_string(),
            ContextType::Entry => {
                let kind = resource.map(|r| r.kind).unwrap_or(ResourceKind::Post);
                entry_context(kind).to_string()
            }
            _ => "index".to_string(),
        };

        let filter = Self::filter(matcher, result);

        let data = matcher
            .data
            .as_ref()
            .map(|d| d.query.clone())
            .unwrap_or_default();

        let content_type = matcher.content_type.clone().or_else(|| {
            if rss {
                Some(RSS_CONTENT_TYPE.to_string())
            } else {
                None
            }
        });

        RequestContext {
            context_type,
            context,
            templates,
            default_template,
            filter,
            data,
            limit: matcher.limit,
            order: matcher.order.clone(),
            name: match matcher.kind {
                MatcherKind::Channel => Some(identifier),
                _ => None,
            },
            content_type,
            params: result.params.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            page,
            rss,
        }
    }

    /// Template candidates: the resource's own list outranks the route's;
    /// the root collection's front page tries `home` first.
    fn templates(
        matcher: &RouteMatcher,
        context_type: ContextType,
        page: Option<u32>,
        resource: Option<&Resource>,
    ) -> Vec<String> {
        if context_type == ContextType::Entry {
            if let Some(resource) = resource {
                if !resource.templates.is_empty() {
                    return resource.templates.clone();
                }
            }
            return matcher.templates.clone();
        }

        let mut templates = Vec::new();
        if matcher.kind == MatcherKind::Collection && matcher.path == "/" && page.is_none() {
            templates.push("home".to_string());
        }
        templates.extend(matcher.templates.iter().cloned());
        templates
    }

    /// Listing filter: the route's own filter, or one derived from the
    /// matched taxonomy term.
    fn filter(matcher: &RouteMatcher, result: &MatchResult) -> Option<String> {
        if let MatcherKind::Taxonomy(kind) = matcher.kind {
            let slug = result.params.get("slug")?;
            let field = match kind {
                TaxonomyKind::Tag => "tag",
                TaxonomyKind::Author => "author",
            };
            return Some(format!("{field}:{slug}"));
        }
        matcher.filter_raw.clone()
    }
}

/// Route identifier used for context names: `/about/` becomes `about`,
/// the root becomes `index`, nested paths join with `-`.
fn route_identifier(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "index".to_string()
    } else {
        trimmed.replace('/', "-")
    }
}

fn entry_context(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Page => "page",
        _ => "post",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::resource::{Status, Visibility};
    use crate::routing::permalink::PermalinkPattern;
    use crate::routing::route::RouteHit;
    use std::collections::HashMap;

    fn static_matcher(path: &str, templates: &[&str]) -> RouteMatcher {
        RouteMatcher {
            rank: 0,
            kind: MatcherKind::Static,
            path: path.to_string(),
            templates: templates.iter().map(|s| s.to_string()).collect(),
            filter: None,
            filter_raw: None,
            permalink: None,
            data: None,
            limit: None,
            order: None,
            rss: false,
            content_type: None,
        }
    }

    fn index_hit() -> MatchResult {
        MatchResult {
            hit: RouteHit::Index,
            params: HashMap::new(),
        }
    }

    #[test]
    fn static_route_context() {
        let matcher = static_matcher("/about/", &["about"]);
        let ctx = RequestContextBuilder::build(&matcher, &index_hit(), None);

        assert_eq!(ctx.context_type, ContextType::Custom);
        assert_eq!(ctx.context, vec!["about"]);
        assert_eq!(ctx.templates, vec!["about"]);
        assert_eq!(ctx.default_template, "default");
        assert!(ctx.filter.is_none());
        assert!(ctx.name.is_none());
    }

    #[test]
    fn root_static_route_uses_index_identifier() {
        let matcher = static_matcher("/", &[]);
        let ctx = RequestContextBuilder::build(&matcher, &index_hit(), None);
        assert_eq!(ctx.context, vec!["index"]);
    }

    #[test]
    fn channel_context_carries_name_and_filter() {
        let mut matcher = static_matcher("/kitchen/", &[]);
        matcher.kind = MatcherKind::Channel;
        matcher.filter_raw = Some("tag:kitchen-sink".to_string());
        matcher.limit = Some(2);
        matcher.order = Some("published_at asc".to_string());

        let ctx = RequestContextBuilder::build(&matcher, &index_hit(), None);
        assert_eq!(ctx.context_type, ContextType::Channel);
        assert_eq!(ctx.name.as_deref(), Some("kitchen"));
        assert_eq!(ctx.filter.as_deref(), Some("tag:kitchen-sink"));
        assert_eq!(ctx.limit, Some(2));
        assert_eq!(ctx.order.as_deref(), Some("published_at asc"));
    }

    #[test]
    fn taxonomy_context_derives_filter_from_slug() {
        let pattern = PermalinkPattern::compile("/tag/:slug/").unwrap();
        let mut matcher = static_matcher("/tag/", &[]);
        matcher.kind = MatcherKind::Taxonomy(TaxonomyKind::Tag);
        matcher.permalink = Some(pattern);

        let mut params = HashMap::new();
        params.insert("slug".to_string(), "bacon".to_string());
        let result = MatchResult {
            hit: RouteHit::Index,
            params,
        };

        let ctx = RequestContextBuilder::build(&matcher, &result, None);
        assert_eq!(ctx.context_type, ContextType::Taxonomy);
        assert_eq!(ctx.context, vec!["tag"]);
        assert_eq!(ctx.filter.as_deref(), Some("tag:bacon"));
        assert_eq!(ctx.params["slug"], "bacon");
    }

    #[test]
    fn paged_hits_prepend_paged_context() {
        let mut matcher = static_matcher("/podcast/", &[]);
        matcher.kind = MatcherKind::Collection;

        let result = MatchResult {
            hit: RouteHit::Page(3),
            params: HashMap::new(),
        };
        let ctx = RequestContextBuilder::build(&matcher, &result, None);
        assert_eq!(ctx.context, vec!["paged", "podcast"]);
        assert_eq!(ctx.page, Some(3));
    }

    #[test]
    fn root_collection_front_page_prefers_home_template() {
        let mut matcher = static_matcher("/", &["casper"]);
        matcher.kind = MatcherKind::Collection;

        let ctx = RequestContextBuilder::build(&matcher, &index_hit(), None);
        assert_eq!(ctx.templates, vec!["home", "casper"]);

        let paged = MatchResult {
            hit: RouteHit::Page(2),
            params: HashMap::new(),
        };
        let ctx = RequestContextBuilder::build(&matcher, &paged, None);
        assert_eq!(ctx.templates, vec!["casper"]);
    }

    #[test]
    fn entry_resource_templates_outrank_route_templates() {
        let mut matcher = static_matcher("/", &["collection-template"]);
        matcher.kind = MatcherKind::Collection;

        let resource = Resource {
            id: "p1".to_string(),
            kind: ResourceKind::Post,
            slug: "custom".to_string(),
            status: Status::Published,
            visibility: Visibility::Public,
            featured: false,
            tags: Vec::new(),
            authors: Vec::new(),
            published_at: None,
            templates: vec!["custom-template".to_string()],
        };
        let result = MatchResult {
            hit: RouteHit::Entry,
            params: HashMap::new(),
        };

        let ctx = RequestContextBuilder::build(&matcher, &result, Some(&resource));
        assert_eq!(ctx.context_type, ContextType::Entry);
        assert_eq!(ctx.templates, vec!["custom-template"]);
        assert_eq!(ctx.default_template, "post");
        assert_eq!(ctx.context, vec!["post"]);
    }

    #[test]
    fn rss_hit_sets_content_type() {
        let mut matcher = static_matcher("/podcast/", &[]);
        matcher.kind = MatcherKind::Collection;
        matcher.rss = true;

        let result = MatchResult {
            hit: RouteHit::Rss,
            params: HashMap::new(),
        };
        let ctx = RequestContextBuilder::build(&matcher, &result, None);
        assert!(ctx.rss);
        assert_eq!(ctx.content_type.as_deref(), Some(RSS_CONTENT_TYPE));
    }

    #[test]
    fn building_twice_yields_identical_contexts() {
        let matcher = static_matcher("/about/", &["about"]);
        let a = RequestContextBuilder::build(&matcher, &index_hit(), None);
        let b = RequestContextBuilder::build(&matcher, &index_hit(), None);
        assert_eq!(a, b);
    }
}
