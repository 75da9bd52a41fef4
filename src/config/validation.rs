//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees: mount paths
//! are well-formed and distinct, permalink patterns compile, filter
//! expressions parse, taxonomy kinds are not declared twice. Every
//! violation is reported, not just the first; an invalid configuration
//! never reaches the dispatch table.

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{RoutingConfig, SiteConfig};
use crate::routing::filter::FilterExpr;
use crate::routing::permalink::PermalinkPattern;

/// One semantic violation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("site url {url:?} is not a valid absolute URL")]
    BadSiteUrl { url: String },

    #[error("route path {path:?} must start and end with '/'")]
    BadMountPath { path: String },

    #[error("route path {path:?} is declared more than once")]
    DuplicatePrefix { path: String },

    #[error("route path {path:?} ends in a reserved segment")]
    ReservedSegment { path: String },

    #[error("route {path:?}: {message}")]
    InvalidPermalink { path: String, message: String },

    #[error("route {path:?}: invalid filter: {message}")]
    InvalidFilter { path: String, message: String },

    #[error("taxonomy {kind:?} is declared more than once")]
    DuplicateTaxonomy { kind: String },
}

/// Segments that collide with generated sub-routes.
const RESERVED_SEGMENTS: &[&str] = &["page", "rss", "feed"];

/// Validate a full site configuration. Returns every violation found.
pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if url::Url::parse(&config.site.url).is_err() {
        errors.push(ValidationError::BadSiteUrl {
            url: config.site.url.clone(),
        });
    }

    validate_routing(&config.routing, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_routing(routing: &RoutingConfig, errors: &mut Vec<ValidationError>) {
    let mut seen_paths: HashSet<&str> = HashSet::new();

    for route in &routing.routes {
        check_mount_path(&route.path, &mut seen_paths, errors);
        if let Some(filter) = &route.filter {
            check_filter(&route.path, filter, errors);
        }
    }

    for collection in &routing.collections {
        check_mount_path(&collection.path, &mut seen_paths, errors);
        if let Some(filter) = &collection.filter {
            check_filter(&collection.path, filter, errors);
        }
        if let Err(e) = PermalinkPattern::compile(&collection.permalink) {
            errors.push(ValidationError::InvalidPermalink {
                path: collection.path.clone(),
                message: e.to_string(),
            });
        }
    }

    let mut seen_kinds = HashSet::new();
    for taxonomy in &routing.taxonomies {
        if !seen_kinds.insert(taxonomy.kind) {
            errors.push(ValidationError::DuplicateTaxonomy {
                kind: taxonomy.kind.as_str().to_string(),
            });
        }
        match PermalinkPattern::compile(&taxonomy.permalink) {
            Ok(pattern) => {
                // the term page needs the slug to exist in the pattern
                if !pattern
                    .placeholders()
                    .any(|p| p.name() == "slug")
                {
                    errors.push(ValidationError::InvalidPermalink {
                        path: taxonomy.permalink.clone(),
                        message: "taxonomy permalink must bind :slug".to_string(),
                    });
                }
            }
            Err(e) => errors.push(ValidationError::InvalidPermalink {
                path: taxonomy.permalink.clone(),
                message: e.to_string(),
            }),
        }
    }
}

fn check_mount_path<'a>(
    path: &'a str,
    seen: &mut HashSet<&'a str>,
    errors: &mut Vec<ValidationError>,
) {
    if !path.starts_with('/') || !path.ends_with('/') {
        errors.push(ValidationError::BadMountPath {
            path: path.to_string(),
        });
        return;
    }

    if let Some(last) = path.trim_matches('/').split('/').next_back() {
        if RESERVED_SEGMENTS.contains(&last) {
            errors.push(ValidationError::ReservedSegment {
                path: path.to_string(),
            });
        }
    }

    if !seen.insert(path) {
        errors.push(ValidationError::DuplicatePrefix {
            path: path.to_string(),
        });
    }
}

fn check_filter(path: &str, filter: &str, errors: &mut Vec<ValidationError>) {
    if let Err(e) = FilterExpr::parse(filter) {
        errors.push(ValidationError::InvalidFilter {
            path: path.to_string(),
            message: e.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(raw: &str) -> SiteConfig {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&SiteConfig::default()).is_ok());
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let config = config(
            r#"
            [[routing.routes]]
            path = "/about/"

            [[routing.collections]]
            path = "/about/"
            permalink = "/about/:slug/"
        "#,
        );

        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicatePrefix { path } if path == "/about/")));
    }

    #[test]
    fn all_errors_are_reported_at_once() {
        let config = config(
            r#"
            site = { url = "not a url" }

            [[routing.routes]]
            path = "no-slashes"

            [[routing.collections]]
            path = "/c/"
            permalink = "/c/:bogus/"
            filter = "tag:"
        "#,
        );

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn reserved_segments_are_rejected() {
        let config = config(
            r#"
            [[routing.routes]]
            path = "/rss/"
        "#,
        );

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::ReservedSegment { .. }));
    }

    #[test]
    fn taxonomy_permalink_must_bind_slug() {
        let config = config(
            r#"
            [[routing.taxonomies]]
            kind = "tag"
            permalink = "/tag/:primary_tag/"
        "#,
        );

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidPermalink { .. }));
    }

    #[test]
    fn duplicate_taxonomy_kind_is_rejected() {
        let config = config(
            r#"
            [[routing.taxonomies]]
            kind = "tag"
            permalink = "/tag/:slug/"

            [[routing.taxonomies]]
            kind = "tag"
            permalink = "/category/:slug/"
        "#,
        );

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::DuplicateTaxonomy { .. }));
    }
}
