//! Permalink pattern compilation, matching, and generation.
//!
//! A permalink template like `/:primary_tag/:slug/` compiles into a token
//! sequence that both matches incoming paths and generates canonical URLs
//! for resources. Matching walks path segments, no regex in the hot path.
//! Matching and generation are inverses for any resource that carries the
//! pattern's required fields.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::index::resource::Resource;

/// Errors from pattern compilation and URL generation.
#[derive(Debug, Error)]
pub enum PermalinkError {
    /// The pattern references an unknown placeholder.
    #[error("unknown permalink placeholder :{token}")]
    UnknownPlaceholder { token: String },

    /// The pattern is not an absolute path with a trailing slash.
    #[error("permalink pattern {pattern:?} must start and end with '/'")]
    NotAbsolute { pattern: String },

    /// The pattern has no placeholder and cannot address a resource.
    #[error("permalink pattern {pattern:?} has no placeholder")]
    NoPlaceholder { pattern: String },

    /// The resource lacks a field the pattern requires. Expected control
    /// flow: the resource is simply unreachable through this route.
    #[error("resource {resource} has no value for :{field}")]
    MissingField { resource: String, field: String },
}

/// Named placeholders a pattern may bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Slug,
    Id,
    PrimaryTag,
    PrimaryAuthor,
    Year,
    Month,
    Day,
}

impl Placeholder {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "slug" => Some(Placeholder::Slug),
            "id" => Some(Placeholder::Id),
            "primary_tag" => Some(Placeholder::PrimaryTag),
            "primary_author" => Some(Placeholder::PrimaryAuthor),
            "year" => Some(Placeholder::Year),
            "month" => Some(Placeholder::Month),
            "day" => Some(Placeholder::Day),
            _ => None,
        }
    }

    /// The parameter name captured on match.
    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::Slug => "slug",
            Placeholder::Id => "id",
            Placeholder::PrimaryTag => "primary_tag",
            Placeholder::PrimaryAuthor => "primary_author",
            Placeholder::Year => "year",
            Placeholder::Month => "month",
            Placeholder::Day => "day",
        }
    }

    /// Resolve this placeholder against a resource.
    fn resolve(&self, resource: &Resource) -> Option<String> {
        match self {
            Placeholder::Slug => Some(resource.slug.clone()),
            Placeholder::Id => Some(resource.id.clone()),
            Placeholder::PrimaryTag => resource.primary_tag().map(str::to_string),
            Placeholder::PrimaryAuthor => resource.primary_author().map(str::to_string),
            Placeholder::Year => resource.publish_date_parts().map(|(y, _, _)| y),
            Placeholder::Month => resource.publish_date_parts().map(|(_, m, _)| m),
            Placeholder::Day => resource.publish_date_parts().map(|(_, _, d)| d),
        }
    }
}

/// One segment of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Placeholder(Placeholder),
}

/// A compiled permalink pattern.
#[derive(Debug, Clone)]
pub struct PermalinkPattern {
    raw: String,
    tokens: Vec<Token>,
}

impl PermalinkPattern {
    /// Compile a pattern string. The pattern must be an absolute path
    /// with a trailing slash and at least one placeholder.
    pub fn compile(raw: &str) -> Result<Self, PermalinkError> {
        if !raw.starts_with('/') || !raw.ends_with('/') {
            return Err(PermalinkError::NotAbsolute {
                pattern: raw.to_string(),
            });
        }

        let mut tokens = Vec::new();
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            match segment.strip_prefix(':') {
                Some(name) => {
                    let placeholder = Placeholder::from_name(name).ok_or_else(|| {
                        PermalinkError::UnknownPlaceholder {
                            token: name.to_string(),
                        }
                    })?;
                    tokens.push(Token::Placeholder(placeholder));
                }
                None => tokens.push(Token::Literal(segment.to_string())),
            }
        }

        if !tokens.iter().any(|t| matches!(t, Token::Placeholder(_))) {
            return Err(PermalinkError::NoPlaceholder {
                pattern: raw.to_string(),
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            tokens,
        })
    }

    /// The pattern string this compiled from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Leading literal segments as a path prefix (e.g. "/podcast/" for
    /// `/podcast/:slug/`, "/" for `/:slug/`).
    pub fn literal_prefix(&self) -> String {
        let mut prefix = String::from("/");
        for token in &self.tokens {
            match token {
                Token::Literal(lit) => {
                    prefix.push_str(lit);
                    prefix.push('/');
                }
                Token::Placeholder(_) => break,
            }
        }
        prefix
    }

    /// Placeholders bound by this pattern, in order.
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.tokens.iter().filter_map(|t| match t {
            Token::Placeholder(p) => Some(*p),
            Token::Literal(_) => None,
        })
    }

    /// Match a normalized path (with trailing slash) against the pattern,
    /// capturing placeholder values by name. `None` when the segment count
    /// or any literal disagrees.
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        if !path.starts_with('/') || !path.ends_with('/') {
            return None;
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() != self.tokens.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (token, segment) in self.tokens.iter().zip(segments) {
            match token {
                Token::Literal(lit) => {
                    if lit != segment {
                        return None;
                    }
                }
                Token::Placeholder(p) => {
                    if segment.is_empty() {
                        return None;
                    }
                    params.insert(p.name().to_string(), segment.to_string());
                }
            }
        }
        Some(params)
    }

    /// Generate the canonical path for a resource. Fails with
    /// [`PermalinkError::MissingField`] when a required field is absent,
    /// which callers treat as "no URL from this route".
    pub fn generate(&self, resource: &Resource) -> Result<String, PermalinkError> {
        let mut path = String::from("/");
        for token in &self.tokens {
            match token {
                Token::Literal(lit) => path.push_str(lit),
                Token::Placeholder(p) => {
                    let value =
                        p.resolve(resource)
                            .ok_or_else(|| PermalinkError::MissingField {
                                resource: resource.id.clone(),
                                field: p.name().to_string(),
                            })?;
                    path.push_str(&value);
                }
            }
            path.push('/');
        }
        Ok(path)
    }
}

impl fmt::Display for PermalinkPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
