//! Indexed content entities.
//!
//! A [`Resource`] is the minimal slice of a content entity the routing
//! layer needs: identity, slug, and the fields referenced by filters and
//! permalink patterns. Resources are owned by the index and only mutated
//! through change events sourced from the persistence layer.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier assigned by the persistence layer.
pub type ResourceId = String;

/// Content entity kinds the routing layer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Post,
    Page,
    Tag,
    Author,
}

/// Publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Published,
    Draft,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Published => "published",
            Status::Draft => "draft",
        }
    }
}

/// Content visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Internal,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Internal => "internal",
        }
    }
}

/// A tag attached to a resource. The first entry is the primary tag.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TagRef {
    pub slug: String,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

/// The indexed view of one content entity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub slug: String,

    #[serde(default = "default_status")]
    pub status: Status,

    #[serde(default = "default_resource_visibility")]
    pub visibility: Visibility,

    #[serde(default)]
    pub featured: bool,

    /// Attached tags, primary first.
    #[serde(default)]
    pub tags: Vec<TagRef>,

    /// Author slugs, primary first.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Publish timestamp, feeds the date permalink tokens.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    /// The entity's own template candidates; these outrank the route's
    /// configured templates.
    #[serde(default)]
    pub templates: Vec<String>,
}

fn default_status() -> Status {
    Status::Published
}

fn default_resource_visibility() -> Visibility {
    Visibility::Public
}

impl Resource {
    /// Slug of the primary tag, if any tag is attached.
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(|t| t.slug.as_str())
    }

    /// Slug of the primary author, if any.
    pub fn primary_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }

    /// Zero-padded date components of the publish timestamp.
    pub fn publish_date_parts(&self) -> Option<(String, String, String)> {
        self.published_at.map(|ts| {
            (
                format!("{:04}", ts.year()),
                format!("{:02}", ts.month()),
                format!("{:02}", ts.day()),
            )
        })
    }

    /// Values of a named field, as compared by filter predicates.
    ///
    /// Multi-valued fields (tags, authors) yield one entry per value;
    /// unknown fields yield nothing, so their predicates never match.
    pub fn field_values(&self, field: &str) -> Vec<String> {
        match field {
            "tag" | "tags" => self.tags.iter().map(|t| t.slug.clone()).collect(),
            "tags.visibility" => self
                .tags
                .iter()
                .map(|t| t.visibility.as_str().to_string())
                .collect(),
            "author" | "authors" => self.authors.clone(),
            "primary_tag" => self.primary_tag().map(str::to_string).into_iter().collect(),
            "primary_author" => self
                .primary_author()
                .map(str::to_string)
                .into_iter()
                .collect(),
            "slug" => vec![self.slug.clone()],
            "featured" => vec![self.featured.to_string()],
            "status" => vec![self.status.as_str().to_string()],
            "visibility" => vec![self.visibility.as_str().to_string()],
            _ => Vec::new(),
        }
    }
}
