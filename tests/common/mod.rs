//! Shared fixtures for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::net::TcpListener;

use masthead::config::parse_config;
use masthead::index::resource::{Resource, ResourceKind, Status, TagRef, Visibility};
use masthead::{DirectiveRenderer, HttpServer, JsonContentStore, Shutdown, Site};

/// A published post with the given tags (primary first).
pub fn post(id: &str, slug: &str, tags: &[&str]) -> Resource {
    Resource {
        id: id.to_string(),
        kind: ResourceKind::Post,
        slug: slug.to_string(),
        status: Status::Published,
        visibility: Visibility::Public,
        featured: false,
        tags: tags
            .iter()
            .map(|t| TagRef {
                slug: t.to_string(),
                visibility: Visibility::Public,
            })
            .collect(),
        authors: vec!["joe-bloggs".to_string()],
        published_at: Some(Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap()),
        templates: Vec::new(),
    }
}

#[allow(dead_code)]
pub fn featured(mut resource: Resource) -> Resource {
    resource.featured = true;
    resource
}

/// A tag resource, so taxonomy term pages exist.
#[allow(dead_code)]
pub fn tag(slug: &str) -> Resource {
    Resource {
        id: format!("tag-{slug}"),
        kind: ResourceKind::Tag,
        slug: slug.to_string(),
        status: Status::Published,
        visibility: Visibility::Public,
        featured: false,
        tags: Vec::new(),
        authors: Vec::new(),
        published_at: None,
        templates: Vec::new(),
    }
}

#[allow(dead_code)]
pub fn author(slug: &str) -> Resource {
    Resource {
        id: format!("author-{slug}"),
        kind: ResourceKind::Author,
        slug: slug.to_string(),
        status: Status::Published,
        visibility: Visibility::Public,
        featured: false,
        tags: Vec::new(),
        authors: Vec::new(),
        published_at: None,
        templates: Vec::new(),
    }
}

/// Build a settled site from a config string and fixture content.
pub fn site_with(config: &str, resources: Vec<Resource>) -> Arc<Site> {
    let config = parse_config(config).expect("test config must validate");
    let site = Site::new(config).expect("test config must build");
    let store = JsonContentStore::from_resources(resources);
    site.load_content(&store).expect("in-memory load");
    site
}

/// Serve a site on the given address and wait for it to accept.
#[allow(dead_code)]
pub async fn serve(site: Arc<Site>, addr: SocketAddr) -> Shutdown {
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let config = site.config();
    let server = HttpServer::new(&config, site, Arc::new(DirectiveRenderer));

    let listener = TcpListener::bind(addr).await.expect("bind test port");
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown
}

/// A client that reports redirects instead of following them.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .expect("build test client")
}
