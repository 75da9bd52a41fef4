//! End-to-end resolution tests: configuration in, responses out.

use masthead::routing::table::Resolution;
use masthead::routing::ContextType;
use masthead::urls::UrlLookup;

mod common;
use common::{author, client, featured, post, serve, site_with, tag};

const TWO_COLLECTIONS: &str = r#"
    [[routing.collections]]
    path = "/podcast/"
    permalink = "/podcast/:slug/"
    filter = "featured:true"

    [[routing.collections]]
    path = "/"
    permalink = "/:slug/"
"#;

#[test]
fn featured_posts_resolve_through_their_collection() {
    let site = site_with(
        TWO_COLLECTIONS,
        vec![featured(post("p-feat", "episode", &[])), post("p-plain", "notes", &[])],
    );

    // the higher-priority collection owns the featured post's URL
    assert_eq!(
        site.url_for("p-feat"),
        UrlLookup::Known("/podcast/episode/".to_string())
    );
    assert_eq!(
        site.url_for("p-plain"),
        UrlLookup::Known("/notes/".to_string())
    );

    match site.resolve("/podcast/episode/", "localhost", false) {
        Resolution::Context { context, resource } => {
            assert_eq!(context.context_type, ContextType::Entry);
            assert_eq!(resource.unwrap().id, "p-feat");
        }
        other => panic!("expected entry context, got {other:?}"),
    }

    // the featured post is never reachable through the root collection
    assert!(matches!(
        site.resolve("/episode/", "localhost", false),
        Resolution::NotFound
    ));
}

#[test]
fn missing_permalink_field_means_unreachable_not_a_crash() {
    let site = site_with(
        r#"
        [[routing.collections]]
        path = "/"
        permalink = "/:primary_tag/:slug/"
        "#,
        vec![post("p-tagged", "carbonara", &["bacon"]), post("p-untagged", "solo", &[])],
    );

    assert_eq!(
        site.url_for("p-tagged"),
        UrlLookup::Known("/bacon/carbonara/".to_string())
    );
    assert_eq!(site.url_for("p-untagged"), UrlLookup::None);

    assert!(matches!(
        site.resolve("/solo/", "localhost", false),
        Resolution::NotFound
    ));
}

#[test]
fn disjoint_filters_give_every_post_exactly_one_home() {
    let site = site_with(
        r#"
        [[routing.collections]]
        path = "/bacon-only/"
        permalink = "/bacon-only/:slug/"
        filter = "tag:bacon+tag:-chorizo"

        [[routing.collections]]
        path = "/chorizo-only/"
        permalink = "/chorizo-only/:slug/"
        filter = "tag:chorizo+tag:-bacon"
        "#,
        vec![
            post("p-bacon", "all-bacon", &["bacon"]),
            post("p-chorizo", "all-chorizo", &["chorizo"]),
            post("p-both", "mixed", &["bacon", "chorizo"]),
        ],
    );

    assert_eq!(
        site.url_for("p-bacon"),
        UrlLookup::Known("/bacon-only/all-bacon/".to_string())
    );
    assert_eq!(
        site.url_for("p-chorizo"),
        UrlLookup::Known("/chorizo-only/all-chorizo/".to_string())
    );
    // matches neither filter, so neither collection claims it
    assert_eq!(site.url_for("p-both"), UrlLookup::None);

    assert!(matches!(
        site.resolve("/bacon-only/all-chorizo/", "localhost", false),
        Resolution::NotFound
    ));
}

#[test]
fn static_route_context_shape() {
    let site = site_with(
        r#"
        [[routing.routes]]
        path = "/about/"
        templates = ["about"]
        "#,
        Vec::new(),
    );

    match site.resolve("/about/", "localhost", false) {
        Resolution::Context { context, .. } => {
            assert_eq!(context.context_type, ContextType::Custom);
            assert_eq!(context.context, vec!["about"]);
            assert_eq!(context.templates, vec!["about"]);
            assert_eq!(context.default_template, "default");
        }
        other => panic!("expected context, got {other:?}"),
    }
}

#[test]
fn channel_context_carries_overrides() {
    let site = site_with(
        r#"
        [[routing.routes]]
        path = "/kitchen/"
        controller = "channel"
        filter = "tag:kitchen-sink"
        limit = 2
        order = "published_at asc"
        "#,
        Vec::new(),
    );

    match site.resolve("/kitchen/", "localhost", false) {
        Resolution::Context { context, .. } => {
            assert_eq!(context.context_type, ContextType::Channel);
            assert_eq!(context.name.as_deref(), Some("kitchen"));
            assert_eq!(context.filter.as_deref(), Some("tag:kitchen-sink"));
            assert_eq!(context.limit, Some(2));
            assert_eq!(context.order.as_deref(), Some("published_at asc"));
        }
        other => panic!("expected context, got {other:?}"),
    }
}

#[test]
fn home_template_applies_to_front_page_only() {
    let site = site_with(TWO_COLLECTIONS, vec![post("p1", "hello", &[])]);

    match site.resolve("/", "localhost", false) {
        Resolution::Context { context, .. } => {
            assert_eq!(context.templates, vec!["home"]);
        }
        other => panic!("expected context, got {other:?}"),
    }

    match site.resolve("/page/2/", "localhost", false) {
        Resolution::Context { context, .. } => {
            assert!(context.templates.is_empty());
            assert_eq!(context.page, Some(2));
            assert_eq!(context.context[0], "paged");
        }
        other => panic!("expected context, got {other:?}"),
    }
}

#[test]
fn taxonomy_pages_exist_only_for_known_terms() {
    let site = site_with(
        r#"
        [[routing.collections]]
        path = "/"
        permalink = "/:slug/"

        [[routing.taxonomies]]
        kind = "tag"
        permalink = "/tag/:slug/"

        [[routing.taxonomies]]
        kind = "author"
        permalink = "/author/:slug/"
        "#,
        vec![tag("bacon"), author("joe-bloggs"), post("p1", "hello", &["bacon"])],
    );

    match site.resolve("/tag/bacon/", "localhost", false) {
        Resolution::Context { context, .. } => {
            assert_eq!(context.context_type, ContextType::Taxonomy);
            assert_eq!(context.filter.as_deref(), Some("tag:bacon"));
        }
        other => panic!("expected context, got {other:?}"),
    }

    match site.resolve("/author/joe-bloggs/", "localhost", false) {
        Resolution::Context { context, .. } => {
            assert_eq!(context.filter.as_deref(), Some("author:joe-bloggs"));
        }
        other => panic!("expected context, got {other:?}"),
    }

    assert!(matches!(
        site.resolve("/tag/unknown/", "localhost", false),
        Resolution::NotFound
    ));

    // term pages get URLs too
    assert_eq!(
        site.url_for("tag-bacon"),
        UrlLookup::Known("/tag/bacon/".to_string())
    );
}

#[test]
fn claimed_posts_redirect_to_the_claiming_route() {
    let site = site_with(
        r#"
        [[routing.routes]]
        path = "/channel6/"
        controller = "channel"
        [routing.routes.data.router]
        posts = [{ slug = "html-ipsum", redirect = true }]

        [[routing.collections]]
        path = "/"
        permalink = "/:slug/"
        "#,
        vec![post("p1", "html-ipsum", &[]), post("p2", "other", &[])],
    );

    match site.resolve("/html-ipsum/", "localhost", false) {
        Resolution::Redirect { status, location } => {
            assert_eq!(status, 301);
            assert_eq!(location, "/channel6/");
        }
        other => panic!("expected redirect, got {other:?}"),
    }

    // the claim does not disturb unclaimed entries
    assert!(matches!(
        site.resolve("/other/", "localhost", false),
        Resolution::Context { .. }
    ));
}

#[tokio::test]
async fn page_one_collapses_to_the_unpaginated_path() {
    let site = site_with(TWO_COLLECTIONS, vec![post("p1", "hello", &[])]);
    let _shutdown = serve(site, "127.0.0.1:23811".parse().unwrap()).await;
    let client = client();

    let res = client
        .get("http://127.0.0.1:23811/page/1/")
        .send()
        .await
        .expect("site unreachable");
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "/");

    let res = client
        .get("http://127.0.0.1:23811/page/2/")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    for bad in ["/page/0/", "/page/abc/"] {
        let res = client
            .get(format!("http://127.0.0.1:23811{bad}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 404, "{bad} must not match pagination");
    }
}

#[tokio::test]
async fn trailing_slash_is_enforced_except_for_assets() {
    let site = site_with(
        r#"
        [[routing.routes]]
        path = "/about/"
        "#,
        Vec::new(),
    );
    let _shutdown = serve(site, "127.0.0.1:23812".parse().unwrap()).await;
    let client = client();

    let res = client
        .get("http://127.0.0.1:23812/about")
        .send()
        .await
        .expect("site unreachable");
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "/about/");

    let res = client
        .get("http://127.0.0.1:23812/style.css")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn rss_sub_routes_serve_and_redirect() {
    let site = site_with(TWO_COLLECTIONS, vec![post("p1", "hello", &[])]);
    let _shutdown = serve(site, "127.0.0.1:23813".parse().unwrap()).await;
    let client = client();

    let res = client
        .get("http://127.0.0.1:23813/rss/")
        .send()
        .await
        .expect("site unreachable");
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/xml; charset=UTF-8");

    let res = client
        .get("http://127.0.0.1:23813/feed/")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "/rss/");

    let res = client
        .get("http://127.0.0.1:23813/rss/2/")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "/rss/");
}

#[tokio::test]
async fn claimed_tag_redirects_to_its_channel() {
    let site = site_with(
        r#"
        [[routing.routes]]
        path = "/channel1/"
        controller = "channel"
        filter = "tag:bacon"
        [routing.routes.data.router]
        tags = [{ slug = "bacon", redirect = true }]

        [[routing.collections]]
        path = "/"
        permalink = "/:slug/"

        [[routing.taxonomies]]
        kind = "tag"
        permalink = "/tag/:slug/"
        "#,
        vec![tag("bacon"), tag("sausage"), post("p1", "hello", &["bacon"])],
    );
    let _shutdown = serve(site, "127.0.0.1:23814".parse().unwrap()).await;
    let client = client();

    let res = client
        .get("http://127.0.0.1:23814/tag/bacon/rss/")
        .send()
        .await
        .expect("site unreachable");
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "/channel1/rss/");

    let res = client
        .get("http://127.0.0.1:23814/tag/bacon/")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "/channel1/");

    // unclaimed terms keep their taxonomy pages
    let res = client
        .get("http://127.0.0.1:23814/tag/sausage/")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .get("http://127.0.0.1:23814/channel1/rss/")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/xml; charset=UTF-8");
}

#[tokio::test]
async fn insecure_requests_upgrade_on_secure_sites() {
    let site = site_with(
        &format!(
            r#"
            [site]
            url = "https://example.com"

            {TWO_COLLECTIONS}
            "#
        ),
        vec![post("p1", "hello", &[])],
    );
    let _shutdown = serve(site, "127.0.0.1:23815".parse().unwrap()).await;
    let client = client();

    let res = client
        .get("http://127.0.0.1:23815/")
        .send()
        .await
        .expect("site unreachable");
    assert_eq!(res.status(), 301);
    let location = res.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("https://"), "got {location}");

    let res = client
        .get("http://127.0.0.1:23815/")
        .header("x-forwarded-proto", "https")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn entry_responses_carry_the_resolved_directive() {
    let site = site_with(TWO_COLLECTIONS, vec![post("p1", "hello", &["bacon"])]);
    let _shutdown = serve(site, "127.0.0.1:23816".parse().unwrap()).await;
    let client = client();

    let res = client
        .get("http://127.0.0.1:23816/hello/")
        .send()
        .await
        .expect("site unreachable");
    assert_eq!(res.status(), 200);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["context"]["type"], "entry");
    assert_eq!(body["context"]["params"]["slug"], "hello");
    assert_eq!(body["resource"]["id"], "p1");
}
