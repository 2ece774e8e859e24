//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{locale, security};
use crate::state::AppState;

/// Create the application router.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new().route("/", get(handlers::pages::get_home));
    for (route, _) in handlers::pages::NAMED_PAGES {
        router = router.route(&format!("/{route}"), get(handlers::pages::get_page));
    }

    router
        .route("/docs", get(handlers::docs::get_docs_index))
        .route("/docs/", get(handlers::docs::get_docs_index))
        .route("/docs/{*link}", get(handlers::docs::get_doc))
        .route("/blog", get(handlers::blog::get_index))
        .route("/blog/{*name}", get(handlers::blog::get_post))
        .route("/products", get(handlers::products::get_products))
        .route("/products/images/{*path}", get(handlers::products::get_image))
        .layer(from_fn_with_state(Arc::clone(&state), locale::resolve_locale))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security::content_type_options_layer())
                .layer(security::frame_options_layer()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use bw_site::{Site, SiteConfig};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::handlers::compute_etag;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "docs/en-US/home.md", b"# Beego\n\nWelcome home");
        write(root, "docs/en-US/about.md", b"# About\n\nBeego is a framework.");
        write(root, "docs/en-US/usecases.md", b"# Use Cases\n\nWho uses Beego");
        write(root, "docs/zh-CN/about.md", "# 关于\n\nBeego 框架".as_bytes());
        write(root, "docs/en-US/intro/index.md", b"---\nroot: true\nname: Intro\n---\n\nStart here");
        write(
            root,
            "docs/en-US/intro/install.md",
            b"---\nname: Install\nlink: install\nsort: 1\n---\n\nRun go get",
        );
        write(root, "docs/en-US/images/arch.png", b"\x89PNG");
        write(root, "blog/en-US/2014-01-01-news.md", b"# News\n\nSecond post");
        write(root, "blog/en-US/2013-10-01-hello.md", b"# Hello\n\nFirst post");
        write(root, "products/projects.json", br#"{"Projects":[{"Name":"A"},{"Name":"B"}]}"#);
        write(root, "products/images/a.jpg", b"jpeg");
        write(root, "secret.txt", b"secret");
        dir
    }

    fn create_app(root: &Path) -> Router {
        let mut config = SiteConfig::with_root(root, vec!["en-US".to_owned(), "zh-CN".to_owned()]);
        config.pages = ["home", "about", "team", "usecases"].map(str::to_owned).to_vec();
        let state = Arc::new(AppState {
            site: Arc::new(Site::load(config)),
            default_locale: "en-US".to_owned(),
            version: "1.0.0".to_owned(),
        });
        create_router(state)
    }

    async fn send(app: Router, uri: &str, headers: &[(header::HeaderName, &str)]) -> Response {
        let mut request = Request::builder().uri(uri);
        for (name, value) in headers {
            request = request.header(name, *value);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_home_page() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/", &[]).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert!(response.headers().contains_key(header::ETAG));
        let body = json(response).await;
        assert_eq!(body["title"], "Beego");
        assert!(body["content"].as_str().unwrap().contains("Welcome home"));
    }

    #[tokio::test]
    async fn test_page_not_modified() {
        let dir = fixture();
        let app = create_app(dir.path());

        let response = send(app.clone(), "/about", &[]).await;
        let etag = response.headers()[header::ETAG].to_str().unwrap().to_owned();

        let response = send(app, "/about", &[(header::IF_NONE_MATCH, etag.as_str())]).await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_etag_covers_version_and_body() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/about", &[]).await;

        let expected = compute_etag("1.0.0", "<p>Beego is a framework.</p>\n");
        assert_eq!(response.headers()[header::ETAG], expected.as_str());
    }

    #[tokio::test]
    async fn test_community_serves_usecases() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/community", &[]).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["title"], "Use Cases");
    }

    #[tokio::test]
    async fn test_missing_page_is_json_404() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/team", &[]).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["error"], "Page not found");
    }

    #[tokio::test]
    async fn test_lang_query_sets_cookie_and_redirects() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/about?lang=zh-CN", &[]).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/about");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("lang=zh-CN;"));
        assert!(cookie.contains("Path=/"));
    }

    #[tokio::test]
    async fn test_cookie_selects_locale() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/about", &[(header::COOKIE, "lang=zh-CN")]).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(header::SET_COOKIE));
        assert_eq!(json(response).await["title"], "关于");
    }

    #[tokio::test]
    async fn test_accept_language_selects_locale() {
        let dir = fixture();
        let response = send(
            create_app(dir.path()),
            "/about",
            &[(header::ACCEPT_LANGUAGE, "zh-CN,zh;q=0.8,en;q=0.6")],
        )
        .await;

        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_owned();
        assert!(cookie.starts_with("lang=zh-CN;"));
        assert_eq!(json(response).await["title"], "关于");
    }

    #[tokio::test]
    async fn test_unsupported_lang_uses_default() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/about?lang=fr-FR", &[]).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["title"], "About");
    }

    #[tokio::test]
    async fn test_doc_found() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/docs/intro/", &[]).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["title"], "Intro");
        assert_eq!(body["link"], "/docs/intro/");
        assert!(body["content"].as_str().unwrap().contains("Start here"));
        assert_eq!(body["children"][0]["title"], "Install");
        assert_eq!(body["children"][0]["link"], "/docs/install");
    }

    #[tokio::test]
    async fn test_doc_served_from_loaded_content() {
        let dir = fixture();
        let app = create_app(dir.path());
        write(
            dir.path(),
            "docs/en-US/intro/index.md",
            b"---\nroot: true\nname: Intro\n---\n\nEdited on disk",
        );

        let body = json(send(app, "/docs/intro/", &[]).await).await;
        assert!(body["content"].as_str().unwrap().contains("Start here"));
    }

    #[tokio::test]
    async fn test_doc_link_without_trailing_slash() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/docs/intro", &[]).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["title"], "Intro");
    }

    #[tokio::test]
    async fn test_docs_index_redirects_to_default() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/docs/", &[]).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/docs/intro/");
    }

    #[tokio::test]
    async fn test_unknown_doc_redirects_to_default() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/docs/missing", &[]).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/docs/intro/");
    }

    #[tokio::test]
    async fn test_missing_default_doc_is_404() {
        let dir = fixture();
        let response = send(
            create_app(dir.path()),
            "/docs/intro/",
            &[(header::COOKIE, "lang=zh-CN")],
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_doc_image() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/docs/images/arch.png", &[]).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn test_doc_image_outside_directory() {
        let dir = fixture();
        let response = send(
            create_app(dir.path()),
            "/docs/images/%2E%2E/%2E%2E/%2E%2E/secret.txt",
            &[],
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blog_index_and_post() {
        let dir = fixture();
        let app = create_app(dir.path());

        let body = json(send(app.clone(), "/blog", &[]).await).await;
        assert_eq!(body["posts"][0]["name"], "2014-01-01-news");
        assert_eq!(body["posts"][1]["title"], "Hello");

        let response = send(app, "/blog/2013-10-01-hello", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["title"], "Hello");
    }

    #[tokio::test]
    async fn test_unknown_post_redirects_to_index() {
        let dir = fixture();
        let response = send(create_app(dir.path()), "/blog/nope", &[]).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/blog");
    }

    #[tokio::test]
    async fn test_products() {
        let dir = fixture();
        let app = create_app(dir.path());

        let body = json(send(app.clone(), "/products", &[]).await).await;
        assert_eq!(body["projects"][0]["Name"], "B");

        let response = send(app.clone(), "/products/images/a.jpg", &[]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");

        let response = send(app, "/products/images/missing.png", &[]).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
