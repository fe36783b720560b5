//! Axum router construction.

use axum::Router;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`]: every path falls through to static-file
/// serving, and every response, errors included, carries the CORS headers.
pub fn build(state: AppState) -> Router {
    let mut router = Router::new().fallback(handlers::serve);
    for (name, value) in middleware::CORS_HEADERS {
        router = router.layer(SetResponseHeaderLayer::overriding(name, value));
    }
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method, StatusCode};
    use axum_test::TestServer;

    fn test_server() -> (TestServer, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello").unwrap();
        let root = dir.path().canonicalize().unwrap();
        let server = TestServer::new(build(AppState::new(root))).unwrap();
        (server, dir)
    }

    fn assert_cors(response: &axum_test::TestResponse) {
        for (name, value) in middleware::CORS_HEADERS {
            assert_eq!(response.header(name), value);
        }
    }

    #[tokio::test]
    async fn existing_file_returns_200_with_cors() {
        let (server, _dir) = test_server();
        let response = server.get("/hello.txt").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.text(), "hello");
        assert_cors(&response);
    }

    #[tokio::test]
    async fn unknown_path_returns_404_with_cors() {
        let (server, _dir) = test_server();
        let response = server.get("/missing.txt").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_cors(&response);
    }

    #[tokio::test]
    async fn options_lists_exact_methods() {
        let (server, _dir) = test_server();
        let response = server.method(Method::OPTIONS, "/hello.txt").await;
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_METHODS),
            "GET, POST, OPTIONS"
        );
        assert_cors(&response);
    }

    #[tokio::test]
    async fn post_is_answered_with_cors() {
        let (server, _dir) = test_server();
        let response = server.post("/hello.txt").await;
        assert_eq!(response.status_code(), StatusCode::NOT_IMPLEMENTED);
        assert_cors(&response);
    }
}
