pub mod handlers;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/options", get(handlers::handle_list_options))
        .route("/api/v1/options/:name", get(handlers::handle_get_option))
        .route("/api/v1/render", post(handlers::handle_render))
        .route("/api/v1/link", get(handlers::handle_link))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::options::catalog;

    fn app() -> Router {
        let state = AppState {
            config: Config::from_lookup(|_| None).unwrap(),
            spec: Arc::new(catalog::compiled().unwrap()),
        };
        build_router(state)
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn render_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/render")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    // ── health / options ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "bigtext");
    }

    #[tokio::test]
    async fn test_list_options() {
        let (status, body) = send(get_request("/api/v1/options")).await;
        assert_eq!(status, StatusCode::OK);
        let options = body.as_array().unwrap();
        assert_eq!(options.len(), 44);

        let find = |name: &str| options.iter().find(|o| o["name"] == name).unwrap().clone();
        assert_eq!(find("image-mode")["exported"], false);
        assert_eq!(find("layout")["triggers_refit"], true);
        assert_eq!(find("countdown-font-family")["target"], "countdown");
        assert_eq!(find("textbox-padding")["css_name"], "padding");
    }

    #[tokio::test]
    async fn test_get_single_option() {
        let (status, body) = send(get_request("/api/v1/options/text-shadow-blur")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["target"], "text");
        assert_eq!(body["scope"], "text-shadow");
    }

    #[tokio::test]
    async fn test_get_unknown_option_is_rejected() {
        let (status, body) = send(get_request("/api/v1/options/font-colour")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "UNKNOWN_OPTION");
        assert!(body["error"]["message"].as_str().unwrap().contains("font-colour"));
    }

    // ── render ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_render_fits_text_surface() {
        let (status, body) = send(render_request(json!({
            "query": "?text=HELLO&layout=row&nope=1",
            "viewport": {"width": 1600.0, "height": 400.0},
            "text_box": {"width": 1600.0, "height": 400.0}
        })))
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let scale = body["session"]["fits"]["text"]["scale"].as_f64().unwrap();
        assert!(scale > 0.0 && scale < 100.0, "{scale}");
        let font_size = body["session"]["surfaces"]["text"]["vars"]["font-size"]
            .as_str()
            .unwrap();
        assert_eq!(font_size, format!("{scale}vh"));
        assert_eq!(body["session"]["surfaces"]["text"]["text"], "HELLO");

        let query = body["query"].as_str().unwrap();
        assert!(query.starts_with("text=HELLO&"));
        assert!(query.contains("layout=row"));
        assert!(!query.contains("nope"));
    }

    #[tokio::test]
    async fn test_render_zero_box_is_unprocessable() {
        let (status, body) = send(render_request(json!({
            "query": "text=HELLO",
            "viewport": {"width": 1600.0, "height": 400.0},
            "text_box": {"width": 0.0, "height": 400.0}
        })))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "LAYOUT_ERROR");
    }

    #[tokio::test]
    async fn test_render_rejects_negative_box() {
        let (status, body) = send(render_request(json!({
            "viewport": {"width": -1.0, "height": 400.0},
            "text_box": {"width": 100.0, "height": 100.0}
        })))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_render_countdown_needs_a_box() {
        let query = "text=SOON&countdown-enabled=true&countdown-timestamp=2000-01-01T00:00:00Z";
        let (status, _) = send(render_request(json!({
            "query": query,
            "viewport": {"width": 1600.0, "height": 900.0},
            "text_box": {"width": 1600.0, "height": 600.0}
        })))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(render_request(json!({
            "query": query,
            "viewport": {"width": 1600.0, "height": 900.0},
            "text_box": {"width": 1600.0, "height": 600.0},
            "countdown_box": {"width": 1600.0, "height": 300.0}
        })))
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(body["session"]["fits"]["countdown"]["scale"].is_number());
        assert!(body["session"]["surfaces"]["root"]["classes"]
            .as_array()
            .unwrap()
            .contains(&json!("has-countdown")));
    }

    // ── link ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_link_canonicalizes_query() {
        let (status, body) =
            send(get_request("/api/v1/link?layout=row&bogus=1&image-size=lots&text=Hi")).await;
        assert_eq!(status, StatusCode::OK);
        let query = body["query"].as_str().unwrap();
        assert!(query.starts_with("text=Hi&"), "{query}");
        assert!(query.contains("&layout=row"));
        assert!(query.contains("&image-size=50"));
        assert!(!query.contains("bogus"));
    }
}
