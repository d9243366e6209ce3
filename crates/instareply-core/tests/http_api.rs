//! Integration tests for the HTTP API

#[cfg(feature = "http-api")]
mod http_api_tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use instareply_core::config::{ChatDefaults, Config};
    use instareply_core::profile::{ProfileContext, ProfileStore};
    use instareply_core::relay::chat::{EMOJI_DEMO_RESPONSE, PLAIN_DEMO_RESPONSE};
    use instareply_core::relay::{ChatRelay, SubscribeRelay};
    use instareply_core::service::http::{create_router, AppState};
    use instareply_core::profile::store::{CURRENT_PROFILE_ID_KEY, PROFILES_KEY};
    use instareply_core::storage::{KeyValueStore, MemoryKeyValueStore};

    fn router() -> Router {
        router_with(Arc::new(MemoryKeyValueStore::new()))
    }

    fn router_with(backend: Arc<MemoryKeyValueStore>) -> Router {
        let mut profiles = ProfileContext::new(ProfileStore::new(Box::new(backend)));
        profiles.init();
        let state = AppState::new(
            Config::default(),
            ChatRelay::new(None, ChatDefaults::default()),
            SubscribeRelay::new(None, "instareply-waitlist"),
            profiles,
        );
        create_router(Arc::new(state))
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&router(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["demo"], true);
    }

    #[tokio::test]
    async fn test_chat_demo_with_emojis() {
        let body = json!({"message": "hi", "profile": {"includeEmojis": true, "tone": "casual"}});
        let (status, resp) = send(&router(), "POST", "/api/chat", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["response"], EMOJI_DEMO_RESPONSE);
        assert_eq!(resp["isDemo"], true);
        assert_eq!(resp["profileSettings"], json!({"includeEmojis": true, "tone": "casual"}));
    }

    #[tokio::test]
    async fn test_chat_demo_without_emojis() {
        let body = json!({"message": "hi", "profile": {"includeEmojis": false}});
        let (status, resp) = send(&router(), "POST", "/api/chat", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["response"], PLAIN_DEMO_RESPONSE);
        assert_eq!(resp["profileSettings"]["tone"], "friendly");
    }

    #[tokio::test]
    async fn test_chat_requires_message() {
        let (status, resp) = send(&router(), "POST", "/api/chat", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, json!({"error": "Message is required"}));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_subscribe_rejects_bad_email() {
        let (status, resp) = send(
            &router(),
            "POST",
            "/api/subscribe",
            Some(json!({"email": "not-an-email"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp, json!({"error": "Invalid email address"}));
    }

    #[tokio::test]
    async fn test_subscribe_without_credential() {
        let (status, resp) = send(
            &router(),
            "POST",
            "/api/subscribe",
            Some(json!({"email": "fan@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp, json!({"error": "Service configuration error"}));
    }

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let router = router();

        let (status, view) = send(&router, "GET", "/api/profiles", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["profiles"].as_array().unwrap().len(), 1);
        assert_eq!(view["currentProfile"]["id"], "default");

        let (status, created) = send(
            &router,
            "POST",
            "/api/profiles",
            Some(json!({"name": "Work", "includeEmojis": false, "tone": "formal"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let work_id = created["id"].as_str().unwrap().to_string();
        assert!(work_id.starts_with("profile-"));

        let (status, view) = send(
            &router,
            "PUT",
            "/api/profiles/current",
            Some(json!({"id": work_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["currentProfile"]["id"], work_id.as_str());

        let (status, view) = send(
            &router,
            "PATCH",
            &format!("/api/profiles/{}", work_id),
            Some(json!({"tone": "casual"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["currentProfile"]["tone"], "casual");
        assert_eq!(view["profiles"][1]["tone"], "casual");

        let (status, view) = send(&router, "DELETE", &format!("/api/profiles/{}", work_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["profiles"].as_array().unwrap().len(), 1);
        assert_eq!(view["currentProfile"]["id"], "default");
    }

    #[tokio::test]
    async fn test_unknown_profile_ids() {
        let router = router();

        let (status, _) = send(&router, "DELETE", "/api/profiles/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &router,
            "PATCH",
            "/api/profiles/nope",
            Some(json!({"name": "X"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&router, "PUT", "/api/profiles/current", Some(json!({"id": "nope"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, view) = send(&router, "GET", "/api/profiles", None).await;
        assert_eq!(view["profiles"].as_array().unwrap().len(), 1);
        assert_eq!(view["profiles"][0]["name"], "Default Profile");
    }

    #[tokio::test]
    async fn test_delete_current_profile_outside_collection() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend
            .set(PROFILES_KEY, r#"[{"id":"a","name":"A","includeEmojis":true}]"#)
            .unwrap();
        backend.set(CURRENT_PROFILE_ID_KEY, "gone").unwrap();
        let router = router_with(backend.clone());

        // Stored current id did not resolve, so current is the built-in default.
        let (_, view) = send(&router, "GET", "/api/profiles", None).await;
        assert_eq!(view["currentProfile"]["id"], "default");

        let (status, view) = send(&router, "DELETE", "/api/profiles/default", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["currentProfile"]["id"], "a");
        assert_eq!(view["profiles"].as_array().unwrap().len(), 1);
        assert_eq!(
            backend.get(CURRENT_PROFILE_ID_KEY).unwrap().as_deref(),
            Some("a")
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_profile_changes_nothing() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let router = router_with(backend.clone());
        let before = backend.get(PROFILES_KEY).unwrap();

        let (status, resp) = send(&router, "DELETE", "/api/profiles/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(resp, json!({"error": "Profile not found: nope"}));
        assert_eq!(backend.get(PROFILES_KEY).unwrap(), before);
        assert_eq!(
            backend.get(CURRENT_PROFILE_ID_KEY).unwrap().as_deref(),
            Some("default")
        );
    }
}
