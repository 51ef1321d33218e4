
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::Engine;
    use ralley_queue::{
        Dispatcher, FakeClock, Job, QueueConfig, QueueError, Scheduler, SharedJobStore,
    };
    use tower::ServiceExt;

    const NOW: f64 = 1_700_000_000.0;

    struct NullDispatcher;

    #[async_trait]
    impl Dispatcher for NullDispatcher {
        async fn dispatch(&self, _job: &Job) -> Result<u16, QueueError> {
            Ok(200)
        }
    }

    fn create_test_state() -> Arc<AppState> {
        Arc::new(AppState::new(Scheduler::new(
            QueueConfig::default(),
            SharedJobStore::default(),
            Arc::new(NullDispatcher),
            Arc::new(FakeClock::new(NOW)),
        )))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn stored(state: &AppState, id: &str) -> Job {
        state.scheduler.store().lock().get(id).cloned().unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_router(create_test_state());
        let response = app
            .oneshot(Request::builder().uri("/_health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["jobs"], 0);
    }

    #[tokio::test]
    async fn test_json_body_is_stored_verbatim() {
        let state = create_test_state();
        let app = create_router(state.clone());
        let sent = r#"{"z": 1, "a": 12345678901234567890123}"#;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/example.com/hook")
                    .body(Body::from(sent))
                    .unwrap(),
            )
            .await
            .unwrap();

        let id = json_body(response).await["id"].as_str().unwrap().to_string();
        let job = stored(&state, &id);
        assert_eq!(job.request.decoded_body().unwrap().unwrap(), sent.as_bytes());
        assert_eq!(job.request.headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_enqueue_json_request() {
        let state = create_test_state();
        let app = create_router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/example.com/hook?_delay=5&a=1")
                    .header("content-type", "application/json")
                    .header("X-Custom", "yes")
                    .body(Body::from(r#"{"hello":"world"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = json_body(response).await["id"].as_str().unwrap().to_string();

        let job = stored(&state, &id);
        assert_eq!(job.request.method, "POST");
        assert_eq!(job.request.url, "https://example.com/hook?a=1");
        assert_eq!(job.start, NOW + 5.0);
        assert_eq!(job.request.headers["x-custom"], "yes");
        assert_eq!(job.request.headers["content-type"], "application/json");

        let body = job.request.decoded_body().unwrap().unwrap();
        assert_eq!(body, br#"{"hello":"world"}"#);
    }

    #[tokio::test]
    async fn test_enqueue_full_target_url() {
        let state = create_test_state();
        let app = create_router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/http://localhost:3000/items")
                    .header("x-ralley-retry", "3|EXPONENTIAL|2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = json_body(response).await["id"].as_str().unwrap().to_string();

        let job = stored(&state, &id);
        assert_eq!(job.request.method, "PUT");
        assert_eq!(job.request.host, "localhost:3000");
        assert_eq!(job.request.scheme, "http");
        assert!(!job.request.hasbody);
        assert_eq!(job.directives.retry.unwrap().max, 3);
        assert!(!job.request.headers.contains_key("x-ralley-retry"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_kept_raw() {
        let state = create_test_state();
        let app = create_router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/example.com")
                    .header("content-type", "application/json")
                    .body(Body::from("{broken"))
                    .unwrap(),
            )
            .await
            .unwrap();

        let id = json_body(response).await["id"].as_str().unwrap().to_string();
        let job = stored(&state, &id);
        assert_eq!(
            job.request.body.as_deref(),
            Some(base64::engine::general_purpose::STANDARD.encode("{broken").as_str())
        );
    }

    #[tokio::test]
    async fn test_missing_target_is_bad_request() {
        let state = create_test_state();
        let app = create_router(state.clone());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("Malformed request"));
        assert_eq!(state.job_count(), 0);
    }

    #[test]
    fn test_raw_request_merges_repeated_headers() {
        let mut headers = HeaderMap::new();
        headers.append("accept", "text/html".parse().unwrap());
        headers.append("accept", "application/json".parse().unwrap());
        let uri: Uri = "/example.com/a?x=1&y=two%20words".parse().unwrap();

        let raw = raw_request(&Method::GET, &uri, &headers, Bytes::new());
        assert_eq!(raw.url, "example.com/a");
        assert_eq!(raw.method, "GET");
        assert_eq!(raw.headers["accept"], "text/html, application/json");
        assert_eq!(raw.params["x"], "1");
        assert_eq!(raw.params["y"], "two words");
        assert!(raw.body.is_none());
    }
