
    use super::*;
    use crate::test_support::NOW;

    fn run(raw: RawRequest) -> Job {
        normalize("job-1".to_string(), "dev", raw, NOW).unwrap()
    }

    fn decoded(job: &Job) -> Vec<u8> {
        job.request.decoded_body().unwrap().unwrap()
    }

    #[test]
    fn test_plain_request() {
        let job = run(RawRequest::new("get", "example.com/hook"));

        assert_eq!(job.id, "job-1");
        assert_eq!(job.workspace, "dev");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.source, JobSource::Request);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.request.method, "GET");
        assert_eq!(job.request.url, "https://example.com/hook");
        assert_eq!(job.request.scheme, "https");
        assert_eq!(job.request.host, "example.com");
        assert_eq!(job.request.path, "/hook");
        assert!(!job.request.hasbody);
        assert_eq!(job.start, NOW);
        assert!(job.start <= job.received);
    }

    #[test]
    fn test_keeps_explicit_scheme_and_port() {
        let job = run(RawRequest::new("POST", "HTTP://localhost:3000/a"));
        assert_eq!(job.request.scheme, "http");
        assert_eq!(job.request.host, "localhost:3000");
    }

    #[test]
    fn test_empty_method_defaults_to_post() {
        assert_eq!(run(RawRequest::new("", "example.com")).request.method, "POST");
    }

    #[test]
    fn test_malformed_url() {
        for url in ["", "https://", "http://[::1"] {
            let result = normalize("x".to_string(), "dev", RawRequest::new("GET", url), NOW);
            assert!(
                matches!(result, Err(QueueError::MalformedRequest(_))),
                "expected failure for {:?}",
                url
            );
        }
    }

    #[test]
    fn test_directives_are_extracted_and_stripped() {
        let raw = RawRequest::new("POST", "example.com/hook?_delay=5&a=1")
            .with_header("X-Ralley-Retry", "3|FIXED|2")
            .with_header("X-Ralley-Token", "secret")
            .with_header("Host", "localhost:4747")
            .with_header("Content-Length", "12")
            .with_header("Authorization", "Bearer t")
            .with_param("_token", "secret");
        let job = run(raw);

        assert_eq!(job.directives.delay, Some(5.0));
        assert_eq!(job.start, NOW + 5.0);
        assert_eq!(job.directives.retry.as_ref().unwrap().max, 3);

        assert_eq!(job.request.url, "https://example.com/hook?a=1");
        assert_eq!(job.request.params.len(), 1);
        assert_eq!(job.request.headers.len(), 1);
        assert_eq!(job.request.headers["authorization"], "Bearer t");
    }

    #[test]
    fn test_explicit_params_override_url_pairs() {
        let job = run(RawRequest::new("GET", "example.com?a=1&b=2").with_param("a", "9"));
        assert_eq!(job.request.params["a"], "9");
        assert_eq!(job.request.params["b"], "2");
        assert_eq!(job.request.url, "https://example.com/?a=9&b=2");
    }

    #[test]
    fn test_no_conflict_preserves_params() {
        let raw = RawRequest::new("GET", "example.com/search?_delay=5&q=x")
            .with_header("x-ralley-no-conflict", "1")
            .with_header("x-ralley-delay", "10");
        let job = run(raw);

        assert_eq!(job.directives.delay, Some(10.0));
        assert_eq!(job.request.params["_delay"], "5");
        assert!(job.request.url.contains("_delay=5"));
        assert!(!job.request.headers.contains_key("x-ralley-no-conflict"));
    }

    #[test]
    fn test_fragment_survives_rebuild() {
        let job = run(RawRequest::new("GET", "example.com/p?_key=k#frag"));
        assert_eq!(job.request.url, "https://example.com/p#frag");
        assert_eq!(job.directives.key, "k");
    }

    #[test]
    fn test_structured_body() {
        let raw = RawRequest::new("POST", "example.com")
            .with_body(RequestBody::Structured(serde_json::json!({"a": 1})));
        let job = run(raw);

        assert!(job.request.hasbody);
        assert_eq!(job.request.headers["content-type"], "application/json");
        let body: Value = serde_json::from_slice(&decoded(&job)).unwrap();
        assert_eq!(body, serde_json::json!({"a": 1}));
    }

    #[test]
    fn test_text_body_keeps_caller_content_type() {
        let raw = RawRequest::new("POST", "example.com")
            .with_header("Content-Type", "application/xml")
            .with_body(RequestBody::Raw(b"<a/>".to_vec()));
        let job = run(raw);

        assert_eq!(job.request.headers["content-type"], "application/xml");
        assert_eq!(decoded(&job), b"<a/>");
    }

    #[test]
    fn test_scalar_body_is_text() {
        let job = run(
            RawRequest::new("POST", "example.com")
                .with_body(RequestBody::Structured(Value::String("hi".to_string()))),
        );
        assert_eq!(job.request.headers["content-type"], "text/plain");
        assert_eq!(decoded(&job), b"hi");
    }

    #[test]
    fn test_raw_json_body_is_kept_byte_for_byte() {
        let body = br#"{"z": 1, "a": 12345678901234567890123}"#.to_vec();
        let job = run(RawRequest::new("POST", "example.com").with_body(RequestBody::Raw(body.clone())));

        assert_eq!(decoded(&job), body);
        assert_eq!(job.request.headers["content-type"], "application/json");
    }

    #[test]
    fn test_raw_scalar_json_is_text() {
        let job = run(RawRequest::new("POST", "example.com").with_body(RequestBody::Raw(b"42".to_vec())));
        assert_eq!(job.request.headers["content-type"], "text/plain");
    }

    #[test]
    fn test_connection_headers_are_stripped() {
        let raw = RawRequest::new("POST", "example.com")
            .with_header("Connection", "keep-alive")
            .with_header("Keep-Alive", "timeout=5")
            .with_header("Transfer-Encoding", "chunked")
            .with_header("Upgrade", "websocket")
            .with_header("X-Custom", "1");
        let job = run(raw);

        assert_eq!(job.request.headers.len(), 1);
        assert_eq!(job.request.headers["x-custom"], "1");
    }

    #[test]
    fn test_trace_override_is_applied() {
        let job = run(RawRequest::new("POST", "example.com").with_header("X-Ralley-Trace", "upstream-7"));
        assert_eq!(job.trace.as_deref(), Some("upstream-7"));
        assert!(!job.request.headers.contains_key("x-ralley-trace"));

        assert!(run(RawRequest::new("POST", "example.com")).trace.is_none());
    }

    #[test]
    fn test_empty_body_is_absent() {
        let job = run(RawRequest::new("POST", "example.com").with_body(RequestBody::Raw(Vec::new())));
        assert!(!job.request.hasbody);
        assert!(job.request.body.is_none());
        assert!(!job.request.headers.contains_key("content-type"));
    }
