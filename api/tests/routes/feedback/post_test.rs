#[cfg(test)]
mod tests {
    use crate::helpers::{MultipartBody, ScriptedProvider, make_test_app};
    use axum::{http::StatusCode, response::Response};
    use marker::error::ProviderError;
    use serde_json::Value;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use util::config::AppConfig;
    use util::test_helpers::setup_test_upload_root;

    const URI: &str = "/api/feedback";
    const SUBMISSION: &str = "an importent policys decision";

    fn configure() -> TempDir {
        AppConfig::reset();
        AppConfig::set_default_provider("openai");
        AppConfig::set_default_max_completion_tokens(1000);
        AppConfig::set_default_temperature(1.0);
        AppConfig::set_provider_timeout_secs(5);
        AppConfig::set_request_timeout_secs(10);
        AppConfig::set_max_upload_bytes(1024 * 1024);
        AppConfig::set_rate_limit_per_minute(1000);
        setup_test_upload_root()
    }

    fn full_replies() -> Vec<&'static str> {
        vec![
            r#"{"Spelling, Punctuation and Grammar": ["- importent -> important", "- policys -> policies"]}"#,
            r#"{"Historical Accuracy": []}"#,
            r#"{"Overall Comments": ["- A clear line of argument"]}"#,
            r#"{"Marking": ["- Level 2: some explanation【4:0†mark_scheme.txt】"]}"#,
        ]
    }

    fn valid_body() -> MultipartBody {
        MultipartBody::with_required_fields()
            .text("submission", SUBMISSION)
            .file("mark_scheme", "mark_scheme.txt", b"Level 1: ...\nLevel 2: ...")
    }

    async fn json_of(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn text_submission_returns_located_feedback() {
        let tmp = configure();
        let provider = ScriptedProvider::replying(&full_replies());
        let app = make_test_app(provider.clone());

        let req = valid_body()
            .text("max_completion_tokens", "2048")
            .text("temperature", "0.5")
            .into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_of(response).await;
        assert_eq!(json["status"], "completed");
        assert_eq!(json["submission"], SUBMISSION);
        assert!(json.get("failed_categories").is_none());

        let feedback = json["feedback"].as_array().unwrap();
        assert_eq!(feedback.len(), 4);
        assert_eq!(feedback[0]["category"], "SPaG");
        assert_eq!(feedback[0]["incorrect_text"], "importent");
        assert_eq!(feedback[0]["feedback_text"], "important");
        assert_eq!(feedback[0]["start"], serde_json::json!([3]));
        assert_eq!(feedback[0]["end"], serde_json::json!([12]));
        assert_eq!(feedback[0]["colour"], "orange");
        assert_eq!(feedback[1]["start"], serde_json::json!([13]));
        assert_eq!(feedback[2]["category"], "overall_comments");
        assert!(feedback[2]["start"].is_null());
        assert_eq!(feedback[3]["citation"], "4:0†mark_scheme.txt");
        assert_eq!(feedback[3]["feedback_text"], "Level 2: some explanation");

        let calls = provider.calls();
        assert_eq!(calls.len(), 4);
        assert!(
            calls
                .iter()
                .all(|p| p.max_completion_tokens == 2048 && (p.temperature - 0.5).abs() < 1e-6)
        );

        let stored = tmp.path().join("mark_scheme-42.txt");
        assert_eq!(
            std::fs::read_to_string(stored).unwrap(),
            "Level 1: ...\nLevel 2: ..."
        );
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn unparseable_category_is_listed_as_failed() {
        let _tmp = configure();
        let mut replies = full_replies();
        replies[3] = "Sorry, I can't do that.";
        let app = make_test_app(ScriptedProvider::replying(&replies));

        let response = app.oneshot(valid_body().into_request(URI)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_of(response).await;
        assert_eq!(json["failed_categories"], serde_json::json!(["marking"]));
        assert_eq!(json["feedback"].as_array().unwrap().len(), 3);
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn file_submission_is_stored_and_not_located() {
        let tmp = configure();
        let app = make_test_app(ScriptedProvider::replying(&full_replies()));

        let req = MultipartBody::with_required_fields()
            .file("submission", "essay.TXT", SUBMISSION.as_bytes())
            .file("mark_scheme", "scheme.png", b"\x89PNG")
            .into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_of(response).await;
        assert_eq!(json["submission"], "essay.TXT");
        assert!(json["feedback"][0]["start"].is_null());
        assert!(tmp.path().join("submission-42.txt").exists());
        assert!(tmp.path().join("mark_scheme-42.png").exists());
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn uploaded_submission_wins_over_text_value() {
        let tmp = configure();
        let app = make_test_app(ScriptedProvider::replying(&full_replies()));

        let req = MultipartBody::with_required_fields()
            .text("submission", SUBMISSION)
            .file("submission", "essay.md", b"a different essay")
            .file("mark_scheme", "mark_scheme.txt", b"Level 1: ...")
            .into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_of(response).await;
        assert_eq!(json["submission"], "essay.md");
        assert!(json["feedback"][0]["start"].is_null());
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("submission-42.md")).unwrap(),
            "a different essay"
        );
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn requests_over_the_per_minute_limit_are_rejected() {
        let _tmp = configure();
        AppConfig::set_rate_limit_per_minute(2);
        let provider = ScriptedProvider::replying(&[]);
        let app = make_test_app(provider.clone());

        for _ in 0..2 {
            let req = MultipartBody::with_required_fields().into_request(URI);
            let response = app.clone().oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let req = MultipartBody::with_required_fields().into_request(URI);
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));

        let json = json_of(response).await;
        assert_eq!(json["success"], false);
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .starts_with("Rate limit exceeded: 2 requests per minute")
        );
        assert!(provider.calls().is_empty());

        let health = axum::http::Request::builder()
            .uri("/api/health")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(app.oneshot(health).await.unwrap().status(), StatusCode::OK);
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn missing_required_field_is_bad_request() {
        let _tmp = configure();
        let provider = ScriptedProvider::replying(&[]);
        let app = make_test_app(provider.clone());

        let req = MultipartBody::new()
            .text("assignment_id", "42")
            .text("submission", SUBMISSION)
            .file("mark_scheme", "ms.txt", b"scheme")
            .into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_of(response).await;
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
        assert_eq!(json["message"], "Missing required field: assignment_title");
        assert!(provider.calls().is_empty());
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn missing_submission_and_mark_scheme_are_bad_requests() {
        let _tmp = configure();

        let app = make_test_app(ScriptedProvider::replying(&[]));
        let req = MultipartBody::with_required_fields()
            .text("submission", "   ")
            .file("mark_scheme", "ms.txt", b"scheme")
            .into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_of(response).await["message"],
            "Missing required field: submission"
        );

        let app = make_test_app(ScriptedProvider::replying(&[]));
        let req = MultipartBody::with_required_fields()
            .text("submission", SUBMISSION)
            .into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_of(response).await["message"],
            "Missing required file: mark_scheme"
        );
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn unsupported_mark_scheme_extension_is_bad_request() {
        let tmp = configure();
        let app = make_test_app(ScriptedProvider::replying(&[]));

        let req = MultipartBody::with_required_fields()
            .text("submission", SUBMISSION)
            .file("mark_scheme", "scheme.docx", b"PK")
            .into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = json_of(response).await;
        let message = json["message"].as_str().unwrap();
        assert!(message.starts_with("Unsupported mark scheme file type: .docx"));
        assert!(!tmp.path().join("mark_scheme-42.docx").exists());
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn out_of_range_parameters_are_bad_requests() {
        let _tmp = configure();

        let app = make_test_app(ScriptedProvider::replying(&[]));
        let req = valid_body()
            .text("max_completion_tokens", "50000")
            .into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_of(response).await["message"],
            "max_completion_tokens must be between 1 and 32000"
        );

        let app = make_test_app(ScriptedProvider::replying(&[]));
        let req = valid_body().text("temperature", "hot").into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn unknown_or_unconfigured_model_is_bad_request() {
        let _tmp = configure();

        let app = make_test_app(ScriptedProvider::replying(&[]));
        let req = valid_body().text("model", "llama").into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = json_of(response).await["message"].as_str().unwrap().to_string();
        assert!(message.contains("llama"));

        let app = make_test_app(ScriptedProvider::replying(&[]));
        let req = valid_body().text("model", "anthropic").into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_of(response).await["message"],
            "Model provider 'anthropic' is not configured on this server"
        );
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn provider_error_is_bad_gateway() {
        let _tmp = configure();
        let provider = ScriptedProvider::new(vec![Err(ProviderError::Http {
            provider: "openai".into(),
            status: 401,
            body: "invalid api key".into(),
        })]);
        let app = make_test_app(provider);

        let response = app.oneshot(valid_body().into_request(URI)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let json = json_of(response).await;
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("HTTP 401"));
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn slow_provider_call_is_gateway_timeout() {
        let _tmp = configure();
        AppConfig::set_provider_timeout_secs(1);
        let app = make_test_app(ScriptedProvider::slow(Duration::from_secs(3)));

        let response = app.oneshot(valid_body().into_request(URI)).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let message = json_of(response).await["message"].as_str().unwrap().to_string();
        assert!(message.contains("retry"));
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn whole_request_deadline_is_gateway_timeout() {
        let _tmp = configure();
        AppConfig::set_request_timeout_secs(1);
        let app = make_test_app(ScriptedProvider::slow(Duration::from_millis(600)));

        let response = app.oneshot(valid_body().into_request(URI)).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let message = json_of(response).await["message"].as_str().unwrap().to_string();
        assert!(message.contains("did not finish within 1 seconds"));
        AppConfig::reset();
    }

    #[tokio::test]
    #[serial]
    async fn oversized_upload_is_payload_too_large() {
        let _tmp = configure();
        AppConfig::set_max_upload_bytes(512);
        let app = make_test_app(ScriptedProvider::replying(&[]));

        let req = MultipartBody::with_required_fields()
            .text("submission", SUBMISSION)
            .file("mark_scheme", "scheme.pdf", &vec![b'x'; 4096])
            .into_request(URI);
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        AppConfig::reset();
    }
}
