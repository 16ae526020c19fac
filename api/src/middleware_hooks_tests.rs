//! Integration tests for the session routes and middleware
//!
//! These tests drive the full router with an in-memory admin client, so the
//! whole login -> session check -> logout cycle runs without a storage server.

#[cfg(test)]
mod tests {
    use crate::{create_router, error::ApiErrorResponse, models::SessionResponse, AppState};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
        Router,
    };
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use session::{
        AccountInfo, AdminClient, AdminClientProvider, ConsoleConfig, Credentials, ServerType,
        SessionError,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    const POLICY: &str = r#"{
        "Version": "2012-10-17",
        "Statement": [
            {"Effect": "Allow", "Action": ["s3:ListAllMyBuckets"], "Resource": ["arn:aws:s3:::*"]},
            {
                "Effect": "Allow",
                "Action": ["s3:GetObject", "s3:PutObject"],
                "Resource": ["arn:aws:s3:::bucket1/*"],
                "Condition": {"StringEquals": {"s3:prefix": ["docs/"]}}
            },
            {"Effect": "Deny", "Action": ["s3:PutObject"], "Resource": ["arn:aws:s3:::bucket1/*"]}
        ]
    }"#;

    struct MockAdmin;

    struct MockClient;

    #[async_trait]
    impl AdminClient for MockClient {
        async fn account_info(&self) -> session::Result<AccountInfo> {
            Ok(AccountInfo {
                account_name: "alice".to_string(),
                server_type: ServerType::Erasure,
                policy: POLICY.as_bytes().to_vec(),
            })
        }
    }

    impl AdminClientProvider for MockAdmin {
        fn connect(&self, credentials: &Credentials) -> session::Result<Box<dyn AdminClient>> {
            if credentials.secret_key != "secret" {
                return Err(SessionError::AdminClient("access denied".to_string()));
            }
            Ok(Box::new(MockClient))
        }
    }

    fn router() -> Router {
        let config = ConsoleConfig::default().with_log_query_url("http://logsearch:8080");
        create_router(AppState::new(config, Arc::new(MockAdmin)))
    }

    fn session_token() -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS512","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"accessKey":"STSKEY","sub":"alice","exp":1735689600}"#);
        format!("{header}.{payload}.c2ln")
    }

    fn login_request(secret: &str, token: &str) -> Request<Body> {
        let body = serde_json::json!({
            "accessKey": "STSKEY",
            "secretKey": secret,
            "sessionToken": token,
            "hideMenu": true
        });
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("login sets a session cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn login(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(login_request("secret", &session_token()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        session_cookie(&response)
    }

    #[tokio::test]
    async fn test_health_check_and_response_headers() {
        let response = router().oneshot(get("/api/v1/health", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-console-version"));
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

        let body: serde_json::Value = json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["storage_endpoint"], "http://localhost:9000");
    }

    #[tokio::test]
    async fn test_session_without_login_is_invalid() {
        let response = router().oneshot(get("/api/v1/session", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let error: ApiErrorResponse = json(response).await;
        assert_eq!(error.code, 401);
        assert_eq!(error.message, "invalid session");
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let response = router()
            .oneshot(login_request("wrong", &session_token()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_token() {
        let response = router()
            .oneshot(login_request("secret", "not-a-token"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let error: ApiErrorResponse = json(response).await;
        assert_eq!(error.message, "invalid session");
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"accessKey": "STSKEY""#))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let error: ApiErrorResponse = json(response).await;
        assert_eq!(error.code, 400);
        assert!(error.message.starts_with("Bad request: "));
    }

    #[tokio::test]
    async fn test_session_after_login() {
        let app = router();
        let cookie = login(&app).await;

        let response = app
            .clone()
            .oneshot(get("/api/v1/session", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let session: SessionResponse = json(response).await;
        assert_eq!(session.status, "ok");
        assert!(session.distributed_mode);
        assert_eq!(session.features, vec!["log-search", "hide-menu"]);
        assert_eq!(session.permissions["console"], vec!["s3:ListAllMyBuckets"]);
        assert_eq!(
            session.permissions["arn:aws:s3:::bucket1/*"],
            vec!["s3:GetObject", "s3:ListAllMyBuckets"]
        );
        assert_eq!(session.allow_resources.len(), 1);
        assert_eq!(session.allow_resources[0].condition_operator, "StringEquals");
        assert_eq!(session.allow_resources[0].prefixes, vec!["docs/"]);
    }

    #[tokio::test]
    async fn test_session_payload_field_names() {
        let app = router();
        let cookie = login(&app).await;

        let response = app
            .oneshot(get("/api/v1/session", Some(&cookie)))
            .await
            .unwrap();
        let body: serde_json::Value = json(response).await;

        for field in [
            "status",
            "distributedMode",
            "permissions",
            "allowResources",
            "features",
            "serverEndPoint",
        ] {
            assert!(body.get(field).is_some(), "missing {field}");
        }
        assert!(body["allowResources"][0].get("conditionOperator").is_some());
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = router();
        let cookie = login(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/logout")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(get("/api/v1/session", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_openapi_document_lists_routes() {
        let response = router()
            .oneshot(get("/api/v1/openapi.json", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let doc: serde_json::Value = json(response).await;
        let paths = doc["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/v1/session"));
        assert!(paths.contains_key("/api/v1/login"));
        assert!(paths.contains_key("/api/v1/logout"));
    }
}
