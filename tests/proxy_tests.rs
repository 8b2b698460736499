//! End-to-end tests for the proxy endpoint.
//!
//! The proxy router is served on a loopback listener and pointed at a fake
//! inference backend that records every generation request it receives.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::Router;
    use axum::extract::Json;
    use axum::http::{StatusCode, header};
    use axum::routing::post;
    use serde_json::{Value, json};

    use loquax::proxy::{self, ProxyConfig};
    use loquax::{ChatSession, SessionConfig};

    /// Serves a router on a loopback listener and returns its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Observable state of a fake inference backend.
    #[derive(Clone, Default)]
    struct BackendFake {
        requests: Arc<AtomicUsize>,
        last_body: Arc<Mutex<Option<Value>>>,
    }

    impl BackendFake {
        fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }

        fn last_body(&self) -> Option<Value> {
            self.last_body.lock().unwrap().clone()
        }
    }

    /// A backend that records the generation request and replies with a
    /// fixed newline-delimited record body.
    fn backend_router(fake: BackendFake, ndjson: &'static str) -> Router {
        Router::new().route(
            "/api/generate",
            post(move |Json(body): Json<Value>| {
                let fake = fake.clone();
                async move {
                    fake.requests.fetch_add(1, Ordering::SeqCst);
                    *fake.last_body.lock().unwrap() = Some(body);
                    (
                        [(header::CONTENT_TYPE, "application/x-ndjson")],
                        ndjson,
                    )
                }
            }),
        )
    }

    /// Serves a proxy wired to the given backend and returns its base URL.
    async fn serve_proxy(backend_url: &str) -> String {
        let config = ProxyConfig::new()
            .with_backend_url(backend_url)
            .with_connect_timeout(Duration::from_secs(2));
        serve(proxy::router(config).unwrap()).await
    }

    #[tokio::test]
    async fn full_pipeline_streams_token_fragments() {
        let fake = BackendFake::default();
        let backend = serve(backend_router(
            fake.clone(),
            concat!(
                "{\"response\":\"He\",\"done\":false}\n",
                "{\"response\":\"llo\",\"done\":false}\n",
                "{\"response\":\" there\",\"done\":false}\n",
                "{\"response\":\"\",\"done\":true}\n",
            ),
        ))
        .await;
        let proxy = serve_proxy(&backend).await;

        let config = SessionConfig::new().with_base_url(&proxy).with_tracking(true);
        let mut session = ChatSession::new(config).unwrap();
        session.load_model("qwen:1.8b").unwrap();

        let tokens = Arc::new(Mutex::new(Vec::new()));
        let sink = tokens.clone();
        session.callbacks_mut().on_token(move |token| {
            sink.lock().unwrap().push(token.to_string());
            Ok(())
        });

        let reply = session.chat("Hello").await.unwrap();
        assert_eq!(reply, "Hello there");
        assert_eq!(
            tokens.lock().unwrap().clone(),
            vec!["He", "llo", " there"]
        );
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn prompt_is_assembled_in_fixed_order() {
        let fake = BackendFake::default();
        let backend = serve(backend_router(
            fake.clone(),
            "{\"response\":\"ok\",\"done\":true}\n",
        ))
        .await;
        let proxy = serve_proxy(&backend).await;

        let response = reqwest::Client::new()
            .post(format!("{proxy}/chat"))
            .json(&json!({
                "message": "And now?",
                "conversation_history": [
                    {"role": "user", "content": "Hello"},
                    {"role": "assistant", "content": "Hi there"},
                ],
                "system_prompt": "Be terse",
                "role": "comedian",
                "model": "qwen:1.8b",
                "model_parameters": {"temperature": 0.7},
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "ok");

        let body = fake.last_body().unwrap();
        assert_eq!(
            body["prompt"],
            "System: Be terse\n\n\
             You are acting as: comedian\n\n\
             user: Hello\n\
             assistant: Hi there\n\
             \nUser: And now?\n"
        );
        assert_eq!(body["model"], "qwen:1.8b");
        assert_eq!(body["stream"], true);
        assert_eq!(body["temperature"], 0.7);
    }

    #[tokio::test]
    async fn unsupported_model_is_rejected_before_backend_contact() {
        let fake = BackendFake::default();
        let backend = serve(backend_router(
            fake.clone(),
            "{\"response\":\"ok\",\"done\":true}\n",
        ))
        .await;
        let proxy = serve_proxy(&backend).await;

        let response = reqwest::Client::new()
            .post(format!("{proxy}/chat"))
            .json(&json!({"message": "hi", "model": "demo-model"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("unsupported model"));
        assert_eq!(fake.request_count(), 0);
    }

    #[tokio::test]
    async fn unreachable_backend_maps_to_service_unavailable() {
        // Port 9 on loopback has no listener.
        let proxy = serve_proxy("http://127.0.0.1:9").await;

        let response = reqwest::Client::new()
            .post(format!("{proxy}/chat"))
            .json(&json!({"message": "hi", "model": "qwen:1.8b"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("unreachable"));
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_as_connection_error_to_the_session() {
        let proxy = serve_proxy("http://127.0.0.1:9").await;
        let config = SessionConfig::new().with_base_url(&proxy).with_tracking(true);
        let mut session = ChatSession::new(config).unwrap();
        session.load_model("qwen:1.8b").unwrap();

        let err = session.chat("Hello").await.unwrap_err();
        assert!(err.is_connection());
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(session.history().len(), 0);
    }

    #[tokio::test]
    async fn backend_error_status_maps_to_internal_error() {
        let backend = serve(Router::new().route(
            "/api/generate",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model imploded") }),
        ))
        .await;
        let proxy = serve_proxy(&backend).await;

        let response = reqwest::Client::new()
            .post(format!("{proxy}/chat"))
            .json(&json!({"message": "hi", "model": "qwen:1.8b"}))
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            reqwest::StatusCode::INTERNAL_SERVER_ERROR
        );
        let body: Value = response.json().await.unwrap();
        assert!(body["detail"].as_str().unwrap().contains("backend returned"));
    }

    #[tokio::test]
    async fn records_after_done_are_not_forwarded() {
        let fake = BackendFake::default();
        let backend = serve(backend_router(
            fake.clone(),
            concat!(
                "{\"response\":\"early\",\"done\":false}\n",
                "{\"response\":\"\",\"done\":true}\n",
                "{\"response\":\"late\",\"done\":false}\n",
            ),
        ))
        .await;
        let proxy = serve_proxy(&backend).await;

        let response = reqwest::Client::new()
            .post(format!("{proxy}/chat"))
            .json(&json!({"message": "hi", "model": "qwen:1.8b"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "early");
    }

    #[tokio::test]
    async fn empty_history_renders_bare_prompt() {
        let fake = BackendFake::default();
        let backend = serve(backend_router(
            fake.clone(),
            "{\"response\":\"ok\",\"done\":true}\n",
        ))
        .await;
        let proxy = serve_proxy(&backend).await;

        reqwest::Client::new()
            .post(format!("{proxy}/chat"))
            .json(&json!({"message": "Hello", "model": "gemma2:2b"}))
            .send()
            .await
            .unwrap();

        let body = fake.last_body().unwrap();
        assert_eq!(body["prompt"], "\nUser: Hello\n");
        assert!(body.get("temperature").is_none());
    }
}
