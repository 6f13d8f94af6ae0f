//! Shared fixtures for the cross-crate test targets.

use std::sync::Arc;

use auth_adapters::JwtIdentity;
use domains::Principal;
use secrecy::SecretString;
use services::{NoopObserver, Services, SharedStore};
use storage_adapters::MemoryStore;

pub const SECRET: &str = "integration-secret-integration-secret";
pub const ISSUER: &str = "taskboard";

pub fn memory_store() -> SharedStore {
    Arc::new(MemoryStore::new())
}

/// Services over a fresh in-memory store, with `principals` registered.
pub async fn services_with(principals: &[&Principal]) -> Services {
    let services = Services::new(memory_store(), Arc::new(NoopObserver));
    for p in principals {
        services.register_principal(p).await.expect("register principal");
    }
    services
}

pub fn identity() -> JwtIdentity {
    JwtIdentity::new(&SecretString::from(SECRET.to_string()), ISSUER, 3600).expect("identity")
}

#[cfg(feature = "web-axum")]
pub mod http {
    use std::sync::Arc;

    use api_adapters::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderMap, Method, Request, StatusCode};
    use axum::Router;
    use domains::{IdentityProvider, Principal};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{identity, memory_store};

    pub struct TestResponse {
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub text: String,
        /// `Value::Null` when the body is not JSON.
        pub json: Value,
    }

    impl TestResponse {
        pub fn location(&self) -> Option<&str> {
            self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
        }
    }

    pub struct TestApp {
        pub router: Router,
        pub state: AppState,
        identity: Arc<auth_adapters::JwtIdentity>,
    }

    impl Default for TestApp {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestApp {
        pub fn new() -> Self {
            let identity = Arc::new(identity());
            let state = AppState::new(memory_store(), identity.clone(), "/login");
            Self::with_state(state, identity)
        }

        /// Router over a custom identity provider; `token` is unusable then.
        pub fn with_identity(provider: Arc<dyn IdentityProvider>) -> Self {
            let state = AppState::new(memory_store(), provider, "/login");
            Self::with_state(state, Arc::new(identity()))
        }

        fn with_state(state: AppState, identity: Arc<auth_adapters::JwtIdentity>) -> Self {
            Self {
                router: api_adapters::router(state.clone()),
                state,
                identity,
            }
        }

        pub fn token(&self, principal: &Principal) -> String {
            self.identity.issue(principal).expect("issue token")
        }

        pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
            self.send(Method::GET, path, token, None, false).await
        }

        pub async fn post(&self, path: &str, token: &str, body: Value) -> TestResponse {
            self.send(Method::POST, path, Some(token), Some(body), false).await
        }

        /// POST carrying `X-Requested-With: XMLHttpRequest`.
        pub async fn post_xhr(&self, path: &str, token: &str, body: Value) -> TestResponse {
            self.send(Method::POST, path, Some(token), Some(body), true).await
        }

        pub async fn post_raw(&self, path: &str, token: &str, body: &'static str, xhr: bool) -> TestResponse {
            let mut req = Request::builder()
                .method(Method::POST)
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {token}"));
            if xhr {
                req = req.header("x-requested-with", "XMLHttpRequest");
            }
            self.dispatch(req.body(Body::from(body)).expect("request")).await
        }

        pub async fn send(
            &self,
            method: Method,
            path: &str,
            token: Option<&str>,
            body: Option<Value>,
            xhr: bool,
        ) -> TestResponse {
            let mut req = Request::builder().method(method).uri(path);
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            if xhr {
                req = req.header("x-requested-with", "XMLHttpRequest");
            }
            let body = match body {
                Some(value) => Body::from(value.to_string()),
                None => Body::empty(),
            };
            self.dispatch(req.body(body).expect("request")).await
        }

        async fn dispatch(&self, req: Request<Body>) -> TestResponse {
            let resp = self.router.clone().oneshot(req).await.expect("infallible router");
            let status = resp.status();
            let headers = resp.headers().clone();
            let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
            let text = String::from_utf8_lossy(&bytes).into_owned();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            TestResponse { status, headers, text, json }
        }
    }
}
