//! HTTP catalog source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;

use super::error::CatalogError;
use super::traits::CatalogSource;
use super::types::parse_catalog;

/// Catalog source that fetches a JSON listing over HTTP.
///
/// Keeps one client with an in-memory cookie jar, so a form login made on
/// the first request carries over to later cycles.
pub struct HttpCatalogSource {
    client: Client,
    config: CatalogConfig,
    /// Set once a form login succeeded (cleared when the session is rejected).
    logged_in: Arc<RwLock<bool>>,
}

impl HttpCatalogSource {
    /// Create a new HTTP catalog source.
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .build()
            .map_err(|e| CatalogError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            config,
            logged_in: Arc::new(RwLock::new(false)),
        })
    }

    /// Delay before retry number `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.config.backoff_ms.saturating_mul(factor))
    }

    fn listing_request(&self) -> RequestBuilder {
        let request = self.client.get(&self.config.url);
        if self.config.login_url.is_none() && self.config.has_credentials() {
            request.basic_auth(&self.config.username, Some(&self.config.password))
        } else {
            request
        }
    }

    /// Sends a request, retrying connect errors, timeouts and gateway-type
    /// statuses with exponential backoff.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response, CatalogError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let reason = match build().send().await {
                Ok(response) if is_transient_status(response.status()) => {
                    format!("HTTP {}", response.status())
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_builder() => {
                    return Err(CatalogError::Configuration(e.to_string()));
                }
                Err(e) => e.to_string(),
            };

            if attempt > self.config.retries {
                return Err(CatalogError::Unreachable {
                    attempts: attempt,
                    reason,
                });
            }

            let delay = self.backoff(attempt);
            warn!(
                "Catalog request failed ({}), retry {}/{} in {:?}",
                reason, attempt, self.config.retries, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Login with the form endpoint; the session cookie lands in the jar.
    async fn login(&self) -> Result<(), CatalogError> {
        let Some(login_url) = self.config.login_url.as_deref() else {
            return Ok(());
        };

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];
        let response = self
            .send_with_retry(|| self.client.post(login_url).form(&params))
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("Catalog login successful");
            *self.logged_in.write().await = true;
            Ok(())
        } else if is_auth_status(status) {
            Err(CatalogError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(CatalogError::AuthenticationFailed(format!(
                "Unexpected login response: HTTP {}",
                status
            )))
        }
    }

    /// Ensure we have a session, logging in if needed.
    async fn ensure_logged_in(&self) -> Result<(), CatalogError> {
        if self.config.login_url.is_none() || *self.logged_in.read().await {
            return Ok(());
        }
        self.login().await
    }

    /// Fetch the raw listing body, re-authenticating once if the session expired.
    async fn fetch_listing(&self) -> Result<String, CatalogError> {
        self.ensure_logged_in().await?;

        let mut response = self.send_with_retry(|| self.listing_request()).await?;

        if is_auth_status(response.status()) && self.config.login_url.is_some() {
            warn!("Catalog session expired, re-authenticating");
            *self.logged_in.write().await = false;
            self.login().await?;
            response = self.send_with_retry(|| self.listing_request()).await?;
        }

        let status = response.status();
        if is_auth_status(status) {
            return Err(CatalogError::AuthenticationFailed(format!(
                "Catalog rejected credentials (HTTP {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(CatalogError::Http {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| CatalogError::MalformedResponse(e.to_string()))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

fn is_auth_status(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn validate(&self) -> Result<(), CatalogError> {
        let items = self.available_items().await?;
        info!(
            "Catalog {} reachable, {} item(s) available",
            self.config.url,
            items.len()
        );
        Ok(())
    }

    async fn available_items(&self) -> Result<Vec<String>, CatalogError> {
        let body = self.fetch_listing().await?;
        let items = parse_catalog(&body)?;
        debug!("Catalog listed {} available item(s)", items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::{get, post};
    use axum::{Form, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct FakeCatalog {
        /// Number of leading listing requests answered with 503.
        fail_first: u32,
        /// Number of listing requests (after login) answered with 401.
        expire_sessions: AtomicU32,
        listing_hits: AtomicU32,
        login_hits: AtomicU32,
        body: String,
    }

    async fn listing(
        State(state): State<Arc<FakeCatalog>>,
        headers: HeaderMap,
    ) -> AxumResponse {
        let hit = state.listing_hits.fetch_add(1, Ordering::SeqCst) + 1;
        if hit <= state.fail_first {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        if state.login_hits.load(Ordering::SeqCst) > 0 && !session_valid(&state, &headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        (StatusCode::OK, state.body.clone()).into_response()
    }

    fn session_valid(state: &FakeCatalog, headers: &HeaderMap) -> bool {
        let has_cookie = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|c| c.contains("session=ok"));
        if !has_cookie {
            return false;
        }
        let pending = state.expire_sessions.load(Ordering::SeqCst);
        if pending > 0 {
            state.expire_sessions.store(pending - 1, Ordering::SeqCst);
            return false;
        }
        true
    }

    async fn login(
        State(state): State<Arc<FakeCatalog>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> AxumResponse {
        state.login_hits.fetch_add(1, Ordering::SeqCst);
        let ok = form.get("username").map(String::as_str) == Some("alice")
            && form.get("password").map(String::as_str) == Some("secret");
        if ok {
            ([(header::SET_COOKIE, "session=ok; Path=/")], "Ok.").into_response()
        } else {
            StatusCode::FORBIDDEN.into_response()
        }
    }

    async fn basic_listing(State(state): State<Arc<FakeCatalog>>, headers: HeaderMap) -> AxumResponse {
        state.listing_hits.fetch_add(1, Ordering::SeqCst);
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some("Basic YWxpY2U6c2VjcmV0");
        if authorized {
            (StatusCode::OK, state.body.clone()).into_response()
        } else {
            StatusCode::UNAUTHORIZED.into_response()
        }
    }

    async fn not_found() -> AxumResponse {
        StatusCode::NOT_FOUND.into_response()
    }

    /// Serves `state` on an ephemeral port, returns the base URL.
    async fn serve(state: Arc<FakeCatalog>) -> String {
        let app = Router::new()
            .route("/items", get(listing))
            .route("/basic/items", get(basic_listing))
            .route("/missing", get(not_found))
            .route("/login", post(login))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(url: String) -> CatalogConfig {
        let mut config = CatalogConfig::with_url(url);
        config.retries = 2;
        config.backoff_ms = 1;
        config
    }

    fn fake(body: &str) -> FakeCatalog {
        FakeCatalog {
            body: body.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_listing() {
        let state = Arc::new(fake(r#"["alice", {"id": "bob", "status": "private"}, "carol"]"#));
        let base = serve(Arc::clone(&state)).await;
        let catalog = HttpCatalogSource::new(config(format!("{}/items", base))).unwrap();

        let items = catalog.available_items().await.unwrap();
        assert_eq!(items, vec!["alice", "carol"]);
        assert_eq!(catalog.name(), "http");
        assert!(catalog.validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let state = Arc::new(FakeCatalog {
            fail_first: 2,
            ..fake(r#"["alice"]"#)
        });
        let base = serve(Arc::clone(&state)).await;
        let catalog = HttpCatalogSource::new(config(format!("{}/items", base))).unwrap();

        let items = catalog.available_items().await.unwrap();
        assert_eq!(items, vec!["alice"]);
        assert_eq!(state.listing_hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let state = Arc::new(FakeCatalog {
            fail_first: 100,
            ..fake("[]")
        });
        let base = serve(Arc::clone(&state)).await;
        let catalog = HttpCatalogSource::new(config(format!("{}/items", base))).unwrap();

        let err = catalog.available_items().await.unwrap_err();
        match err {
            CatalogError::Unreachable { attempts, reason } => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("503"));
            }
            other => panic!("expected Unreachable, got {:?}", other),
        }
        assert_eq!(state.listing_hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let catalog = HttpCatalogSource::new(config(format!("http://{}/items", addr))).unwrap();
        let err = catalog.available_items().await.unwrap_err();
        assert!(matches!(err, CatalogError::Unreachable { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let base = serve(Arc::new(fake("[]"))).await;
        let catalog = HttpCatalogSource::new(config(format!("{}/missing", base))).unwrap();

        let err = catalog.available_items().await.unwrap_err();
        assert!(matches!(err, CatalogError::Http { status: 404 }));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let base = serve(Arc::new(fake("<html>maintenance</html>"))).await;
        let catalog = HttpCatalogSource::new(config(format!("{}/items", base))).unwrap();

        let err = catalog.available_items().await.unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));
    }

    fn login_config(base: &str, password: &str) -> CatalogConfig {
        let mut config = config(format!("{}/items", base));
        config.login_url = Some(format!("{}/login", base));
        config.username = "alice".to_string();
        config.password = password.to_string();
        config
    }

    #[tokio::test]
    async fn test_form_login_before_first_request() {
        let state = Arc::new(fake(r#"["bob"]"#));
        let base = serve(Arc::clone(&state)).await;
        let catalog = HttpCatalogSource::new(login_config(&base, "secret")).unwrap();

        assert_eq!(catalog.available_items().await.unwrap(), vec!["bob"]);
        assert_eq!(catalog.available_items().await.unwrap(), vec!["bob"]);
        assert_eq!(state.login_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relogin_when_session_expires() {
        let state = Arc::new(fake(r#"["bob"]"#));
        let base = serve(Arc::clone(&state)).await;
        let catalog = HttpCatalogSource::new(login_config(&base, "secret")).unwrap();

        catalog.available_items().await.unwrap();
        state.expire_sessions.store(1, Ordering::SeqCst);

        assert_eq!(catalog.available_items().await.unwrap(), vec!["bob"]);
        assert_eq!(state.login_hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejected_login() {
        let state = Arc::new(fake("[]"));
        let base = serve(Arc::clone(&state)).await;
        let catalog = HttpCatalogSource::new(login_config(&base, "wrong")).unwrap();

        let err = catalog.available_items().await.unwrap_err();
        assert!(matches!(err, CatalogError::AuthenticationFailed(_)));
        assert_eq!(state.listing_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_basic_auth_without_login_url() {
        let state = Arc::new(fake(r#"["carol"]"#));
        let base = serve(Arc::clone(&state)).await;

        let mut good = config(format!("{}/basic/items", base));
        good.username = "alice".to_string();
        good.password = "secret".to_string();
        let catalog = HttpCatalogSource::new(good).unwrap();
        assert_eq!(catalog.available_items().await.unwrap(), vec!["carol"]);

        let anonymous = HttpCatalogSource::new(config(format!("{}/basic/items", base))).unwrap();
        let err = anonymous.available_items().await.unwrap_err();
        assert!(matches!(err, CatalogError::AuthenticationFailed(_)));
    }

    #[test]
    fn test_backoff_doubles() {
        let mut config = CatalogConfig::with_url("http://127.0.0.1:1/items");
        config.backoff_ms = 400;
        let catalog = HttpCatalogSource::new(config).unwrap();
        assert_eq!(catalog.backoff(1), Duration::from_millis(400));
        assert_eq!(catalog.backoff(2), Duration::from_millis(800));
        assert_eq!(catalog.backoff(3), Duration::from_millis(1600));
    }
}
