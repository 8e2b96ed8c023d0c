// src/fetch/client.rs
//! Resilient fetch client: one primary attempt, at most one fallback attempt,
//! never more. No queueing and no back-off; the caller decides what empty
//! state to show when both attempts fail.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::transport::{ApiRequest, ApiResponse, FallbackTransport, PrimaryTransport, Transport};
use super::{FetchError, FetchParams, FetchTask, LOGIN_ENDPOINT};
use crate::session::{AuthError, Credentials, SessionStore};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_requests_total", "Fetch operations started, per task.");
        describe_counter!(
            "fetch_fallback_total",
            "Fetches that fell through to the fallback transport."
        );
        describe_counter!(
            "fetch_failures_total",
            "Fetches that failed after every permitted attempt."
        );
        describe_counter!(
            "session_invalidations_total",
            "Sessions dropped because an authenticated call was denied."
        );
        describe_counter!("refresh_ticks_total", "Periodic refresh invocations, per task.");
    });
}

type Decoder<T> = fn(&[u8]) -> Result<T, FetchError>;

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice(bytes).map_err(|e| FetchError::Decode(e.to_string()))
}

fn ignore_body(_: &[u8]) -> Result<(), FetchError> {
    Ok(())
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

pub struct ApiClient {
    base: Url,
    session: Arc<SessionStore>,
    primary: Arc<dyn Transport>,
    fallback: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(
        base: Url,
        session: Arc<SessionStore>,
        primary: Arc<dyn Transport>,
        fallback: Arc<dyn Transport>,
    ) -> Self {
        ensure_metrics_described();
        Self {
            base,
            session,
            primary,
            fallback,
        }
    }

    /// Production wiring: two reqwest transports against `<backend>/api/`.
    pub fn from_backend(
        backend_url: &str,
        session: Arc<SessionStore>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base = api_base(backend_url)?;
        Ok(Self::new(
            base,
            session,
            Arc::new(PrimaryTransport::new(timeout)?),
            Arc::new(FallbackTransport::new(timeout)?),
        ))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// GET/POST a task and decode the JSON body into `T`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        task: &FetchTask,
        params: &FetchParams,
    ) -> Result<T, FetchError> {
        self.execute(task, params, None, decode_json::<T>).await
    }

    /// Sends a task with a JSON body (admin actions).
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        task: &FetchTask,
        body: serde_json::Value,
    ) -> Result<T, FetchError> {
        self.execute(task, &FetchParams::none(), Some(&body), decode_json::<T>)
            .await
    }

    /// Like `fetch`, but the response body is never inspected.
    pub async fn ping(&self, task: &FetchTask) -> Result<(), FetchError> {
        self.execute(task, &FetchParams::none(), None, ignore_body)
            .await
    }

    async fn execute<T>(
        &self,
        task: &FetchTask,
        params: &FetchParams,
        body: Option<&serde_json::Value>,
        decode: Decoder<T>,
    ) -> Result<T, FetchError> {
        counter!("fetch_requests_total", "task" => task.name).increment(1);

        let primary_err = match self
            .attempt(self.primary.as_ref(), task, params, body, decode)
            .await
        {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };

        if !task.fallback || !primary_err.triggers_fallback() {
            counter!("fetch_failures_total", "task" => task.name).increment(1);
            debug!(target: "fetch", task = task.name, error = %primary_err, "fetch failed without fallback");
            return Err(primary_err);
        }

        warn!(
            target: "fetch",
            task = task.name,
            error = %primary_err,
            transport = self.fallback.name(),
            "primary transport failed, trying fallback"
        );
        counter!("fetch_fallback_total", "task" => task.name).increment(1);

        let reduced = params.for_fallback(task);
        match self
            .attempt(self.fallback.as_ref(), task, &reduced, body, decode)
            .await
        {
            Ok(v) => Ok(v),
            Err(e) => {
                counter!("fetch_failures_total", "task" => task.name).increment(1);
                warn!(target: "fetch", task = task.name, error = %e, "fallback transport failed too");
                Err(e)
            }
        }
    }

    async fn attempt<T>(
        &self,
        transport: &dyn Transport,
        task: &FetchTask,
        params: &FetchParams,
        body: Option<&serde_json::Value>,
        decode: Decoder<T>,
    ) -> Result<T, FetchError> {
        let req = self.build_request(task, params, body)?;
        debug!(
            target: "fetch",
            task = task.name,
            transport = transport.name(),
            url = %req.url,
            authed = req.bearer.is_some(),
            "sending"
        );
        let resp = transport
            .send(&req)
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let payload = self.classify(task, resp)?;
        decode(&payload)
    }

    pub fn build_request(
        &self,
        task: &FetchTask,
        params: &FetchParams,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiRequest, FetchError> {
        let mut url = self
            .base
            .join(task.endpoint)
            .map_err(|e| FetchError::Network(format!("bad endpoint {}: {e}", task.endpoint)))?;
        let query = params.to_query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let bearer = if task.requires_auth {
            self.session.token()
        } else {
            None
        };
        Ok(ApiRequest {
            method: task.method.as_method(),
            url,
            bearer,
            body: body.cloned(),
        })
    }

    fn classify(&self, task: &FetchTask, resp: ApiResponse) -> Result<Vec<u8>, FetchError> {
        let status = resp.status;
        if resp.is_success() {
            return Ok(resp.body);
        }
        match status {
            401 | 403 if task.requires_auth => {
                self.session.invalidate();
                Err(FetchError::Unauthorized { status })
            }
            s if s >= 500 => Err(FetchError::Server { status: s }),
            s => Err(FetchError::Validation {
                status: s,
                body: resp.body_text(),
            }),
        }
    }

    /// Posts credentials once on the primary transport. On any failure the
    /// session is left exactly as it was.
    pub async fn login(&self, creds: &Credentials) -> Result<(), AuthError> {
        creds.validate()?;
        let url = self
            .base
            .join(LOGIN_ENDPOINT)
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let req = ApiRequest {
            method: Method::POST,
            url,
            bearer: None,
            body: Some(serde_json::json!({
                "username": creds.username,
                "password": creds.password,
            })),
        };
        let resp = self
            .primary
            .send(&req)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        match resp.status {
            _ if resp.is_success() => {
                let parsed: LoginResponse = serde_json::from_slice(&resp.body)
                    .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
                if parsed.access_token.is_empty() {
                    return Err(AuthError::MalformedResponse("empty access_token".into()));
                }
                self.session.establish(parsed.access_token);
                Ok(())
            }
            s if s >= 500 => Err(AuthError::Network(format!("server error (status {s})"))),
            s => {
                debug!(target: "session", status = s, user = %creds.username, "login rejected");
                Err(AuthError::InvalidCredentials { status: s })
            }
        }
    }
}

/// `http://host:8001` and `http://host:8001/` both become `http://host:8001/api/`.
pub fn api_base(backend_url: &str) -> Result<Url> {
    let trimmed = backend_url.trim().trim_end_matches('/');
    Url::parse(&format!("{trimmed}/api/"))
        .with_context(|| format!("invalid backend url '{backend_url}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{ARTICLES, MARKET_DATA};
    use crate::storage::MemoryStore;
    use crate::fetch::TransportError;
    use std::sync::Mutex;

    struct Fixed(Mutex<Vec<ApiRequest>>, u16);

    #[async_trait::async_trait]
    impl Transport for Fixed {
        async fn send(&self, req: &ApiRequest) -> Result<ApiResponse, TransportError> {
            self.0.lock().unwrap().push(req.clone());
            Ok(ApiResponse::new(self.1, "[]"))
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn client(primary_status: u16) -> (ApiClient, Arc<Fixed>, Arc<Fixed>) {
        let session = Arc::new(SessionStore::new(Arc::new(MemoryStore::new())));
        let p = Arc::new(Fixed(Mutex::new(vec![]), primary_status));
        let f = Arc::new(Fixed(Mutex::new(vec![]), 200));
        let c = ApiClient::new(
            api_base("http://localhost:8001").unwrap(),
            session,
            p.clone(),
            f.clone(),
        );
        (c, p, f)
    }

    #[test]
    fn api_base_normalizes_trailing_slash() {
        assert_eq!(
            api_base("http://localhost:8001/").unwrap().as_str(),
            "http://localhost:8001/api/"
        );
    }

    #[test]
    fn request_urls_follow_the_catalog() {
        let (c, _, _) = client(200);
        let req = c
            .build_request(&ARTICLES, &FetchParams::none().category("finance").limit(20), None)
            .unwrap();
        assert_eq!(
            req.url.as_str(),
            "http://localhost:8001/api/articles?category=finance&limit=20"
        );
        let ping = c
            .build_request(&crate::fetch::KEEP_ALIVE, &FetchParams::none(), None)
            .unwrap();
        assert_eq!(ping.url.as_str(), "http://localhost:8001/api/");
    }

    #[tokio::test]
    async fn client_errors_do_not_use_fallback() {
        let (c, p, f) = client(404);
        let out: Result<Vec<serde_json::Value>, _> =
            c.fetch(&MARKET_DATA, &FetchParams::none()).await;
        assert!(matches!(out, Err(FetchError::Validation { status: 404, .. })));
        assert_eq!(p.0.lock().unwrap().len(), 1);
        assert!(f.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_errors_use_fallback_with_reduced_page() {
        let (c, p, f) = client(503);
        let out: Vec<serde_json::Value> = c
            .fetch(&ARTICLES, &FetchParams::none().limit(20))
            .await
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(p.0.lock().unwrap().len(), 1);
        let fb = f.0.lock().unwrap();
        assert_eq!(fb.len(), 1);
        assert_eq!(fb[0].url.query(), Some("limit=10"));
    }
}
