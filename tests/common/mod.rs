// tests/common/mod.rs
// Shared fixtures: scripted transports, a recording task runner and an
// in-process axum backend.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::time::Instant;

use digest_dashboard::feeds::CuratedFeeds;
use digest_dashboard::fetch::client::api_base;
use digest_dashboard::fetch::{ApiRequest, ApiResponse, Transport, TransportError};
use digest_dashboard::storage::{KeyValueStore, MemoryStore};
use digest_dashboard::{ApiClient, Dashboard, Operation, SessionStore, TaskRunner};

pub const BASE: &str = "http://backend.test";

// ---------- scripted transports ----------

#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Raw(u16, &'static str),
    Fail(&'static str),
}

type Responder = Box<dyn Fn(&ApiRequest) -> Reply + Send + Sync>;

pub struct ScriptedTransport {
    name: &'static str,
    calls: Mutex<Vec<ApiRequest>>,
    delays: Mutex<VecDeque<Duration>>,
    respond: Responder,
}

impl ScriptedTransport {
    pub fn new(
        name: &'static str,
        respond: impl Fn(&ApiRequest) -> Reply + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: Mutex::new(Vec::new()),
            delays: Mutex::new(VecDeque::new()),
            respond: Box::new(respond),
        })
    }

    pub fn always(name: &'static str, reply: Reply) -> Arc<Self> {
        Self::new(name, move |_| reply.clone())
    }

    /// The next calls answer only after these delays, in order.
    pub fn delay_calls(&self, delays: impl IntoIterator<Item = Duration>) {
        self.delays.lock().unwrap().extend(delays);
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Requests whose path ends with `suffix`, as `path?query` strings.
    pub fn hits(&self, suffix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|r| r.url.path().ends_with(suffix))
            .map(|r| match r.url.query() {
                Some(q) => format!("{}?{}", r.url.path(), q),
                None => r.url.path().to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, req: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.calls.lock().unwrap().push(req.clone());
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        match (self.respond)(req) {
            Reply::Json(status, v) => Ok(ApiResponse::json(status, &v)),
            Reply::Raw(status, body) => Ok(ApiResponse::new(status, body)),
            Reply::Fail(msg) => Err(TransportError {
                transport: self.name,
                message: msg.to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub session: Arc<SessionStore>,
    pub primary: Arc<ScriptedTransport>,
    pub fallback: Arc<ScriptedTransport>,
    pub client: Arc<ApiClient>,
    pub dashboard: Arc<Dashboard>,
}

pub fn harness(primary: Arc<ScriptedTransport>, fallback: Arc<ScriptedTransport>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let session = Arc::new(SessionStore::new(store.clone() as Arc<dyn KeyValueStore>));
    let client = Arc::new(ApiClient::new(
        api_base(BASE).unwrap(),
        session.clone(),
        primary.clone(),
        fallback.clone(),
    ));
    let dashboard = Arc::new(Dashboard::new(client.clone(), Arc::new(CuratedFeeds), 20));
    Harness {
        store,
        session,
        primary,
        fallback,
        client,
        dashboard,
    }
}

// ---------- canned payloads ----------

pub fn article(id: &str, category: &str) -> Value {
    json!({
        "id": id,
        "title": format!("{category} headline {id}"),
        "summary": "summary",
        "content": "content",
        "category": category,
        "tags": ["markets"],
        "published_at": "2024-01-15T10:00:00Z",
        "source_name": "Reuters"
    })
}

pub fn market() -> Value {
    json!({
        "stocks": [{"symbol": "AAPL", "name": "Apple", "price": 190.1, "change_percentage_24h": 0.4}],
        "cryptos": [{"symbol": "BTC", "name": "Bitcoin", "price": 45000.0, "change_percentage_24h": -1.2}]
    })
}

pub fn seo() -> Value {
    json!({"total_articles": 120, "articles_today": 7})
}

pub fn admin_stats() -> Value {
    json!({"total_articles": 42, "total_sources": 3, "active_sources": 2, "recent_articles": [article("r1", "crypto")]})
}

pub fn news_sources() -> Value {
    json!([{"id": "s1", "name": "Reuters", "url": "https://reuters.com", "category": "finance"}])
}

pub fn stream(id: &str, category: &str) -> Value {
    json!({
        "id": id, "title": "Live", "description": "d", "category": category,
        "embed_url": "https://youtube.com/embed/x", "started_at": "2024-01-15T10:00:00Z",
        "source_name": "Bloomberg"
    })
}

/// A backend that answers every catalog endpoint, filtering articles and
/// streams by the `category` query.
pub fn catalog(req: &ApiRequest) -> Reply {
    let category = req
        .url
        .query_pairs()
        .find(|(k, _)| k == "category")
        .map(|(_, v)| v.into_owned());
    let path = req.url.path();
    let body = match path {
        "/api/articles" => match category.as_deref() {
            Some(c) => json!([article("c1", c)]),
            None => json!([article("a1", "finance"), article("a2", "crypto")]),
        },
        "/api/live-streams" => json!([stream("l1", category.as_deref().unwrap_or("finance"))]),
        "/api/market-data" => market(),
        "/api/seo-stats" => seo(),
        "/api/admin/stats" => admin_stats(),
        "/api/news-sources" => news_sources(),
        "/api/admin/generate-now" => json!({"message": "generation started"}),
        "/api/trending-topics" => json!([{"topic": "Stablecoin Bill", "volume": 4100}]),
        "/api/" => json!({"message": "ok"}),
        _ => return Reply::Json(404, json!({"detail": "Not Found"})),
    };
    Reply::Json(200, body)
}

// ---------- recording runner ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Started(Operation, Duration),
    Finished(Operation, Duration),
}

pub struct Recorder {
    origin: Instant,
    latency: HashMap<Operation, Duration>,
    panics_on: Option<Operation>,
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Self::with_latency(&[])
    }

    pub fn with_latency(latency: &[(Operation, Duration)]) -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            latency: latency.iter().copied().collect(),
            panics_on: None,
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn panicking_on(op: Operation) -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            latency: HashMap::new(),
            panics_on: Some(op),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn started(&self) -> Vec<(Operation, Duration)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match *e {
                Event::Started(op, at) => Some((op, at)),
                Event::Finished(..) => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<Operation> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match *e {
                Event::Finished(op, _) => Some(op),
                Event::Started(..) => None,
            })
            .collect()
    }

    pub fn starts_of(&self, op: Operation) -> usize {
        self.started().iter().filter(|(o, _)| *o == op).count()
    }
}

#[async_trait]
impl TaskRunner for Recorder {
    async fn run(&self, op: Operation) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Started(op, self.origin.elapsed()));
        if self.panics_on == Some(op) {
            panic!("task {op:?} blew up");
        }
        if let Some(d) = self.latency.get(&op) {
            tokio::time::sleep(*d).await;
        }
        self.events
            .lock()
            .unwrap()
            .push(Event::Finished(op, self.origin.elapsed()));
    }
}

/// Paused-clock deadlines land on millisecond ticks; allow that much slack.
pub fn assert_near(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

// ---------- in-process HTTP backend ----------

pub type Hits = Arc<Mutex<Vec<String>>>;

pub struct Backend {
    pub base: String,
    pub hits: Hits,
}

impl Backend {
    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.split('?').next() == Some(path))
            .count()
    }
}

fn record(hits: &Hits, uri: &Uri) {
    hits.lock().unwrap().push(uri.to_string());
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer abc123")
}

async fn login(State(hits): State<Hits>, uri: Uri, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    record(&hits, &uri);
    if body["username"] == "admin" && body["password"] == "secret" {
        (StatusCode::OK, Json(json!({"access_token": "abc123", "token_type": "bearer"})))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid credentials"})))
    }
}

async fn admin_only(hits: Hits, uri: Uri, headers: HeaderMap, body: Value) -> (StatusCode, Json<Value>) {
    record(&hits, &uri);
    if bearer_ok(&headers) {
        (StatusCode::OK, Json(body))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token"})))
    }
}

async fn public(hits: Hits, uri: Uri, body: Value) -> Json<Value> {
    record(&hits, &uri);
    Json(body)
}

pub async fn spawn_backend() -> Backend {
    let hits: Hits = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/api/", get(|State(h): State<Hits>, uri: Uri| public(h, uri, json!({"message": "ok"}))))
        .route("/api/articles", get(|State(h): State<Hits>, uri: Uri| public(h, uri, json!([article("a1", "finance")]))))
        .route("/api/market-data", get(|State(h): State<Hits>, uri: Uri| public(h, uri, market())))
        .route("/api/seo-stats", get(|State(h): State<Hits>, uri: Uri| public(h, uri, seo())))
        .route("/api/live-streams", get(|State(h): State<Hits>, uri: Uri| public(h, uri, json!([]))))
        .route("/api/admin/login", post(login))
        .route(
            "/api/admin/stats",
            get(|State(h): State<Hits>, uri: Uri, headers: HeaderMap| admin_only(h, uri, headers, admin_stats())),
        )
        .route(
            "/api/news-sources",
            get(|State(h): State<Hits>, uri: Uri, headers: HeaderMap| admin_only(h, uri, headers, news_sources())),
        )
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Backend {
        base: format!("http://{addr}"),
        hits,
    }
}
