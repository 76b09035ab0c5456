//! In-process HTTP backend serving canned responses per path.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::{net::TcpListener, sync::watch};

use crate::fetch::Resource;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub(crate) struct Canned {
    status: u16,
    content_type: String,
    body: Vec<u8>,
    delay: Duration,
}

impl Canned {
    pub(crate) fn json(value: serde_json::Value) -> Self {
        Self {
            status: 200,
            content_type: "application/json".into(),
            body: value.to_string().into_bytes(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain".into(),
            body: body.as_bytes().to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn with_content_type(status: u16, content_type: &str) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Default)]
pub(crate) struct TestBackend {
    routes: Arc<Mutex<HashMap<String, Canned>>>,
    hits: Arc<Mutex<Vec<(Method, String)>>>,
}

impl TestBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(&self, path: &str, canned: Canned) -> &Self {
        self.routes
            .lock()
            .expect("routes lock")
            .insert(path.to_string(), canned);
        self
    }

    pub(crate) fn hits(&self, path: &str) -> Vec<Method> {
        self.hits
            .lock()
            .expect("hits lock")
            .iter()
            .filter(|(_, hit)| hit == path)
            .map(|(method, _)| method.clone())
            .collect()
    }

    /// Serves on an ephemeral local port and returns the base URL.
    pub(crate) async fn spawn(&self) -> String {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let app = Router::new().fallback(serve_canned).with_state(self.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }
}

async fn serve_canned(State(backend): State<TestBackend>, method: Method, uri: Uri) -> Response {
    let path = uri.path().to_string();
    backend
        .hits
        .lock()
        .expect("hits lock")
        .push((method, path.clone()));
    let canned = backend.routes.lock().expect("routes lock").get(&path).cloned();

    let Some(canned) = canned else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }
    let status = StatusCode::from_u16(canned.status).expect("status code");
    (status, [(header::CONTENT_TYPE, canned.content_type)], canned.body).into_response()
}

/// Waits until the resource is no longer loading and returns it.
pub(crate) async fn settled<T: Clone>(mut updates: watch::Receiver<Resource<T>>) -> Resource<T> {
    let resource = tokio::time::timeout(WAIT_LIMIT, updates.wait_for(|r| !r.loading))
        .await
        .expect("resource did not settle in time")
        .expect("loader dropped")
        .clone();
    resource
}

/// Polls `check` until it yields a value.
pub(crate) async fn eventually<T, F, Fut>(mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let poll = async {
        loop {
            if let Some(value) = check().await {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(WAIT_LIMIT, poll)
        .await
        .expect("condition not reached in time")
}
