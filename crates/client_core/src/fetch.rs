//! One-shot data loader bound to a URL.
//!
//! Every (re)load bumps a generation counter and cancels the previous
//! request's token. A completion only reaches the published [`Resource`] when
//! its generation is still current and its token was not cancelled, so the
//! most recently issued request always wins.

use std::sync::Arc;

use reqwest::Client;
use shared::error::FetchError;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

pub type Transform<T> = Arc<dyn Fn(&[u8]) -> Result<T, FetchError> + Send + Sync>;

/// Observable state of one data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<FetchError>,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> Resource<T> {
    pub fn is_idle(&self) -> bool {
        self.data.is_none() && !self.loading && self.error.is_none()
    }

    pub fn is_settled(&self) -> bool {
        !self.loading && (self.data.is_some() || self.error.is_some())
    }
}

struct Binding<T> {
    generation: u64,
    url: Option<String>,
    transform: Option<Transform<T>>,
    token: Option<CancellationToken>,
}

struct Shared<T> {
    binding: Mutex<Binding<T>>,
    state: watch::Sender<Resource<T>>,
}

pub struct Loader<T> {
    http: Client,
    scope: CancellationToken,
    shared: Arc<Shared<T>>,
    _cancel_on_drop: DropGuard,
}

impl<T> Loader<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a loader whose requests are cancelled when `parent` is
    /// cancelled or when the loader is dropped.
    pub fn new(http: Client, parent: &CancellationToken) -> Self {
        let scope = parent.child_token();
        let (state, _) = watch::channel(Resource::default());
        Self {
            http,
            _cancel_on_drop: scope.clone().drop_guard(),
            scope,
            shared: Arc::new(Shared {
                binding: Mutex::new(Binding {
                    generation: 0,
                    url: None,
                    transform: None,
                    token: None,
                }),
                state,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Resource<T>> {
        self.shared.state.subscribe()
    }

    pub fn snapshot(&self) -> Resource<T> {
        self.shared.state.borrow().clone()
    }

    pub async fn current_url(&self) -> Option<String> {
        self.shared.binding.lock().await.url.clone()
    }

    /// Rebinds to `url`. Any in-flight request is cancelled and the previous
    /// data is dropped; `None` leaves the loader idle.
    pub async fn load(&self, url: Option<String>, transform: Transform<T>) {
        let mut binding = self.shared.binding.lock().await;
        supersede(&mut binding);
        binding.url = url.clone();
        binding.transform = Some(Arc::clone(&transform));

        match url {
            Some(url) => self.start(&mut binding, url, transform, false),
            None => {
                self.shared.state.send_replace(Resource::default());
            }
        }
    }

    /// Re-issues the current request, keeping the last data visible until
    /// the new outcome arrives. Does nothing while unbound.
    pub async fn refetch(&self) -> bool {
        let mut binding = self.shared.binding.lock().await;
        let (Some(url), Some(transform)) = (binding.url.clone(), binding.transform.clone()) else {
            return false;
        };
        supersede(&mut binding);
        self.start(&mut binding, url, transform, true);
        true
    }

    /// Cancels the in-flight request, if any. Its result is discarded.
    pub async fn cancel(&self) {
        let binding = self.shared.binding.lock().await;
        if let Some(token) = &binding.token {
            token.cancel();
        }
    }

    fn start(&self, binding: &mut Binding<T>, url: String, transform: Transform<T>, keep_data: bool) {
        let generation = binding.generation;
        let token = self.scope.child_token();
        binding.token = Some(token.clone());

        self.shared.state.send_modify(|resource| {
            if !keep_data {
                resource.data = None;
            }
            resource.loading = true;
            resource.error = None;
        });
        debug!(url = %url, generation, "fetch started");

        let http = self.http.clone();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Err(FetchError::Cancelled),
                body = fetch_body(&http, &url) => body.and_then(|body| transform(body.as_slice())),
            };
            shared.settle(generation, &token, &url, outcome).await;
        });
    }
}

impl<T> Shared<T> {
    async fn settle(
        &self,
        generation: u64,
        token: &CancellationToken,
        url: &str,
        outcome: Result<T, FetchError>,
    ) {
        let binding = self.binding.lock().await;
        if binding.generation != generation {
            debug!(url, generation, "discarding superseded response");
            return;
        }

        let outcome = if token.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            outcome
        };

        match outcome {
            Ok(data) => {
                debug!(url, generation, "fetch finished");
                self.state.send_replace(Resource {
                    data: Some(data),
                    loading: false,
                    error: None,
                });
            }
            Err(FetchError::Cancelled) => {
                debug!(url, generation, "fetch cancelled");
                self.state.send_modify(|resource| resource.loading = false);
            }
            Err(err) => {
                warn!(url, generation, error = %err, "fetch failed");
                self.state.send_modify(|resource| {
                    resource.loading = false;
                    resource.error = Some(err);
                });
            }
        }
    }
}

fn supersede<T>(binding: &mut Binding<T>) {
    binding.generation += 1;
    if let Some(token) = binding.token.take() {
        token.cancel();
    }
}

/// GETs `url` and returns the raw body of a successful response.
pub(crate) async fn fetch_body(http: &Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|err| FetchError::message(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|err| FetchError::message(err.to_string()))?;
    Ok(body.to_vec())
}

#[cfg(test)]
#[path = "tests/fetch_tests.rs"]
mod tests;
