use reqwest::{header::CONTENT_TYPE, Client};
use shared::domain::{CapabilityState, ItemId};
use tracing::debug;

/// Content types accepted as a binary 3D asset.
const MODEL_CONTENT_MARKERS: [&str; 2] = ["model", "application/octet-stream"];

/// Checks whether a `.glb` asset exists for an item without downloading it.
#[derive(Clone)]
pub struct CapabilityProbe {
    http: Client,
    asset_base_url: String,
}

impl CapabilityProbe {
    pub fn new(asset_base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), asset_base_url)
    }

    pub fn with_client(http: Client, asset_base_url: impl Into<String>) -> Self {
        let asset_base_url = asset_base_url.into();
        Self {
            http,
            asset_base_url: asset_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn model_url(&self, item_id: ItemId) -> String {
        format!("{}/3d/{}.glb", self.asset_base_url, item_id.0)
    }

    pub fn ar_viewer_url(&self, item_id: ItemId) -> String {
        format!("{}/ar-modele?id={}", self.asset_base_url, item_id.0)
    }

    /// Issues a `HEAD` request for the item's model. Anything but a successful
    /// response with a model content type is reported as unavailable.
    pub async fn probe(&self, item_id: ItemId) -> CapabilityState {
        let url = self.model_url(item_id);
        match self.http.head(&url).send().await {
            Ok(response) => {
                let status = response.status();
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok());
                let state = classify(status.is_success(), content_type);
                debug!(
                    item_id = %item_id,
                    status = status.as_u16(),
                    content_type = content_type.unwrap_or_default(),
                    ?state,
                    "capability probe finished"
                );
                state
            }
            Err(err) => {
                debug!(item_id = %item_id, error = %err, "capability probe failed");
                CapabilityState::Unavailable
            }
        }
    }
}

pub fn classify(success: bool, content_type: Option<&str>) -> CapabilityState {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
    let is_model = MODEL_CONTENT_MARKERS
        .iter()
        .any(|marker| content_type.contains(marker));
    if success && is_model {
        CapabilityState::Available
    } else {
        CapabilityState::Unavailable
    }
}
