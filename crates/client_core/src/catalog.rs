//! Catalogue backend client and the coercion of its loosely typed JSON into
//! the entities of `shared::domain`.

use std::{str::FromStr, sync::Arc};

use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::{
    domain::{Accessory, AccessoryId, Category, CategoryId, Item, ItemId, PriceRange},
    error::FetchError,
};
use tracing::warn;

use crate::fetch::{fetch_body, Transform};

const ITEM_IMAGE_DIR: &str = "/bases";
const ACCESSORY_IMAGE_DIR: &str = "/accessoires";
const DEFAULT_IMAGE: &str = "default.png";

#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    api_url: String,
}

impl CatalogClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_url)
    }

    pub fn with_client(http: Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into();
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn item_url(&self, item_id: ItemId) -> String {
        format!("{}/moyens/{}", self.api_url, item_id.0)
    }

    pub fn optional_accessories_url(&self, item_id: ItemId) -> String {
        format!("{}/moyens/{}/accessoires", self.api_url, item_id.0)
    }

    pub fn default_accessories_url(&self, item_id: ItemId) -> String {
        format!("{}/moyens/{}/accessoires_defauts", self.api_url, item_id.0)
    }

    pub fn categories_url(&self) -> String {
        format!("{}/categories", self.api_url)
    }

    pub fn items_url(&self) -> String {
        format!("{}/moyens", self.api_url)
    }

    pub async fn fetch_item(&self, item_id: ItemId) -> Result<Item, FetchError> {
        let body = fetch_body(&self.http, &self.item_url(item_id)).await?;
        decode_item(&body)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, FetchError> {
        let body = fetch_body(&self.http, &self.categories_url()).await?;
        Ok(decode_categories(&body))
    }

    /// Price bounds for the catalogue filter: floor of the cheapest item and
    /// ceiling of the most expensive one. `None` for an empty catalogue.
    pub async fn price_range(&self) -> Result<Option<PriceRange>, FetchError> {
        let body = fetch_body(&self.http, &self.items_url()).await?;
        Ok(price_range_of(&body))
    }
}

pub fn item_transform() -> Transform<Item> {
    Arc::new(decode_item)
}

pub fn accessories_transform() -> Transform<Vec<Accessory>> {
    Arc::new(|body: &[u8]| Ok::<_, FetchError>(decode_accessories(body)))
}

pub fn decode_item(body: &[u8]) -> Result<Item, FetchError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| FetchError::message(format!("invalid item payload: {err}")))?;

    let id = value
        .get("id")
        .and_then(coerce_id)
        .ok_or_else(|| FetchError::message("item payload has no valid id"))?;

    Ok(Item {
        id: ItemId(id),
        name: coerce_string(value.get("nom")),
        category_id: CategoryId(value.get("categorie_id").and_then(coerce_integer).unwrap_or(0)),
        image: image_path(ITEM_IMAGE_DIR, value.get("image")),
        unit_price: coerce_price(value.get("prix")),
    })
}

/// Non-array or non-JSON payloads decode as an empty list. Entries without a
/// usable id are skipped.
pub fn decode_accessories(body: &[u8]) -> Vec<Accessory> {
    list_entries(body, "accessories")
        .iter()
        .filter_map(|entry| {
            let Some(id) = entry.get("id").and_then(coerce_id) else {
                warn!(entry = %entry, "skipping accessory without a valid id");
                return None;
            };
            Some(Accessory {
                id: AccessoryId(id),
                name: coerce_string(entry.get("nom")),
                unit_price: coerce_price(entry.get("prix")),
                image: image_path(ACCESSORY_IMAGE_DIR, entry.get("image")),
            })
        })
        .collect()
}

pub fn decode_categories(body: &[u8]) -> Vec<Category> {
    list_entries(body, "categories")
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(coerce_id)?;
            Some(Category {
                id: CategoryId(id),
                name: coerce_string(entry.get("nom")),
            })
        })
        .collect()
}

fn price_range_of(body: &[u8]) -> Option<PriceRange> {
    let prices: Vec<Decimal> = list_entries(body, "items")
        .iter()
        .filter_map(|entry| entry.get("prix").and_then(parse_decimal))
        .collect();

    let min = prices.iter().min()?.floor();
    let max = prices.iter().max()?.ceil();
    Some(PriceRange { min, max })
}

fn list_entries(body: &[u8], what: &str) -> Vec<Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            warn!(list = what, "list payload is not an array; treating as empty");
            Vec::new()
        }
        Err(err) => {
            warn!(list = what, error = %err, "list payload is not JSON; treating as empty");
            Vec::new()
        }
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_id(value: &Value) -> Option<i64> {
    coerce_integer(value).filter(|id| *id >= 1)
}

fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

/// Missing, unparsable and negative prices count as zero.
fn coerce_price(value: Option<&Value>) -> Decimal {
    value
        .and_then(parse_decimal)
        .filter(|price| !price.is_sign_negative())
        .unwrap_or(Decimal::ZERO)
}

fn image_path(dir: &str, value: Option<&Value>) -> String {
    match value {
        Some(Value::String(name)) if !name.trim().is_empty() => format!("{dir}/{name}"),
        _ => format!("{dir}/{DEFAULT_IMAGE}"),
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
