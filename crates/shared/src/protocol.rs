use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{null_as_default, Accessory, Quantity};

/// One committed configuration, as persisted in the local cart record.
///
/// Field names follow the cart payload written by earlier releases, so older
/// records (without `committedAt`) still decode. Prices are written as JSON
/// numbers and read back from numbers or numeric strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRecord {
    #[serde(rename = "produit")]
    pub item_name: String,
    #[serde(rename = "imageProduit", default, deserialize_with = "null_as_default")]
    pub item_image: String,
    #[serde(rename = "quantite")]
    pub quantity: Quantity,
    #[serde(rename = "accessoires", default, deserialize_with = "null_as_default")]
    pub optional_accessories: Vec<Accessory>,
    #[serde(
        rename = "accessoiresParDefaut",
        default,
        deserialize_with = "null_as_default"
    )]
    pub default_accessories: Vec<Accessory>,
    #[serde(
        rename = "totalPrice",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub total_price: Decimal,
    #[serde(
        rename = "committedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub committed_at: Option<DateTime<Utc>>,
}
