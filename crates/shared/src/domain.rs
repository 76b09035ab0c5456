use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ItemId);
id_newtype!(AccessoryId);
id_newtype!(CategoryId);

/// A catalogue entry being configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category_id: CategoryId,
    pub image: String,
    pub unit_price: Decimal,
}

/// Serialized with the backend's field names so that committed drafts keep
/// the layout of the persisted cart payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessory {
    pub id: AccessoryId,
    #[serde(rename = "nom", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(
        rename = "prix",
        default,
        deserialize_with = "null_as_default",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub unit_price: Decimal,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(rename = "nom", default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

/// Order quantity, always within `[Quantity::MIN, Quantity::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u16")]
pub struct Quantity(u16);

impl Quantity {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 999;

    pub fn new(value: i64) -> Self {
        Self(value.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u16)
    }

    /// Strips every non-digit character and clamps what is left. Empty input
    /// means the minimum; it is never an error.
    pub fn from_input(raw: &str) -> Self {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Self(Self::MIN);
        }
        let significant = digits.trim_start_matches('0');
        if significant.len() > 3 {
            return Self(Self::MAX);
        }
        Self::new(significant.parse::<i64>().unwrap_or(0))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Quantity> for u16 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        Decimal::from(value.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a 3D asset exists for the current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityState {
    #[default]
    Unknown,
    Checking,
    Available,
    Unavailable,
}

impl CapabilityState {
    pub fn can_advance_to(self, next: CapabilityState) -> bool {
        matches!(
            (self, next),
            (Self::Unknown, Self::Checking)
                | (Self::Checking, Self::Available)
                | (Self::Checking, Self::Unavailable)
        )
    }

    /// Moves forward along unknown -> checking -> {available | unavailable}.
    /// Any other transition is refused and leaves the state untouched.
    pub fn advance(&mut self, next: CapabilityState) -> bool {
        if self.can_advance_to(next) {
            *self = next;
            true
        } else {
            false
        }
    }

    pub fn is_settled(self) -> bool {
        matches!(self, Self::Available | Self::Unavailable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    FlatImage,
    Interactive3d,
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
