//! Price breakdown of a configuration. Everything here is pure; callers
//! recompute on every change instead of caching a breakdown.

use rust_decimal::{Decimal, RoundingStrategy};
use shared::domain::{Accessory, Quantity};

use crate::selection::SelectionSet;

const CURRENCY_DECIMALS: u32 = 2;
const GROUP_SEPARATOR: char = '\u{202f}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub unit_price: Decimal,
    pub default_subtotal: Decimal,
    pub optional_subtotal: Decimal,
    pub quantity: Quantity,
    /// `(unit_price + default_subtotal + optional_subtotal) * quantity`
    pub total: Decimal,
}

impl PriceBreakdown {
    pub fn item_line_total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity)
    }

    pub fn default_line_total(&self) -> Decimal {
        line_total(self.default_subtotal, self.quantity)
    }

    pub fn optional_line_total(&self) -> Decimal {
        line_total(self.optional_subtotal, self.quantity)
    }
}

/// Optional accessories of the loaded collection whose id is selected, in
/// collection order. Ids that are not in `optionals` are ignored.
pub fn selected_optionals(optionals: &[Accessory], selection: &SelectionSet) -> Vec<Accessory> {
    optionals
        .iter()
        .filter(|accessory| selection.contains(accessory.id))
        .cloned()
        .collect()
}

/// Amounts beyond what `Decimal` can hold saturate at `Decimal::MAX`.
pub fn aggregate(
    unit_price: Decimal,
    defaults: &[Accessory],
    selected: &[Accessory],
    quantity: Quantity,
) -> PriceBreakdown {
    let default_subtotal = subtotal(defaults);
    let optional_subtotal = subtotal(selected);
    let per_unit = saturating_add(saturating_add(unit_price, default_subtotal), optional_subtotal);
    let total = line_total(per_unit, quantity);

    PriceBreakdown {
        unit_price,
        default_subtotal,
        optional_subtotal,
        quantity,
        total,
    }
}

pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// French euro rendering, e.g. `1 234,50 €`.
pub fn format_eur(amount: Decimal) -> String {
    let mut rounded = round_currency(amount);
    rounded.rescale(CURRENCY_DECIMALS);

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = rounded.abs().to_string();
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    format!("{sign}{},{fraction}\u{a0}€", group_thousands(whole))
}

fn group_thousands(whole: &str) -> String {
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3 * 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(digit);
    }
    grouped
}

fn subtotal(accessories: &[Accessory]) -> Decimal {
    accessories
        .iter()
        .fold(Decimal::ZERO, |sum, accessory| saturating_add(sum, accessory.unit_price))
}

fn line_total(amount: Decimal, quantity: Quantity) -> Decimal {
    let product = amount
        .checked_mul(Decimal::from(quantity))
        .unwrap_or(Decimal::MAX);
    round_currency(product)
}

fn saturating_add(left: Decimal, right: Decimal) -> Decimal {
    left.checked_add(right).unwrap_or(Decimal::MAX)
}

#[cfg(test)]
#[path = "tests/pricing_tests.rs"]
mod tests;
