use std::str::FromStr;

use rust_decimal::Decimal;
use shared::domain::{Accessory, AccessoryId, Quantity};

use super::*;
use crate::selection::SelectionSet;

fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).expect("decimal literal")
}

fn accessory(id: i64, price: &str) -> Accessory {
    Accessory {
        id: AccessoryId(id),
        name: format!("accessory {id}"),
        unit_price: dec(price),
        image: "/accessoires/default.png".into(),
    }
}

#[test]
fn aggregates_the_reference_configuration() {
    let defaults = vec![accessory(1, "10")];
    let optionals = vec![accessory(2, "20"), accessory(3, "5")];
    let mut selection = SelectionSet::new();
    selection.toggle(AccessoryId(2));

    let selected = selected_optionals(&optionals, &selection);
    let breakdown = aggregate(dec("100"), &defaults, &selected, Quantity::new(3));

    assert_eq!(breakdown.default_subtotal, dec("10"));
    assert_eq!(breakdown.optional_subtotal, dec("20"));
    assert_eq!(breakdown.total, dec("390"));
    assert_eq!(breakdown.item_line_total(), dec("300"));
    assert_eq!(breakdown.default_line_total(), dec("30"));
    assert_eq!(breakdown.optional_line_total(), dec("60"));
}

#[test]
fn empty_configuration_costs_the_item_times_quantity() {
    let breakdown = aggregate(dec("12.5"), &[], &[], Quantity::new(2));
    assert_eq!(breakdown.default_subtotal, Decimal::ZERO);
    assert_eq!(breakdown.optional_subtotal, Decimal::ZERO);
    assert_eq!(breakdown.total, dec("25"));
}

#[test]
fn cent_amounts_add_up_exactly() {
    let defaults = vec![accessory(1, "0.1"), accessory(4, "0.2")];
    let breakdown = aggregate(dec("0.3"), &defaults, &[], Quantity::new(999));
    assert_eq!(breakdown.total, dec("599.4"));
}

#[test]
fn selection_ids_outside_the_loaded_collection_do_not_count() {
    let optionals = vec![accessory(2, "20"), accessory(3, "5")];
    let mut selection = SelectionSet::new();
    selection.toggle(AccessoryId(3));
    selection.toggle(AccessoryId(77));

    let selected = selected_optionals(&optionals, &selection);
    assert_eq!(selected, vec![accessory(3, "5")]);

    let breakdown = aggregate(dec("1"), &[], &selected, Quantity::default());
    assert_eq!(breakdown.total, dec("6"));
}

#[test]
fn rounds_half_cents_away_from_zero() {
    assert_eq!(round_currency(dec("0.125")), dec("0.13"));
    assert_eq!(round_currency(dec("-0.125")), dec("-0.13"));
    assert_eq!(round_currency(dec("2.344")), dec("2.34"));
}

#[test]
fn formats_french_euro_amounts() {
    assert_eq!(format_eur(dec("390")), "390,00\u{a0}€");
    assert_eq!(format_eur(dec("1234.5")), "1\u{202f}234,50\u{a0}€");
    assert_eq!(format_eur(dec("1234567.891")), "1\u{202f}234\u{202f}567,89\u{a0}€");
    assert_eq!(format_eur(Decimal::ZERO), "0,00\u{a0}€");
    assert_eq!(format_eur(dec("-15")), "-15,00\u{a0}€");
}

#[test]
fn totals_beyond_decimal_range_saturate() {
    let defaults = vec![accessory(1, "1")];
    let selected = vec![accessory(2, "79228162514264337593543950335")];
    let breakdown = aggregate(Decimal::MAX, &defaults, &selected, Quantity::new(2));

    assert_eq!(breakdown.default_subtotal, dec("1"));
    assert_eq!(breakdown.total, Decimal::MAX);
    assert_eq!(breakdown.item_line_total(), Decimal::MAX);
    assert_eq!(breakdown.optional_line_total(), Decimal::MAX);
    assert_eq!(breakdown.default_line_total(), dec("2"));
}
