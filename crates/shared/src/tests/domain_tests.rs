use super::*;

#[test]
fn quantity_clamps_out_of_range_values() {
    assert_eq!(Quantity::new(0).get(), 1);
    assert_eq!(Quantity::new(-40).get(), 1);
    assert_eq!(Quantity::new(1000).get(), 999);
    assert_eq!(Quantity::new(i64::MAX).get(), 999);
    assert_eq!(Quantity::new(42).get(), 42);
}

#[test]
fn quantity_input_strips_non_digits_before_clamping() {
    assert_eq!(Quantity::from_input("12a3").get(), 123);
    assert_eq!(Quantity::from_input("-5").get(), 5);
    assert_eq!(Quantity::from_input("4.5").get(), 45);
    assert_eq!(Quantity::from_input("abc").get(), 1);
    assert_eq!(Quantity::from_input("").get(), 1);
    assert_eq!(Quantity::from_input("0").get(), 1);
    assert_eq!(Quantity::from_input("000").get(), 1);
    assert_eq!(Quantity::from_input("1000").get(), 999);
    assert_eq!(Quantity::from_input("0999").get(), 999);
}

#[test]
fn quantity_input_saturates_digit_strings_longer_than_any_integer() {
    assert_eq!(Quantity::from_input("123456789012345678901234567890").get(), 999);
}

#[test]
fn quantity_input_matches_clamp_for_every_digit_string_up_to_four_digits() {
    for q in 0..=9999_i64 {
        assert_eq!(
            Quantity::from_input(&q.to_string()).get() as i64,
            q.clamp(1, 999),
            "input {q}"
        );
    }
}

#[test]
fn persisted_quantity_is_clamped_on_decode() {
    let quantity: Quantity = serde_json::from_str("5000").expect("decode");
    assert_eq!(quantity.get(), 999);
    assert_eq!(serde_json::to_string(&Quantity::new(7)).expect("encode"), "7");
}

#[test]
fn capability_only_moves_forward() {
    let mut state = CapabilityState::default();
    assert_eq!(state, CapabilityState::Unknown);
    assert!(!state.advance(CapabilityState::Available));
    assert!(state.advance(CapabilityState::Checking));
    assert!(!state.advance(CapabilityState::Unknown));
    assert!(state.advance(CapabilityState::Unavailable));
    assert!(state.is_settled());
    assert!(!state.advance(CapabilityState::Available));
    assert_eq!(state, CapabilityState::Unavailable);
}

#[test]
fn accessory_decodes_backend_field_names_and_null_image() {
    let accessory: Accessory =
        serde_json::from_str(r#"{"id": 3, "nom": "Bac", "prix": "12.50", "image": null}"#)
            .expect("decode");
    assert_eq!(accessory.id, AccessoryId(3));
    assert_eq!(accessory.name, "Bac");
    assert_eq!(accessory.unit_price, Decimal::new(1250, 2));
    assert_eq!(accessory.image, "");
}

#[test]
fn view_mode_defaults_to_flat_image() {
    assert_eq!(ViewMode::default(), ViewMode::FlatImage);
}
