use alloy_primitives::U256;
use assert_matches::assert_matches;

use crate::decimal::parse_u256;
use crate::deposit::RawDepositRecord;
use crate::errors::LiquidityError;

#[test]
fn test_parse_decimal_and_hex() {
    assert_eq!(parse_u256("42").unwrap(), U256::from(42u64));
    assert_eq!(parse_u256("0x2a").unwrap(), U256::from(42u64));
    assert_eq!(parse_u256(" 7 ").unwrap(), U256::from(7u64));
}

#[test]
fn test_parse_rejects_non_integers() {
    assert_matches!(parse_u256(""), Err(LiquidityError::MalformedRecord(_)));
    assert_matches!(parse_u256("0x"), Err(LiquidityError::MalformedRecord(_)));
    assert_matches!(parse_u256("-1"), Err(LiquidityError::MalformedRecord(_)));
    assert_matches!(parse_u256("1.5"), Err(LiquidityError::MalformedRecord(_)));
}

#[test]
fn test_raw_record_accepts_strings_and_numbers() {
    let json = r#"{
        "depositId": 3,
        "depositor": "0xabc",
        "paymentIdentifier": "alice",
        "depositAmount": "100000000",
        "remainingDepositAmount": "60000000",
        "outstandingIntentAmount": 0,
        "conversionRate": "1000000000000000000",
        "intentHashes": [],
        "availableLiquidity": "60000000"
    }"#;

    let record: RawDepositRecord = serde_json::from_str(json).unwrap();
    assert_eq!(record.deposit_id, U256::from(3u64));
    assert_eq!(record.remaining_deposit_amount, U256::from(60_000_000u64));
    assert!(record.depositor_id_hash.is_none());
}

#[test]
fn test_raw_record_rejects_negative_amounts() {
    let json = r#"{
        "depositId": 3,
        "depositor": "0xabc",
        "depositAmount": -1,
        "remainingDepositAmount": 0,
        "outstandingIntentAmount": 0,
        "conversionRate": 1,
        "availableLiquidity": 0
    }"#;

    assert!(serde_json::from_str::<RawDepositRecord>(json).is_err());
}

#[test]
fn test_u256_serializes_as_decimal_string() {
    let record = RawDepositRecord {
        deposit_id: U256::from(9u64),
        depositor: "0xabc".to_string(),
        depositor_id_hash: None,
        payment_identifier: String::new(),
        deposit_amount: U256::from(1u64),
        remaining_deposit_amount: U256::from(1u64),
        outstanding_intent_amount: U256::ZERO,
        conversion_rate: U256::from(10u64).pow(U256::from(18u64)),
        intent_hashes: vec![],
        available_liquidity: U256::from(1u64),
    };

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["depositId"], "9");
    assert_eq!(value["conversionRate"], "1000000000000000000");
    assert!(value.get("depositorIdHash").is_none());
}
