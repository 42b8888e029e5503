//! Field kinds as seen through models

use bigdecimal::BigDecimal;
use familiar_models::validators::{predicate, validator, ValidateError};
use familiar_models::{
    model_to_raw, DeclaredType, EnumType, Field, FieldOptions, Model, SchemaError, Value,
};
use regex::Regex;
use serde_json::json;
use std::str::FromStr;

const DATETIME_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}[+-]\d{2}:\d{2}$";
const DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";

fn looks_like(pattern: &str, value: &serde_json::Value) -> bool {
    Regex::new(pattern).unwrap().is_match(value.as_str().unwrap_or_default())
}

// =============================================================================
// Scalar Kinds
// =============================================================================

#[test]
fn test_any_field() {
    let model = Model::builder("Test")
        .field("v1", Field::any())
        .declare("v2", DeclaredType::Str, Field::any())
        .initial("v2", "")
        .build()
        .unwrap();
    let v1 = model.field("v1").unwrap();
    let v2 = model.field("v2").unwrap();

    assert_eq!(v1.get_default().unwrap(), Some(Value::Null));
    assert_eq!(v2.get_default().unwrap(), None);
    assert_eq!(v1.to_representation(&Value::Null).unwrap(), json!(null));
    assert_eq!(
        model.init(None).unwrap().to_representation().unwrap(),
        json!({"v1": null, "v2": ""})
    );
}

#[test]
fn test_readonly_string_field() {
    let model = Model::builder("Test")
        .field("label", Field::string().readonly(true))
        .build()
        .unwrap();
    assert_eq!(model.field("label").unwrap().get_default().unwrap(), Some(Value::from("")));
    assert_eq!(model.init(None).unwrap().to_representation().unwrap(), json!({}));
}

#[test]
fn test_numeric_and_boolean_defaults() {
    let model = Model::builder("Test")
        .field("count", Field::integer())
        .field("f", Field::float())
        .field("pi", Field::float())
        .field("flag", Field::boolean())
        .initial("pi", 3.1415926)
        .build()
        .unwrap();
    assert_eq!(
        model_to_raw(&model.init(None).unwrap().into()),
        json!({"count": 0, "f": 0.0, "pi": 3.1415926, "flag": false})
    );
}

#[test]
fn test_integer_normalizes_integral_floats() {
    let field = Field::integer();
    assert_eq!(field.to_internal_value(&json!(4.0).into()).unwrap(), Value::Int(4));
    assert_eq!(field.to_internal_value(&json!(4.5).into()).unwrap(), Value::Float(4.5));
}

#[test]
fn test_decimal_field() {
    let model = Model::builder("Price")
        .field("amount", Field::decimal())
        .build()
        .unwrap();
    let record = model.init(Some(json!({"amount": "0.10"}).into())).unwrap();
    assert_eq!(
        record.get("amount"),
        Some(&Value::Decimal(BigDecimal::from_str("0.1").unwrap()))
    );
    assert_eq!(record.to_representation().unwrap(), json!({"amount": "0.10"}));

    let mut record = model.init(Some(json!({"amount": 3}).into())).unwrap();
    assert!(record.validate().unwrap());
    assert!(matches!(
        model.init(Some(json!({"amount": "ten"}).into())),
        Err(SchemaError::Conversion { kind: "decimal", .. })
    ));
}

// =============================================================================
// Enum Kind
// =============================================================================

#[test]
fn test_enum_field() {
    let te = EnumType::new("TE", [("A", 1), ("B", 2), ("C", 3)]);
    let model = Model::builder("Test")
        .field(
            "te",
            Field::enumeration(te.clone())
                .init(FieldOptions::new().default_with(|| Value::Int(1)))
                .unwrap(),
        )
        .build()
        .unwrap();
    let field = model.field("te").unwrap();

    assert_eq!(field.get_default().unwrap(), Some(Value::Int(1)));
    assert_eq!(model_to_raw(&model.init(None).unwrap().into()), json!({"te": 1}));
    assert_eq!(field.run_validators(Some(&Value::Int(1))).unwrap(), None);
    assert!(field.run_validators(Some(&Value::from("x"))).unwrap().is_some());
    assert_eq!(te.value_of("B"), Some(&Value::Int(2)));
}

#[test]
fn test_enum_field_configuration_errors() {
    assert!(matches!(
        Field::new(familiar_models::FieldKind::Enum).init(FieldOptions::new()),
        Err(SchemaError::Configuration(_))
    ));

    let te = EnumType::new("TE", [("A", 1)]);
    assert!(matches!(
        Model::builder("Test").field("te", Field::enumeration(te)).build(),
        Err(SchemaError::Configuration(_))
    ));
}

// =============================================================================
// Temporal Kinds
// =============================================================================

#[test]
fn test_temporal_defaults() {
    let model = Model::builder("Test")
        .field("timestamp", Field::timestamp())
        .field("datetime", Field::datetime())
        .field(
            "date",
            Field::datetime().init(FieldOptions::new().format("date")).unwrap(),
        )
        .field("day", Field::date())
        .build()
        .unwrap();
    let record = model.init(None).unwrap();

    assert!(matches!(record.get("timestamp"), Some(Value::Int(_))));
    assert!(matches!(record.get("datetime"), Some(Value::DateTime(_))));
    assert!(matches!(record.get("day"), Some(Value::Date(_))));

    let representation = record.to_representation().unwrap();
    assert!(looks_like(DATETIME_PATTERN, &representation["timestamp"]));
    assert!(looks_like(DATETIME_PATTERN, &representation["datetime"]));
    assert!(looks_like(DATE_PATTERN, &representation["date"]));
    assert!(looks_like(DATE_PATTERN, &representation["day"]));
}

#[test]
fn test_datetime_timezone_and_format() {
    let field = Field::datetime()
        .init(FieldOptions::new().timezone("+08:00"))
        .unwrap();
    let internal = field.to_internal_value(&json!(0).into()).unwrap();
    assert_eq!(
        field.to_representation(&internal).unwrap(),
        json!("1970-01-01T08:00:00.000+08:00")
    );

    let field = Field::timestamp()
        .init(FieldOptions::new().format("timestamp"))
        .unwrap();
    assert_eq!(
        field
            .to_representation(&field.to_internal_value(&json!("1970-01-01T00:00:02Z").into()).unwrap())
            .unwrap(),
        json!(2000)
    );

    let field = Field::datetime()
        .init(FieldOptions::new().format("%d.%m.%Y %H:%M").timezone("UTC"))
        .unwrap();
    assert_eq!(
        field
            .to_representation(&json!("2024-03-01T23:30:00-01:00").into())
            .unwrap(),
        json!("02.03.2024 00:30")
    );
}

#[test]
fn test_date_field_cannot_take_timezone() {
    assert!(matches!(
        Field::date().init(FieldOptions::new().timezone("UTC")),
        Err(SchemaError::Configuration(_))
    ));
    assert!(matches!(
        Field::string().init(FieldOptions::new().timezone("UTC")),
        Err(SchemaError::Configuration(_))
    ));
}

// =============================================================================
// List Kind and Validation
// =============================================================================

#[test]
fn test_list_errors_have_one_key_per_failure() {
    let field = Field::list(Field::integer().validator(predicate("must be positive", |v| {
        v.as_i64().is_some_and(|i| i > 0)
    })))
    .unwrap();
    let errors = field
        .run_validators(Some(&json!([1, -2, 3]).into()))
        .unwrap()
        .unwrap();
    assert_eq!(errors.to_json(), json!({"1": "must be positive"}));
}

#[test]
fn test_list_of_models() {
    let tag = Model::builder("Tag")
        .field("label", Field::string().validator(familiar_models::validators::min_len(2)))
        .build()
        .unwrap();
    let post = Model::builder("Post")
        .field("tags", Field::model(&tag).many(FieldOptions::new()).unwrap())
        .build()
        .unwrap();
    let mut record = post
        .init(Some(json!({"tags": [{"label": "rust"}, {"label": "x"}]}).into()))
        .unwrap();
    assert!(!record.validate().unwrap());
    assert_eq!(
        record.errors().unwrap().to_json(),
        json!({"tags": {"1": {"label": "length (1) is lower than minimum of 2"}}})
    );
}

#[test]
fn test_validator_payload_shapes() {
    let model = Model::builder("Account")
        .field(
            "password",
            Field::string().validator(validator(|value, _| {
                let password = value.as_str().unwrap_or_default();
                let mut problems = Vec::new();
                if password.len() < 8 {
                    problems.push("too short".to_string());
                }
                if !password.chars().any(|c| c.is_ascii_digit()) {
                    problems.push("needs a digit".to_string());
                }
                if problems.is_empty() {
                    Ok(())
                } else {
                    Err(ValidateError::Messages(problems))
                }
            })),
        )
        .build()
        .unwrap();
    let mut record = model.init(Some(json!({"password": "abc"}).into())).unwrap();
    assert!(!record.validate().unwrap());
    assert_eq!(
        record.errors().unwrap().to_json(),
        json!({"password": ["too short", "needs a digit"]})
    );
}

#[test]
fn test_nullable_null_skips_conversion() {
    let model = Model::builder("Event")
        .field(
            "at",
            Field::datetime()
                .init(FieldOptions::new().nullable(true).format("%Y"))
                .unwrap(),
        )
        .build()
        .unwrap();
    let mut record = model.init(None).unwrap();
    assert_eq!(record.get("at"), Some(&Value::Null));
    assert_eq!(record.to_representation().unwrap(), json!({"at": null}));
    assert!(record.validate().unwrap());
}

#[test]
fn test_source_names_external_key() {
    let model = Model::builder("Contact")
        .field("email", Field::string().source("mail"))
        .build()
        .unwrap();
    let record = model.init(Some(json!({"mail": "a@b.io", "email": "ignored"}).into())).unwrap();
    assert_eq!(record.get("email"), Some(&Value::from("a@b.io")));
    assert_eq!(record.to_representation().unwrap(), json!({"mail": "a@b.io"}));
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_field_round_trip_stability() {
    let cases: Vec<(Field, serde_json::Value)> = vec![
        (Field::string(), json!("text")),
        (Field::integer(), json!(12)),
        (Field::float(), json!(1)),
        (Field::boolean(), json!(false)),
        (Field::decimal(), json!(0.25)),
        (Field::timestamp(), json!(1_700_000_000_123_i64)),
        (Field::datetime(), json!("2024-06-01T12:00:00.5+02:00")),
        (Field::date(), json!("2024-06-01T23:59:59Z")),
        (Field::list(Field::float()).unwrap(), json!([1, 2.5])),
    ];
    for (field, input) in cases {
        let first = field.to_internal_value(&input.clone().into()).unwrap();
        let represented = field.to_representation(&first).unwrap();
        let second = field.to_internal_value(&represented.into()).unwrap();
        assert_eq!(first, second, "unstable round trip for {input}");
    }
}
