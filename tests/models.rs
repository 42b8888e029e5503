//! Model, model set and derivation behavior

use familiar_models::validators::{self, ValidateError};
use familiar_models::{
    is_model, model_to_raw, Field, FieldOptions, Model, ModelSet, SchemaError, Value,
};
use regex::Regex;
use serde_json::json;

const DATETIME_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}[+-]\d{2}:\d{2}$";

fn user() -> Model {
    Model::builder("User")
        .field("id", Field::integer().readonly(true))
        .field("name", Field::string())
        .field("email", Field::string().validator(validators::email()))
        .field("age", Field::integer())
        .field("created_at", Field::datetime())
        .initial("age", 999)
        .build()
        .unwrap()
}

fn users_fixture() -> Value {
    let raw: serde_json::Value =
        serde_json::from_str(include_str!("fixtures/users.json")).unwrap();
    Value::from(raw)
}

// =============================================================================
// Model Tests
// =============================================================================

#[test]
fn test_user_model() {
    let user = user().init(Some(json!({"name": "Eugene Reese"}).into())).unwrap();
    assert_eq!(user.get("name"), Some(&Value::from("Eugene Reese")));

    let mut representation = user.to_representation().unwrap();
    let created_at = representation
        .as_object_mut()
        .and_then(|obj| obj.remove("created_at"))
        .unwrap();
    assert!(Regex::new(DATETIME_PATTERN)
        .unwrap()
        .is_match(created_at.as_str().unwrap()));
    assert_eq!(
        representation,
        json!({"name": "Eugene Reese", "email": "", "age": 999})
    );

    assert!(is_model(&user.into()));
}

#[test]
fn test_representation_round_trip_is_idempotent() {
    let model = user();
    let Value::List(items) = users_fixture() else {
        panic!("fixture must be a list");
    };
    for item in items {
        let record = model.init(Some(item)).unwrap();
        let first = record.to_representation().unwrap();
        let again = model
            .init(Some(first.clone().into()))
            .unwrap()
            .to_representation()
            .unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn test_readonly_accepted_on_input() {
    let model = user();
    let internal = model
        .to_internal_value(&json!({"id": 5, "name": "x"}).into())
        .unwrap();
    assert_eq!(internal["id"], Value::Int(5));

    let record = model.init(Some(json!({"id": 5}).into())).unwrap();
    assert_eq!(record.get("id"), Some(&Value::Int(5)));
    assert!(record.to_representation().unwrap().get("id").is_none());
}

#[test]
fn test_initializer_and_extension() {
    let new_user = user()
        .exclude(&["id", "email", "created_at"])
        .include([
            (
                "nickname",
                Field::string()
                    .init(FieldOptions::new().default_value("Nickname"))
                    .unwrap(),
            ),
            (
                "subscribe",
                Field::integer()
                    .init(FieldOptions::new().many(FieldOptions::new()))
                    .unwrap(),
            ),
            (
                "phone_number",
                Field::string()
                    .init(FieldOptions::new().default_value("998"))
                    .unwrap(),
            ),
        ])
        .unwrap()
        .extend("NewUser")
        .initial("name", "John Doe")
        .build()
        .unwrap();

    let record = new_user.init(None).unwrap();
    assert_eq!(record.get("name"), Some(&Value::from("John Doe")));
    assert_eq!(
        record.to_representation().unwrap(),
        json!({
            "name": "John Doe",
            "age": 999,
            "nickname": "Nickname",
            "subscribe": [],
            "phone_number": "998"
        })
    );
    assert!(record.is_instance_of(&new_user));
}

#[test]
fn test_derivation_never_mutates_parent() {
    let base = user();
    let excluded = base.exclude(&["age"]);
    let picked = base.pick(&["name"]);
    let included = base.include([("nickname", Field::string())]).unwrap();

    assert!(base.fields().contains_key("age"));
    assert!(!base.fields().contains_key("nickname"));
    assert_eq!(base.fields().len(), 5);
    assert_eq!(excluded.fields().len(), 4);
    assert_eq!(included.fields().len(), 6);

    assert_eq!(
        picked
            .init(Some(json!({"name": "Eugene Reese"}).into()))
            .unwrap()
            .to_representation()
            .unwrap(),
        json!({"name": "Eugene Reese"})
    );
}

#[test]
fn test_derivations_compose() {
    let base = user();
    let left = base.exclude(&["id"]).pick(&["name", "email"]);
    let right = base.pick(&["name", "email"]).exclude(&["id"]);
    let keys = |m: &Model| m.fields().keys().cloned().collect::<Vec<_>>();
    assert_eq!(keys(&left), keys(&right));
    assert_eq!(keys(&left), vec!["name", "email"]);
}

#[test]
fn test_model_to_raw_skips_conversion() {
    let record = user()
        .init(Some(json!({"name": "Eugene Reese", "id": 3}).into()))
        .unwrap();
    let raw = model_to_raw(&record.into());
    assert_eq!(raw["name"], json!("Eugene Reese"));
    assert_eq!(raw["age"], json!(999));
    assert_eq!(raw["id"], json!(3));
}

// =============================================================================
// Nested Model Tests
// =============================================================================

fn person() -> (Model, Model, ModelSet) {
    let address = Model::builder("Address")
        .field("city", Field::string())
        .field("zip", Field::string().validator(validators::len_range(Some(5), Some(5))))
        .build()
        .unwrap();
    let pet = Model::builder("Pet")
        .field("name", Field::string().validator(validators::min_len(1)))
        .build()
        .unwrap();
    let pets = ModelSet::from_model(&pet);
    let person = Model::builder("Person")
        .field("name", Field::string())
        .field("address", Field::model(&address))
        .field("pets", Field::model_set(&pets))
        .build()
        .unwrap();
    (person, address, pets)
}

#[test]
fn test_nested_defaults_and_conversion() {
    let (person, address, pets) = person();
    let record = person.init(None).unwrap();
    let nested = record.get("address").and_then(Value::as_record).unwrap();
    assert!(nested.is_instance_of(&address));
    assert!(record.get("pets").and_then(Value::as_set).unwrap().is_empty());

    let record = person
        .init(Some(
            json!({
                "name": "Ann",
                "address": {"city": "Oslo", "zip": "0150"},
                "pets": [{"name": "Rex"}, {"name": "Tom"}]
            })
            .into(),
        ))
        .unwrap();
    let set = record.get("pets").and_then(Value::as_set).unwrap();
    assert!(set.is_instance_of(&pets));
    assert_eq!(set.len(), 2);
    assert_eq!(
        record.to_representation().unwrap(),
        json!({
            "name": "Ann",
            "address": {"city": "Oslo", "zip": "0150"},
            "pets": [{"name": "Rex"}, {"name": "Tom"}]
        })
    );
}

#[test]
fn test_nested_errors_compose() {
    let (person, _, _) = person();
    let mut record = person
        .init(Some(
            json!({
                "address": {"city": "Oslo", "zip": "015"},
                "pets": [{"name": "Rex"}, {"name": ""}]
            })
            .into(),
        ))
        .unwrap();
    assert!(!record.validate().unwrap());
    let errors = record.errors().unwrap();
    assert!(errors.get("address").and_then(|e| e.get("zip")).is_some());
    match errors.get("pets") {
        Some(ValidateError::Items(items)) => {
            assert_eq!(items.len(), 1);
            assert!(items[0].get("name").is_some());
        }
        other => panic!("expected element errors, got {other:?}"),
    }
}

#[test]
fn test_nested_foreign_record_read_by_property() {
    let mailbox = |name: &str| {
        Model::builder(name)
            .field("email", Field::string().source("mail"))
            .build()
            .unwrap()
    };
    let (inbox, outbox) = (mailbox("Inbox"), mailbox("Outbox"));
    let account = Model::builder("Account")
        .field("inbox", Field::model(&inbox))
        .build()
        .unwrap();

    let foreign = outbox.init(Some(json!({"mail": "x@y.z"}).into())).unwrap();
    let mut data = indexmap::IndexMap::new();
    data.insert("inbox".to_string(), Value::from(foreign));
    let record = account.init(Some(Value::Map(data))).unwrap();

    let nested = record.get("inbox").and_then(Value::as_record).unwrap();
    assert!(nested.is_instance_of(&inbox));
    assert_eq!(nested.get("email"), Some(&Value::from("x@y.z")));
    assert_eq!(
        record.to_representation().unwrap(),
        json!({"inbox": {"mail": "x@y.z"}})
    );
}

#[test]
fn test_nested_rejects_scalar() {
    let (person, _, _) = person();
    assert!(matches!(
        person.init(Some(json!({"address": "Oslo"}).into())),
        Err(SchemaError::Type(_))
    ));
    assert!(matches!(
        person.init(Some(json!({"pets": {"name": "Rex"}}).into())),
        Err(SchemaError::Type(_))
    ));
}

// =============================================================================
// Model Set Tests
// =============================================================================

#[test]
fn test_model_set_passes_instances_through() {
    let model = user();
    let users = ModelSet::from_model(&model);

    let mut existing = model.init(Some(json!({"name": "Eugene Reese"}).into())).unwrap();
    assert!(!existing.validate().unwrap());

    let records = users
        .init(Some(Value::List(vec![
            existing.clone().into(),
            json!({"name": "John Doe"}).into(),
        ])))
        .unwrap();

    assert_eq!(users.model(), &model);
    // a re-initialized record would have lost its errors
    assert_eq!(records[0], existing);
    assert!(records[0].errors().is_some());
    assert!(records[1].is_instance_of(&model));
    assert!(records[1].errors().is_none());
    assert!(records.iter().all(|r| r.is_instance_of(&model)));
    assert!(is_model(&records.into()));
}

#[test]
fn test_model_set_fixture() {
    let users = ModelSet::from_model(&user());
    let mut records = users.init(Some(users_fixture())).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].get("age"), Some(&Value::Int(999)));

    assert!(!records.validate().unwrap());
    assert_eq!(
        records.errors().unwrap().to_json(),
        json!([{"email": "Invalid email"}])
    );

    let representation = records.to_representation().unwrap();
    let names: Vec<_> = representation
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Eugene Reese", "John Doe", "Ethan"]);
    assert_eq!(
        representation[1]["created_at"],
        json!("2023-11-05T22:10:05.000-05:00")
    );
}

#[test]
fn test_model_set_requires_list() {
    let users = ModelSet::from_model(&user());
    assert!(matches!(
        users.to_internal_value(&Value::from("users")),
        Err(SchemaError::Type(_))
    ));
}
