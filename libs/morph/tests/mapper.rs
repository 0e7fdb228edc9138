use std::collections::BTreeMap;

use morph::capability::{CapabilityError, Scanner, Textual, Valuer};
use morph::{
    set_field_by_name, to_map, to_string, to_struct, Arg, Dictionary, ErrorCode, MapperConfig,
    Record, ResolutionMode, Value,
};

#[derive(Record, Clone, Default, Debug, PartialEq)]
pub struct User {
    #[tag(db = "user_id", json = "id")]
    pub id: i64,

    #[tag(json = "name,omitempty")]
    pub name: String,

    pub age: u8,

    #[tag(json = "-")]
    pub secret: String,

    hidden: i32,
}

#[derive(Record, Clone, Default, Debug)]
pub struct Invoice {
    #[tag(json = "number")]
    pub number: u32,

    #[tag(json = "customer")]
    pub customer: String,

    #[tag(json = "total")]
    pub total: f64,

    #[tag(json = "paid")]
    pub paid: bool,

    #[tag(json = "lines")]
    pub lines: Vec<String>,

    #[tag(json = "note")]
    pub note: Option<String>,

    #[tag(db = "digest")]
    pub digest: Vec<u8>,
}

#[derive(Record, Clone, Default, Debug)]
pub struct Address {
    #[tag(json = "city")]
    pub city: String,
}

#[derive(Record, Clone, Default, Debug)]
pub struct Profile {
    #[tag(json = "address")]
    pub address: Address,

    #[tag(json = "nickname")]
    pub nickname: Option<String>,

    #[tag(json = "scores")]
    pub scores: Vec<i32>,
}

#[derive(Record, Clone, Default, Debug)]
#[record(scanner, valuer)]
pub struct NullInt {
    pub value: i64,
    pub valid: bool,
}

impl Scanner for NullInt {
    fn scan(&mut self, src: &Value) -> Result<(), CapabilityError> {
        if src.is_nil() {
            *self = NullInt::default();
            return Ok(());
        }
        self.value = morph::to_int64(src)?;
        self.valid = true;
        Ok(())
    }
}

impl Valuer for NullInt {
    fn value(&self) -> Value {
        if self.valid { Value::I64(self.value) } else { Value::Nil }
    }
}

#[derive(Record, Clone, Default, Debug)]
pub struct Row {
    #[tag(db = "count")]
    pub count: NullInt,
}

#[derive(Record, Clone, Default, Debug)]
#[record(textual)]
pub struct Money {
    pub cents: i64,
}

impl Textual for Money {
    fn text(&self) -> String {
        format!("{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

fn dict(entries: &[(&str, Value)]) -> Value {
    Value::Dict(entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
}

fn user() -> User {
    User {
        id: 7,
        name: String::new(),
        age: 30,
        secret: "s3cret".to_string(),
        hidden: 1,
    }
}

#[test]
fn test_to_map_publishes_tags_only_by_default() {
    let mut out = Dictionary::new();
    to_map(&mut out, &[Arg::Record(&user())]).unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(out.get("user_id"), Some(&Value::I64(7)));
    assert_eq!(out.get("id"), Some(&Value::I64(7)));
}

#[test]
fn test_to_map_names_and_tags() {
    let config = MapperConfig::default().with_mode(ResolutionMode::NamesAndTags);
    let mut source = user();
    source.name = "bob".to_string();

    let mut out = Dictionary::new();
    to_map(&mut out, &[Arg::Record(&source), Arg::Config(config)]).unwrap();

    assert_eq!(out.get("name"), Some(&Value::from("bob")));
    assert_eq!(out.get("age"), Some(&Value::U8(30)));
    assert_eq!(out.get("secret"), Some(&Value::from("s3cret")));
    assert!(!out.contains_key("hidden"));
}

#[test]
fn test_to_map_names_if_no_tag() {
    let config = MapperConfig::default().with_mode(ResolutionMode::NamesIfNoTag);
    let mut out = Dictionary::new();
    to_map(&mut out, &[Arg::Record(&user()), Arg::Config(config)]).unwrap();

    assert!(out.contains_key("age"));
    assert!(out.contains_key("user_id"));
    assert!(!out.contains_key("hidden"));
}

#[test]
fn test_to_map_global_omit_empty() {
    let config = MapperConfig::default()
        .with_mode(ResolutionMode::NamesOnly)
        .with_omit_empty(true);
    let source = User { id: 0, age: 5, ..User::default() };

    let mut out = Dictionary::new();
    to_map(&mut out, &[Arg::Record(&source), Arg::Config(config)]).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out.get("age"), Some(&Value::U8(5)));
}

#[test]
fn test_to_struct_resolves_names_then_tags() {
    let mut target = User::default();
    let source = dict(&[
        ("user_id", Value::I64(9)),
        ("name", Value::from("alice")),
        ("age", Value::from("41")),
        ("secret", Value::from("nope")),
        ("hidden", Value::I32(5)),
    ]);
    to_struct(&mut target, &[Arg::Value(source)]).unwrap();

    assert_eq!(target.id, 9);
    assert_eq!(target.name, "alice");
    assert_eq!(target.age, 41);
    assert_eq!(target.secret, "nope");
    assert_eq!(target.hidden, 0);
}

#[test]
fn test_to_struct_reports_field_context() {
    let mut target = User::default();
    let err = to_struct(&mut target, &[Arg::Value(dict(&[("age", Value::I64(300))]))]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NumberOverflow);

    let err = to_struct(&mut target, &[Arg::Value(dict(&[("age", Value::from("old"))]))]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TypeNotSupported);
    assert!(err.to_string().contains("User.age"));
}

#[test]
fn test_to_struct_rejects_empty_sources() {
    let mut target = User::default();
    let err = to_struct(&mut target, &[Arg::Value(Value::I32(1))]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ArgumentInvalid);
}

#[test]
fn test_record_round_trip_tags_only_drops_untagged() {
    let mut source = user();
    source.name = "carol".to_string();

    let mut data = Dictionary::new();
    to_map(&mut data, &[Arg::Record(&source)]).unwrap();

    let mut copy = User::default();
    to_struct(&mut copy, &[Arg::Value(Value::Dict(data))]).unwrap();
    assert_eq!(copy.id, 7);
    assert_eq!(copy.name, "carol");
    assert_eq!(copy.age, 0);
}

#[test]
fn test_tagged_record_round_trip_is_lossless() {
    let invoice = Invoice {
        number: 1042,
        customer: "ACME".to_string(),
        total: 99.5,
        paid: true,
        lines: vec!["bolts".to_string(), "nuts".to_string()],
        note: Some("rush".to_string()),
        digest: vec![0xde, 0xad],
    };

    let mut data = Dictionary::new();
    to_map(&mut data, &[Arg::Record(&invoice)]).unwrap();

    let mut copy = Invoice::default();
    to_struct(&mut copy, &[Arg::Value(Value::Dict(data))]).unwrap();
    assert_eq!(Value::from(copy.clone()), Value::from(invoice.clone()));
    assert_eq!(copy.note, invoice.note);
    assert_eq!(copy.digest, invoice.digest);
}

#[test]
fn test_names_and_tags_round_trip_is_lossless() {
    let source = User {
        id: 7,
        name: "dave".to_string(),
        age: 52,
        secret: "hunter2".to_string(),
        hidden: 0,
    };
    let config = MapperConfig::default().with_mode(ResolutionMode::NamesAndTags);

    let mut data = Dictionary::new();
    to_map(&mut data, &[Arg::Record(&source), Arg::Config(config)]).unwrap();

    let mut copy = User::default();
    to_struct(&mut copy, &[Arg::Value(Value::Dict(data))]).unwrap();
    assert_eq!(copy, source);
}

#[test]
fn test_to_map_is_idempotent() {
    let profile = Profile {
        address: Address { city: "Oslo".to_string() },
        nickname: Some("oz".to_string()),
        scores: vec![3, 1, 2],
    };
    let config = MapperConfig::default().with_mode(ResolutionMode::NamesAndTags);
    let args = [Arg::Record(&profile), Arg::Config(config)];

    let mut first = Dictionary::new();
    to_map(&mut first, &args).unwrap();
    let mut second = Dictionary::new();
    to_map(&mut second, &args).unwrap();

    assert_eq!(first, second);
    assert_eq!(Value::Dict(first).to_string(), Value::Dict(second).to_string());
}

#[test]
fn test_to_struct_prefers_bare_name_over_tag() {
    let mut target = User::default();
    let source = dict(&[("user_id", Value::I64(2)), ("id", Value::I64(1))]);
    to_struct(&mut target, &[Arg::Value(source)]).unwrap();
    assert_eq!(target.id, 1);

    let mut target = User::default();
    to_struct(&mut target, &[Arg::Value(dict(&[("user_id", Value::I64(2))]))]).unwrap();
    assert_eq!(target.id, 2);
}

#[test]
fn test_nested_records_and_options() {
    let profile = Profile {
        address: Address { city: "Oslo".to_string() },
        nickname: None,
        scores: vec![1, 2],
    };
    let mut out = Dictionary::new();
    to_map(&mut out, &[Arg::Record(&profile)]).unwrap();

    assert_eq!(out.get("address"), Some(&dict(&[("city", Value::from("Oslo"))])));
    assert_eq!(out.get("nickname"), Some(&Value::Nil));
    assert_eq!(out.get("scores"), Some(&Value::List(vec![Value::I32(1), Value::I32(2)])));

    let mut target = Profile::default();
    let source = dict(&[
        ("address", dict(&[("city", Value::from("Bergen"))])),
        ("nickname", Value::from("nick")),
        ("scores", Value::List(vec![Value::from("3"), Value::I64(4)])),
    ]);
    to_struct(&mut target, &[Arg::Value(source)]).unwrap();

    assert_eq!(target.address.city, "Bergen");
    assert_eq!(target.nickname.as_deref(), Some("nick"));
    assert_eq!(target.scores, vec![3, 4]);
}

#[test]
fn test_scanner_populates_wrapper() {
    let mut row = Row::default();
    to_struct(&mut row, &[Arg::Value(dict(&[("count", Value::from("12"))]))]).unwrap();
    assert!(row.count.valid);
    assert_eq!(row.count.value, 12);

    let err = to_struct(&mut row, &[Arg::Value(dict(&[("count", Value::from("many"))]))]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ScannerFailed);
}

#[test]
fn test_evaluate_methods_replaces_producers() {
    let row = Row { count: NullInt { value: 5, valid: true } };

    let mut raw = Dictionary::new();
    to_map(&mut raw, &[Arg::Record(&row)]).unwrap();
    assert!(matches!(raw.get("count"), Some(Value::Record(_))));

    let mut evaluated = Dictionary::new();
    let config = MapperConfig::default().with_evaluate_methods(true);
    to_map(&mut evaluated, &[Arg::Record(&row), Arg::Config(config)]).unwrap();
    assert_eq!(evaluated.get("count"), Some(&Value::I64(5)));
}

#[test]
fn test_set_field_by_name() {
    let config = MapperConfig::default();
    let mut target = User::default();
    set_field_by_name(&mut target, "age", &Value::F64(12.0), &config).unwrap();
    assert_eq!(target.age, 12);

    let err = set_field_by_name(&mut target, "hidden", &Value::I32(1), &config).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidField);
    let err = set_field_by_name(&mut target, "missing", &Value::I32(1), &config).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidField);
}

#[test]
fn test_map_field_destination() {
    #[derive(Record, Clone, Default, Debug)]
    pub struct Settings {
        #[tag(json = "limits")]
        pub limits: BTreeMap<String, u32>,
    }

    let mut target = Settings::default();
    let source = dict(&[("limits", dict(&[("cpu", Value::from("4")), ("mem", Value::I64(512))]))]);
    to_struct(&mut target, &[Arg::Value(source)]).unwrap();
    assert_eq!(target.limits.get("cpu"), Some(&4));
    assert_eq!(target.limits.get("mem"), Some(&512));
}

#[test]
fn test_textual_record_to_string() {
    assert_eq!(to_string(&Value::from(Money { cents: 1234 })).unwrap(), "12.34");

    let err = to_string(&Value::from(user())).unwrap_err();
    assert_eq!(err.code(), ErrorCode::TypeNotSupported);
}

#[test]
fn test_config_from_json() {
    let config = MapperConfig::from_json(r#"{"mode": "names_only", "tags": ["json"], "omit_empty": true}"#)
        .unwrap();
    assert_eq!(config.mode, ResolutionMode::NamesOnly);
    assert_eq!(config.tags, vec!["json".to_string()]);
    assert!(config.omit_empty);
    assert!(config.keep_pointers);

    let err = MapperConfig::from_json(r#"{"mode": "sometimes"}"#).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ArgumentInvalid);
}
