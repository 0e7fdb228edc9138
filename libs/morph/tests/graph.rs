use morph::capability::DeepCopier;
use morph::{deep_copy, deep_merge, MergeOptions, Pointer, Priority, Record, Value};

#[derive(Record, Clone, Default, Debug)]
pub struct Node {
    #[tag(json = "name")]
    pub name: String,

    #[tag(json = "next")]
    pub next: Value,

    visits: u32,
}

#[derive(Record, Clone, Default, Debug)]
#[record(deep_copier)]
pub struct Handle {
    pub id: u64,
}

impl DeepCopier for Handle {
    fn deep_copy(&self) -> Value {
        Value::from(Handle { id: self.id + 1 })
    }
}

#[derive(Record, Clone, Default, Debug)]
pub struct Account {
    #[tag(json = "id")]
    pub id: i64,

    #[tag(json = "tags")]
    pub tags: Vec<String>,
}

fn node(value: &Value) -> &Node {
    value.downcast_record::<Node>().expect("node record")
}

#[test]
fn test_deep_copy_preserves_two_node_cycle() {
    let a = Pointer::new(Value::Nil);
    let b = Pointer::new(Value::Nil);
    a.replace(Value::from(Node {
        name: "a".to_string(),
        next: Value::Ptr(b.clone()),
        visits: 3,
    }));
    b.replace(Value::from(Node {
        name: "b".to_string(),
        next: Value::Ptr(a.clone()),
        visits: 4,
    }));

    let Value::Ptr(copy_a) = deep_copy(&Value::Ptr(a.clone())) else {
        panic!("expected pointer");
    };
    assert!(!copy_a.ptr_eq(&a));

    let first = copy_a.borrow().clone();
    let first = node(&first);
    assert_eq!(first.name, "a");
    assert_eq!(first.visits, 0);

    let Value::Ptr(copy_b) = &first.next else {
        panic!("expected pointer to second node");
    };
    assert!(!copy_b.ptr_eq(&b));

    let second = copy_b.borrow().clone();
    let second = node(&second);
    assert_eq!(second.name, "b");
    match &second.next {
        Value::Ptr(back) => assert!(back.ptr_eq(&copy_a)),
        other => panic!("expected back pointer, got {other:?}"),
    }

    for pointer in [&a, &b, &copy_a, copy_b] {
        pointer.replace(Value::Nil);
    }
}

#[test]
fn test_deep_copy_delegates_to_copier() {
    let copied = deep_copy(&Value::from(Handle { id: 41 }));
    assert_eq!(copied.downcast_record::<Handle>().map(|h| h.id), Some(42));
}

#[test]
fn test_deep_copy_is_independent() {
    let original = Value::from(Account { id: 1, tags: vec!["x".to_string()] });
    let copied = deep_copy(&original);
    assert_eq!(copied, original);

    let account = copied.downcast_record::<Account>().expect("account record");
    assert_eq!(account.tags, vec!["x".to_string()]);
}

#[test]
fn test_deep_merge_record_with_dictionary() {
    let first = Value::from(Account { id: 1, tags: vec!["a".to_string()] });
    let second = Value::Dict(
        [
            ("id".to_string(), Value::I64(2)),
            ("tags".to_string(), Value::List(vec![Value::from("b")])),
            ("extra".to_string(), Value::Bool(true)),
        ]
        .into_iter()
        .collect(),
    );

    let merged = deep_merge(&first, &second, MergeOptions::default()).unwrap();
    let merged = merged.as_dict().expect("dictionary");
    assert_eq!(merged.get("id"), Some(&Value::I64(2)));
    assert_eq!(
        merged.get("tags"),
        Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
    );
    assert_eq!(merged.get("extra"), Some(&Value::Bool(true)));

    let kept = deep_merge(&first, &second, MergeOptions::new(Priority::First, true)).unwrap();
    let kept = kept.as_dict().expect("dictionary");
    assert_eq!(kept.get("id"), Some(&Value::I64(1)));
    assert_eq!(kept.get("tags"), Some(&Value::List(vec![Value::from("a")])));
}
