//! End-to-end encode/decode tests over whole documents.
//!
//! Unit tests next to the codec assert exact wire bytes; these tests only
//! care that what comes out of the decoder is the graph that went in,
//! including shared identity and cycles.

use std::rc::Rc;

use proptest::prelude::*;
use sereal::{
    decode, decode_with_options, encode, node, DecoderOptions, Encoder, EncoderOptions, Node,
    RegexFlags, Value,
};

fn unwrapped() -> (EncoderOptions, DecoderOptions) {
    (
        EncoderOptions {
            unwrapped_references: true,
            ..EncoderOptions::default()
        },
        DecoderOptions {
            unwrapped_references: true,
        },
    )
}

fn roundtrip(graph: &Node) -> Node {
    decode(&encode(graph).unwrap()).unwrap()
}

#[test]
fn scalars_roundtrip() {
    let scalars = [
        Value::Undef,
        Value::Bool(true),
        Value::Bool(false),
        Value::Integer(0),
        Value::Integer(15),
        Value::Integer(-16),
        Value::Integer(i64::MAX),
        Value::Integer(i64::MIN),
        Value::Float(0.25),
        Value::Double(-1.5e300),
        Value::Bytes(vec![0x00, 0xFF, 0x80]),
        Value::Text("snowman \u{2603}".to_string()),
    ];
    for scalar in scalars {
        let graph = node(scalar);
        assert_eq!(roundtrip(&graph), graph);
    }
}

#[test]
fn nested_containers_roundtrip() {
    let graph = node(Value::hash([
        ("list".to_string(), node(Value::array([
            node(Value::Integer(1)),
            node(Value::from("two")),
        ]))),
        ("empty".to_string(), node(Value::Array(Vec::new()))),
        ("deep".to_string(), node(Value::hash([(
            "inner".to_string(),
            node(Value::Undef),
        )]))),
    ]));
    assert_eq!(roundtrip(&graph), graph);
}

#[test]
fn regex_roundtrip() {
    let graph = node(Value::Regex {
        pattern: "^a.*z$".to_string(),
        flags: RegexFlags {
            case_insensitive: true,
            multiline: true,
            ..RegexFlags::default()
        },
    });
    assert_eq!(roundtrip(&graph), graph);
}

#[test]
fn object_roundtrip_through_classname_dedup() {
    let graph = node(Value::array([
        node(Value::Object {
            class: "My::Class".to_string(),
            data: node(Value::hash([("id".to_string(), node(Value::Integer(1)))])),
        }),
        node(Value::Object {
            class: "My::Class".to_string(),
            data: node(Value::hash([("id".to_string(), node(Value::Integer(2)))])),
        }),
    ]));
    assert_eq!(roundtrip(&graph), graph);
}

#[test]
fn shared_container_identity_survives() {
    let inner = node(Value::array([node(Value::Integer(7))]));
    let graph = node(Value::array([inner.clone(), inner]));

    let decoded = roundtrip(&graph);
    let items = match &*decoded.borrow() {
        Value::Array(items) => items.clone(),
        other => panic!("expected array, got {}", other.kind()),
    };

    // the first occurrence is the container itself, the second a pointer
    // back to the same node
    match &*items[1].borrow() {
        Value::Ref(target) => assert!(Rc::ptr_eq(target, &items[0])),
        other => panic!("expected ref, got {}", other.kind()),
    }
}

#[test]
fn weak_reference_follows_its_strong_sibling() {
    let target = node(Value::Integer(3));
    let graph = node(Value::array([
        node(Value::Ref(target.clone())),
        node(Value::Weak(Rc::downgrade(&target))),
    ]));

    let decoded = roundtrip(&graph);
    let items = match &*decoded.borrow() {
        Value::Array(items) => items.clone(),
        other => panic!("expected array, got {}", other.kind()),
    };

    let strong = match &*items[0].borrow() {
        Value::Ref(target) => target.clone(),
        other => panic!("expected ref, got {}", other.kind()),
    };
    match &*items[1].borrow() {
        Value::Weak(weak) => {
            let upgraded = weak.upgrade().unwrap();
            assert!(Rc::ptr_eq(&upgraded, &strong));
            assert_eq!(*upgraded.borrow(), Value::Integer(3));
        }
        other => panic!("expected weak ref, got {}", other.kind()),
    }
}

#[test]
fn alias_identity_survives() {
    let shared = node(Value::from("shared"));
    let graph = node(Value::array([
        shared.clone(),
        node(Value::Alias(shared.clone())),
        node(Value::Alias(shared)),
    ]));

    let mut encoder = Encoder::new(EncoderOptions {
        aliases: true,
        ..EncoderOptions::default()
    });
    let decoded = decode(&encoder.write(&graph).unwrap()).unwrap();

    let items = match &*decoded.borrow() {
        Value::Array(items) => items.clone(),
        other => panic!("expected array, got {}", other.kind()),
    };
    assert!(Rc::ptr_eq(&items[0], &items[1]));
    assert!(Rc::ptr_eq(&items[0], &items[2]));
    assert_eq!(*items[0].borrow(), Value::Text("shared".to_string()));
}

#[test]
fn hash_cycle_roundtrip() {
    let map = node(Value::Hash(Vec::new()));
    let selfref = node(Value::Ref(map.clone()));
    if let Value::Hash(pairs) = &mut *map.borrow_mut() {
        pairs.push(("me".to_string(), selfref));
    }
    let top = node(Value::Ref(map));

    let (enc, dec) = unwrapped();
    let bytes = Encoder::new(enc).write(&top).unwrap();
    let decoded = decode_with_options(&bytes, dec).unwrap();

    let container = match &*decoded.borrow() {
        Value::Ref(target) => target.clone(),
        other => panic!("expected ref, got {}", other.kind()),
    };
    let entry = match &*container.borrow() {
        Value::Hash(pairs) => {
            assert_eq!(pairs[0].0, "me");
            pairs[0].1.clone()
        }
        other => panic!("expected hash, got {}", other.kind()),
    };
    match &*entry.borrow() {
        Value::Ref(target) => assert!(Rc::ptr_eq(target, &container)),
        other => panic!("expected ref, got {}", other.kind()),
    }
}

#[test]
fn self_referential_ref_roundtrip() {
    let a = node(Value::Undef);
    *a.borrow_mut() = Value::Ref(a.clone());

    let decoded = roundtrip(&a);
    let inner = match &*decoded.borrow() {
        Value::Ref(target) => target.clone(),
        other => panic!("expected ref, got {}", other.kind()),
    };
    match &*inner.borrow() {
        Value::Ref(target) => assert!(Rc::ptr_eq(target, &inner)),
        other => panic!("expected ref, got {}", other.kind()),
    }
}

#[test]
fn mutual_cycle_roundtrip() {
    let a = node(Value::Array(Vec::new()));
    let b = node(Value::array([node(Value::Ref(a.clone()))]));
    if let Value::Array(items) = &mut *a.borrow_mut() {
        items.push(node(Value::Ref(b)));
    }
    let top = node(Value::Ref(a));

    let (enc, dec) = unwrapped();
    let bytes = Encoder::new(enc).write(&top).unwrap();
    let decoded = decode_with_options(&bytes, dec).unwrap();

    let a2 = match &*decoded.borrow() {
        Value::Ref(target) => target.clone(),
        other => panic!("expected ref, got {}", other.kind()),
    };
    let b2 = {
        let borrowed = a2.borrow();
        let first = match &*borrowed {
            Value::Array(items) => items[0].clone(),
            other => panic!("expected array, got {}", other.kind()),
        };
        let inner = match &*first.borrow() {
            Value::Ref(target) => target.clone(),
            other => panic!("expected ref, got {}", other.kind()),
        };
        inner
    };
    let back = {
        let borrowed = b2.borrow();
        match &*borrowed {
            Value::Array(items) => items[0].clone(),
            other => panic!("expected array, got {}", other.kind()),
        }
    };
    match &*back.borrow() {
        Value::Ref(target) => assert!(Rc::ptr_eq(target, &a2)),
        other => panic!("expected ref, got {}", other.kind()),
    }
}

#[test]
fn encoder_reuse_across_documents() {
    let mut encoder = Encoder::new(EncoderOptions::default());
    let first = encoder.write(&node(Value::from("one"))).unwrap();
    encoder.reset();
    let second = encoder.write(&node(Value::Integer(2))).unwrap();

    assert_eq!(*decode(&first).unwrap().borrow(), Value::Text("one".to_string()));
    assert_eq!(*decode(&second).unwrap().borrow(), Value::Integer(2));
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undef),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e12..1.0e12f64).prop_map(Value::Double),
        (-1.0e6f32..1.0e6f32).prop_map(Value::Float),
        prop::collection::vec(any::<u8>(), 0..48).prop_map(Value::Bytes),
        ".{0,24}".prop_map(Value::Text),
    ]
}

/// Acyclic trees out of scalars and containers. No reference wrappers:
/// in the default decoding mode an explicit reference to a container and
/// the container itself share one wire form, so only this subset maps
/// back to itself structurally.
fn tree_value() -> impl Strategy<Value = Value> {
    scalar_value().prop_recursive(4, 24, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone().prop_map(node), 0..5).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{0,6}", inner.prop_map(node)), 0..5)
                .prop_map(Value::Hash),
        ]
    })
}

/// Trees including explicit reference wrappers, for the unwrapped mode
/// where references keep a distinct wire form.
fn ref_tree_value() -> impl Strategy<Value = Value> {
    scalar_value().prop_recursive(4, 24, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone().prop_map(node), 0..5).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{0,6}", inner.clone().prop_map(node)), 0..5)
                .prop_map(Value::Hash),
            inner.prop_map(|v| Value::Ref(node(v))),
        ]
    })
}

proptest! {
    #[test]
    fn roundtrip_default_mode(value in tree_value()) {
        let graph = node(value);
        let decoded = decode(&encode(&graph).unwrap()).unwrap();
        prop_assert_eq!(decoded, graph);
    }

    #[test]
    fn roundtrip_unwrapped_mode(value in ref_tree_value()) {
        let graph = node(value);
        let (enc, dec) = unwrapped();
        let bytes = Encoder::new(enc).write(&graph).unwrap();
        let decoded = decode_with_options(&bytes, dec).unwrap();
        prop_assert_eq!(decoded, graph);
    }

    #[test]
    fn decoder_never_panics_on_noise(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut document = vec![0x3D, 0x73, 0x72, 0x6C, 0x01, 0x00];
        document.extend_from_slice(&body);
        // any outcome is fine as long as it is a Result
        let _ = decode(&document);
    }
}
