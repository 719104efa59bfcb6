//! # Property-Based Tests
//!
//! Codec reversibility and count invariants under arbitrary inputs.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use trixel_tags_core::{MemoryStore, TagEngine, TagError, codec};

#[derive(Debug, Clone)]
enum Op {
    Associate(String, String),
    Dissociate(String, String),
}

fn op() -> impl Strategy<Value = Op> {
    let id = prop::sample::select(vec!["1", "2", "10", "42"]).prop_map(String::from);
    let tag = prop::sample::select(vec!["red", "blue", "a\"b", "", "new\nline"])
        .prop_map(String::from);
    (any::<bool>(), id, tag).prop_map(|(add, id, tag)| {
        if add {
            Op::Associate(id, tag)
        } else {
            Op::Dissociate(id, tag)
        }
    })
}

proptest! {
    /// Any tag survives the forward key round trip.
    #[test]
    fn forward_key_round_trip(id in "[0-9]{1,8}", tag in any::<String>()) {
        let key = codec::encode_forward(&id, &tag);
        prop_assert_eq!(codec::decode_forward_suffix(&key, id.len()).expect("decode"), tag.clone());
        prop_assert_eq!(codec::split_forward(&key).expect("split"), (id, tag));
    }

    /// Any tag survives the reverse key round trip.
    #[test]
    fn reverse_key_round_trip(id in "[0-9]{1,8}", tag in any::<String>()) {
        let key = codec::encode_reverse(&id, &tag);
        let quoted_len = codec::quote(&tag).len();
        prop_assert_eq!(codec::decode_reverse_prefix(&key, quoted_len).expect("decode"), id.clone());
        prop_assert_eq!(codec::split_reverse(&key).expect("split"), (id, tag));
    }

    /// Distinct pairs never share a key.
    #[test]
    fn keys_are_injective(
        a in ("[0-9]{1,4}", ".{0,6}"),
        b in ("[0-9]{1,4}", ".{0,6}"),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(codec::encode_forward(&a.0, &a.1), codec::encode_forward(&b.0, &b.1));
        prop_assert_ne!(codec::encode_reverse(&a.0, &a.1), codec::encode_reverse(&b.0, &b.1));
    }

    /// Quoted tags never contain a raw newline or an unescaped delimiter.
    #[test]
    fn quoted_form_is_self_delimiting(tag in any::<String>()) {
        let quoted = codec::quote(&tag);
        prop_assert!(!quoted.contains('\n'));
        let bytes = quoted.as_bytes();
        let mut i = 1;
        while i < bytes.len() - 1 {
            prop_assert_ne!(bytes[i], b'"');
            i += if bytes[i] == b'\\' { 2 } else { 1 };
        }
        prop_assert_eq!(i, bytes.len() - 1);
    }

    /// After any operation sequence the engine matches a set model.
    #[test]
    fn engine_matches_set_model(ops in vec(op(), 1..40)) {
        let engine = TagEngine::new(MemoryStore::new());
        let mut model: BTreeSet<(String, String)> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Associate(id, tag) => {
                    engine.associate(&id, &tag).expect("associate");
                    model.insert((id, tag));
                }
                Op::Dissociate(id, tag) => {
                    let counted = model.iter().any(|(_, t)| *t == tag);
                    match engine.dissociate(&id, &tag) {
                        Ok(()) => {
                            prop_assert!(counted);
                            model.remove(&(id, tag));
                        }
                        Err(TagError::MissingCount(missing)) => {
                            prop_assert!(!counted);
                            prop_assert_eq!(missing, tag);
                        }
                        Err(e) => prop_assert!(false, "unexpected error: {}", e),
                    }
                }
            }
        }

        let mut per_tag: BTreeMap<Vec<u8>, (String, u32)> = BTreeMap::new();
        for (_, tag) in &model {
            per_tag.entry(tag.as_bytes().to_vec()).or_insert((tag.clone(), 0)).1 += 1;
        }

        let expected_tags: Vec<String> = per_tag.values().map(|(t, _)| t.clone()).collect();
        prop_assert_eq!(engine.all_tags().expect("all tags"), expected_tags);
        for (tag, count) in per_tag.values() {
            prop_assert_eq!(engine.count_of(tag).expect("count"), Some(*count));
            let ids = engine.ids_of(tag).expect("ids");
            prop_assert_eq!(ids.len() as u32, *count);
        }
        for (id, tag) in &model {
            prop_assert!(engine.tags_of(id).expect("tags").contains(tag));
        }
        prop_assert!(engine.verify().expect("verify").is_consistent());
    }
}
