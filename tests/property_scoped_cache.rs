use proptest::prelude::*;
use scoped_memo::{Scope, ScopeResolver, ScopedCache};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    GetOrCompute { name: usize, value: i64 },
    Set { name: usize, value: i64 },
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..4, any::<i64>()).prop_map(|(name, value)| Op::GetOrCompute { name, value }),
        2 => (0usize..4, any::<i64>()).prop_map(|(name, value)| Op::Set { name, value }),
        1 => Just(Op::Clear),
    ]
}

/// Mixed-case spelling of the `index`-th name, varied by `salt`.
fn spelled(index: usize, salt: usize) -> String {
    let base = format!("caller{index}");
    base.chars()
        .enumerate()
        .map(|(i, c)| if (i + salt) % 2 == 0 { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    /// Property: a sequence of operations behaves like a case-folded map
    ///
    /// `get_or_compute` returns the stored value when present and stores the
    /// computed one otherwise; `set` overwrites; `clear` empties.
    #[test]
    fn prop_cache_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let cache = ScopedCache::new("model");
        let mut model: HashMap<usize, i64> = HashMap::new();

        for (step, op) in ops.into_iter().enumerate() {
            match op {
                Op::GetOrCompute { name, value } => {
                    let got = cache.get_or_compute(&spelled(name, step), || value).unwrap();
                    let expected = *model.entry(name).or_insert(value);
                    prop_assert_eq!(got, expected);
                }
                Op::Set { name, value } => {
                    cache.set(&spelled(name, step), value).unwrap();
                    model.insert(name, value);
                }
                Op::Clear => {
                    cache.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(cache.len(), model.len());
        }
    }

    /// Property: keyed maps never leak between keys
    #[test]
    fn prop_keyed_values_are_independent(
        entries in prop::collection::hash_map(any::<u16>(), any::<u32>(), 1..30)
    ) {
        let cache = ScopedCache::new("keyed");
        for (&key, &value) in &entries {
            cache.set_keyed("Table", key, value).unwrap();
        }

        prop_assert_eq!(cache.len(), 1);
        for (&key, &value) in &entries {
            let got = cache.get_or_compute_keyed("table", key, || value.wrapping_add(1)).unwrap();
            prop_assert_eq!(got, value);
        }
    }

    /// Property: process-wide values are partitioned by owner token
    #[test]
    fn prop_process_wide_partitions_by_owner(
        owners in prop::collection::hash_set("[a-z]{1,8}", 1..6),
        value in any::<u64>(),
    ) {
        let shared = Arc::new(ScopedCache::default());
        let resolvers: Vec<(String, ScopeResolver)> = owners
            .iter()
            .map(|owner| {
                let resolver = ScopeResolver::builder(owner.as_str())
                    .process_wide(Arc::clone(&shared))
                    .build();
                (owner.clone(), resolver)
            })
            .collect();

        let (writer_owner, writer) = &resolvers[0];
        writer.set(Scope::ProcessWide, "Shared", value).unwrap();

        for (owner, resolver) in &resolvers {
            let seen = resolver.get::<u64>(Scope::ProcessWide, "Shared").unwrap();
            if owner == writer_owner {
                prop_assert_eq!(seen, Some(value));
            } else {
                prop_assert_eq!(seen, None);
            }
        }
        prop_assert_eq!(shared.len(), 1);
    }
}
