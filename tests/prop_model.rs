use std::collections::BTreeSet;
use std::ops::Bound;

use proptest::prelude::*;
use vast_bitmap::VastBitmap;

/// Operations mirrored against a `BTreeSet<u64>` model.
#[derive(Debug, Clone)]
enum Op {
    Insert(u64),
    Remove(u64),
    Toggle(u64),
    InsertRange(u64, u64),
    FlipRange(u64, u64),
    RunOptimize,
    Trim,
}

/// Values clustered around a few bases so containers of every form show up,
/// including ones straddling the sign boundary and the top of the space.
fn arb_value() -> impl Strategy<Value = u64> {
    let bases = prop_oneof![
        Just(0u64),
        Just(1 << 16),
        Just(1 << 32),
        Just((1 << 63) - 40_000),
        Just(u64::MAX - 200_000),
    ];
    (bases, 0u64..200_000).prop_map(|(base, off)| base.saturating_add(off))
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arb_value().prop_map(Op::Insert),
        2 => arb_value().prop_map(Op::Remove),
        1 => arb_value().prop_map(Op::Toggle),
        2 => (arb_value(), 1u64..10_000).prop_map(|(s, n)| Op::InsertRange(s, n)),
        2 => (arb_value(), 1u64..10_000).prop_map(|(s, n)| Op::FlipRange(s, n)),
        1 => Just(Op::RunOptimize),
        1 => Just(Op::Trim),
    ]
}

fn apply(ops: &[Op]) -> (VastBitmap, BTreeSet<u64>) {
    let mut bitmap = VastBitmap::new();
    let mut model = BTreeSet::new();
    for op in ops {
        match *op {
            Op::Insert(v) => {
                assert_eq!(bitmap.insert(v), model.insert(v));
            }
            Op::Remove(v) => {
                assert_eq!(bitmap.remove(v), model.remove(&v));
            }
            Op::Toggle(v) => {
                bitmap.toggle(v);
                if !model.remove(&v) {
                    model.insert(v);
                }
            }
            Op::InsertRange(start, n) => {
                let end = start.saturating_add(n);
                if end > start {
                    bitmap.insert_range(start, end).unwrap();
                    model.extend(start..end);
                }
            }
            Op::FlipRange(start, n) => {
                let end = start.saturating_add(n);
                if end > start {
                    bitmap.flip_range(start, end).unwrap();
                    for v in start..end {
                        if !model.remove(&v) {
                            model.insert(v);
                        }
                    }
                }
            }
            Op::RunOptimize => {
                bitmap.run_optimize();
            }
            Op::Trim => bitmap.trim(),
        }
    }
    (bitmap, model)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matches_model(ops in prop::collection::vec(arb_op(), 1..24)) {
        let (bitmap, model) = apply(&ops);

        prop_assert_eq!(bitmap.len(), model.len() as u64);
        prop_assert_eq!(bitmap.is_empty(), model.is_empty());
        prop_assert_eq!(bitmap.min(), model.first().copied());
        prop_assert_eq!(bitmap.max(), model.last().copied());

        let forward: Vec<u64> = bitmap.iter().collect();
        let expected: Vec<u64> = model.iter().copied().collect();
        prop_assert_eq!(&forward, &expected);

        let mut backward: Vec<u64> = bitmap.rev_iter().collect();
        backward.reverse();
        prop_assert_eq!(&backward, &expected);
    }

    #[test]
    fn membership_agrees(ops in prop::collection::vec(arb_op(), 1..16), probes in prop::collection::vec(arb_value(), 8)) {
        let (bitmap, model) = apply(&ops);
        for v in probes {
            prop_assert_eq!(bitmap.contains(v), model.contains(&v));
            prop_assert_eq!(bitmap.rank(v), model.range(..=v).count() as u64);
        }
    }

    #[test]
    fn rank_select_laws(ops in prop::collection::vec(arb_op(), 1..16)) {
        let (bitmap, model) = apply(&ops);
        let n = bitmap.len();
        prop_assert_eq!(n, model.len() as u64);

        // Sample across the index space rather than walking everything.
        let step = (n / 50).max(1);
        let mut k = 0;
        while k < n {
            let v = bitmap.select(k).unwrap();
            prop_assert_eq!(bitmap.rank(v), k + 1);
            prop_assert!(model.contains(&v));
            k += step;
        }
        prop_assert!(bitmap.select(n).is_err());
    }

    #[test]
    fn seek_matches_model(ops in prop::collection::vec(arb_op(), 1..16), probe in arb_value()) {
        let (bitmap, model) = apply(&ops);

        let mut iter = bitmap.iter();
        iter.seek(probe);
        prop_assert_eq!(iter.peek(), model.range(probe..).next().copied());

        let mut rev = bitmap.rev_iter();
        rev.seek(probe);
        prop_assert_eq!(rev.peek(), model.range(..=probe).next_back().copied());

        let from: Vec<u64> = bitmap.iter_from(probe).take(5).collect();
        let expected: Vec<u64> = model.range(probe..).take(5).copied().collect();
        prop_assert_eq!(from, expected);
    }

    #[test]
    fn serialization_round_trips(ops in prop::collection::vec(arb_op(), 1..16)) {
        let (bitmap, _) = apply(&ops);
        let back = VastBitmap::from_bytes(&bitmap.to_bytes()).unwrap();
        prop_assert_eq!(&back, &bitmap);
        // Optimized forms round-trip too.
        let mut optimized = bitmap.clone();
        optimized.run_optimize();
        let back = VastBitmap::from_bytes(&optimized.to_bytes()).unwrap();
        prop_assert_eq!(&back, &bitmap);
    }

    #[test]
    fn algebra_laws(
        a_ops in prop::collection::vec(arb_op(), 1..12),
        b_ops in prop::collection::vec(arb_op(), 1..12),
    ) {
        let (a, ma) = apply(&a_ops);
        let (b, mb) = apply(&b_ops);

        let union = a.union(&b);
        let inter = a.intersection(&b);
        let diff = a.difference(&b);
        let xor = a.symmetric_difference(&b);

        prop_assert_eq!(union.to_vec(), ma.union(&mb).copied().collect::<Vec<_>>());
        prop_assert_eq!(inter.to_vec(), ma.intersection(&mb).copied().collect::<Vec<_>>());
        prop_assert_eq!(diff.to_vec(), ma.difference(&mb).copied().collect::<Vec<_>>());
        prop_assert_eq!(xor.to_vec(), ma.symmetric_difference(&mb).copied().collect::<Vec<_>>());

        prop_assert!(a.symmetric_difference(&a).is_empty());
        prop_assert!(a.difference(&a).is_empty());
        prop_assert_eq!(a.union(&a), a.clone());
        prop_assert_eq!(a.intersection(&a), a.clone());
        prop_assert!(inter.is_subset(&a) && inter.is_subset(&b));
        prop_assert!(a.is_subset(&union) && b.is_subset(&union));
        prop_assert!(diff.is_disjoint(&b));
    }

    #[test]
    fn flip_twice_is_identity(ops in prop::collection::vec(arb_op(), 1..12), start in arb_value(), n in 1u64..5_000) {
        let (mut bitmap, _) = apply(&ops);
        let end = start.saturating_add(n);
        prop_assume!(end > start);
        let snapshot = bitmap.clone();
        bitmap.flip_range(start, end).unwrap();
        bitmap.flip_range(start, end).unwrap();
        prop_assert_eq!(bitmap, snapshot);
    }

    #[test]
    fn for_all_in_range_partitions_the_window(
        ops in prop::collection::vec(arb_op(), 1..12),
        start in arb_value(),
        len in 1u64..50_000,
    ) {
        use vast_bitmap::RangeVisitor;

        struct Check {
            cursor: u64,
            start: u64,
            present: Vec<u64>,
            last_was_absent: bool,
        }
        impl RangeVisitor for Check {
            fn present(&mut self, offset: u64, value: u64) {
                assert_eq!(offset, self.cursor, "present out of sequence");
                assert_eq!(self.start + offset, value);
                self.cursor += 1;
                self.present.push(value);
                self.last_was_absent = false;
            }
            fn absent(&mut self, from: u64, to: u64) {
                assert_eq!(from, self.cursor, "absent out of sequence");
                assert!(to > from, "empty absent span");
                assert!(!self.last_was_absent, "adjacent absent spans not coalesced");
                self.cursor = to;
                self.last_was_absent = true;
            }
        }

        let (bitmap, model) = apply(&ops);
        prop_assume!(start.checked_add(len).is_some());
        let end = start + len;

        let mut check = Check { cursor: 0, start, present: Vec::new(), last_was_absent: false };
        bitmap.for_all_in_range(start, len, &mut check).unwrap();

        // The callbacks tile [0, len) exactly, and the present values are
        // precisely the model's slice of the window.
        prop_assert_eq!(check.cursor, len);
        let expected: Vec<u64> = model
            .range((Bound::Included(start), Bound::Excluded(end)))
            .copied()
            .collect();
        prop_assert_eq!(check.present, expected);
    }
}
