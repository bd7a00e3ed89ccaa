use std::collections::BTreeSet;

use vast_bitmap::VastBitmap;

fn dense() -> VastBitmap {
    let mut bitmap = VastBitmap::new();
    bitmap.insert_range(0, 10_000).unwrap();
    bitmap.insert_range(1 << 40, (1 << 40) + 5_000).unwrap();
    bitmap
}

fn sparse() -> VastBitmap {
    let mut bitmap = VastBitmap::of(&[1, 9_999, 10_000, 1 << 40, u64::MAX]);
    bitmap.insert_range(2_000, 2_100).unwrap();
    bitmap
}

fn runs() -> VastBitmap {
    let mut bitmap = VastBitmap::new();
    bitmap.insert_range(5_000, 6_000).unwrap();
    bitmap.insert_range((1 << 40) + 100, (1 << 40) + 200).unwrap();
    assert!(bitmap.run_optimize());
    bitmap
}

fn model(bitmap: &VastBitmap) -> BTreeSet<u64> {
    bitmap.iter().collect()
}

#[test]
fn test_algebra_matches_model_across_forms() {
    let shapes = [dense(), sparse(), runs()];
    for a in &shapes {
        for b in &shapes {
            let sa = model(a);
            let sb = model(b);

            let union = a.union(b);
            assert_eq!(model(&union), sa.union(&sb).copied().collect());

            let inter = a.intersection(b);
            assert_eq!(model(&inter), sa.intersection(&sb).copied().collect());

            let xor = a.symmetric_difference(b);
            assert_eq!(model(&xor), sa.symmetric_difference(&sb).copied().collect());

            let diff = a.difference(b);
            assert_eq!(model(&diff), sa.difference(&sb).copied().collect());

            // Laws tying the four together.
            assert_eq!(union.len(), inter.len() + xor.len());
            assert_eq!(model(&xor.union(&inter)), model(&union));
            assert_eq!(diff.len() + inter.len(), a.len());
        }
    }
}

#[test]
fn test_in_place_variants_match_copying() {
    let pairs = [(dense(), sparse()), (sparse(), runs()), (runs(), dense())];
    for (a, b) in pairs {
        let mut x = a.clone();
        x.union_with(&b);
        assert_eq!(x, a.union(&b));

        let mut x = a.clone();
        x.intersection_with(&b);
        assert_eq!(x, a.intersection(&b));

        let mut x = a.clone();
        x.difference_with(&b);
        assert_eq!(x, a.difference(&b));

        let mut x = a.clone();
        x.symmetric_difference_with(&b);
        assert_eq!(x, a.symmetric_difference(&b));
    }
}

#[test]
fn test_self_algebra() {
    let bitmap = VastBitmap::of(&[1, 2, 3]);
    assert_eq!(bitmap.union(&bitmap), bitmap);
    assert_eq!(bitmap.intersection(&bitmap), bitmap);
    assert!(bitmap.symmetric_difference(&bitmap).is_empty());
    assert!(bitmap.difference(&bitmap).is_empty());
    assert_eq!(bitmap.symmetric_difference(&bitmap).len(), 0);
}

#[test]
fn test_union_idempotent() {
    let mut a = dense();
    let b = sparse();
    a.union_with(&b);
    let once = a.clone();
    a.union_with(&b);
    assert_eq!(a, once);
}

#[test]
fn test_empty_identities() {
    let empty = VastBitmap::new();
    let a = sparse();

    assert_eq!(a.union(&empty), a);
    assert_eq!(empty.union(&a), a);
    assert!(a.intersection(&empty).is_empty());
    assert_eq!(a.difference(&empty), a);
    assert_eq!(a.symmetric_difference(&empty), a);
    assert!(empty.is_subset(&a));
    assert!(empty.is_disjoint(&a));
}

#[test]
fn test_operators_delegate() {
    let a = sparse();
    let b = runs();

    assert_eq!(&a | &b, a.union(&b));
    assert_eq!(&a & &b, a.intersection(&b));
    assert_eq!(&a ^ &b, a.symmetric_difference(&b));
    assert_eq!(&a - &b, a.difference(&b));

    let mut x = a.clone();
    x |= &b;
    assert_eq!(x, a.union(&b));
    let mut x = a.clone();
    x &= &b;
    assert_eq!(x, a.intersection(&b));
    let mut x = a.clone();
    x ^= &b;
    assert_eq!(x, a.symmetric_difference(&b));
    let mut x = a.clone();
    x -= &b;
    assert_eq!(x, a.difference(&b));
}

#[test]
fn test_subset_superset_disjoint() {
    let a = VastBitmap::of(&[1, 5, 1 << 40]);
    let mut b = a.clone();
    b.insert(77);
    assert!(a.is_subset(&b));
    assert!(!b.is_subset(&a));
    assert!(b.is_superset(&a));
    assert!(a.is_subset(&a));

    let c = VastBitmap::of(&[2, 6, (1 << 40) + 1]);
    assert!(a.is_disjoint(&c));
    assert!(!a.is_disjoint(&b));

    // Dense versus its carved-out half.
    let big = dense();
    let mut half = big.clone();
    half.difference_with(&VastBitmap::of(&[0, 17, 9_999]));
    assert!(half.is_subset(&big));
    assert!(!big.is_subset(&half));
}

#[test]
fn test_intersection_drops_empty_containers() {
    let mut a = VastBitmap::new();
    a.insert_range(0, 100).unwrap();
    a.insert_range(1 << 20, (1 << 20) + 100).unwrap();
    let b = VastBitmap::of(&[50]);

    a.intersection_with(&b);
    assert_eq!(a.to_vec(), vec![50]);

    // Differencing everything away leaves a genuinely empty bitmap.
    let mut c = b.clone();
    c.difference_with(&b);
    assert!(c.is_empty());
    assert_eq!(c, VastBitmap::new());
}

#[test]
fn test_xor_twice_restores() {
    let a = dense();
    let b = sparse();
    let mut x = a.clone();
    x.symmetric_difference_with(&b);
    x.symmetric_difference_with(&b);
    assert_eq!(x, a);
}
