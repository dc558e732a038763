//! Quantified invariants from the data-model write-up, checked with `quickcheck` over random
//! shapes and `approx` for the floating-point tolerances that rebin/transpose arithmetic need.

use approx::assert_abs_diff_eq;
use itertools::Itertools;
use quickcheck::{quickcheck, TestResult};

use labeled_nd::dimensions::Label::{self, *};
use labeled_nd::tag::{CoordTag, DataTag, Tag};
use labeled_nd::variable::StorageKind;
use labeled_nd::{Dimensions, Variable};

fn value(dims: Dimensions, data: Vec<f64>) -> Variable {
    Variable::new(Tag::Data(DataTag::Value), dims, StorageKind::F64(data)).unwrap()
}

fn small_dims(extents: (u8, u8, u8)) -> Dimensions {
    let labels: [Label; 3] = [Z, Y, X];
    let extents = [extents.0 as usize % 4, extents.1 as usize % 4, extents.2 as usize % 4];
    let mut dims = Dimensions::new();
    for (&label, &extent) in labels.iter().zip(extents.iter()) {
        dims.add(label, extent).unwrap();
    }
    dims
}

#[test]
fn size_equals_volume() {
    fn prop(extents: (u8, u8, u8)) -> bool {
        let dims = small_dims(extents);
        let data = vec![0.0f64; dims.volume()];
        let v = value(dims, data);
        v.size() == v.dimensions().volume()
    }
    quickcheck(prop as fn((u8, u8, u8)) -> bool);
}

#[test]
fn cow_isolation_holds_after_mutation() {
    fn prop(extents: (u8, u8, u8)) -> TestResult {
        let dims = small_dims(extents);
        if dims.volume() == 0 {
            return TestResult::discard();
        }
        let data: Vec<f64> = (0..dims.volume()).map(|i| i as f64).collect();
        let original = value(dims, data.clone());
        let mut w = original.clone();
        if let StorageKind::F64(buf) = w.make_unique() {
            buf[0] += 1.0;
        }
        let unchanged = match original.storage() {
            StorageKind::F64(buf) => *buf == data,
            _ => false,
        };
        TestResult::from_bool(unchanged && !original.shares_storage_with(&w))
    }
    quickcheck(prop as fn((u8, u8, u8)) -> TestResult);
}

#[test]
fn reshape_is_value_preserving() {
    fn prop(extents: (u8, u8, u8)) -> TestResult {
        let dims = small_dims(extents);
        if dims.volume() == 0 || dims.ndim() == 0 {
            return TestResult::discard();
        }
        let data: Vec<f64> = (0..dims.volume()).map(|i| i as f64).collect();
        let v = value(dims, data.clone());
        let flat = Dimensions::from_pairs(&[(Row, dims.volume())]).unwrap();
        let reshaped = v.reshape(flat).unwrap();
        let matches = match reshaped.storage() {
            StorageKind::F64(buf) => *buf == data,
            _ => false,
        };
        TestResult::from_bool(matches)
    }
    quickcheck(prop as fn((u8, u8, u8)) -> TestResult);
}

#[test]
fn transpose_correctness() {
    let a_dims = Dimensions::from_pairs(&[(Y, 3), (X, 2)]).unwrap();
    let b_dims = Dimensions::from_pairs(&[(X, 2), (Y, 3)]).unwrap();
    let a = value(a_dims, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let transposed = value(b_dims, vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);

    let sum = a.add(&transposed).unwrap();
    let doubled_dims = Dimensions::from_pairs(&[(Y, 3), (X, 2)]).unwrap();
    let scalar_two = value(Dimensions::new(), vec![2.0]);
    let mut doubled = value(doubled_dims, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    doubled.mul_assign(&scalar_two).unwrap();

    match (sum.storage(), doubled.storage()) {
        (StorageKind::F64(lhs), StorageKind::F64(rhs)) => {
            for (l, r) in lhs.iter().zip(rhs) {
                assert_abs_diff_eq!(l, r, epsilon = 1e-12);
            }
        }
        _ => unreachable!(),
    }
}

#[test]
fn rebin_conserves_total_when_new_edges_cover_old() {
    let v = value(Dimensions::from_pairs(&[(X, 4)]).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    let old_edges = Variable::new(
        Tag::Coord(CoordTag::X),
        Dimensions::from_pairs(&[(X, 5)]).unwrap(),
        StorageKind::F64(vec![0.0, 1.0, 2.0, 3.0, 4.0]),
    )
    .unwrap();
    let new_edges = Variable::new(
        Tag::Coord(CoordTag::X),
        Dimensions::from_pairs(&[(X, 3)]).unwrap(),
        StorageKind::F64(vec![0.0, 2.0, 4.0]),
    )
    .unwrap();

    let rebinned = labeled_nd::variable::rebin(&v, X, &old_edges, &new_edges).unwrap();
    let original_total: f64 = match v.storage() {
        StorageKind::F64(d) => d.iter().sum(),
        _ => unreachable!(),
    };
    let rebinned_total: f64 = match rebinned.storage() {
        StorageKind::F64(d) => d.iter().sum(),
        _ => unreachable!(),
    };
    assert_abs_diff_eq!(original_total, rebinned_total, epsilon = 1e-9);
}

#[test]
fn self_op_safety_subtracting_a_slice_of_self() {
    let dims = Dimensions::from_pairs(&[(Y, 2), (X, 3)]).unwrap();
    let mut v = value(dims, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let row0 = v.slice(Y, 0).unwrap().to_owned().unwrap();
    v.sub_assign(&row0).unwrap();
    match v.storage() {
        StorageKind::F64(d) => assert_eq!(d, &[0.0, 0.0, 0.0, 3.0, 3.0, 3.0]),
        _ => unreachable!(),
    }
}

#[test]
fn sorting_a_dataset_produces_a_monotonic_coord() {
    use labeled_nd::Dataset;

    let mut ds = Dataset::new();
    ds.insert(Variable::new(
        Tag::Coord(CoordTag::X),
        Dimensions::from_pairs(&[(X, 5)]).unwrap(),
        StorageKind::F64(vec![4.0, 1.0, 3.0, 0.0, 2.0]),
    )
    .unwrap())
    .unwrap();

    let sorted = ds.sort(Tag::Coord(CoordTag::X), "").unwrap();
    let edges = match sorted.get(Tag::Coord(CoordTag::X), "").unwrap().storage() {
        StorageKind::F64(d) => d.clone(),
        _ => unreachable!(),
    };
    assert!(edges.iter().tuple_windows().all(|(a, b)| a <= b));
}
