//! End-to-end scenarios transcribed from the concrete examples in the data-model write-up:
//! slicing a 3-D volume, broadcast/transposed arithmetic, rebin, dataset sort, and
//! `MDZipView` bin-edge co-iteration.

use labeled_nd::dimensions::Label::*;
use labeled_nd::tag::{CoordTag, DataTag, Tag};
use labeled_nd::variable::StorageKind;
use labeled_nd::{Dataset, Dimensions, Handle, MDZipView, Variable};

fn value(dims: Dimensions, data: Vec<f64>) -> Variable {
    Variable::new(Tag::Data(DataTag::Value), dims, StorageKind::F64(data)).unwrap()
}

fn coord(tag: CoordTag, dims: Dimensions, data: Vec<f64>) -> Variable {
    Variable::new(Tag::Coord(tag), dims, StorageKind::F64(data)).unwrap()
}

#[test]
fn slice_3x2x4_volume() {
    let dims = Dimensions::from_pairs(&[(Z, 3), (Y, 2), (X, 4)]).unwrap();
    let v = value(dims, (1..=24).map(|i| i as f64).collect());

    let x1 = v.slice(X, 1).unwrap().to_owned().unwrap();
    assert_eq!(x1.dimensions().labels(), &[Z, Y]);
    match x1.storage() {
        StorageKind::F64(d) => assert_eq!(d, &[2.0, 6.0, 10.0, 14.0, 18.0, 22.0]),
        _ => unreachable!(),
    }

    let y0 = v.slice(Y, 0).unwrap().to_owned().unwrap();
    match y0.storage() {
        StorageKind::F64(d) => {
            assert_eq!(d, &[1.0, 2.0, 3.0, 4.0, 9.0, 10.0, 11.0, 12.0, 17.0, 18.0, 19.0, 20.0])
        }
        _ => unreachable!(),
    }

    let z2 = v.slice(Z, 2).unwrap().to_owned().unwrap();
    match z2.storage() {
        StorageKind::F64(d) => assert_eq!(d, &[17.0, 18.0, 19.0, 20.0, 21.0, 22.0, 23.0, 24.0]),
        _ => unreachable!(),
    }
}

#[test]
fn broadcast_add() {
    let mut a = value(Dimensions::from_pairs(&[(X, 2)]).unwrap(), vec![1.1, 2.2]);
    let b = value(Dimensions::new(), vec![1.0]);
    a.add_assign(&b).unwrap();
    match a.storage() {
        StorageKind::F64(d) => {
            assert!((d[0] - 2.1).abs() < 1e-9);
            assert!((d[1] - 3.2).abs() < 1e-9);
        }
        _ => unreachable!(),
    }
}

#[test]
fn transposed_add() {
    let mut a = value(Dimensions::from_pairs(&[(Y, 3), (X, 2)]).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let b = value(Dimensions::from_pairs(&[(X, 2), (Y, 3)]).unwrap(), vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
    a.add_assign(&b).unwrap();
    match a.storage() {
        StorageKind::F64(d) => assert_eq!(d, &[2.0, 4.0, 6.0, 8.0, 10.0, 12.0]),
        _ => unreachable!(),
    }
}

#[test]
fn rebin_sum() {
    let v = value(Dimensions::from_pairs(&[(X, 2)]).unwrap(), vec![1.0, 2.0]);
    let old_edges = coord(CoordTag::X, Dimensions::from_pairs(&[(X, 3)]).unwrap(), vec![1.0, 2.0, 3.0]);
    let new_edges = coord(CoordTag::X, Dimensions::from_pairs(&[(X, 2)]).unwrap(), vec![1.0, 3.0]);
    let out = labeled_nd::variable::rebin(&v, X, &old_edges, &new_edges).unwrap();
    assert_eq!(out.dimensions().extent_at(X).unwrap(), 1);
    match out.storage() {
        StorageKind::F64(d) => assert!((d[0] - 3.0).abs() < 1e-9),
        _ => unreachable!(),
    }
}

#[test]
fn sort_dataset_by_coord() {
    let mut ds = Dataset::new();
    ds.insert(coord(CoordTag::X, Dimensions::from_pairs(&[(X, 4)]).unwrap(), vec![5.0, 1.0, 3.0, 0.0]))
        .unwrap();
    ds.insert(
        value(Dimensions::from_pairs(&[(X, 4)]).unwrap(), vec![1.0, 2.0, 3.0, 4.0]).with_name("signal"),
    )
    .unwrap();

    let sorted = ds.sort(Tag::Coord(CoordTag::X), "").unwrap();
    match sorted.get(Tag::Coord(CoordTag::X), "").unwrap().storage() {
        StorageKind::F64(d) => assert_eq!(d, &[0.0, 1.0, 3.0, 5.0]),
        _ => unreachable!(),
    }
    match sorted.get(Tag::Data(DataTag::Value), "signal").unwrap().storage() {
        StorageKind::F64(d) => assert_eq!(d, &[4.0, 2.0, 3.0, 1.0]),
        _ => unreachable!(),
    }
}

#[test]
fn mdzipview_with_bin_edges() {
    let mut ds = Dataset::new();
    ds.insert_edge(
        coord(CoordTag::Tof, Dimensions::from_pairs(&[(Tof, 3)]).unwrap(), vec![10.0, 20.0, 30.0]),
        Tof,
    )
    .unwrap();
    ds.insert(
        value(Dimensions::from_pairs(&[(Tof, 2), (Spectrum, 4)]).unwrap(), (1..=8).map(|i| i as f64).collect())
            .with_name("signal"),
    )
    .unwrap();

    let view = MDZipView::new(
        &ds,
        &[Handle::Bin(Tag::Coord(CoordTag::Tof)), Handle::Value(Tag::Data(DataTag::Value), "signal")],
        &[],
    )
    .unwrap();

    let mut pairs = Vec::new();
    let mut values = Vec::new();
    for item in view.iter() {
        match (&item[0], &item[1]) {
            (labeled_nd::mdzipview::Item::Bin(l, r), labeled_nd::mdzipview::Item::Value(v)) => {
                pairs.push((*l, *r));
                values.push(*v);
            }
            _ => unreachable!(),
        }
    }
    assert_eq!(
        pairs,
        vec![(10.0, 20.0), (10.0, 20.0), (10.0, 20.0), (10.0, 20.0), (20.0, 30.0), (20.0, 30.0), (20.0, 30.0), (20.0, 30.0)]
    );
    assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
}

#[test]
fn md_zip_reads_value_and_std_dev_together() {
    let mut ds = Dataset::new();
    ds.insert(value(Dimensions::from_pairs(&[(X, 3)]).unwrap(), vec![1.0, 2.0, 3.0]).with_name("signal"))
        .unwrap();
    ds.insert(
        Variable::new(
            Tag::Data(DataTag::Variance),
            Dimensions::from_pairs(&[(X, 3)]).unwrap(),
            StorageKind::F64(vec![1.0, 4.0, 9.0]),
        )
        .unwrap()
        .with_name("signal"),
    )
    .unwrap();

    let handles = [Handle::Value(Tag::Data(DataTag::Value), "signal"), Handle::StdDev("signal")];
    let mut values = Vec::new();
    let mut std_devs = Vec::new();
    for item in labeled_nd::md_zip(&ds, &handles).unwrap() {
        match (&item[0], &item[1]) {
            (labeled_nd::mdzipview::Item::Value(v), labeled_nd::mdzipview::Item::StdDev(s)) => {
                values.push(*v);
                std_devs.push(*s);
            }
            _ => unreachable!(),
        }
    }
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
    assert_eq!(std_devs, vec![1.0, 2.0, 3.0]);
}
