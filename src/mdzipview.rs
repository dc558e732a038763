// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `MDZipView`: zero-copy multi-variable co-iteration over a `Dataset` (§4.8).
//!
//! A handle names a `(Tag, name)` pair to read; a `Bin` handle additionally marks that name
//! as an edge coord, yielding `(left, right)` pairs instead of single values. `StdDev` and
//! `Position` are derived, read-only handles computed from stored data rather than read
//! directly. A `Nested` handle embeds an inner co-iteration whose dimensions the outer
//! iteration holds fixed. Co-iteration uses [`MultiIndex`] exactly as `Variable` arithmetic
//! does — broadcasting a handle whose dimension set is a subset of the iteration space
//! requires no special case.
//!
//! `ValueMut` is the one write-capable handle (§4.8 point 3): it resolves through
//! `Variable::make_unique` and must match the iteration space exactly rather than broadcast
//! into it, since a write target visited more than once per step would be ambiguous. Built
//! via [`MDZipView::new_mut`]/[`md_zip_mut`], which takes the dataset mutably and resolves
//! every handle's backing entry through `Dataset::get_many_mut` in one pass.

use std::cell::Cell;

use crate::dataset::Dataset;
use crate::dimensions::{Dimensions, Label};
use crate::error::{DatasetError, DimensionError, Error, TypeError};
use crate::multi_index::MultiIndex;
use crate::tag::{CoordTag, DataTag, Tag};
use crate::variable::{StorageKind, Variable};

/// One participant of an `MDZipView`: a plain value, a dimension coord accessed through its
/// bin edges (§4.8 point 4), a derived getter (§4.8 point 5), a nested sub-view (§4.8 point
/// 6), or a write target.
#[derive(Clone, Debug)]
pub enum Handle<'n> {
    Value(Tag, &'n str),
    /// Like [`Handle::Value`], but resolved for writing (§4.8 point 3); only valid with
    /// [`MDZipView::new_mut`]/[`md_zip_mut`].
    ValueMut(Tag, &'n str),
    Bin(Tag),
    /// `sqrt(variance)` on read, for the `Data::Variance` entry named `name`.
    StdDev(&'n str),
    /// Detector positions averaged per spectrum via `Coord::DetectorGrouping`.
    Position,
    /// An inner co-iteration sharing this view's data; its dimensions must be listed in the
    /// outer `fixed` set so the outer iteration does not also try to traverse them.
    Nested(Vec<Handle<'n>>),
}

#[derive(Copy, Clone)]
enum ResolvedKind<'a> {
    Value { data: &'a [f64] },
    /// Aliased through `Cell` rather than `&mut [f64]` so several disjoint write handles can
    /// sit in the same flat `Vec<Resolved<'a>>` without each claiming an exclusive borrow of
    /// it — writes still land in the dataset's own storage, just through shared cells.
    ValueMut { data: &'a [Cell<f64>] },
    Bin { data: &'a [f64], stride: usize },
    StdDev { variance: &'a [f64] },
    Position { positions: &'a [[f64; 3]], grouping: &'a [Dataset] },
}

#[derive(Clone)]
struct Resolved<'a> {
    kind: ResolvedKind<'a>,
    /// The handle's own storage-backed `Dimensions` (pre-bin-adjustment, pre-fixed-erasure),
    /// used to look up its stride for each iteration-space label — `MultiIndex` matches by
    /// label, not position, so this is what makes broadcasting and bin-edge striding correct.
    own_dims: Dimensions,
}

#[derive(Clone)]
enum TopSlot {
    Single(usize),
    Nested { slots: Vec<usize>, inner_dims: Dimensions },
}

/// A read-only cursor co-iterating several `Dataset` entries (§4.8).
#[derive(Clone)]
pub struct MDZipView<'a> {
    dims: Dimensions,
    flat: Vec<Resolved<'a>>,
    layout: Vec<TopSlot>,
}

/// One step's worth of values, in handle order.
pub enum Item<'a> {
    Value(f64),
    /// The current value plus a setter writing back into the underlying `Dataset` storage at
    /// this step's position.
    ValueMut(ValueMutItem<'a>),
    Bin(f64, f64),
    StdDev(f64),
    Position([f64; 3]),
    /// Rows of the embedded view for this outer step, each row in handle order.
    Nested(Vec<Vec<Item<'a>>>),
}

/// A write handle's slot at the current step; `get`/`set` read and write through the same
/// `Cell` the rest of the view's `ValueMut` participants share, so each step's write is
/// visible to any read of the same entry taken afterward.
#[derive(Copy, Clone)]
pub struct ValueMutItem<'a> {
    cell: &'a Cell<f64>,
}

impl<'a> ValueMutItem<'a> {
    pub fn get(&self) -> f64 {
        self.cell.get()
    }

    pub fn set(&self, value: f64) {
        self.cell.set(value)
    }
}

fn as_f64<'a>(var: &'a Variable) -> Result<&'a [f64], Error> {
    match var.storage() {
        StorageKind::F64(v) => Ok(v),
        other => Err(Error::Type(TypeError::NotArithmetic { dtype: other.dtype().to_string() })),
    }
}

/// Resolve a single non-nested handle against `dataset`, returning its logical dims (used to
/// find the iteration space) and its resolved, storage-backed form.
fn resolve_handle<'a>(
    dataset: &'a Dataset,
    handle: &Handle<'_>,
) -> Result<(Dimensions, Resolved<'a>), Error> {
    match handle {
        Handle::Value(tag, name) => {
            let var = dataset.get(*tag, *name)?;
            let data = as_f64(var)?;
            let dims = *var.dimensions();
            Ok((dims, Resolved { kind: ResolvedKind::Value { data }, own_dims: dims }))
        }
        Handle::Bin(tag) => {
            let var = dataset.get(*tag, "")?;
            let data = as_f64(var)?;
            let own_dims = *var.dimensions();
            let dim = tag
                .dimension_label()
                .ok_or(Error::Dimension(DimensionError::NotJoint { label: Label::Invalid }))?;
            let axis = own_dims.labels().iter().position(|&l| l == dim).unwrap();
            let stride = own_dims.stride_at(axis);
            let edge_extent = own_dims.extent_at(dim)?;
            let mut logical = own_dims;
            logical.resize(dim, edge_extent.saturating_sub(1))?;
            Ok((logical, Resolved { kind: ResolvedKind::Bin { data, stride }, own_dims }))
        }
        Handle::StdDev(name) => {
            let var = dataset.get(Tag::Data(DataTag::Variance), *name)?;
            let data = as_f64(var)?;
            let dims = *var.dimensions();
            Ok((dims, Resolved { kind: ResolvedKind::StdDev { variance: data }, own_dims: dims }))
        }
        Handle::Position => {
            let pos_var = dataset.get(Tag::Coord(CoordTag::DetectorPosition), "")?;
            let positions = match pos_var.storage() {
                StorageKind::Vector3(v) => v.as_slice(),
                other => {
                    return Err(Error::Type(TypeError::NotArithmetic { dtype: other.dtype().to_string() }))
                }
            };
            let grp_var = dataset.get(Tag::Coord(CoordTag::DetectorGrouping), "")?;
            let grouping = match grp_var.storage() {
                StorageKind::Dataset(v) => v.as_slice(),
                other => {
                    return Err(Error::Type(TypeError::NotArithmetic { dtype: other.dtype().to_string() }))
                }
            };
            let dims = *grp_var.dimensions();
            Ok((dims, Resolved { kind: ResolvedKind::Position { positions, grouping }, own_dims: dims }))
        }
        Handle::ValueMut(..) => {
            unreachable!("MDZipView::new rejects write handles before resolving any handle")
        }
        Handle::Nested(_) => unreachable!("nested handles are flattened by MDZipView::new"),
    }
}

/// Resolve a single non-nested handle using a variable already pulled out of the dataset
/// through `Dataset::get_many_mut`, in the same order `required_keys` listed it.
fn resolve_handle_mut<'a>(
    vars: &mut std::vec::IntoIter<&'a mut Variable>,
    handle: &Handle<'_>,
) -> Result<(Dimensions, Resolved<'a>), Error> {
    match handle {
        Handle::Value(..) => {
            let var = vars.next().expect("one variable collected per handle key");
            let data = as_f64(var)?;
            let dims = *var.dimensions();
            Ok((dims, Resolved { kind: ResolvedKind::Value { data }, own_dims: dims }))
        }
        Handle::ValueMut(..) => {
            let var = vars.next().expect("one variable collected per handle key");
            let dims = *var.dimensions();
            let data = match var.make_unique() {
                StorageKind::F64(v) => v.as_mut_slice(),
                other => {
                    return Err(Error::Type(TypeError::NotArithmetic { dtype: other.dtype().to_string() }))
                }
            };
            let cells = Cell::from_mut(data).as_slice_of_cells();
            Ok((dims, Resolved { kind: ResolvedKind::ValueMut { data: cells }, own_dims: dims }))
        }
        Handle::Bin(tag) => {
            let var = vars.next().expect("one variable collected per handle key");
            let data = as_f64(var)?;
            let own_dims = *var.dimensions();
            let dim = tag
                .dimension_label()
                .ok_or(Error::Dimension(DimensionError::NotJoint { label: Label::Invalid }))?;
            let axis = own_dims.labels().iter().position(|&l| l == dim).unwrap();
            let stride = own_dims.stride_at(axis);
            let edge_extent = own_dims.extent_at(dim)?;
            let mut logical = own_dims;
            logical.resize(dim, edge_extent.saturating_sub(1))?;
            Ok((logical, Resolved { kind: ResolvedKind::Bin { data, stride }, own_dims }))
        }
        Handle::StdDev(..) => {
            let var = vars.next().expect("one variable collected per handle key");
            let data = as_f64(var)?;
            let dims = *var.dimensions();
            Ok((dims, Resolved { kind: ResolvedKind::StdDev { variance: data }, own_dims: dims }))
        }
        Handle::Position => {
            let pos_var = vars.next().expect("one variable collected per handle key");
            let positions = match pos_var.storage() {
                StorageKind::Vector3(v) => v.as_slice(),
                other => {
                    return Err(Error::Type(TypeError::NotArithmetic { dtype: other.dtype().to_string() }))
                }
            };
            let grp_var = vars.next().expect("one variable collected per handle key");
            let grouping = match grp_var.storage() {
                StorageKind::Dataset(v) => v.as_slice(),
                other => {
                    return Err(Error::Type(TypeError::NotArithmetic { dtype: other.dtype().to_string() }))
                }
            };
            let dims = *grp_var.dimensions();
            Ok((dims, Resolved { kind: ResolvedKind::Position { positions, grouping }, own_dims: dims }))
        }
        Handle::Nested(_) => unreachable!("nested handles are flattened by MDZipView::new_mut"),
    }
}

/// The `(tag, name)` entries `handles` need pulled out of the dataset, in resolution order —
/// shared between the key-collection pass and the later handle-resolution pass in
/// `MDZipView::new_mut`, which must walk `handles` identically to line back up with them.
fn required_keys(handles: &[Handle<'_>], keys: &mut Vec<(Tag, String)>) {
    for handle in handles {
        match handle {
            Handle::Value(tag, name) | Handle::ValueMut(tag, name) => {
                keys.push((*tag, (*name).to_string()))
            }
            Handle::Bin(tag) => keys.push((*tag, String::new())),
            Handle::StdDev(name) => keys.push((Tag::Data(DataTag::Variance), (*name).to_string())),
            Handle::Position => {
                keys.push((Tag::Coord(CoordTag::DetectorPosition), String::new()));
                keys.push((Tag::Coord(CoordTag::DetectorGrouping), String::new()));
            }
            Handle::Nested(inner) => required_keys(inner, keys),
        }
    }
}

fn contains_value_mut(handles: &[Handle<'_>]) -> bool {
    handles.iter().any(|h| match h {
        Handle::ValueMut(..) => true,
        Handle::Nested(inner) => contains_value_mut(inner),
        _ => false,
    })
}

/// The logical-dims entry that is a superset of every other, or `NotJoint` if none is.
fn superset(candidates: &[Dimensions]) -> Result<Dimensions, Error> {
    candidates
        .iter()
        .find(|candidate| candidates.iter().all(|d| candidate.contains_dims(d)))
        .copied()
        .ok_or(Error::Dimension(DimensionError::NotJoint { label: Label::Invalid }))
}

fn erase_fixed(mut dims: Dimensions, fixed: &[Label]) -> Result<Dimensions, Error> {
    for label in fixed {
        if dims.contains(*label) {
            dims.erase(*label)?;
        }
    }
    Ok(dims)
}

/// Convenience wrapper: resolve `handles` against `dataset` with no fixed dimensions and
/// iterate directly, without naming the intermediate `MDZipView`.
pub fn md_zip<'a>(dataset: &'a Dataset, handles: &[Handle<'_>]) -> Result<MDZipIter<'a>, Error> {
    Ok(MDZipView::new(dataset, handles, &[])?.into_iter())
}

/// Like [`md_zip`], but resolves `Handle::ValueMut` participants for writing.
pub fn md_zip_mut<'a>(
    dataset: &'a mut Dataset,
    handles: &[Handle<'_>],
) -> Result<MDZipIter<'a>, Error> {
    Ok(MDZipView::new_mut(dataset, handles, &[])?.into_iter())
}

impl<'a> MDZipView<'a> {
    /// Resolve `handles` against `dataset`. `fixed` names dimensions the outer iteration must
    /// not traverse (the dimensions a `Nested` handle's inner view iterates instead).
    ///
    /// Read-only: rejects `Handle::ValueMut` with `DatasetError::WriteHandleNotSupported` —
    /// use [`MDZipView::new_mut`] when a participant needs to be written.
    pub fn new(
        dataset: &'a Dataset,
        handles: &[Handle<'_>],
        fixed: &[Label],
    ) -> Result<MDZipView<'a>, Error> {
        if contains_value_mut(handles) {
            return Err(Error::Dataset(DatasetError::WriteHandleNotSupported));
        }
        let mut flat: Vec<Resolved<'a>> = Vec::with_capacity(handles.len());
        let mut logical_dims: Vec<Dimensions> = Vec::with_capacity(handles.len());
        let mut layout: Vec<TopSlot> = Vec::with_capacity(handles.len());

        for handle in handles {
            match handle {
                Handle::Nested(inner_handles) => {
                    let mut slots = Vec::with_capacity(inner_handles.len());
                    let mut inner_logical = Vec::with_capacity(inner_handles.len());
                    for inner in inner_handles {
                        let (logical, resolved) = resolve_handle(dataset, inner)?;
                        slots.push(flat.len());
                        inner_logical.push(logical);
                        flat.push(resolved);
                    }
                    let nested_logical = superset(&inner_logical)?;
                    for d in &inner_logical {
                        if !nested_logical.contains_dims(d) {
                            return Err(Error::Dimension(DimensionError::NotJoint {
                                label: d.labels().first().copied().unwrap_or(Label::Invalid),
                            }));
                        }
                    }

                    let mut inner_dims = Dimensions::new();
                    for (&label, &extent) in
                        nested_logical.labels().iter().zip(nested_logical.extents())
                    {
                        if fixed.contains(&label) {
                            inner_dims.add(label, extent)?;
                        }
                    }

                    logical_dims.push(erase_fixed(nested_logical, fixed)?);
                    layout.push(TopSlot::Nested { slots, inner_dims });
                }
                other => {
                    let (logical, resolved) = resolve_handle(dataset, other)?;
                    logical_dims.push(erase_fixed(logical, fixed)?);
                    layout.push(TopSlot::Single(flat.len()));
                    flat.push(resolved);
                }
            }
        }

        let iteration_dims = superset(&logical_dims)?;
        for dims in &logical_dims {
            if !iteration_dims.contains_dims(dims) {
                return Err(Error::Dimension(DimensionError::NotJoint {
                    label: dims.labels().first().copied().unwrap_or(Label::Invalid),
                }));
            }
        }

        Ok(MDZipView { dims: iteration_dims, flat, layout })
    }

    /// Like [`MDZipView::new`], but resolves every handle's backing entry out of `dataset`
    /// mutably in one pass (`Dataset::get_many_mut`), so `Handle::ValueMut` participants can
    /// write back. Every handle — read or write — must therefore name a distinct `(tag,
    /// name)` entry; two handles sharing one entry fail with `DatasetError::Duplicate`. A
    /// `Handle::ValueMut`'s own dimensions must equal the iteration space exactly — broadcast
    /// into a write target would mean writing the same cell more than once per step, which
    /// `DimensionError::Mismatch` rejects instead of silently picking one write to keep.
    pub fn new_mut(
        dataset: &'a mut Dataset,
        handles: &[Handle<'_>],
        fixed: &[Label],
    ) -> Result<MDZipView<'a>, Error> {
        let mut keys = Vec::new();
        required_keys(handles, &mut keys);
        let key_refs: Vec<(Tag, &str)> = keys.iter().map(|(t, n)| (*t, n.as_str())).collect();
        let mut vars = dataset.get_many_mut(&key_refs)?.into_iter();

        let mut flat: Vec<Resolved<'a>> = Vec::with_capacity(handles.len());
        let mut logical_dims: Vec<Dimensions> = Vec::with_capacity(handles.len());
        let mut layout: Vec<TopSlot> = Vec::with_capacity(handles.len());
        let mut write_dims: Vec<Dimensions> = Vec::new();

        for handle in handles {
            match handle {
                Handle::Nested(inner_handles) => {
                    let mut slots = Vec::with_capacity(inner_handles.len());
                    let mut inner_logical = Vec::with_capacity(inner_handles.len());
                    for inner in inner_handles {
                        let (logical, resolved) = resolve_handle_mut(&mut vars, inner)?;
                        slots.push(flat.len());
                        inner_logical.push(logical);
                        flat.push(resolved);
                    }
                    let nested_logical = superset(&inner_logical)?;
                    for d in &inner_logical {
                        if !nested_logical.contains_dims(d) {
                            return Err(Error::Dimension(DimensionError::NotJoint {
                                label: d.labels().first().copied().unwrap_or(Label::Invalid),
                            }));
                        }
                    }

                    let mut inner_dims = Dimensions::new();
                    for (&label, &extent) in
                        nested_logical.labels().iter().zip(nested_logical.extents())
                    {
                        if fixed.contains(&label) {
                            inner_dims.add(label, extent)?;
                        }
                    }

                    logical_dims.push(erase_fixed(nested_logical, fixed)?);
                    layout.push(TopSlot::Nested { slots, inner_dims });
                }
                other => {
                    let (logical, resolved) = resolve_handle_mut(&mut vars, other)?;
                    if matches!(other, Handle::ValueMut(..)) {
                        write_dims.push(resolved.own_dims);
                    }
                    logical_dims.push(erase_fixed(logical, fixed)?);
                    layout.push(TopSlot::Single(flat.len()));
                    flat.push(resolved);
                }
            }
        }

        let iteration_dims = superset(&logical_dims)?;
        for dims in &logical_dims {
            if !iteration_dims.contains_dims(dims) {
                return Err(Error::Dimension(DimensionError::NotJoint {
                    label: dims.labels().first().copied().unwrap_or(Label::Invalid),
                }));
            }
        }
        for dims in &write_dims {
            if *dims != iteration_dims {
                return Err(Error::Dimension(DimensionError::Mismatch {
                    lhs: dims.to_string(),
                    rhs: iteration_dims.to_string(),
                }));
            }
        }

        Ok(MDZipView { dims: iteration_dims, flat, layout })
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    /// Iterate items in row-major order over the iteration space.
    pub fn iter(&self) -> MDZipIter<'a> {
        self.clone().into_iter()
    }

    /// Like [`MDZipView::iter`], but consumes `self` instead of cloning it first.
    pub fn into_iter(self) -> MDZipIter<'a> {
        let own_dims: Vec<Dimensions> = self.flat.iter().map(|h| h.own_dims).collect();
        let mi = MultiIndex::new(&self.dims, &own_dims);
        MDZipIter { view: self, mi, step: 0 }
    }
}

fn item_for<'a>(resolved: &Resolved<'a>, offset: usize) -> Item<'a> {
    match resolved.kind {
        ResolvedKind::Value { data } => Item::Value(data[offset]),
        ResolvedKind::ValueMut { data } => Item::ValueMut(ValueMutItem { cell: &data[offset] }),
        ResolvedKind::Bin { data, stride } => Item::Bin(data[offset], data[offset + stride]),
        ResolvedKind::StdDev { variance } => Item::StdDev(variance[offset].sqrt()),
        ResolvedKind::Position { positions, grouping } => {
            let indices: Vec<i64> = match grouping[offset].get(Tag::Data(DataTag::Value), "") {
                Ok(var) => match var.storage() {
                    StorageKind::I64(idx) => idx.clone(),
                    _ => Vec::new(),
                },
                Err(_) => Vec::new(),
            };
            assert!(!indices.is_empty(), "spectrum has no detectors, cannot get position");
            let mut sum = [0.0f64; 3];
            for &det in &indices {
                let p = positions[det as usize];
                sum[0] += p[0];
                sum[1] += p[1];
                sum[2] += p[2];
            }
            let n = indices.len() as f64;
            Item::Position([sum[0] / n, sum[1] / n, sum[2] / n])
        }
    }
}

/// Materialise one outer step's worth of an embedded view, row-major over `inner_dims`.
fn nested_rows<'a>(
    flat: &[Resolved<'a>],
    slots: &[usize],
    bases: &[usize],
    inner_dims: &Dimensions,
) -> Vec<Vec<Item<'a>>> {
    let inner_own_dims: Vec<Dimensions> = slots.iter().map(|&i| flat[i].own_dims).collect();
    let mut inner_mi = MultiIndex::new(inner_dims, &inner_own_dims);
    let mut rows = Vec::with_capacity(inner_mi.size());
    let mut step = 0;
    loop {
        if inner_mi.size() == 0 || step >= inner_mi.size() {
            break;
        }
        let row = slots
            .iter()
            .zip(bases.iter())
            .enumerate()
            .map(|(k, (&i, &base))| item_for(&flat[i], base + inner_mi.offset(k)))
            .collect();
        rows.push(row);
        step += 1;
        if step < inner_mi.size() {
            inner_mi.increment();
        }
    }
    rows
}

/// Iterator over [`MDZipView::iter`].
pub struct MDZipIter<'a> {
    view: MDZipView<'a>,
    mi: MultiIndex,
    step: usize,
}

impl<'a> Iterator for MDZipIter<'a> {
    type Item = Vec<Item<'a>>;

    fn next(&mut self) -> Option<Vec<Item<'a>>> {
        if self.mi.size() == 0 || self.step >= self.mi.size() {
            return None;
        }
        let items = self
            .view
            .layout
            .iter()
            .map(|slot| match slot {
                TopSlot::Single(i) => item_for(&self.view.flat[*i], self.mi.offset(*i)),
                TopSlot::Nested { slots, inner_dims } => {
                    let bases: Vec<usize> = slots.iter().map(|&i| self.mi.offset(i)).collect();
                    Item::Nested(nested_rows(&self.view.flat, slots, &bases, inner_dims))
                }
            })
            .collect();
        self.step += 1;
        if self.step < self.mi.size() {
            self.mi.increment();
        }
        Some(items)
    }
}
