// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Dataset`: an ordered, `(Tag, name)`-keyed collection of `Variable`s sharing one global
//! `Dimensions` (§4.7).

use crate::dimensions::{Dimensions, Label};
use crate::error::{DatasetError, DimensionError, Error, VarianceError};
use crate::tag::{AttrTag, DataTag, Tag};
use crate::variable::storage::Op;
use crate::variable::{self, Variable};

#[derive(Clone, Debug, PartialEq)]
struct Entry {
    tag: Tag,
    name: String,
    var: Variable,
    /// The dimension this entry was inserted as an edge coord for, if any; needed to rebuild
    /// the global dimension map correctly after removing an unrelated entry.
    edge_label: Option<Label>,
}

/// An ordered collection of `Variable`s, each uniquely keyed by `(tag, name)`, sharing one
/// global `Dimensions` map (§3, §4.7).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    dims: Dimensions,
    entries: Vec<Entry>,
}

impl Dataset {
    pub fn new() -> Self {
        Dataset { dims: Dimensions::new(), entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    fn index_of(&self, tag: Tag, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.tag == tag && e.name == name)
    }

    pub fn contains(&self, tag: Tag, name: &str) -> bool {
        self.index_of(tag, name).is_some()
    }

    pub fn get(&self, tag: Tag, name: &str) -> Result<&Variable, Error> {
        self.index_of(tag, name)
            .map(|i| &self.entries[i].var)
            .ok_or_else(|| Error::Dataset(DatasetError::NotFound { tag, name: name.to_string() }))
    }

    /// Non-panicking lookup; `None` rather than `DatasetError::NotFound` when absent.
    pub fn find(&self, tag: Tag, name: &str) -> Option<&Variable> {
        self.index_of(tag, name).map(|i| &self.entries[i].var)
    }

    /// Like [`Dataset::get`], but mutable — the path write-mode `MDZipView` handles use to
    /// reach storage through `Variable::make_unique`.
    pub fn get_mut(&mut self, tag: Tag, name: &str) -> Result<&mut Variable, Error> {
        let i = self
            .index_of(tag, name)
            .ok_or_else(|| Error::Dataset(DatasetError::NotFound { tag, name: name.to_string() }))?;
        Ok(&mut self.entries[i].var)
    }

    /// Resolve several `(tag, name)` keys to disjoint mutable `Variable` borrows in one pass,
    /// in the order requested. Used by write-mode `MDZipView` construction, where several
    /// handles each need their own mutable slot out of the same entry list. Errors if any key
    /// is missing or repeated — two handles cannot hold a mutable slot on the same entry.
    pub fn get_many_mut(&mut self, keys: &[(Tag, &str)]) -> Result<Vec<&mut Variable>, Error> {
        let mut indices = Vec::with_capacity(keys.len());
        for &(tag, name) in keys {
            let i = self
                .index_of(tag, name)
                .ok_or_else(|| Error::Dataset(DatasetError::NotFound { tag, name: name.to_string() }))?;
            if indices.contains(&i) {
                return Err(Error::Dataset(DatasetError::Duplicate { tag, name: name.to_string() }));
            }
            indices.push(i);
        }

        let mut order: Vec<usize> = (0..indices.len()).collect();
        order.sort_by_key(|&k| indices[k]);

        let mut slots: Vec<Option<&mut Variable>> = (0..indices.len()).map(|_| None).collect();
        let mut rest = self.entries.as_mut_slice();
        let mut consumed = 0;
        for &k in &order {
            let i = indices[k] - consumed;
            let (_, tail) = rest.split_at_mut(i);
            let (entry, tail) = tail.split_at_mut(1);
            slots[k] = Some(&mut entry[0].var);
            rest = tail;
            consumed = indices[k] + 1;
        }

        Ok(slots.into_iter().map(|s| s.expect("every index resolved above")).collect())
    }

    /// Number of entries; an alias of [`Dataset::len`] for parity with the external
    /// `insert`/`erase`/`find`/`count` naming.
    pub fn count(&self) -> usize {
        self.len()
    }

    fn merge_label(&mut self, label: Label, extent: usize) -> Result<(), DimensionError> {
        if self.dims.contains(label) {
            let existing = self.dims.extent_at(label)?;
            if existing != extent {
                return Err(DimensionError::Mismatch {
                    lhs: existing.to_string(),
                    rhs: extent.to_string(),
                });
            }
        } else {
            self.dims.add(label, extent)?;
        }
        Ok(())
    }

    fn merge_dims(&mut self, var: &Variable, edge_label: Option<Label>) -> Result<(), Error> {
        for (&label, &extent) in var.dimensions().labels().iter().zip(var.dimensions().extents()) {
            let recorded = if Some(label) == edge_label { extent - 1 } else { extent };
            self.merge_label(label, recorded)?;
        }
        Ok(())
    }

    /// Insert a dense (non-edge) variable. Fails with `DatasetError::Duplicate` on a
    /// `(tag, name)` collision, or if `tag` is a coord already present.
    pub fn insert(&mut self, var: Variable) -> Result<(), Error> {
        self.insert_impl(var, None)
    }

    /// Insert a dimension coord whose length is one more than `dim`'s dataset extent (an
    /// *edge coord*, §3/§9); the dataset records `dim`'s extent as `len - 1`.
    pub fn insert_edge(&mut self, var: Variable, dim: Label) -> Result<(), Error> {
        if var.tag().dimension_label() != Some(dim) {
            return Err(Error::Dataset(DatasetError::EdgeConflict { label: dim }));
        }
        self.insert_impl(var, Some(dim))
    }

    fn insert_impl(&mut self, var: Variable, edge_label: Option<Label>) -> Result<(), Error> {
        let tag = var.tag();
        let name = if tag.requires_empty_name() { String::new() } else { var.name().to_string() };
        if self.contains(tag, &name) {
            return Err(Error::Dataset(DatasetError::Duplicate { tag, name }));
        }
        self.merge_dims(&var, edge_label)?;
        self.entries.push(Entry { tag, name, var, edge_label });
        Ok(())
    }

    /// Remove the `(tag, name)` entry and rebuild the global dimension map from what remains.
    pub fn erase(&mut self, tag: Tag, name: &str) -> Result<(), Error> {
        let i = self
            .index_of(tag, name)
            .ok_or_else(|| Error::Dataset(DatasetError::NotFound { tag, name: name.to_string() }))?;
        self.entries.remove(i);
        self.rebuild_dims()
    }

    /// Recompute `self.dims` from the surviving entries, honoring each entry's own edge
    /// status rather than assuming none of them are edge coords.
    fn rebuild_dims(&mut self) -> Result<(), Error> {
        self.dims = Dimensions::new();
        let entries = std::mem::take(&mut self.entries);
        let result = entries.iter().try_for_each(|entry| self.merge_dims(&entry.var, entry.edge_label));
        self.entries = entries;
        result
    }

    /// Move every entry named `name` into a freshly returned `Dataset`.
    pub fn extract(&mut self, name: &str) -> Dataset {
        let mut out = Dataset::new();
        let (moved, kept): (Vec<Entry>, Vec<Entry>) =
            self.entries.drain(..).partition(|e| e.name == name);
        self.entries = kept;
        self.rebuild_dims()
            .expect("removing entries cannot reintroduce a merge conflict that did not exist before removal");
        for entry in moved {
            out.insert_impl(entry.var, entry.edge_label)
                .expect("moving a previously valid entry into an empty Dataset cannot violate the merge invariant");
        }
        out
    }

    /// Insert every entry of `other`; fails on the first `(tag, name)` collision.
    pub fn merge(&mut self, other: &Dataset) -> Result<(), Error> {
        for entry in &other.entries {
            self.insert(entry.var.clone())?;
        }
        Ok(())
    }

    fn op_assign(&mut self, other: &Dataset, op: Op) -> Result<(), Error> {
        let mut value_names: Vec<String> = Vec::new();
        for entry in &other.entries {
            match entry.tag {
                Tag::Coord(_) => {
                    let mine = self.get(entry.tag, &entry.name)?;
                    if mine != &entry.var {
                        return Err(Error::Dataset(DatasetError::CoordMismatch {
                            label: entry.tag.dimension_label().unwrap_or(Label::Invalid),
                        }));
                    }
                }
                Tag::Attr(_) => {
                    let combined = {
                        let mine = self.get(entry.tag, &entry.name)?;
                        apply_op(mine, &entry.var, op)?
                    };
                    let i = self.index_of(entry.tag, &entry.name).unwrap();
                    self.entries[i].var = combined;
                }
                Tag::Data(DataTag::Value) => value_names.push(entry.name.clone()),
                Tag::Data(DataTag::Variance) => {
                    if !other.contains(Tag::Data(DataTag::Value), &entry.name) {
                        return Err(Error::Variance(VarianceError::ValueMissing {
                            name: entry.name.clone(),
                        }));
                    }
                }
            }
        }

        for name in value_names {
            let b_value = other.get(Tag::Data(DataTag::Value), &name)?.clone();
            let b_variance = other.index_of(Tag::Data(DataTag::Variance), &name);
            let a_variance = self.index_of(Tag::Data(DataTag::Variance), &name);

            match (a_variance, b_variance) {
                (Some(avi), Some(bvi)) => {
                    let a_value = self.get(Tag::Data(DataTag::Value), &name)?.clone();
                    let new_variance = match op {
                        Op::Add | Op::Sub => {
                            self.entries[avi].var.add(&other.entries[bvi].var)?
                        }
                        Op::Mul | Op::Div => {
                            let v2_sq = b_value.mul(&b_value)?;
                            let v1_sq = a_value.mul(&a_value)?;
                            let term1 = self.entries[avi].var.mul(&v2_sq)?;
                            let term2 = v1_sq.mul(&other.entries[bvi].var)?;
                            term1.add(&term2)?
                        }
                    };
                    self.entries[avi].var = new_variance;
                }
                (None, None) => {}
                _ => return Err(Error::Variance(VarianceError::Unmatched { name })),
            }

            let i = self.index_of(Tag::Data(DataTag::Value), &name).unwrap();
            self.entries[i].var = apply_op(&self.entries[i].var, &b_value, op)?;
        }
        Ok(())
    }

    pub fn add_assign(&mut self, other: &Dataset) -> Result<(), Error> {
        self.op_assign(other, Op::Add)
    }
    pub fn sub_assign(&mut self, other: &Dataset) -> Result<(), Error> {
        self.op_assign(other, Op::Sub)
    }
    pub fn mul_assign(&mut self, other: &Dataset) -> Result<(), Error> {
        self.op_assign(other, Op::Mul)
    }
    pub fn div_assign(&mut self, other: &Dataset) -> Result<(), Error> {
        self.op_assign(other, Op::Div)
    }

    /// Concatenate `a` and `b` along `dim`: entries not depending on `dim` must match
    /// exactly; entries depending on `dim` are appended along it (§4.7).
    pub fn concatenate(a: &Dataset, b: &Dataset, dim: Label) -> Result<Dataset, Error> {
        let mut out = Dataset::new();
        for entry in &a.entries {
            if entry.var.dimensions().contains(dim) {
                let other = b.get(entry.tag, &entry.name)?;
                let combined = concat_along(&entry.var, other, dim)?;
                out.insert_impl(combined, None)?;
            } else {
                let other = b.get(entry.tag, &entry.name)?;
                if other != &entry.var {
                    return Err(Error::Dimension(DimensionError::Mismatch {
                        lhs: entry.var.dimensions().to_string(),
                        rhs: other.dimensions().to_string(),
                    }));
                }
                out.insert_impl(entry.var.clone(), None)?;
            }
        }
        Ok(out)
    }

    /// Slice every entry at fixed `index` along `dim`; entries that do not depend on `dim`
    /// pass through unchanged. A coord still depending on `dim` no longer describes the
    /// dataset as a whole once `dim` is sliced away, so it is demoted: instead of staying a
    /// dataset-level coord it is copied into every data item's attribute set as an
    /// `AttrTag::UnalignedCoord` entry (§4.5). An edge coord on `dim` keeps the axis as a
    /// length-1 "one-edge" slice rather than dropping it, before being demoted the same way.
    pub fn slice(&self, dim: Label, index: usize) -> Result<Dataset, Error> {
        let data_names: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.tag == Tag::Data(DataTag::Value))
            .map(|e| e.name.clone())
            .collect();

        let mut out = Dataset::new();
        for entry in &self.entries {
            if !entry.var.dimensions().contains(dim) {
                out.insert_impl(entry.var.clone(), entry.edge_label)?;
                continue;
            }

            let sliced = if entry.edge_label == Some(dim) {
                entry.var.slice_range(dim, index, index + 1)?.to_owned()?
            } else {
                entry.var.slice(dim, index)?.to_owned()?
            };

            if let Tag::Coord(coord_tag) = entry.tag {
                let demoted_tag = Tag::Attr(AttrTag::UnalignedCoord(coord_tag));
                for name in &data_names {
                    out.insert_impl(sliced.clone().with_tag(demoted_tag).with_name(name.clone()), None)?;
                }
            } else {
                out.insert_impl(sliced, entry.edge_label)?;
            }
        }
        Ok(out)
    }

    /// Slice every entry to `[begin, end)` along `dim`, keeping the axis.
    pub fn slice_range(&self, dim: Label, begin: usize, end: usize) -> Result<Dataset, Error> {
        let mut out = Dataset::new();
        for entry in &self.entries {
            let sliced = if entry.var.dimensions().contains(dim) {
                entry.var.slice_range(dim, begin, end)?.to_owned()?
            } else {
                entry.var.clone()
            };
            out.insert_impl(sliced, None)?;
        }
        Ok(out)
    }

    /// Build a permutation from the 1-D coord `(tag, name)` and apply it to every entry
    /// depending on that coord's dimension (§4.7 scenario 5).
    pub fn sort(&self, tag: Tag, name: &str) -> Result<Dataset, Error> {
        let key = self.get(tag, name)?;
        let dim = tag
            .dimension_label()
            .ok_or(Error::Dataset(DatasetError::NotFound { tag, name: name.to_string() }))?;
        let values = match key.storage() {
            crate::variable::StorageKind::F64(v) => v.clone(),
            _ => {
                return Err(Error::Type(crate::error::TypeError::NotArithmetic {
                    dtype: key.dtype().to_string(),
                }))
            }
        };
        let mut perm: Vec<usize> = (0..values.len()).collect();
        perm.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap());
        // perm[j] names which source position lands at output position j.
        let mut out = Dataset::new();
        for entry in &self.entries {
            let permuted = if entry.var.dimensions().contains(dim) {
                variable::permute(&entry.var, dim, &perm)?
            } else {
                entry.var.clone()
            };
            out.insert_impl(permuted, None)?;
        }
        Ok(out)
    }

    /// Rebin every entry depending on `dim` onto `new_edges` (§4.6); the old edge coord is
    /// replaced by `new_edges` in the result. Entries not depending on `dim` pass through
    /// unchanged; coords on `dim` other than the edge coord itself are dropped, since they no
    /// longer describe the rebinned axis.
    pub fn rebin(&self, dim: Label, new_edges: &Variable) -> Result<Dataset, Error> {
        let old_edges = self
            .entries
            .iter()
            .find(|e| matches!(e.tag, Tag::Coord(_)) && e.tag.dimension_label() == Some(dim))
            .map(|e| &e.var)
            .ok_or(Error::Rebin(crate::error::RebinError::MissingCoord { label: dim }))?
            .clone();

        let mut out = Dataset::new();
        for entry in &self.entries {
            if matches!(entry.tag, Tag::Coord(_)) && entry.tag.dimension_label() == Some(dim) {
                continue;
            }
            let rebinned = if entry.var.dimensions().contains(dim) {
                variable::rebin(&entry.var, dim, &old_edges, new_edges)?
            } else {
                entry.var.clone()
            };
            out.insert_impl(rebinned, None)?;
        }
        out.insert_impl(new_edges.clone(), Some(dim))?;
        Ok(out)
    }

    /// Keep only the positions where `mask` is `true`, applied to every entry depending on
    /// the mask's dimension.
    pub fn filter(&self, dim: Label, mask: &Variable) -> Result<Dataset, Error> {
        let mask_data = match mask.storage() {
            crate::variable::StorageKind::Bool(v) => v.clone(),
            _ => {
                return Err(Error::Type(crate::error::TypeError::NotArithmetic {
                    dtype: mask.dtype().to_string(),
                }))
            }
        };
        let mut out = Dataset::new();
        for entry in &self.entries {
            let filtered = if entry.var.dimensions().contains(dim) {
                variable::filter(&entry.var, dim, &mask_data)?
            } else {
                entry.var.clone()
            };
            out.insert_impl(filtered, None)?;
        }
        Ok(out)
    }
}

/// `ds["signal"]` is shorthand for `ds.get(Tag::Data(DataTag::Value), "signal")`, panicking
/// like the standard library's `Index` impls (e.g. `HashMap`) do on a missing key.
impl std::ops::Index<&str> for Dataset {
    type Output = Variable;

    fn index(&self, name: &str) -> &Variable {
        self.get(Tag::Data(DataTag::Value), name).expect("no such data entry")
    }
}

fn apply_op(lhs: &Variable, rhs: &Variable, op: Op) -> Result<Variable, Error> {
    match op {
        Op::Add => lhs.add(rhs),
        Op::Sub => lhs.sub(rhs),
        Op::Mul => lhs.mul(rhs),
        Op::Div => lhs.div(rhs),
    }
}

fn concat_along(a: &Variable, b: &Variable, dim: Label) -> Result<Variable, Error> {
    let a_extent = a.dimensions().extent_at(dim)?;
    let b_extent = b.dimensions().extent_at(dim)?;
    let mut out_dims = *a.dimensions();
    out_dims.resize(dim, a_extent + b_extent)?;

    let a_data = match a.storage() {
        crate::variable::StorageKind::F64(v) => v,
        _ => {
            return Err(Error::Type(crate::error::TypeError::NotArithmetic {
                dtype: a.dtype().to_string(),
            }))
        }
    };
    let b_data = match b.storage() {
        crate::variable::StorageKind::F64(v) => v,
        _ => {
            return Err(Error::Type(crate::error::TypeError::NotArithmetic {
                dtype: b.dtype().to_string(),
            }))
        }
    };

    let ndim = out_dims.ndim();
    let dim_axis = out_dims.labels().iter().position(|&l| l == dim).unwrap();
    let a_strides: Vec<usize> = (0..ndim).map(|i| a.dimensions().stride_at(i)).collect();
    let b_strides: Vec<usize> = (0..ndim).map(|i| b.dimensions().stride_at(i)).collect();
    let out_strides: Vec<usize> = (0..ndim).map(|i| out_dims.stride_at(i)).collect();

    let mut out_data = vec![0.0f64; out_dims.volume()];
    let mut coord = vec![0usize; ndim];
    for _ in 0..out_dims.volume() {
        let out_off: usize = (0..ndim).map(|a| coord[a] * out_strides[a]).sum();
        let c = coord[dim_axis];
        if c < a_extent {
            let off: usize = (0..ndim).map(|ax| coord[ax] * a_strides[ax]).sum();
            out_data[out_off] = a_data[off];
        } else {
            let mut src_coord = coord.clone();
            src_coord[dim_axis] = c - a_extent;
            let off: usize = (0..ndim).map(|ax| src_coord[ax] * b_strides[ax]).sum();
            out_data[out_off] = b_data[off];
        }
        for axis in (0..ndim).rev() {
            coord[axis] += 1;
            if coord[axis] < out_dims.extents()[axis] {
                break;
            }
            coord[axis] = 0;
        }
    }

    Variable::new(a.tag(), out_dims, crate::variable::StorageKind::F64(out_data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::Label::X;
    use crate::tag::CoordTag;
    use crate::variable::StorageKind;

    fn coord_x(values: Vec<f64>) -> Variable {
        let dims = Dimensions::from_pairs(&[(X, values.len())]).unwrap();
        Variable::new(Tag::Coord(CoordTag::X), dims, StorageKind::F64(values)).unwrap()
    }

    fn data_value(name: &str, values: Vec<f64>) -> Variable {
        let dims = Dimensions::from_pairs(&[(X, values.len())]).unwrap();
        Variable::new(Tag::Data(DataTag::Value), dims, StorageKind::F64(values))
            .unwrap()
            .with_name(name)
    }

    #[test]
    fn sort_scenario() {
        let mut ds = Dataset::new();
        ds.insert(coord_x(vec![5.0, 1.0, 3.0, 0.0])).unwrap();
        ds.insert(data_value("signal", vec![1.0, 2.0, 3.0, 4.0])).unwrap();

        let sorted = ds.sort(Tag::Coord(CoordTag::X), "").unwrap();
        let x = sorted.get(Tag::Coord(CoordTag::X), "").unwrap();
        match x.storage() {
            StorageKind::F64(v) => assert_eq!(v, &[0.0, 1.0, 3.0, 5.0]),
            _ => unreachable!(),
        }
        let signal = sorted.get(Tag::Data(DataTag::Value), "signal").unwrap();
        match signal.storage() {
            StorageKind::F64(v) => assert_eq!(v, &[4.0, 2.0, 3.0, 1.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn insert_rejects_duplicate_coord() {
        let mut ds = Dataset::new();
        ds.insert(coord_x(vec![1.0, 2.0])).unwrap();
        assert!(ds.insert(coord_x(vec![1.0, 2.0])).is_err());
    }

    #[test]
    fn extract_moves_named_entries() {
        let mut ds = Dataset::new();
        ds.insert(coord_x(vec![1.0, 2.0])).unwrap();
        ds.insert(data_value("signal", vec![10.0, 20.0])).unwrap();
        let extracted = ds.extract("signal");
        assert!(extracted.contains(Tag::Data(DataTag::Value), "signal"));
        assert!(!ds.contains(Tag::Data(DataTag::Value), "signal"));
    }

    #[test]
    fn rebin_replaces_edge_coord_and_sums_overlap() {
        let mut ds = Dataset::new();
        let old_edges =
            Variable::new(Tag::Coord(CoordTag::X), Dimensions::from_pairs(&[(X, 3)]).unwrap(), StorageKind::F64(vec![0.0, 1.0, 2.0])).unwrap();
        ds.insert_edge(old_edges, X).unwrap();
        ds.insert(data_value("signal", vec![1.0, 2.0])).unwrap();

        let new_edges =
            Variable::new(Tag::Coord(CoordTag::X), Dimensions::from_pairs(&[(X, 2)]).unwrap(), StorageKind::F64(vec![0.0, 2.0])).unwrap();
        let rebinned = ds.rebin(X, &new_edges).unwrap();

        let edges = rebinned.get(Tag::Coord(CoordTag::X), "").unwrap();
        match edges.storage() {
            StorageKind::F64(v) => assert_eq!(v, &[0.0, 2.0]),
            _ => unreachable!(),
        }
        let signal = rebinned.get(Tag::Data(DataTag::Value), "signal").unwrap();
        match signal.storage() {
            StorageKind::F64(v) => assert!((v[0] - 3.0).abs() < 1e-9),
            _ => unreachable!(),
        }
    }

    #[test]
    fn index_by_name_returns_value_variable() {
        let mut ds = Dataset::new();
        ds.insert(data_value("signal", vec![10.0, 20.0])).unwrap();
        match ds["signal"].storage() {
            StorageKind::F64(v) => assert_eq!(v, &[10.0, 20.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn non_range_slice_demotes_coord_to_unaligned_attr() {
        use crate::tag::AttrTag;

        let mut ds = Dataset::new();
        ds.insert(coord_x(vec![1.0, 2.0, 3.0])).unwrap();
        ds.insert(data_value("signal", vec![10.0, 20.0, 30.0])).unwrap();

        let sliced = ds.slice(X, 1).unwrap();
        assert!(!sliced.contains(Tag::Coord(CoordTag::X), ""));
        let demoted = sliced
            .get(Tag::Attr(AttrTag::UnalignedCoord(CoordTag::X)), "signal")
            .unwrap();
        match demoted.storage() {
            StorageKind::F64(v) => assert_eq!(v, &[2.0]),
            _ => unreachable!(),
        }
        let signal = sliced.get(Tag::Data(DataTag::Value), "signal").unwrap();
        match signal.storage() {
            StorageKind::F64(v) => assert_eq!(v, &[20.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn range_slice_keeps_coord_aligned() {
        let mut ds = Dataset::new();
        ds.insert(coord_x(vec![1.0, 2.0, 3.0])).unwrap();
        ds.insert(data_value("signal", vec![10.0, 20.0, 30.0])).unwrap();

        let sliced = ds.slice_range(X, 1, 3).unwrap();
        let x = sliced.get(Tag::Coord(CoordTag::X), "").unwrap();
        match x.storage() {
            StorageKind::F64(v) => assert_eq!(v, &[2.0, 3.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn concatenate_extends_dependent_entries() {
        let mut a = Dataset::new();
        a.insert(data_value("signal", vec![1.0, 2.0])).unwrap();
        let mut b = Dataset::new();
        b.insert(data_value("signal", vec![3.0, 4.0])).unwrap();
        let out = Dataset::concatenate(&a, &b, X).unwrap();
        let signal = out.get(Tag::Data(DataTag::Value), "signal").unwrap();
        assert_eq!(signal.dimensions().extent_at(X).unwrap(), 4);
        match signal.storage() {
            StorageKind::F64(v) => assert_eq!(v, &[1.0, 2.0, 3.0, 4.0]),
            _ => unreachable!(),
        }
    }
}
