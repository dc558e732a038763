// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Non-owning strided views over a [`Variable`] (§4.5).
//!
//! A slice is produced by `(label, index)` (drops the axis) or `(label, begin, end)` (keeps
//! the axis with length `end - begin`). Views borrow from their source `Variable`; Rust's
//! borrow checker enforces that the source's storage pointer cannot be replaced while a view
//! is alive (§5).

use crate::dimensions::{Dimensions, Label, MAX_NDIM};
use crate::error::{DimensionError, Error};
use crate::tag::Tag;
use crate::unit::Unit;
use crate::variable::storage::StorageKind;
use crate::variable::variable::Variable;

/// Per-axis (stride, in elements of the source buffer) table plus a base offset, shared by
/// both the const and mutable slice types.
#[derive(Copy, Clone, Debug)]
struct StrideMap {
    strides: [usize; MAX_NDIM],
    base_offset: usize,
}

fn split_non_range(
    dims: &Dimensions,
    strides: &StrideMap,
    label: Label,
    index: usize,
) -> Result<(Dimensions, StrideMap), Error> {
    let axis = dims
        .labels()
        .iter()
        .position(|&l| l == label)
        .ok_or(Error::Dimension(DimensionError::NotFound { label }))?;
    let extent = dims.extents()[axis];
    if index >= extent {
        return Err(Error::Dimension(DimensionError::SliceOutOfRange {
            label,
            begin: index,
            end: index + 1,
            extent,
        }));
    }
    let mut new_dims = *dims;
    new_dims.erase(label)?;
    let mut new_strides = *strides;
    new_strides.base_offset += index * strides.strides[axis];
    for j in axis..dims.ndim() - 1 {
        new_strides.strides[j] = strides.strides[j + 1];
    }
    Ok((new_dims, new_strides))
}

fn split_range(
    dims: &Dimensions,
    strides: &StrideMap,
    label: Label,
    begin: usize,
    end: usize,
) -> Result<(Dimensions, StrideMap), Error> {
    let axis = dims
        .labels()
        .iter()
        .position(|&l| l == label)
        .ok_or(Error::Dimension(DimensionError::NotFound { label }))?;
    let extent = dims.extents()[axis];
    if begin > end || end > extent {
        return Err(Error::Dimension(DimensionError::SliceOutOfRange {
            label,
            begin,
            end,
            extent,
        }));
    }
    let mut new_dims = *dims;
    new_dims.resize(label, end - begin)?;
    let mut new_strides = *strides;
    new_strides.base_offset += begin * strides.strides[axis];
    Ok((new_dims, new_strides))
}

/// Row-major flat offsets (into the source buffer) of every element of `dims`, given its
/// per-axis stride table and base offset.
fn enumerate_offsets(dims: &Dimensions, strides: &StrideMap) -> Vec<usize> {
    let ndim = dims.ndim();
    let volume = dims.volume();
    let mut out = Vec::with_capacity(volume);
    let mut coord = [0usize; MAX_NDIM];
    for _ in 0..volume {
        let mut off = strides.base_offset;
        for axis in 0..ndim {
            off += coord[axis] * strides.strides[axis];
        }
        out.push(off);
        for axis in (0..ndim).rev() {
            coord[axis] += 1;
            if coord[axis] < dims.extents()[axis] {
                break;
            }
            coord[axis] = 0;
        }
    }
    out
}

fn source_strides(dims: &Dimensions) -> StrideMap {
    let mut strides = [0usize; MAX_NDIM];
    for axis in 0..dims.ndim() {
        strides[axis] = dims.stride_at(axis);
    }
    StrideMap { strides, base_offset: 0 }
}

/// A read-only strided view into a [`Variable`].
#[derive(Clone)]
pub struct ConstVariableSlice<'a> {
    tag: Tag,
    unit: Unit,
    name: String,
    dims: Dimensions,
    strides: StrideMap,
    source: &'a StorageKind,
}

impl<'a> ConstVariableSlice<'a> {
    pub fn from_variable(source: &'a Variable) -> Self {
        let dims = *source.dimensions();
        ConstVariableSlice {
            tag: source.tag(),
            unit: source.unit(),
            name: source.name().to_string(),
            strides: source_strides(&dims),
            dims,
            source: source.storage(),
        }
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Drop axis `label` at fixed `index` (§4.5, "non-range slice").
    pub fn slice(&self, label: Label, index: usize) -> Result<ConstVariableSlice<'a>, Error> {
        let (dims, strides) = split_non_range(&self.dims, &self.strides, label, index)?;
        Ok(ConstVariableSlice {
            tag: self.tag,
            unit: self.unit,
            name: self.name.clone(),
            dims,
            strides,
            source: self.source,
        })
    }

    /// Keep axis `label` restricted to `[begin, end)` (§4.5, "range slice").
    pub fn slice_range(
        &self,
        label: Label,
        begin: usize,
        end: usize,
    ) -> Result<ConstVariableSlice<'a>, Error> {
        let (dims, strides) = split_range(&self.dims, &self.strides, label, begin, end)?;
        Ok(ConstVariableSlice {
            tag: self.tag,
            unit: self.unit,
            name: self.name.clone(),
            dims,
            strides,
            source: self.source,
        })
    }

    /// Materialise a fresh, owned, contiguous `Variable` (never retains a borrow).
    pub fn to_owned(&self) -> Result<Variable, Error> {
        let offsets = enumerate_offsets(&self.dims, &self.strides);
        let data = self.source.gather(&offsets);
        let mut v = Variable::new(self.tag, self.dims, data)?;
        v.set_name(self.name.clone());
        Ok(v)
    }
}

/// A mutable strided view into a [`Variable`]; obtained only through
/// [`Variable::make_unique`](crate::variable::variable::Variable::make_unique), so writing
/// through it never observes a shared buffer.
pub struct VariableSlice<'a> {
    dims: Dimensions,
    strides: StrideMap,
    source: &'a mut StorageKind,
}

impl<'a> VariableSlice<'a> {
    pub fn from_unique(dims: Dimensions, source: &'a mut StorageKind) -> Self {
        let strides = source_strides(&dims);
        VariableSlice { dims, strides, source }
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    pub fn slice(&mut self, label: Label, index: usize) -> Result<VariableSlice<'_>, Error> {
        let (dims, strides) = split_non_range(&self.dims, &self.strides, label, index)?;
        Ok(VariableSlice { dims, strides, source: self.source })
    }

    pub fn slice_range(
        &mut self,
        label: Label,
        begin: usize,
        end: usize,
    ) -> Result<VariableSlice<'_>, Error> {
        let (dims, strides) = split_range(&self.dims, &self.strides, label, begin, end)?;
        Ok(VariableSlice { dims, strides, source: self.source })
    }

    /// Element-wise copy from `src` through this view, handling source/target overlap by
    /// gathering `src` fully before scattering (§4.5).
    pub fn assign(&mut self, src: &ConstVariableSlice<'_>) -> Result<(), Error> {
        if !self.dims.contains_dims(src.dimensions()) || !src.dimensions().contains_dims(&self.dims) {
            return Err(Error::Dimension(DimensionError::Mismatch {
                lhs: self.dims.to_string(),
                rhs: src.dimensions().to_string(),
            }));
        }
        let dst_offsets = enumerate_offsets(&self.dims, &self.strides);
        let src_offsets = enumerate_offsets(src.dimensions(), &src.strides);
        let gathered = src.source.gather(&src_offsets);
        self.source
            .scatter(&dst_offsets, &gathered)
            .map_err(crate::error::Error::Type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::Label::*;
    use crate::tag::DataTag;
    use crate::variable::storage::StorageKind;

    fn build_3x2x4() -> Variable {
        let dims = Dimensions::from_pairs(&[(Z, 3), (Y, 2), (X, 4)]).unwrap();
        let data: Vec<f64> = (1..=24).map(|i| i as f64).collect();
        Variable::new(Tag::Data(DataTag::Value), dims, StorageKind::F64(data)).unwrap()
    }

    #[test]
    fn slice_x_drops_axis() {
        let v = build_3x2x4();
        let view = ConstVariableSlice::from_variable(&v).slice(X, 1).unwrap();
        assert_eq!(view.dimensions().labels(), &[Z, Y]);
        let owned = view.to_owned().unwrap();
        match owned.storage() {
            StorageKind::F64(d) => assert_eq!(d, &[2.0, 6.0, 10.0, 14.0, 18.0, 22.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn slice_y_drops_axis() {
        let v = build_3x2x4();
        let view = ConstVariableSlice::from_variable(&v).slice(Y, 0).unwrap();
        let owned = view.to_owned().unwrap();
        match owned.storage() {
            StorageKind::F64(d) => {
                assert_eq!(d, &[1.0, 2.0, 3.0, 4.0, 9.0, 10.0, 11.0, 12.0, 17.0, 18.0, 19.0, 20.0])
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn slice_z_drops_axis() {
        let v = build_3x2x4();
        let view = ConstVariableSlice::from_variable(&v).slice(Z, 2).unwrap();
        let owned = view.to_owned().unwrap();
        match owned.storage() {
            StorageKind::F64(d) => {
                assert_eq!(d, &[17.0, 18.0, 19.0, 20.0, 21.0, 22.0, 23.0, 24.0])
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn range_slice_keeps_axis() {
        let v = build_3x2x4();
        let view = ConstVariableSlice::from_variable(&v).slice_range(X, 1, 3).unwrap();
        assert_eq!(view.dimensions().extent_at(X).unwrap(), 2);
    }
}
