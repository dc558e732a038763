// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `Variable` subsystem: type-erased COW storage, the `Variable` value type, strided
//! views, rebin, and the free-function reductions named in §6.

pub mod rebin;
pub mod slice;
pub mod storage;
pub mod variable;

pub use rebin::rebin;
pub use slice::{ConstVariableSlice, VariableSlice};
pub use storage::{Op, StorageKind};
pub use variable::Variable;

use crate::dimensions::{Dimensions, Label};
use crate::error::{DimensionError, Error, TypeError};
use crate::multi_index::MultiIndex;

fn as_f64(var: &Variable) -> Result<&[f64], Error> {
    match var.storage() {
        StorageKind::F64(v) => Ok(v),
        other => Err(Error::Type(TypeError::NotArithmetic { dtype: other.dtype().to_string() })),
    }
}

fn outer_bases(dims: &Dimensions, dim_axis: usize, strides: &[usize]) -> Vec<usize> {
    let ndim = dims.ndim();
    let dim_extent = dims.extents()[dim_axis];
    let outer_volume = if dim_extent == 0 { 0 } else { dims.volume() / dim_extent };
    let mut out = Vec::with_capacity(outer_volume);
    let mut coord = vec![0usize; ndim];
    for _ in 0..outer_volume {
        let base: usize =
            (0..ndim).filter(|&a| a != dim_axis).map(|a| coord[a] * strides[a]).sum();
        out.push(base);
        for axis in (0..ndim).rev() {
            if axis == dim_axis {
                continue;
            }
            coord[axis] += 1;
            if coord[axis] < dims.extents()[axis] {
                break;
            }
            coord[axis] = 0;
        }
    }
    out
}

/// Sum `var` along `dim`, dropping that axis.
pub fn sum(var: &Variable, dim: Label) -> Result<Variable, Error> {
    let dims = *var.dimensions();
    let dim_axis = dims
        .labels()
        .iter()
        .position(|&l| l == dim)
        .ok_or(Error::Dimension(DimensionError::NotFound { label: dim }))?;
    let strides: Vec<usize> = (0..dims.ndim()).map(|i| dims.stride_at(i)).collect();
    let data = as_f64(var)?;
    let extent = dims.extents()[dim_axis];
    let dim_stride = strides[dim_axis];

    let mut out_dims = dims;
    out_dims.erase(dim)?;
    let bases = outer_bases(&dims, dim_axis, &strides);
    let out_data: Vec<f64> = bases
        .iter()
        .map(|&base| (0..extent).map(|i| data[base + i * dim_stride]).sum())
        .collect();

    let mut out = Variable::new(var.tag(), out_dims, StorageKind::F64(out_data))?;
    out.set_name(var.name().to_string());
    Ok(out)
}

/// Mean of `var` along `dim`.
pub fn mean(var: &Variable, dim: Label) -> Result<Variable, Error> {
    let extent = var.dimensions().extent_at(dim)?;
    let summed = sum(var, dim)?;
    let mut out = summed;
    if let StorageKind::F64(v) = out.make_unique() {
        let n = extent.max(1) as f64;
        for x in v.iter_mut() {
            *x /= n;
        }
    }
    Ok(out)
}

/// Euclidean norm of every element in `var`, as a scalar `Variable`.
pub fn norm(var: &Variable) -> Result<Variable, Error> {
    let data = as_f64(var)?;
    let total: f64 = data.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mut out = Variable::new(var.tag(), Dimensions::new(), StorageKind::F64(vec![total]))?;
    out.set_name(var.name().to_string());
    Ok(out)
}

/// Elementwise square root.
pub fn sqrt(var: &Variable) -> Result<Variable, Error> {
    let data = as_f64(var)?;
    let out_data: Vec<f64> = data.iter().map(|x| x.sqrt()).collect();
    let mut out = Variable::new(var.tag(), *var.dimensions(), StorageKind::F64(out_data))?;
    out.set_name(var.name().to_string());
    Ok(out)
}

/// Replicate `var` to `dims` (which must be a superset of `var.dimensions()`), producing an
/// owned, fully materialised `Variable` (the broadcast of §6).
pub fn broadcast(var: &Variable, dims: Dimensions) -> Result<Variable, Error> {
    if !dims.contains_dims(var.dimensions()) {
        return Err(Error::Dimension(DimensionError::Mismatch {
            lhs: dims.to_string(),
            rhs: var.dimensions().to_string(),
        }));
    }
    let data = as_f64(var)?;
    let mut mi = MultiIndex::new(&dims, &[*var.dimensions()]);
    let mut out_data = Vec::with_capacity(dims.volume());
    if dims.volume() > 0 {
        loop {
            out_data.push(data[mi.offset(0)]);
            if mi.linear_index() + 1 >= mi.size() {
                break;
            }
            mi.increment();
        }
    }
    let mut out = Variable::new(var.tag(), dims, StorageKind::F64(out_data))?;
    out.set_name(var.name().to_string());
    Ok(out)
}

/// Reverse the element order of `var` along `dim`.
pub fn reverse(var: &Variable, dim: Label) -> Result<Variable, Error> {
    let dims = *var.dimensions();
    let dim_axis = dims
        .labels()
        .iter()
        .position(|&l| l == dim)
        .ok_or(Error::Dimension(DimensionError::NotFound { label: dim }))?;
    let strides: Vec<usize> = (0..dims.ndim()).map(|i| dims.stride_at(i)).collect();
    let data = as_f64(var)?;
    let extent = dims.extents()[dim_axis];
    let dim_stride = strides[dim_axis];

    let bases = outer_bases(&dims, dim_axis, &strides);
    let mut out_data = vec![0.0f64; dims.volume()];
    for &base in &bases {
        for i in 0..extent {
            out_data[base + i * dim_stride] = data[base + (extent - 1 - i) * dim_stride];
        }
    }
    let mut out = Variable::new(var.tag(), dims, StorageKind::F64(out_data))?;
    out.set_name(var.name().to_string());
    Ok(out)
}

/// Reorder the elements along `dim` according to `perm` (a permutation of `0..extent`,
/// `perm[j]` naming which source position lands at output position `j`). Works for any
/// storage dtype via [`StorageKind::gather`]; used by `Dataset::sort` (§4.7).
pub fn permute(var: &Variable, dim: Label, perm: &[usize]) -> Result<Variable, Error> {
    let dims = *var.dimensions();
    let ndim = dims.ndim();
    let dim_axis = dims
        .labels()
        .iter()
        .position(|&l| l == dim)
        .ok_or(Error::Dimension(DimensionError::NotFound { label: dim }))?;
    let extent = dims.extents()[dim_axis];
    if perm.len() != extent {
        return Err(Error::Dimension(DimensionError::Mismatch {
            lhs: extent.to_string(),
            rhs: perm.len().to_string(),
        }));
    }
    let strides: Vec<usize> = (0..ndim).map(|i| dims.stride_at(i)).collect();
    let mut coord = vec![0usize; ndim];
    let mut offsets = Vec::with_capacity(dims.volume());
    for _ in 0..dims.volume() {
        let mut off = 0usize;
        for a in 0..ndim {
            let c = if a == dim_axis { perm[coord[a]] } else { coord[a] };
            off += c * strides[a];
        }
        offsets.push(off);
        for axis in (0..ndim).rev() {
            coord[axis] += 1;
            if coord[axis] < dims.extents()[axis] {
                break;
            }
            coord[axis] = 0;
        }
    }
    let data = var.storage().gather(&offsets);
    let mut out = Variable::new(var.tag(), dims, data)?;
    out.set_name(var.name().to_string());
    Ok(out)
}

/// Keep only the positions along `dim` where `mask` is `true` (`Dataset::filter`, §4.7).
pub fn filter(var: &Variable, dim: Label, mask: &[bool]) -> Result<Variable, Error> {
    let dims = *var.dimensions();
    let ndim = dims.ndim();
    let dim_axis = dims
        .labels()
        .iter()
        .position(|&l| l == dim)
        .ok_or(Error::Dimension(DimensionError::NotFound { label: dim }))?;
    let extent = dims.extents()[dim_axis];
    if mask.len() != extent {
        return Err(Error::Dimension(DimensionError::Mismatch {
            lhs: extent.to_string(),
            rhs: mask.len().to_string(),
        }));
    }
    let keep: Vec<usize> = (0..extent).filter(|&i| mask[i]).collect();
    let strides: Vec<usize> = (0..ndim).map(|i| dims.stride_at(i)).collect();

    let mut out_dims = dims;
    out_dims.resize(dim, keep.len())?;
    let mut coord = vec![0usize; ndim];
    let mut offsets = Vec::with_capacity(out_dims.volume());
    for _ in 0..out_dims.volume() {
        let mut off = 0usize;
        for a in 0..ndim {
            let c = if a == dim_axis { keep[coord[a]] } else { coord[a] };
            off += c * strides[a];
        }
        offsets.push(off);
        for axis in (0..ndim).rev() {
            coord[axis] += 1;
            if coord[axis] < out_dims.extents()[axis] {
                break;
            }
            coord[axis] = 0;
        }
    }
    let data = var.storage().gather(&offsets);
    let mut out = Variable::new(var.tag(), out_dims, data)?;
    out.set_name(var.name().to_string());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::Label::*;
    use crate::tag::{DataTag, Tag};

    fn value(dims: Dimensions, data: Vec<f64>) -> Variable {
        Variable::new(Tag::Data(DataTag::Value), dims, StorageKind::F64(data)).unwrap()
    }

    #[test]
    fn sum_drops_axis() {
        let v = value(Dimensions::from_pairs(&[(Y, 2), (X, 3)]).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let s = sum(&v, X).unwrap();
        assert_eq!(s.dimensions().labels(), &[Y]);
        match s.storage() {
            StorageKind::F64(d) => assert_eq!(d, &[6.0, 15.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn reverse_round_trips() {
        let v = value(Dimensions::from_pairs(&[(X, 4)]).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        let r = reverse(&v, X).unwrap();
        match r.storage() {
            StorageKind::F64(d) => assert_eq!(d, &[4.0, 3.0, 2.0, 1.0]),
            _ => unreachable!(),
        }
        let back = reverse(&r, X).unwrap();
        assert_eq!(back.storage(), v.storage());
    }

    #[test]
    fn permute_reorders_along_axis() {
        let v = value(Dimensions::from_pairs(&[(X, 4)]).unwrap(), vec![5.0, 1.0, 3.0, 0.0]);
        let out = permute(&v, X, &[3, 1, 2, 0]).unwrap();
        match out.storage() {
            StorageKind::F64(d) => assert_eq!(d, &[0.0, 1.0, 3.0, 5.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn filter_keeps_masked_positions() {
        let v = value(Dimensions::from_pairs(&[(X, 4)]).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        let out = filter(&v, X, &[true, false, true, false]).unwrap();
        assert_eq!(out.dimensions().extent_at(X).unwrap(), 2);
        match out.storage() {
            StorageKind::F64(d) => assert_eq!(d, &[1.0, 3.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn broadcast_materialises_replicated_data() {
        let v = value(Dimensions::new(), vec![7.0]);
        let out = broadcast(&v, Dimensions::from_pairs(&[(X, 3)]).unwrap()).unwrap();
        match out.storage() {
            StorageKind::F64(d) => assert_eq!(d, &[7.0, 7.0, 7.0]),
            _ => unreachable!(),
        }
    }
}
