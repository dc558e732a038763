// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Overlap-weighted bin remapping along one dimension coord (§4.6).

use crate::dimensions::{Dimensions, Label};
use crate::error::{DimensionError, Error, RebinError};
use crate::variable::storage::StorageKind;
use crate::variable::variable::Variable;

fn as_f64(var: &Variable) -> Result<&[f64], Error> {
    match var.storage() {
        StorageKind::F64(v) => Ok(v),
        other => Err(Error::Type(crate::error::TypeError::NotArithmetic {
            dtype: other.dtype().to_string(),
        })),
    }
}

fn is_monotonic_increasing(edges: &[f64]) -> bool {
    edges.windows(2).all(|w| w[0] < w[1])
}

/// Overlap-weighted remap of one old edge-coord bin layout onto a new one, for a single
/// contiguous run of `old_values` (length `old_edges.len() - 1`).
fn rebin_1d(old_edges: &[f64], old_values: &[f64], new_edges: &[f64]) -> Vec<f64> {
    let new_bins = new_edges.len() - 1;
    let old_bins = old_edges.len() - 1;
    let mut out = vec![0.0; new_bins];
    let mut i = 0usize;
    for (j, out_j) in out.iter_mut().enumerate() {
        let (lo, hi) = (new_edges[j], new_edges[j + 1]);
        while i < old_bins && old_edges[i + 1] <= lo {
            i += 1;
        }
        let mut k = i;
        while k < old_bins && old_edges[k] < hi {
            let overlap = hi.min(old_edges[k + 1]) - lo.max(old_edges[k]);
            if overlap > 0.0 {
                let width = old_edges[k + 1] - old_edges[k];
                *out_j += old_values[k] * overlap / width;
            }
            k += 1;
        }
    }
    out
}

/// Rebin `var` along `dim`: `old_edges` must be the edge coord currently describing `dim`
/// (length = extent + 1); `new_edges` must be a monotonically increasing dimension coord for
/// `dim`. Preconditions and failure modes follow §4.6.
pub fn rebin(
    var: &Variable,
    dim: Label,
    old_edges: &Variable,
    new_edges: &Variable,
) -> Result<Variable, Error> {
    let var_extent = var
        .dimensions()
        .extent_at(dim)
        .map_err(|_| Error::Rebin(RebinError::MissingCoord { label: dim }))?;
    let old_extent = old_edges
        .dimensions()
        .extent_at(dim)
        .map_err(|_| Error::Rebin(RebinError::MissingCoord { label: dim }))?;
    if old_extent != var_extent + 1 {
        return Err(Error::Rebin(RebinError::NotEdge { label: dim }));
    }
    if new_edges.tag().dimension_label() != Some(dim) {
        return Err(Error::Rebin(RebinError::NotDimensionCoord { label: dim }));
    }
    let new_extent = new_edges
        .dimensions()
        .extent_at(dim)
        .map_err(|_| Error::Rebin(RebinError::NotDimensionCoord { label: dim }))?;
    if new_extent < 2 {
        return Err(Error::Rebin(RebinError::NotContinuous { label: dim }));
    }
    if new_edges.dimensions().ndim() > 1 {
        let aux_ok = new_edges
            .dimensions()
            .labels()
            .iter()
            .filter(|&&l| l != dim)
            .all(|&l| var.dimensions().extent_at(l) == new_edges.dimensions().extent_at(l));
        if !aux_ok {
            return Err(Error::Rebin(RebinError::AuxSizeMismatch { label: dim }));
        }
    }

    let old_edges_data = as_f64(old_edges)?;
    let new_edges_data = as_f64(new_edges)?;
    if !is_monotonic_increasing(old_edges_data) {
        return Err(Error::Rebin(RebinError::NotContinuous { label: dim }));
    }
    if !is_monotonic_increasing(new_edges_data) {
        return Err(Error::Rebin(RebinError::NotContinuous { label: dim }));
    }
    let var_data = as_f64(var)?;

    let dims = *var.dimensions();
    let ndim = dims.ndim();
    let dim_axis = dims.labels().iter().position(|&l| l == dim).unwrap();
    let strides: Vec<usize> = (0..ndim).map(|i| dims.stride_at(i)).collect();

    let mut out_dims: Dimensions = dims;
    out_dims.resize(dim, new_extent - 1)?;
    let out_strides: Vec<usize> = (0..ndim).map(|i| out_dims.stride_at(i)).collect();

    let outer_volume = if var_extent == 0 { 0 } else { dims.volume() / var_extent };
    let dim_stride = strides[dim_axis];
    let out_dim_stride = out_strides[dim_axis];

    // Enumerate every outer coordinate (all axes but `dim_axis`) once, in row-major order.
    let mut outer_coords: Vec<(usize, usize)> = Vec::with_capacity(outer_volume);
    let mut coord = vec![0usize; ndim];
    for _ in 0..outer_volume {
        let base_in: usize = (0..ndim)
            .filter(|&a| a != dim_axis)
            .map(|a| coord[a] * strides[a])
            .sum();
        let base_out: usize = (0..ndim)
            .filter(|&a| a != dim_axis)
            .map(|a| coord[a] * out_strides[a])
            .sum();
        outer_coords.push((base_in, base_out));
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

    let compute = |base_in: usize| -> Vec<f64> {
        let mut run = Vec::with_capacity(var_extent);
        for i in 0..var_extent {
            run.push(var_data[base_in + i * dim_stride]);
        }
        rebin_1d(old_edges_data, &run, new_edges_data)
    };

    #[cfg(feature = "rayon")]
    let results: Vec<Vec<f64>> = {
        use rayon::prelude::*;
        outer_coords.par_iter().map(|&(base_in, _)| compute(base_in)).collect()
    };
    #[cfg(not(feature = "rayon"))]
    let results: Vec<Vec<f64>> =
        outer_coords.iter().map(|&(base_in, _)| compute(base_in)).collect();

    let mut out_data = vec![0.0f64; out_dims.volume()];
    for ((_, base_out), run) in outer_coords.iter().zip(results) {
        for (j, value) in run.into_iter().enumerate() {
            out_data[base_out + j * out_dim_stride] = value;
        }
    }

    let mut result = Variable::new(var.tag(), out_dims, StorageKind::F64(out_data))?;
    result.set_name(var.name().to_string());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::Label::X;
    use crate::tag::{CoordTag, DataTag, Tag};

    #[test]
    fn rebin_sum_scenario() {
        let dims = Dimensions::from_pairs(&[(X, 2)]).unwrap();
        let var = Variable::new(Tag::Data(DataTag::Value), dims, StorageKind::F64(vec![1.0, 2.0]))
            .unwrap();
        let old_edge_dims = Dimensions::from_pairs(&[(X, 3)]).unwrap();
        let old_edges =
            Variable::new(Tag::Coord(CoordTag::X), old_edge_dims, StorageKind::F64(vec![1.0, 2.0, 3.0]))
                .unwrap();
        let new_edge_dims = Dimensions::from_pairs(&[(X, 2)]).unwrap();
        let new_edges =
            Variable::new(Tag::Coord(CoordTag::X), new_edge_dims, StorageKind::F64(vec![1.0, 3.0]))
                .unwrap();
        let out = rebin(&var, X, &old_edges, &new_edges).unwrap();
        assert_eq!(out.dimensions().extent_at(X).unwrap(), 1);
        match out.storage() {
            StorageKind::F64(v) => assert!((v[0] - 3.0).abs() < 1e-9),
            _ => unreachable!(),
        }
    }

    #[test]
    fn rejects_non_edge_old_coord() {
        let dims = Dimensions::from_pairs(&[(X, 2)]).unwrap();
        let var = Variable::new(Tag::Data(DataTag::Value), dims, StorageKind::F64(vec![1.0, 2.0]))
            .unwrap();
        let bad_old = Variable::new(Tag::Coord(CoordTag::X), dims, StorageKind::F64(vec![1.0, 2.0]))
            .unwrap();
        let new_edge_dims = Dimensions::from_pairs(&[(X, 2)]).unwrap();
        let new_edges =
            Variable::new(Tag::Coord(CoordTag::X), new_edge_dims, StorageKind::F64(vec![1.0, 3.0]))
                .unwrap();
        assert!(rebin(&var, X, &bad_old, &new_edges).is_err());
    }
}
