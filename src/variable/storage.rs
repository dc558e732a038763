// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Type-erased storage backends (§4.3, §9).
//!
//! Replaces the source's "concept + model" split with a sum over element-type-parameterised
//! backends: `StorageKind` plus the runtime [`DType`] tag used for dispatch at the API
//! surface. Arithmetic capability is a marker on the storage variant — non-arithmetic
//! variants (strings, nested datasets, fixed 3-vectors) return
//! [`TypeError::NotArithmetic`](crate::error::TypeError::NotArithmetic).

use crate::dataset::Dataset;
use crate::dtype::DType;
use crate::error::TypeError;
use crate::multi_index::MultiIndex;

/// Binary arithmetic operator, dispatched over a matching pair of arithmetic
/// [`StorageKind`] variants.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

/// One contiguous, densely-packed element buffer, tagged by element type.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum StorageKind {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    Bool(Vec<bool>),
    String(Vec<String>),
    Vector3(Vec<[f64; 3]>),
    Dataset(Vec<Dataset>),
}

impl StorageKind {
    pub fn dtype(&self) -> DType {
        match self {
            StorageKind::F64(_) => DType::F64,
            StorageKind::F32(_) => DType::F32,
            StorageKind::I32(_) => DType::I32,
            StorageKind::I64(_) => DType::I64,
            StorageKind::Bool(_) => DType::Bool,
            StorageKind::String(_) => DType::String,
            StorageKind::Vector3(_) => DType::Vector3,
            StorageKind::Dataset(_) => DType::Dataset,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StorageKind::F64(v) => v.len(),
            StorageKind::F32(v) => v.len(),
            StorageKind::I32(v) => v.len(),
            StorageKind::I64(v) => v.len(),
            StorageKind::Bool(v) => v.len(),
            StorageKind::String(v) => v.len(),
            StorageKind::Vector3(v) => v.len(),
            StorageKind::Dataset(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A single-element placeholder buffer with the same element type (§4.3).
    pub fn clone_empty(&self) -> StorageKind {
        match self {
            StorageKind::F64(_) => StorageKind::F64(vec![0.0]),
            StorageKind::F32(_) => StorageKind::F32(vec![0.0]),
            StorageKind::I32(_) => StorageKind::I32(vec![0]),
            StorageKind::I64(_) => StorageKind::I64(vec![0]),
            StorageKind::Bool(_) => StorageKind::Bool(vec![false]),
            StorageKind::String(_) => StorageKind::String(vec![String::new()]),
            StorageKind::Vector3(_) => StorageKind::Vector3(vec![[0.0; 3]]),
            StorageKind::Dataset(_) => StorageKind::Dataset(vec![Dataset::new()]),
        }
    }

    /// Gather the elements at `offsets` (in order) into a freshly-owned buffer of the same
    /// variant. Used to materialise a strided view into a contiguous `Variable` (§4.5).
    pub fn gather(&self, offsets: &[usize]) -> StorageKind {
        match self {
            StorageKind::F64(v) => StorageKind::F64(offsets.iter().map(|&i| v[i]).collect()),
            StorageKind::F32(v) => StorageKind::F32(offsets.iter().map(|&i| v[i]).collect()),
            StorageKind::I32(v) => StorageKind::I32(offsets.iter().map(|&i| v[i]).collect()),
            StorageKind::I64(v) => StorageKind::I64(offsets.iter().map(|&i| v[i]).collect()),
            StorageKind::Bool(v) => StorageKind::Bool(offsets.iter().map(|&i| v[i]).collect()),
            StorageKind::String(v) => {
                StorageKind::String(offsets.iter().map(|&i| v[i].clone()).collect())
            }
            StorageKind::Vector3(v) => StorageKind::Vector3(offsets.iter().map(|&i| v[i]).collect()),
            StorageKind::Dataset(v) => {
                StorageKind::Dataset(offsets.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    /// Scatter `src`'s elements (in order) to `self` at `offsets`; used by
    /// [`crate::variable::slice::VariableSlice::assign`]. Variants must match.
    pub fn scatter(&mut self, offsets: &[usize], src: &StorageKind) -> Result<(), TypeError> {
        match (self, src) {
            (StorageKind::F64(d), StorageKind::F64(s)) => {
                for (&o, &v) in offsets.iter().zip(s) {
                    d[o] = v;
                }
            }
            (StorageKind::F32(d), StorageKind::F32(s)) => {
                for (&o, &v) in offsets.iter().zip(s) {
                    d[o] = v;
                }
            }
            (StorageKind::I32(d), StorageKind::I32(s)) => {
                for (&o, &v) in offsets.iter().zip(s) {
                    d[o] = v;
                }
            }
            (StorageKind::I64(d), StorageKind::I64(s)) => {
                for (&o, &v) in offsets.iter().zip(s) {
                    d[o] = v;
                }
            }
            (StorageKind::Bool(d), StorageKind::Bool(s)) => {
                for (&o, &v) in offsets.iter().zip(s) {
                    d[o] = v;
                }
            }
            (StorageKind::String(d), StorageKind::String(s)) => {
                for (&o, v) in offsets.iter().zip(s) {
                    d[o] = v.clone();
                }
            }
            (StorageKind::Vector3(d), StorageKind::Vector3(s)) => {
                for (&o, &v) in offsets.iter().zip(s) {
                    d[o] = v;
                }
            }
            (StorageKind::Dataset(d), StorageKind::Dataset(s)) => {
                for (&o, v) in offsets.iter().zip(s) {
                    d[o] = v.clone();
                }
            }
            (d, s) => {
                return Err(TypeError::DTypeMismatch {
                    lhs: d.dtype().to_string(),
                    rhs: s.dtype().to_string(),
                })
            }
        }
        Ok(())
    }
}

macro_rules! numeric_binary {
    ($dst:expr, $src:expr, $op:expr, $mi:expr, $variant:ident) => {{
        match ($dst, $src) {
            (StorageKind::$variant(d), StorageKind::$variant(s)) => {
                apply_numeric(d, s, $op, $mi);
                Ok(())
            }
            _ => unreachable!(),
        }
    }};
}

fn apply_numeric<T>(dst: &mut [T], src: &[T], op: Op, mi: &mut MultiIndex)
where
    T: Copy
        + std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>
        + std::ops::Div<Output = T>,
{
    loop {
        let (d, s) = (mi.offset(0), mi.offset(1));
        dst[d] = match op {
            Op::Add => dst[d] + src[s],
            Op::Sub => dst[d] - src[s],
            Op::Mul => dst[d] * src[s],
            Op::Div => dst[d] / src[s],
        };
        if mi.linear_index() + 1 >= mi.size() {
            break;
        }
        mi.increment();
    }
}

/// Apply `op` element-wise: `dst[mi.offset(0)] = dst[mi.offset(0)] op src[mi.offset(1)]` for
/// every step of `mi`. `mi` must have been built with `dst`'s and `src`'s `Dimensions` as its
/// two sub-variables (v=0, v=1) over the broadcast/union iteration space. Both operands must
/// be the same arithmetic variant.
pub fn binary_in_place(
    dst: &mut StorageKind,
    src: &StorageKind,
    op: Op,
    mi: &mut MultiIndex,
) -> Result<(), TypeError> {
    if !dst.dtype().is_arithmetic() {
        return Err(TypeError::NotArithmetic { dtype: dst.dtype().to_string() });
    }
    if dst.dtype() != src.dtype() {
        return Err(TypeError::DTypeMismatch {
            lhs: dst.dtype().to_string(),
            rhs: src.dtype().to_string(),
        });
    }
    if mi.size() == 0 {
        return Ok(());
    }
    match dst.dtype() {
        DType::F64 => numeric_binary!(dst, src, op, mi, F64),
        DType::F32 => numeric_binary!(dst, src, op, mi, F32),
        DType::I32 => numeric_binary!(dst, src, op, mi, I32),
        DType::I64 => numeric_binary!(dst, src, op, mi, I64),
        _ => unreachable!("non-arithmetic dtype already rejected above"),
    }
}
