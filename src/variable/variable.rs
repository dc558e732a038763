// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Variable`: a type-erased, copy-on-write, labelled N-dimensional array with a unit (§4.4).

use std::rc::Rc;

use crate::dimensions::Dimensions;
use crate::dtype::DType;
use crate::error::{DimensionError, Error, TypeError};
use crate::multi_index::MultiIndex;
use crate::tag::Tag;
use crate::unit::{Quantity, Unit};
use crate::variable::storage::{self, Op, StorageKind};

/// A labelled, unit-tagged, copy-on-write N-dimensional array.
///
/// Cloning a `Variable` is `Rc::clone` on the underlying storage — cheap, and shared until
/// the first mutation through either clone forces a unique copy (§9, §4.3 "COW contract").
#[derive(Clone, Debug)]
pub struct Variable {
    tag: Tag,
    unit: Unit,
    name: String,
    dims: Dimensions,
    data: Rc<StorageKind>,
}

impl Variable {
    /// Construct a dense, row-major `Variable`. `data.len()` must equal `dims.volume()`.
    pub fn new(tag: Tag, dims: Dimensions, data: StorageKind) -> Result<Variable, Error> {
        if data.len() != dims.volume() {
            return Err(Error::Dimension(DimensionError::LengthError {
                label: crate::dimensions::Label::Invalid,
                extent: data.len() as i64,
            }));
        }
        Ok(Variable { tag, unit: tag.default_unit(), name: String::new(), dims, data: Rc::new(data) })
    }

    /// Like [`Variable::new`], but also attaches a `Variance` sibling buffer of the same
    /// shape (the common dense-row-major construction path named in §6).
    pub fn new_with_variances(
        tag: Tag,
        dims: Dimensions,
        data: StorageKind,
        variances: StorageKind,
    ) -> Result<(Variable, Variable), Error> {
        let value = Variable::new(tag, dims, data)?;
        let variance = Variable::new(
            Tag::Data(crate::tag::DataTag::Variance),
            value.dims,
            variances,
        )?;
        Ok((value, variance))
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reassign this `Variable`'s tag, keeping unit, name, dims, and storage intact; used
    /// when a dataset-level coord is demoted to a per-item unaligned attribute (§4.5).
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn storage(&self) -> &StorageKind {
        &self.data
    }

    /// Whether two distinct `Variable`s currently share the same backing buffer.
    pub fn shares_storage_with(&self, other: &Variable) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// COW mutability gate (§4.3, §9): clone the buffer first if it is not uniquely owned.
    pub fn make_unique(&mut self) -> &mut StorageKind {
        if Rc::get_mut(&mut self.data).is_none() {
            self.data = Rc::new((*self.data).clone());
        }
        Rc::get_mut(&mut self.data).expect("just made unique")
    }

    fn binary(&self, rhs: &Variable, op: Op, in_place: bool) -> Result<Variable, Error> {
        let result_unit = match op {
            Op::Add | Op::Sub => self.unit.add(rhs.unit)?,
            Op::Mul => self.unit.mul(rhs.unit)?,
            Op::Div => self.unit.div(rhs.unit)?,
        };
        if self.dtype() != rhs.dtype() {
            return Err(Error::Type(TypeError::DTypeMismatch {
                lhs: self.dtype().to_string(),
                rhs: rhs.dtype().to_string(),
            }));
        }

        let out_dims = if in_place {
            if !self.dims.contains_dims(&rhs.dims) {
                return Err(Error::Dimension(DimensionError::Mismatch {
                    lhs: self.dims.to_string(),
                    rhs: rhs.dims.to_string(),
                }));
            }
            self.dims
        } else if self.dims.contains_dims(&rhs.dims) {
            self.dims
        } else if rhs.dims.contains_dims(&self.dims) {
            rhs.dims
        } else {
            return Err(Error::Dimension(DimensionError::Mismatch {
                lhs: self.dims.to_string(),
                rhs: rhs.dims.to_string(),
            }));
        };

        // Self-overlap (§4.4): if lhs and rhs are the same buffer, snapshot the rhs operand
        // first so writes to lhs never observe a partially-updated source.
        let rhs_snapshot;
        let rhs_storage: &StorageKind = if in_place && self.shares_storage_with(rhs) {
            rhs_snapshot = (*rhs.data).clone();
            &rhs_snapshot
        } else {
            &rhs.data
        };

        let mut result = if in_place {
            self.clone()
        } else {
            Variable {
                tag: self.tag,
                unit: self.unit,
                name: self.name.clone(),
                dims: out_dims,
                data: Rc::new((*self.data).clone()),
            }
        };
        result.unit = result_unit;
        result.dims = out_dims;

        let mut mi = MultiIndex::new(&out_dims, &[out_dims, rhs.dims]);
        let dst = result.make_unique();
        storage::binary_in_place(dst, rhs_storage, op, &mut mi)?;
        Ok(result)
    }

    pub fn add(&self, rhs: &Variable) -> Result<Variable, Error> {
        self.binary(rhs, Op::Add, false)
    }
    pub fn sub(&self, rhs: &Variable) -> Result<Variable, Error> {
        self.binary(rhs, Op::Sub, false)
    }
    pub fn mul(&self, rhs: &Variable) -> Result<Variable, Error> {
        self.binary(rhs, Op::Mul, false)
    }
    pub fn div(&self, rhs: &Variable) -> Result<Variable, Error> {
        self.binary(rhs, Op::Div, false)
    }

    pub fn add_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        *self = self.binary(rhs, Op::Add, true)?;
        Ok(())
    }
    pub fn sub_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        *self = self.binary(rhs, Op::Sub, true)?;
        Ok(())
    }
    pub fn mul_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        *self = self.binary(rhs, Op::Mul, true)?;
        Ok(())
    }
    pub fn div_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        *self = self.binary(rhs, Op::Div, true)?;
        Ok(())
    }

    /// Arithmetic against a scalar `Quantity`, composing units the same way two `Variable`s
    /// would (§6); the value is broadcast over every element.
    pub fn add_quantity(&self, rhs: Quantity<f64>) -> Result<Variable, Error> {
        let scalar = Variable::new(self.tag, Dimensions::new(), StorageKind::F64(vec![rhs.value]))?
            .with_unit(rhs.unit);
        self.add(&scalar)
    }

    pub fn mul_quantity(&self, rhs: Quantity<f64>) -> Result<Variable, Error> {
        let scalar = Variable::new(self.tag, Dimensions::new(), StorageKind::F64(vec![rhs.value]))?
            .with_unit(rhs.unit);
        self.mul(&scalar)
    }

    fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Drop axis `label` at fixed `index` (§4.5, "non-range slice").
    pub fn slice(&self, label: crate::dimensions::Label, index: usize) -> Result<crate::variable::slice::ConstVariableSlice<'_>, Error> {
        crate::variable::slice::ConstVariableSlice::from_variable(self).slice(label, index)
    }

    /// Keep axis `label` restricted to `[begin, end)` (§4.5, "range slice").
    pub fn slice_range(
        &self,
        label: crate::dimensions::Label,
        begin: usize,
        end: usize,
    ) -> Result<crate::variable::slice::ConstVariableSlice<'_>, Error> {
        crate::variable::slice::ConstVariableSlice::from_variable(self).slice_range(label, begin, end)
    }

    /// Reshape to `new_dims` when the total volume matches (a cheap relabel, §4.3); fails
    /// otherwise.
    pub fn reshape(&self, new_dims: Dimensions) -> Result<Variable, Error> {
        if new_dims.volume() != self.dims.volume() {
            return Err(Error::Dimension(DimensionError::Mismatch {
                lhs: self.dims.to_string(),
                rhs: new_dims.to_string(),
            }));
        }
        let mut out = self.clone();
        out.dims = new_dims;
        Ok(out)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.unit == other.unit
            && self.name == other.name
            && self.dims == other.dims
            && self.data == other.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::Label::*;
    use crate::tag::DataTag;

    fn value(dims: Dimensions, data: Vec<f64>) -> Variable {
        Variable::new(Tag::Data(DataTag::Value), dims, StorageKind::F64(data)).unwrap()
    }

    #[test]
    fn broadcast_add_scenario() {
        let a = value(Dimensions::from_pairs(&[(X, 2)]).unwrap(), vec![1.1, 2.2]);
        let b = value(Dimensions::new(), vec![1.0]);
        let mut a = a;
        a.add_assign(&b).unwrap();
        match a.storage() {
            StorageKind::F64(v) => {
                assert!((v[0] - 2.1).abs() < 1e-9);
                assert!((v[1] - 3.2).abs() < 1e-9);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn transposed_add_scenario() {
        let a_dims = Dimensions::from_pairs(&[(Y, 3), (X, 2)]).unwrap();
        let b_dims = Dimensions::from_pairs(&[(X, 2), (Y, 3)]).unwrap();
        let mut a = value(a_dims, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = value(b_dims, vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
        a.add_assign(&b).unwrap();
        match a.storage() {
            StorageKind::F64(v) => assert_eq!(v, &[2.0, 4.0, 6.0, 8.0, 10.0, 12.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn cow_isolation() {
        let a = value(Dimensions::from_pairs(&[(X, 2)]).unwrap(), vec![1.0, 2.0]);
        let mut w = a.clone();
        assert!(a.shares_storage_with(&w));
        if let StorageKind::F64(v) = w.make_unique() {
            v[0] = 99.0;
        }
        assert!(!a.shares_storage_with(&w));
        match a.storage() {
            StorageKind::F64(v) => assert_eq!(v, &[1.0, 2.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn self_add_assign_is_safe() {
        let mut a = value(Dimensions::from_pairs(&[(X, 2)]).unwrap(), vec![1.0, 2.0]);
        let rhs = a.clone();
        a.add_assign(&rhs).unwrap();
        match a.storage() {
            StorageKind::F64(v) => assert_eq!(v, &[2.0, 4.0]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn unit_mismatch_on_add_fails() {
        let mut a = value(Dimensions::new(), vec![1.0]).with_unit(Unit::Length);
        let b = value(Dimensions::new(), vec![1.0]).with_unit(Unit::Time);
        assert!(a.add_assign(&b).is_err());
    }
}
