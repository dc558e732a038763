// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Typed error model for the whole crate.
//!
//! Each subsystem owns a small `#[non_exhaustive]` error enum with named fields describing
//! the failure; all of them are collected under one [`Error`] so public functions return a
//! single `Result<T, Error>`.

use std::fmt;

#[cfg(feature = "std")]
use std::error::Error as StdError;

use crate::dimensions::Label;
use crate::tag::Tag;

/// Top-level error type returned by every fallible operation in this crate.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    Dimension(DimensionError),
    Unit(UnitError),
    Type(TypeError),
    Dataset(DatasetError),
    Rebin(RebinError),
    Variance(VarianceError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Dimension(e) => write!(f, "{}", e),
            Error::Unit(e) => write!(f, "{}", e),
            Error::Type(e) => write!(f, "{}", e),
            Error::Dataset(e) => write!(f, "{}", e),
            Error::Rebin(e) => write!(f, "{}", e),
            Error::Variance(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "std")]
impl StdError for Error {}

macro_rules! from_family {
    ($kind:ident, $variant:ident) => {
        impl From<$kind> for Error {
            fn from(e: $kind) -> Error {
                Error::$variant(e)
            }
        }
    };
}

from_family!(DimensionError, Dimension);
from_family!(UnitError, Unit);
from_family!(TypeError, Type);
from_family!(DatasetError, Dataset);
from_family!(RebinError, Rebin);
from_family!(VarianceError, Variance);

/// Errors from [`crate::dimensions::Dimensions`] and dimension-indexed slicing.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum DimensionError {
    NotFound { label: Label },
    AlreadyExists { label: Label },
    Mismatch { lhs: String, rhs: String },
    LengthError { label: Label, extent: i64 },
    NotJoint { label: Label },
    SliceOutOfRange { label: Label, begin: usize, end: usize, extent: usize },
}

impl fmt::Display for DimensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionError::NotFound { label } => write!(f, "dimension label {:?} not found", label),
            DimensionError::AlreadyExists { label } => {
                write!(f, "dimension label {:?} already exists", label)
            }
            DimensionError::Mismatch { lhs, rhs } => {
                write!(f, "incompatible dimensions: {} vs {}", lhs, rhs)
            }
            DimensionError::LengthError { label, extent } => {
                write!(f, "invalid extent {} for label {:?}", extent, label)
            }
            DimensionError::NotJoint { label } => {
                write!(f, "dimension {:?} is not joint across participants", label)
            }
            DimensionError::SliceOutOfRange { label, begin, end, extent } => write!(
                f,
                "slice [{}, {}) out of range for label {:?} with extent {}",
                begin, end, label, extent
            ),
        }
    }
}

#[cfg(feature = "std")]
impl StdError for DimensionError {}

/// Errors from [`crate::unit::Unit`] arithmetic.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum UnitError {
    Mismatch { lhs: String, rhs: String },
    Unsupported { lhs: String, op: &'static str, rhs: String },
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitError::Mismatch { lhs, rhs } => write!(f, "unit mismatch: {} vs {}", lhs, rhs),
            UnitError::Unsupported { lhs, op, rhs } => {
                write!(f, "unsupported unit operation: {} {} {}", lhs, op, rhs)
            }
        }
    }
}

#[cfg(feature = "std")]
impl StdError for UnitError {}

/// Errors from dtype dispatch over [`crate::variable::storage::StorageKind`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum TypeError {
    NotArithmetic { dtype: String },
    DTypeMismatch { lhs: String, rhs: String },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::NotArithmetic { dtype } => {
                write!(f, "storage of type {} does not support arithmetic", dtype)
            }
            TypeError::DTypeMismatch { lhs, rhs } => {
                write!(f, "element type mismatch: {} vs {}", lhs, rhs)
            }
        }
    }
}

#[cfg(feature = "std")]
impl StdError for TypeError {}

/// Errors from [`crate::dataset::Dataset`] operations.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum DatasetError {
    Duplicate { tag: Tag, name: String },
    NotFound { tag: Tag, name: String },
    CoordMismatch { label: Label },
    EdgeConflict { label: Label },
    /// A `Handle::ValueMut` was passed to a read-only view constructor.
    WriteHandleNotSupported,
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetError::Duplicate { tag, name } => {
                write!(f, "duplicate entry for tag {:?} name {:?}", tag, name)
            }
            DatasetError::NotFound { tag, name } => {
                write!(f, "no entry for tag {:?} name {:?}", tag, name)
            }
            DatasetError::CoordMismatch { label } => {
                write!(f, "coordinate mismatch on label {:?}", label)
            }
            DatasetError::EdgeConflict { label } => {
                write!(f, "conflicting edge coordinate on label {:?}", label)
            }
            DatasetError::WriteHandleNotSupported => {
                write!(f, "a write handle requires a mutable view constructor")
            }
        }
    }
}

#[cfg(feature = "std")]
impl StdError for DatasetError {}

/// Errors from [`crate::variable::rebin::rebin`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum RebinError {
    NotEdge { label: Label },
    NotContinuous { label: Label },
    MissingCoord { label: Label },
    NotDimensionCoord { label: Label },
    AuxSizeMismatch { label: Label },
}

impl fmt::Display for RebinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebinError::NotEdge { label } => write!(f, "coord on {:?} is not an edge coord", label),
            RebinError::NotContinuous { label } => {
                write!(f, "new coord on {:?} is not continuous", label)
            }
            RebinError::MissingCoord { label } => {
                write!(f, "missing dimension coord on {:?}", label)
            }
            RebinError::NotDimensionCoord { label } => {
                write!(f, "new coord is not a dimension coord for {:?}", label)
            }
            RebinError::AuxSizeMismatch { label } => {
                write!(f, "auxiliary dimensions of new coord mismatch on {:?}", label)
            }
        }
    }
}

#[cfg(feature = "std")]
impl StdError for RebinError {}

/// Errors from variance-propagating dataset arithmetic (§4.7).
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum VarianceError {
    Unmatched { name: String },
    ValueMissing { name: String },
}

impl fmt::Display for VarianceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarianceError::Unmatched { name } => {
                write!(f, "variance {:?} present on only one operand", name)
            }
            VarianceError::ValueMissing { name } => {
                write!(f, "variance {:?} has no matching value entry", name)
            }
        }
    }
}

#[cfg(feature = "std")]
impl StdError for VarianceError {}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
