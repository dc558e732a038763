// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Physical units attached to [`crate::variable::Variable`] values.
//!
//! `Unit` is a small closed sum type rather than a dimensional-analysis system: the set of
//! legal products is an explicit table (mirroring `Unit::Id` and its `operator*` rules in the
//! source this crate's domain model was distilled from), not derived from base-unit exponents.

use std::fmt;

use crate::error::UnitError;

/// A physical unit. `Dimensionless` is the multiplicative identity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum Unit {
    Dimensionless,
    Counts,
    Length,
    Area,
    Energy,
    Time,
    InverseLength,
    InverseTime,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Dimensionless => "dimensionless",
            Unit::Counts => "counts",
            Unit::Length => "m",
            Unit::Area => "m^2",
            Unit::Energy => "meV",
            Unit::Time => "us",
            Unit::InverseLength => "1/m",
            Unit::InverseTime => "1/us",
        };
        f.write_str(s)
    }
}

impl Unit {
    /// `a + b` requires equal units and returns that unit unchanged.
    pub fn add(self, rhs: Unit) -> Result<Unit, UnitError> {
        if self == rhs {
            Ok(self)
        } else {
            Err(UnitError::Mismatch { lhs: self.to_string(), rhs: rhs.to_string() })
        }
    }

    /// `a * b`, following the explicit product table below. Multiplication by
    /// `Dimensionless` is always the identity.
    pub fn mul(self, rhs: Unit) -> Result<Unit, UnitError> {
        use Unit::*;
        let out = match (self, rhs) {
            (Dimensionless, u) | (u, Dimensionless) => u,
            (Length, Length) => Area,
            (Length, InverseLength) | (InverseLength, Length) => Dimensionless,
            (Time, InverseTime) | (InverseTime, Time) => Dimensionless,
            (Counts, Counts) => Counts,
            _ => {
                return Err(UnitError::Unsupported {
                    lhs: self.to_string(),
                    op: "*",
                    rhs: rhs.to_string(),
                })
            }
        };
        Ok(out)
    }

    /// `a / b`, defined as the inverse of [`Unit::mul`]: succeeds exactly where some `c`
    /// exists with `c * b == a`.
    pub fn div(self, rhs: Unit) -> Result<Unit, UnitError> {
        use Unit::*;
        let out = match (self, rhs) {
            (u, Dimensionless) => u,
            (u, v) if u == v => Dimensionless,
            (Area, Length) => Length,
            (Dimensionless, Length) => InverseLength,
            (Dimensionless, Time) => InverseTime,
            (Dimensionless, InverseLength) => Length,
            (Dimensionless, InverseTime) => Time,
            _ => {
                return Err(UnitError::Unsupported {
                    lhs: self.to_string(),
                    op: "/",
                    rhs: rhs.to_string(),
                })
            }
        };
        Ok(out)
    }
}

/// A scalar value tagged with a [`Unit`]; the scalar right-hand side of `Variable` arithmetic
/// (§6) when the caller wants the operation to compose units instead of leaving them
/// unchanged.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quantity<T> {
    pub value: T,
    pub unit: Unit,
}

impl<T> Quantity<T> {
    pub fn new(value: T, unit: Unit) -> Self {
        Quantity { value, unit }
    }
}
