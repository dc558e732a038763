// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Variable tags: the fixed enumeration partitioned into `Coord`/`Data`/`Attr` ranges (§3).
//!
//! Grounded on the `CoordDef`/`DataDef`/`AttrDef` catalogues in the source this crate's
//! domain model was distilled from: each tag carries a default [`DType`] and [`Unit`], and
//! some coord tags are permanently bound to one dimension [`Label`].

use std::fmt;

use crate::dimensions::Label;
use crate::dtype::DType;
use crate::unit::Unit;

/// Coordinate tags. Some are *dimension coords*, permanently bound to one [`Label`]
/// (see [`CoordTag::dimension_label`]); the rest are non-dimension coordinates/metadata.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum CoordTag {
    X,
    Y,
    Z,
    Tof,
    Spectrum,
    DetectorGrouping,
    DetectorPosition,
}

/// Data tags: measured quantities, always named within a [`crate::dataset::Dataset`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum DataTag {
    Value,
    Variance,
}

/// Attribute tags: metadata riding alongside data, combined under dataset arithmetic with
/// "present on both sides" semantics (§4.7).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum AttrTag {
    ExperimentLog,
    RunTitle,
    /// A coord demoted from dataset level by a non-range slice over its own dimension
    /// (§4.5); carries the original coord tag it was demoted from.
    UnalignedCoord(CoordTag),
}

/// The fixed tag enumeration, partitioned into three non-overlapping ranges (§3).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Tag {
    Coord(CoordTag),
    Data(DataTag),
    Attr(AttrTag),
}

impl Tag {
    pub fn is_coord(self) -> bool {
        matches!(self, Tag::Coord(_))
    }

    /// Coord tags (and only coord tags) require an empty name (§3: "Coord tags allow at most
    /// one entry (name is empty)").
    pub fn requires_empty_name(self) -> bool {
        self.is_coord()
    }

    pub fn default_dtype(self) -> DType {
        match self {
            Tag::Coord(CoordTag::X)
            | Tag::Coord(CoordTag::Y)
            | Tag::Coord(CoordTag::Z)
            | Tag::Coord(CoordTag::Tof) => DType::F64,
            Tag::Coord(CoordTag::Spectrum) => DType::I64,
            // One nested Dataset per spectrum, each holding that spectrum's detector index
            // list as a Data::Value entry — a jagged array, not a flat I64 column.
            Tag::Coord(CoordTag::DetectorGrouping) => DType::Dataset,
            Tag::Coord(CoordTag::DetectorPosition) => DType::Vector3,
            Tag::Data(DataTag::Value) | Tag::Data(DataTag::Variance) => DType::F64,
            Tag::Attr(AttrTag::ExperimentLog) => DType::Dataset,
            Tag::Attr(AttrTag::RunTitle) => DType::String,
            Tag::Attr(AttrTag::UnalignedCoord(ct)) => Tag::Coord(ct).default_dtype(),
        }
    }

    pub fn default_unit(self) -> Unit {
        match self {
            Tag::Coord(CoordTag::X) | Tag::Coord(CoordTag::Y) | Tag::Coord(CoordTag::Z) => {
                Unit::Length
            }
            Tag::Coord(CoordTag::Tof) => Unit::Time,
            Tag::Coord(CoordTag::DetectorPosition) => Unit::Length,
            Tag::Data(DataTag::Value) | Tag::Data(DataTag::Variance) => Unit::Counts,
            Tag::Attr(AttrTag::UnalignedCoord(ct)) => Tag::Coord(ct).default_unit(),
            _ => Unit::Dimensionless,
        }
    }

    /// Some coord tags are bound permanently to one dimension label.
    pub fn dimension_label(self) -> Option<Label> {
        match self {
            Tag::Coord(CoordTag::X) => Some(Label::X),
            Tag::Coord(CoordTag::Y) => Some(Label::Y),
            Tag::Coord(CoordTag::Z) => Some(Label::Z),
            Tag::Coord(CoordTag::Tof) => Some(Label::Tof),
            Tag::Coord(CoordTag::Spectrum) => Some(Label::Spectrum),
            _ => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
