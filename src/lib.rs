// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![cfg_attr(docsrs, feature(doc_cfg))]

//! `labeled-nd` is a labelled, copy-on-write N-dimensional array with attached physical
//! units, built around a `Dataset` container for scientific data reduction (neutron
//! scattering and similar instruments).
//!
//! - [`Variable`](variable::Variable): a type-erased, unit-tagged, copy-on-write array whose
//!   axes are named [`Label`](dimensions::Label)s rather than positional indices — arithmetic
//!   broadcasts and transposes automatically because axes are matched by label.
//! - [`Dataset`](dataset::Dataset): an ordered `(Tag, name)`-keyed collection of `Variable`s
//!   sharing one global [`Dimensions`](dimensions::Dimensions).
//! - [`MDZipView`](mdzipview::MDZipView): zero-copy, label-resolved co-iteration over several
//!   `Dataset` entries at once, including bin-edge coordinates, derived getters, and nesting.
//!
//! ## Crate feature flags
//!
//! - `std` (default): enables `std::error::Error` impls and the `num-traits` std feature.
//! - `rayon`: parallelises `rebin` and related bulk operations over outer indices on top of
//!   the sequential fallback; implies `std`.
//!
//! ## Errors
//!
//! Every fallible public function returns [`error::Result<T>`], a type alias for
//! `Result<T, error::Error>`. `Error` is an umbrella over one `#[non_exhaustive]` enum per
//! subsystem (dimension, unit, dtype, dataset, rebin, variance) so callers can match on the
//! failure family without the umbrella itself growing new variants across releases.

pub mod dataset;
pub mod dimensions;
pub mod dtype;
pub mod error;
pub mod mdzipview;
pub mod multi_index;
pub mod prelude;
pub mod tag;
pub mod unit;
pub mod variable;

pub use dataset::Dataset;
pub use dimensions::{Dimensions, Label};
pub use dtype::DType;
pub use error::{Error, Result};
pub use mdzipview::{md_zip, md_zip_mut, Handle, Item, MDZipView, ValueMutItem};
pub use multi_index::MultiIndex;
pub use tag::{AttrTag, CoordTag, DataTag, Tag};
pub use unit::{Quantity, Unit};
pub use variable::{ConstVariableSlice, Op, StorageKind, Variable, VariableSlice};
