// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Convenience re-exports of the most commonly used types.
//!
//! ```
//! use labeled_nd::prelude::*;
//! ```

#[doc(no_inline)]
pub use crate::dataset::Dataset;
#[doc(no_inline)]
pub use crate::dimensions::{Dimensions, Label};
#[doc(no_inline)]
pub use crate::dtype::DType;
#[doc(no_inline)]
pub use crate::error::{Error, Result};
#[doc(no_inline)]
pub use crate::mdzipview::{md_zip, md_zip_mut, Handle, Item, MDZipView, ValueMutItem};
#[doc(no_inline)]
pub use crate::tag::{AttrTag, CoordTag, DataTag, Tag};
#[doc(no_inline)]
pub use crate::unit::{Quantity, Unit};
#[doc(no_inline)]
pub use crate::variable::{StorageKind, Variable};
