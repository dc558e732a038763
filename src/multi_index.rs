// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Co-iteration engine for `k` sub-variables over one outer iteration space (§4.2).
//!
//! Per-(sub-variable, outer-axis) strides are precomputed once at construction, so
//! [`MultiIndex::increment`] does one addition per inner step and extra additions only on
//! carry (an outer axis other than the innermost one rolling over). Axes a sub-variable does
//! not depend on get stride 0: advancing them leaves that sub-variable's offset unchanged
//! (broadcasting).

use crate::dimensions::{Dimensions, MAX_NDIM};

/// Precomputed stepping state for `k` sub-variables walked against one outer [`Dimensions`].
#[derive(Clone, Debug)]
pub struct MultiIndex {
    outer_extents: [usize; MAX_NDIM],
    ndim: usize,
    size: usize,
    coord: [usize; MAX_NDIM],
    linear_index: usize,
    /// `strides[v][axis]`: stride of sub-variable `v` along outer axis `axis`, or 0 if `v`
    /// does not depend on that axis.
    strides: Vec<[usize; MAX_NDIM]>,
    offsets: Vec<usize>,
}

impl MultiIndex {
    /// Build from an outer `Dimensions` and the `Dimensions` of each of the `k`
    /// sub-variables to co-iterate.
    pub fn new(outer: &Dimensions, subs: &[Dimensions]) -> Self {
        let ndim = outer.ndim();
        let mut outer_extents = [0usize; MAX_NDIM];
        outer_extents[..ndim].copy_from_slice(outer.extents());

        let strides: Vec<[usize; MAX_NDIM]> = subs
            .iter()
            .map(|sub| {
                let mut row = [0usize; MAX_NDIM];
                for (axis, &label) in outer.labels().iter().enumerate() {
                    if let Some(sub_axis) = sub.labels().iter().position(|&l| l == label) {
                        row[axis] = sub.stride_at(sub_axis);
                    }
                }
                row
            })
            .collect();

        let offsets = vec![0usize; subs.len()];
        let size = outer.volume();

        MultiIndex {
            outer_extents,
            ndim,
            size,
            coord: [0usize; MAX_NDIM],
            linear_index: 0,
            strides,
            offsets,
        }
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Total number of steps across the whole outer iteration space.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current flat position within the outer iteration space, 0-based.
    pub fn linear_index(&self) -> usize {
        self.linear_index
    }

    /// Current linear offset of sub-variable `v` into its own storage.
    pub fn offset(&self, v: usize) -> usize {
        self.offsets[v]
    }

    /// Advance by one step in row-major order (innermost axis fastest). Returns `false` once
    /// the iteration space has been exhausted (call before reading, not after).
    pub fn increment(&mut self) -> bool {
        if self.linear_index >= self.size {
            return false;
        }
        self.linear_index += 1;
        if self.linear_index == self.size {
            return true;
        }
        // Walk from the innermost axis outward, carrying on wrap-around.
        for axis in (0..self.ndim).rev() {
            self.coord[axis] += 1;
            for v in 0..self.offsets.len() {
                self.offsets[v] += self.strides[v][axis];
            }
            if self.coord[axis] < self.outer_extents[axis] {
                return true;
            }
            // Carry: reset this axis back to 0 and its contribution to every offset.
            for v in 0..self.offsets.len() {
                self.offsets[v] -= self.strides[v][axis] * self.outer_extents[axis];
            }
            self.coord[axis] = 0;
        }
        true
    }

    /// Reconstruct `coord` and every sub-variable offset from the flat index `i` directly,
    /// without stepping through the intervening positions.
    pub fn set_index(&mut self, i: usize) {
        self.linear_index = i;
        let mut rem = i;
        for axis in (0..self.ndim).rev() {
            let extent = self.outer_extents[axis].max(1);
            self.coord[axis] = rem % extent;
            rem /= extent;
        }
        for v in 0..self.offsets.len() {
            let mut offset = 0usize;
            for axis in 0..self.ndim {
                offset += self.coord[axis] * self.strides[v][axis];
            }
            self.offsets[v] = offset;
        }
    }
}
