//! Shape specifications and the view-transform algebra.
//!
//! A [`ShapeSpec`] describes how to read a flat buffer as an N-dimensional
//! array: an extent and a stride per axis, plus an offset into the buffer.
//! It knows nothing about storage. Every transform (`select`, `narrow`,
//! `transpose`, `permute`, `unfold`, `resize`, ...) is a pure function that
//! validates its arguments and returns a new spec; a failing call never
//! produces a partially transformed value.
//!
//! # Footprint
//!
//! The footprint of a spec is the number of buffer elements it needs:
//!
//! ```text
//! footprint = offset + 1 + Σ (extent_i − 1) · stride_i
//! ```
//!
//! A tensor binding a spec to a storage keeps `footprint <= capacity`.
//!
//! # Examples
//!
//! ```
//! use stridx_core::ShapeSpec;
//!
//! let spec = ShapeSpec::row_major(&[2, 3]).unwrap();
//! assert_eq!(spec.strides(), &[3, 1]);
//! assert_eq!(spec.footprint(), 6);
//!
//! let t = spec.transpose(0, 1).unwrap();
//! assert_eq!(t.extents(), &[3, 2]);
//! assert_eq!(t.strides(), &[1, 3]);
//! assert!(!t.is_contiguous());
//! ```

use crate::error::{
    AllocationError, DimensionError, IndexError, RankError, TensorError, TensorResult,
};
use smallvec::SmallVec;
use std::fmt;

/// Largest supported rank.
pub const MAX_RANK: usize = 8;

/// Per-axis values (extents, strides or indices) without heap allocation.
pub type Dims = SmallVec<[usize; MAX_RANK]>;

/// Rank, per-axis extent and stride, and buffer offset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShapeSpec {
    extents: Dims,
    strides: Dims,
    offset: usize,
}

/// Row-major strides for `extents`: the last axis has stride 1 and every
/// other stride is the product of the extents after it.
pub fn row_major_strides(extents: &[usize]) -> Dims {
    let mut strides: Dims = SmallVec::from_elem(0, extents.len());
    let mut step = 1usize;
    for (stride, &extent) in strides.iter_mut().zip(extents.iter()).rev() {
        *stride = step;
        step = step.saturating_mul(extent);
    }
    strides
}

fn check_rank(rank: usize) -> TensorResult<()> {
    if rank > MAX_RANK {
        return Err(RankError::TooLarge {
            rank,
            max: MAX_RANK,
        }
        .into());
    }
    Ok(())
}

impl ShapeSpec {
    /// Rank-0 spec addressing a single element at offset 0.
    pub fn scalar() -> Self {
        Self {
            extents: SmallVec::new(),
            strides: SmallVec::new(),
            offset: 0,
        }
    }

    /// Row-major spec with zero offset.
    ///
    /// # Errors
    ///
    /// - [`RankError::TooLarge`] if `extents` has more than [`MAX_RANK`] entries
    /// - [`AllocationError::Overflow`] if the element count overflows `usize`
    pub fn row_major(extents: &[usize]) -> TensorResult<Self> {
        check_rank(extents.len())?;
        extents
            .iter()
            .try_fold(1usize, |acc, &e| acc.checked_mul(e))
            .ok_or(AllocationError::Overflow)?;
        Ok(Self {
            extents: SmallVec::from_slice(extents),
            strides: row_major_strides(extents),
            offset: 0,
        })
    }

    /// Spec with explicit strides and offset.
    ///
    /// # Errors
    ///
    /// - [`DimensionError::StrideCount`] if the lengths differ
    /// - [`RankError::TooLarge`] if the rank exceeds [`MAX_RANK`]
    /// - [`AllocationError::Overflow`] if the footprint overflows `usize`
    pub fn with_strides(offset: usize, extents: &[usize], strides: &[usize]) -> TensorResult<Self> {
        if extents.len() != strides.len() {
            return Err(DimensionError::StrideCount {
                extents: extents.to_vec(),
                strides: strides.to_vec(),
            }
            .into());
        }
        check_rank(extents.len())?;
        let spec = Self {
            extents: SmallVec::from_slice(extents),
            strides: SmallVec::from_slice(strides),
            offset,
        };
        spec.checked_footprint()?;
        Ok(spec)
    }

    /// Number of axes.
    #[inline]
    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    /// Extent of every axis.
    #[inline]
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Stride of every axis, in elements.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Buffer position of the first element.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Extent of a single axis.
    pub fn extent(&self, axis: usize) -> TensorResult<usize> {
        self.check_axis(axis)?;
        Ok(self.extents[axis])
    }

    /// Stride of a single axis.
    pub fn stride(&self, axis: usize) -> TensorResult<usize> {
        self.check_axis(axis)?;
        Ok(self.strides[axis])
    }

    /// Product of the extents (1 for rank 0).
    #[inline]
    pub fn element_count(&self) -> usize {
        self.extents.iter().product()
    }

    /// Whether the spec addresses no element at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.extents.contains(&0)
    }

    /// Number of buffer elements needed to back this spec.
    ///
    /// A spec with a zero extent needs only its offset.
    pub fn footprint(&self) -> usize {
        if self.is_empty() {
            return self.offset;
        }
        self.extents
            .iter()
            .zip(self.strides.iter())
            .fold(self.offset + 1, |acc, (&e, &s)| acc + (e - 1) * s)
    }

    fn checked_footprint(&self) -> TensorResult<usize> {
        if self.is_empty() {
            return Ok(self.offset);
        }
        let mut footprint = self.offset.checked_add(1);
        for (&e, &s) in self.extents.iter().zip(self.strides.iter()) {
            footprint = footprint
                .zip((e - 1).checked_mul(s))
                .and_then(|(acc, span)| acc.checked_add(span));
        }
        footprint.ok_or_else(|| AllocationError::Overflow.into())
    }

    /// Whether the strides match row-major packing of the extents.
    ///
    /// Axes of extent 1 are never stepped over, so their stride is ignored.
    pub fn is_contiguous(&self) -> bool {
        if self.is_empty() {
            return true;
        }
        let mut expected = 1usize;
        for (&extent, &stride) in self.extents.iter().zip(self.strides.iter()).rev() {
            if extent != 1 && stride != expected {
                return false;
            }
            expected *= extent;
        }
        true
    }

    /// Whether both specs have the same extents, whatever their strides.
    ///
    /// Specs of the same shape can be traversed in lock-step.
    pub fn same_shape(&self, other: &ShapeSpec) -> bool {
        self.extents == other.extents
    }

    fn check_axis(&self, axis: usize) -> TensorResult<()> {
        if axis >= self.rank() {
            return Err(TensorError::axis_out_of_range(axis, self.rank()));
        }
        Ok(())
    }

    /// Buffer position of the element at `indices`, bounds-checked.
    ///
    /// # Errors
    ///
    /// - [`RankError::Mismatch`] if `indices.len() != rank`
    /// - [`IndexError::PositionOutOfRange`] for an index beyond its extent
    pub fn flat_offset(&self, indices: &[usize]) -> TensorResult<usize> {
        if indices.len() != self.rank() {
            return Err(TensorError::rank_mismatch(
                "index",
                self.rank(),
                indices.len(),
            ));
        }
        let mut position = self.offset;
        for (axis, ((&index, &extent), &stride)) in indices
            .iter()
            .zip(self.extents.iter())
            .zip(self.strides.iter())
            .enumerate()
        {
            if index >= extent {
                return Err(IndexError::PositionOutOfRange {
                    axis,
                    index,
                    extent,
                }
                .into());
            }
            position += index * stride;
        }
        Ok(position)
    }

    /// Drop `axis`, fixing it at `index`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stridx_core::ShapeSpec;
    ///
    /// let spec = ShapeSpec::row_major(&[2, 3, 4]).unwrap();
    /// let row = spec.select(1, 2).unwrap();
    /// assert_eq!(row.extents(), &[2, 4]);
    /// assert_eq!(row.offset(), 8);
    /// ```
    pub fn select(&self, axis: usize, index: usize) -> TensorResult<Self> {
        self.check_axis(axis)?;
        let extent = self.extents[axis];
        if index >= extent {
            return Err(IndexError::PositionOutOfRange {
                axis,
                index,
                extent,
            }
            .into());
        }
        let mut extents = self.extents.clone();
        let mut strides = self.strides.clone();
        extents.remove(axis);
        let stride = strides.remove(axis);
        Ok(Self {
            extents,
            strides,
            offset: self.offset + index * stride,
        })
    }

    /// Restrict `axis` to `size` positions starting at `start`.
    pub fn narrow(&self, axis: usize, size: usize, start: usize) -> TensorResult<Self> {
        self.check_axis(axis)?;
        let extent = self.extents[axis];
        let fits = start.checked_add(size).is_some_and(|end| end <= extent);
        if size < 1 || !fits {
            return Err(IndexError::NarrowOutOfRange {
                axis,
                size,
                start,
                extent,
            }
            .into());
        }
        let mut spec = self.clone();
        spec.extents[axis] = size;
        spec.offset += start * self.strides[axis];
        Ok(spec)
    }

    /// Swap two axes.
    pub fn transpose(&self, a: usize, b: usize) -> TensorResult<Self> {
        self.check_axis(a)?;
        self.check_axis(b)?;
        let mut spec = self.clone();
        spec.extents.swap(a, b);
        spec.strides.swap(a, b);
        Ok(spec)
    }

    /// Reorder all axes: axis `i` of the result is axis `permutation[i]` of
    /// `self`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidPermutation`] unless `permutation` contains
    /// every axis exactly once.
    pub fn permute(&self, permutation: &[usize]) -> TensorResult<Self> {
        let rank = self.rank();
        let mut seen = [false; MAX_RANK];
        let valid = permutation.len() == rank
            && permutation
                .iter()
                .all(|&axis| axis < rank && !std::mem::replace(&mut seen[axis], true));
        if !valid {
            return Err(IndexError::InvalidPermutation {
                permutation: permutation.to_vec(),
                rank,
            }
            .into());
        }
        Ok(Self {
            extents: permutation.iter().map(|&p| self.extents[p]).collect(),
            strides: permutation.iter().map(|&p| self.strides[p]).collect(),
            offset: self.offset,
        })
    }

    /// Move `axis` to `position`, keeping the other axes in order.
    pub fn shift_axis(&self, axis: usize, position: usize) -> TensorResult<Self> {
        self.check_axis(axis)?;
        self.check_axis(position)?;
        let mut order: Dims = (0..self.rank()).collect();
        let moved = order.remove(axis);
        order.insert(position, moved);
        self.permute(&order)
    }

    /// Expose a sliding window along `axis` as a new trailing axis.
    ///
    /// The trailing axis has extent `window` and the original stride of
    /// `axis`. `axis` keeps one position per window start, `1 + (extent −
    /// window) / step` of them, and its stride is multiplied by `step`. No
    /// element is copied, so a convolution becomes a contraction over the new
    /// axis.
    ///
    /// # Errors
    ///
    /// - [`IndexError::AxisOutOfRange`] for a bad axis
    /// - [`DimensionError::Unfold`] if `window < 1`, `step < 1`,
    ///   `window > extent` or `(extent − window) % step != 0`
    /// - [`RankError::TooLarge`] if the result would exceed [`MAX_RANK`]
    ///
    /// # Examples
    ///
    /// ```
    /// use stridx_core::ShapeSpec;
    ///
    /// let spec = ShapeSpec::row_major(&[7]).unwrap();
    /// let windows = spec.unfold(0, 3, 2).unwrap();
    /// assert_eq!(windows.extents(), &[3, 3]);
    /// assert_eq!(windows.strides(), &[2, 1]);
    /// ```
    pub fn unfold(&self, axis: usize, window: usize, step: usize) -> TensorResult<Self> {
        self.check_axis(axis)?;
        let extent = self.extents[axis];
        if window < 1 || step < 1 || window > extent || (extent - window) % step != 0 {
            return Err(DimensionError::Unfold {
                axis,
                extent,
                window,
                step,
            }
            .into());
        }
        check_rank(self.rank() + 1)?;
        let stride = self.strides[axis];
        let mut spec = self.clone();
        spec.extents[axis] = 1 + (extent - window) / step;
        spec.strides[axis] = stride * step;
        spec.extents.push(window);
        spec.strides.push(stride);
        Ok(spec)
    }

    /// Same rank, new extents, row-major strides, offset unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::Mismatch`] if `extents.len() != rank`.
    pub fn resize(&self, extents: &[usize]) -> TensorResult<Self> {
        if extents.len() != self.rank() {
            return Err(TensorError::rank_mismatch(
                "resize",
                self.rank(),
                extents.len(),
            ));
        }
        let spec = Self {
            extents: SmallVec::from_slice(extents),
            strides: row_major_strides(extents),
            offset: self.offset,
        };
        spec.checked_footprint()?;
        Ok(spec)
    }

    /// Resize a single axis, recomputing row-major strides.
    pub fn resize_axis(&self, axis: usize, size: usize) -> TensorResult<Self> {
        self.check_axis(axis)?;
        let mut extents = self.extents.clone();
        extents[axis] = size;
        self.resize(&extents)
    }
}

impl fmt::Display for ShapeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ShapeSpec(rank={}, offset={}, extents={:?}, strides={:?})",
            self.rank(),
            self.offset,
            self.extents.as_slice(),
            self.strides.as_slice()
        )
    }
}
