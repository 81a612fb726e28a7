//! The tensor handle: a shared [`Storage`] read through an owned [`ShapeSpec`].
//!
//! Tensors are cheap handles. Constructors allocate storage sized to the
//! spec's footprint; view operations (`select`, `narrow`, `transpose`,
//! `permute`, `unfold`, `shift_axis`) share the source's storage with a
//! transformed spec, in O(1) and without copying. Writes through any view are
//! visible through every tensor that addresses the same elements.
//!
//! Cloning a tensor produces another alias of the same storage; use
//! [`Tensor::deep_copy`] for an independent copy.
//!
//! # Examples
//!
//! ```
//! use stridx_core::Tensor;
//!
//! let a = Tensor::from_vec((0..6).map(|x| x as f64).collect(), &[2, 3]).unwrap();
//! let b = a.transpose(0, 1).unwrap();
//! assert_eq!(b.get(&[1, 0]).unwrap(), a.get(&[0, 1]).unwrap());
//!
//! b.set(&[2, 1], 42.0).unwrap();
//! assert_eq!(a.get(&[1, 2]).unwrap(), 42.0);
//! ```

use crate::element::Element;
use crate::error::{ShapeMismatchError, TensorError, TensorResult};
use crate::iter::{DimIter, Offsets, ScalarIter};
use crate::shape::ShapeSpec;
use crate::storage::Storage;
use scirs2_core::ndarray_ext::{ArrayD, IxDyn};
use std::fmt;

/// N-dimensional strided array over shared storage.
#[derive(Clone)]
pub struct Tensor<T: Element> {
    storage: Storage<T>,
    spec: ShapeSpec,
}

impl<T: Element> Tensor<T> {
    /// Zero-filled row-major tensor with fresh storage.
    ///
    /// # Errors
    ///
    /// - [`RankError::TooLarge`](crate::error::RankError::TooLarge) for more
    ///   than [`MAX_RANK`](crate::shape::MAX_RANK) extents
    /// - [`AllocationError`](crate::error::AllocationError) if the storage
    ///   cannot be allocated
    pub fn new(extents: &[usize]) -> TensorResult<Self> {
        let spec = ShapeSpec::row_major(extents)?;
        let storage = Storage::new(spec.footprint())?;
        Ok(Self { storage, spec })
    }

    /// Alias of [`Tensor::new`].
    pub fn zeros(extents: &[usize]) -> TensorResult<Self> {
        Self::new(extents)
    }

    /// Row-major tensor with every element set to `value`.
    pub fn full(extents: &[usize], value: T) -> TensorResult<Self> {
        let tensor = Self::new(extents)?;
        tensor.fill(value);
        Ok(tensor)
    }

    /// Rank-0 tensor holding one value.
    pub fn scalar(value: T) -> Self {
        Self {
            storage: Storage::from_vec(vec![value]),
            spec: ShapeSpec::scalar(),
        }
    }

    /// Row-major tensor over `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeMismatchError::DataLength`] if `data.len()` differs from
    /// the product of `extents`.
    pub fn from_vec(data: Vec<T>, extents: &[usize]) -> TensorResult<Self> {
        let spec = ShapeSpec::row_major(extents)?;
        let expected = spec.element_count();
        if data.len() != expected {
            return Err(ShapeMismatchError::DataLength {
                len: data.len(),
                extents: extents.to_vec(),
                expected,
            }
            .into());
        }
        Ok(Self {
            storage: Storage::from_vec(data),
            spec,
        })
    }

    /// Attach to an existing storage through `spec`.
    ///
    /// The storage is acquired, and grown if `spec` reaches past its end.
    pub fn from_storage(storage: &Storage<T>, spec: ShapeSpec) -> TensorResult<Self> {
        storage.ensure_capacity(spec.footprint())?;
        Ok(Self {
            storage: storage.clone(),
            spec,
        })
    }

    /// Build a tensor from a scirs2 ndarray, copying its elements in logical
    /// order.
    pub fn from_array(array: &ArrayD<T>) -> TensorResult<Self> {
        Self::from_vec(array.iter().copied().collect(), array.shape())
    }

    /// Copy this tensor into a standard-layout scirs2 ndarray.
    pub fn to_array(&self) -> TensorResult<ArrayD<T>> {
        let data = self.to_vec();
        let len = data.len();
        ArrayD::from_shape_vec(IxDyn(self.extents()), data).map_err(|_| {
            ShapeMismatchError::DataLength {
                len,
                extents: self.extents().to_vec(),
                expected: self.element_count(),
            }
            .into()
        })
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// The shape spec of this handle.
    #[inline]
    pub fn spec(&self) -> &ShapeSpec {
        &self.spec
    }

    /// The storage this handle reads from.
    #[inline]
    pub fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.spec.rank()
    }

    #[inline]
    pub fn extents(&self) -> &[usize] {
        self.spec.extents()
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        self.spec.strides()
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.spec.offset()
    }

    /// Extent of one axis.
    pub fn extent(&self, axis: usize) -> TensorResult<usize> {
        self.spec.extent(axis)
    }

    /// Product of the extents.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.spec.element_count()
    }

    #[inline]
    pub fn footprint(&self) -> usize {
        self.spec.footprint()
    }

    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.spec.is_contiguous()
    }

    /// Whether both tensors have the same extents.
    pub fn same_shape<U: Element>(&self, other: &Tensor<U>) -> bool {
        self.spec.same_shape(other.spec())
    }

    /// Whether both tensors read from the same storage.
    pub fn shares_storage(&self, other: &Tensor<T>) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    fn view(&self, spec: ShapeSpec) -> Self {
        Self {
            storage: self.storage.clone(),
            spec,
        }
    }

    /// View with `axis` fixed at `index` (rank − 1).
    pub fn select(&self, axis: usize, index: usize) -> TensorResult<Self> {
        Ok(self.view(self.spec.select(axis, index)?))
    }

    /// View of `size` positions of `axis` starting at `start`.
    pub fn narrow(&self, axis: usize, size: usize, start: usize) -> TensorResult<Self> {
        Ok(self.view(self.spec.narrow(axis, size, start)?))
    }

    /// View with axes `a` and `b` swapped.
    pub fn transpose(&self, a: usize, b: usize) -> TensorResult<Self> {
        Ok(self.view(self.spec.transpose(a, b)?))
    }

    /// View with all axes reordered.
    pub fn permute(&self, permutation: &[usize]) -> TensorResult<Self> {
        Ok(self.view(self.spec.permute(permutation)?))
    }

    /// View with `axis` moved to `position`.
    pub fn shift_axis(&self, axis: usize, position: usize) -> TensorResult<Self> {
        Ok(self.view(self.spec.shift_axis(axis, position)?))
    }

    /// Sliding-window view: windows of `window` positions every `step`
    /// positions along `axis`, exposed as a new trailing axis.
    ///
    /// The view's footprint equals the source's, so no storage growth is ever
    /// needed.
    pub fn unfold(&self, axis: usize, window: usize, step: usize) -> TensorResult<Self> {
        Ok(self.view(self.spec.unfold(axis, window, step)?))
    }

    // ------------------------------------------------------------------
    // Shape mutation
    // ------------------------------------------------------------------

    /// Change the extents (same rank), growing the storage if needed.
    ///
    /// Strides become row-major and the offset is kept. On failure the tensor
    /// is left unchanged.
    pub fn resize(&mut self, extents: &[usize]) -> TensorResult<()> {
        let spec = self.spec.resize(extents)?;
        self.rebind(spec, 0)
    }

    /// Change the extent of one axis, growing the storage if needed.
    pub fn resize_axis(&mut self, axis: usize, size: usize) -> TensorResult<()> {
        let spec = self.spec.resize_axis(axis, size)?;
        self.rebind(spec, 0)
    }

    /// Like [`Tensor::resize`], reserving `chunk` extra elements whenever the
    /// storage has to grow.
    pub fn resize_chunk(&mut self, extents: &[usize], chunk: usize) -> TensorResult<()> {
        let spec = self.spec.resize(extents)?;
        self.rebind(spec, chunk)
    }

    fn rebind(&mut self, spec: ShapeSpec, chunk: usize) -> TensorResult<()> {
        let capacity = self
            .storage
            .ensure_capacity_chunk(spec.footprint(), chunk)?;
        log::trace!(
            "resized tensor {:?} -> {:?} (capacity {})",
            self.extents(),
            spec.extents(),
            capacity
        );
        self.spec = spec;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------

    /// Read one element.
    ///
    /// # Errors
    ///
    /// - [`RankError::Mismatch`](crate::error::RankError::Mismatch) if
    ///   `indices.len() != rank`
    /// - [`IndexError::PositionOutOfRange`](crate::error::IndexError) for an
    ///   index beyond its axis
    pub fn get(&self, indices: &[usize]) -> TensorResult<T> {
        let position = self.spec.flat_offset(indices)?;
        self.storage.get(position)
    }

    /// Write one element. Every alias of the element sees the new value.
    pub fn set(&self, indices: &[usize], value: T) -> TensorResult<()> {
        let position = self.spec.flat_offset(indices)?;
        self.storage.set(position, value)
    }

    /// Set every addressed element to `value`.
    pub fn fill(&self, value: T) {
        let cells = self.storage.cells();
        for position in self.offsets() {
            if let Some(cell) = cells.get(position) {
                cell.set(value);
            }
        }
    }

    /// Set every addressed element to zero.
    pub fn clear(&self) {
        self.fill(T::zero());
    }

    /// Elements in canonical order (last axis fastest).
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Contiguous copy with its own storage.
    pub fn deep_copy(&self) -> TensorResult<Self> {
        Self::from_vec(self.to_vec(), self.extents())
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// Storage positions of every element, in canonical order.
    pub fn offsets(&self) -> Offsets {
        Offsets::new(&self.spec)
    }

    /// Scalar iterator over every element.
    ///
    /// The iterator borrows the storage: growing it through an alias fails
    /// until the iterator is dropped.
    pub fn iter(&self) -> ScalarIter<'_, T> {
        ScalarIter::new(self)
    }

    /// Iterator over the `select(axis, i)` views for every `i`.
    pub fn dim_iter(&self, axis: usize) -> TensorResult<DimIter<'_, T>> {
        DimIter::new(self, axis)
    }
}

impl<T: Element> fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("dtype", &T::DTYPE)
            .field("extents", &self.extents())
            .field("strides", &self.strides())
            .field("offset", &self.offset())
            .field("refs", &self.storage.ref_count())
            .finish()
    }
}

impl<T: Element> TryFrom<&ArrayD<T>> for Tensor<T> {
    type Error = TensorError;

    fn try_from(array: &ArrayD<T>) -> TensorResult<Self> {
        Self::from_array(array)
    }
}
