//! Reference-counted backing buffer shared by tensors and their views.
//!
//! A [`Storage`] owns one growable buffer of elements. Cloning a `Storage`
//! acquires another reference to the same buffer and dropping it releases that
//! reference; the buffer is freed exactly once, when the last reference goes.
//!
//! Elements are stored as [`Cell`]s so that any tensor holding a reference can
//! write shared elements through `&self`: writes through one alias are visible
//! through every other alias immediately. The buffer itself sits behind a
//! [`RefCell`] so that [`Storage::ensure_capacity`] can reallocate it in place;
//! aliases observe the new buffer because they hold the `Storage`, never a raw
//! pointer into it.
//!
//! `Storage` is neither `Send` nor `Sync`.

use crate::element::Element;
use crate::error::{AllocationError, IndexError, TensorResult};
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// Shared, growable element buffer.
pub struct Storage<T: Element> {
    buffer: Rc<RefCell<Vec<Cell<T>>>>,
}

impl<T: Element> Storage<T> {
    /// Allocate a zero-filled buffer of `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::OutOfMemory`] if the allocator refuses the
    /// request.
    ///
    /// # Examples
    ///
    /// ```
    /// use stridx_core::Storage;
    ///
    /// let storage = Storage::<f32>::new(4).unwrap();
    /// assert_eq!(storage.capacity(), 4);
    /// assert_eq!(storage.ref_count(), 1);
    /// ```
    pub fn new(capacity: usize) -> TensorResult<Self> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| AllocationError::OutOfMemory {
                capacity: 0,
                requested: capacity,
            })?;
        buffer.resize_with(capacity, || Cell::new(T::zero()));
        log::trace!("allocated {} storage of {} elements", T::DTYPE, capacity);
        Ok(Self {
            buffer: Rc::new(RefCell::new(buffer)),
        })
    }

    /// Take ownership of an existing vector as the buffer.
    pub fn from_vec(data: Vec<T>) -> Self {
        let buffer = data.into_iter().map(Cell::new).collect();
        Self {
            buffer: Rc::new(RefCell::new(buffer)),
        }
    }

    /// Number of elements the buffer can address.
    pub fn capacity(&self) -> usize {
        self.buffer.borrow().len()
    }

    /// Number of live references (tensors and storage handles) to the buffer.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.buffer)
    }

    /// Whether two handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &Storage<T>) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// Grow the buffer so that it holds at least `footprint` elements.
    ///
    /// New slots are zero-filled. Every tensor sharing this storage sees the
    /// grown buffer; any slice obtained from [`Storage::cells`] before the call
    /// must be fetched again afterwards.
    ///
    /// Returns the capacity after the call.
    ///
    /// # Errors
    ///
    /// - [`AllocationError::OutOfMemory`] if the allocator cannot satisfy the
    ///   request
    /// - [`AllocationError::Borrowed`] if a traversal still holds the buffer
    pub fn ensure_capacity(&self, footprint: usize) -> TensorResult<usize> {
        self.grow(footprint, footprint)
    }

    /// Like [`Storage::ensure_capacity`], but when growth is needed reserve
    /// `chunk` extra elements beyond `footprint`.
    pub fn ensure_capacity_chunk(&self, footprint: usize, chunk: usize) -> TensorResult<usize> {
        let target = footprint
            .checked_add(chunk)
            .ok_or(AllocationError::Overflow)?;
        self.grow(footprint, target)
    }

    fn grow(&self, needed: usize, target: usize) -> TensorResult<usize> {
        let capacity = self.capacity();
        if needed <= capacity {
            return Ok(capacity);
        }
        let mut buffer = self
            .buffer
            .try_borrow_mut()
            .map_err(|_| AllocationError::Borrowed { capacity })?;
        buffer
            .try_reserve_exact(target - capacity)
            .map_err(|_| AllocationError::OutOfMemory {
                capacity,
                requested: target,
            })?;
        buffer.resize_with(target, || Cell::new(T::zero()));
        log::debug!(
            "grew {} storage from {} to {} elements ({} refs)",
            T::DTYPE,
            capacity,
            target,
            self.ref_count()
        );
        Ok(target)
    }

    /// Borrow the whole buffer.
    ///
    /// The returned guard blocks growth of this storage until it is dropped.
    pub fn cells(&self) -> Ref<'_, [Cell<T>]> {
        Ref::map(self.buffer.borrow(), |buffer| buffer.as_slice())
    }

    /// Read the element at buffer position `index`.
    pub fn get(&self, index: usize) -> TensorResult<T> {
        let cells = self.cells();
        cells
            .get(index)
            .map(Cell::get)
            .ok_or_else(|| self.position_error(index, cells.len()))
    }

    /// Write the element at buffer position `index`.
    pub fn set(&self, index: usize, value: T) -> TensorResult<()> {
        let cells = self.cells();
        match cells.get(index) {
            Some(cell) => {
                cell.set(value);
                Ok(())
            }
            None => Err(self.position_error(index, cells.len())),
        }
    }

    fn position_error(&self, index: usize, extent: usize) -> crate::error::TensorError {
        IndexError::PositionOutOfRange {
            axis: 0,
            index,
            extent,
        }
        .into()
    }

    /// Set every element of the buffer to zero.
    pub fn clear(&self) {
        for cell in self.cells().iter() {
            cell.set(T::zero());
        }
    }

    /// Copy the whole buffer out, in buffer order.
    pub fn to_vec(&self) -> Vec<T> {
        self.cells().iter().map(Cell::get).collect()
    }
}

impl<T: Element> Clone for Storage<T> {
    fn clone(&self) -> Self {
        let buffer = Rc::clone(&self.buffer);
        log::trace!("acquired storage ({} refs)", Rc::strong_count(&buffer));
        Self { buffer }
    }
}

impl<T: Element> Drop for Storage<T> {
    fn drop(&mut self) {
        let remaining = Rc::strong_count(&self.buffer) - 1;
        if remaining == 0 {
            log::trace!("releasing storage buffer of {} elements", self.capacity());
        } else {
            log::trace!("released storage ({} refs remaining)", remaining);
        }
    }
}

impl<T: Element> fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("dtype", &T::DTYPE)
            .field("capacity", &self.capacity())
            .field("refs", &self.ref_count())
            .finish()
    }
}
