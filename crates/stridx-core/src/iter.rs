//! Iteration over strided tensors.
//!
//! Two kinds of traversal:
//!
//! - **Scalar** ([`Offsets`], [`ScalarIter`]): every element once, last axis
//!   fastest. At construction the walker picks one of two paths:
//!   - *flat*: a single position advanced by a fixed step, used when the spec
//!     is contiguous (step 1) or has rank 1 (step = its stride)
//!   - *odometer*: one counter per axis; when an axis reaches its extent it
//!     resets and carries into the axis before it
//! - **Dimension** ([`DimIter`]): the `select(axis, i)` views for each `i`,
//!   sharing the source's storage.
//!
//! [`zip_scalars`], [`zip3_scalars`], [`zip_dims`] and [`zip3_dims`] advance
//! several traversals in lock-step after checking that they line up.
//!
//! A [`ScalarIter`] borrows its tensor's storage for its whole lifetime, so the
//! storage cannot be reallocated under it.

use crate::element::Element;
use crate::error::{ShapeMismatchError, TensorError, TensorResult};
use crate::shape::{Dims, ShapeSpec};
use crate::tensor::Tensor;
use smallvec::SmallVec;
use std::cell::{Cell, Ref};

#[derive(Clone, Debug)]
enum Walk {
    Flat {
        next: usize,
        step: usize,
    },
    Odometer {
        extents: Dims,
        strides: Dims,
        index: Dims,
        next: usize,
    },
}

/// Storage positions of a spec's elements in canonical order.
#[derive(Clone, Debug)]
pub struct Offsets {
    walk: Walk,
    remaining: usize,
}

impl Offsets {
    /// Walker over `spec`, choosing the flat or the odometer path.
    pub fn new(spec: &ShapeSpec) -> Self {
        let remaining = spec.element_count();
        let walk = if spec.is_contiguous() {
            Walk::Flat {
                next: spec.offset(),
                step: 1,
            }
        } else if spec.rank() == 1 {
            Walk::Flat {
                next: spec.offset(),
                step: spec.strides()[0],
            }
        } else {
            Walk::Odometer {
                extents: SmallVec::from_slice(spec.extents()),
                strides: SmallVec::from_slice(spec.strides()),
                index: SmallVec::from_elem(0, spec.rank()),
                next: spec.offset(),
            }
        };
        Self { walk, remaining }
    }

    /// Whether this walker uses the flat path.
    pub fn is_flat(&self) -> bool {
        matches!(self.walk, Walk::Flat { .. })
    }
}

impl Iterator for Offsets {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let more = self.remaining > 0;
        match &mut self.walk {
            Walk::Flat { next, step } => {
                let current = *next;
                if more {
                    *next += *step;
                }
                Some(current)
            }
            Walk::Odometer {
                extents,
                strides,
                index,
                next,
            } => {
                let current = *next;
                if more {
                    for axis in (0..extents.len()).rev() {
                        index[axis] += 1;
                        if index[axis] < extents[axis] {
                            *next += strides[axis];
                            break;
                        }
                        // carry
                        *next -= (extents[axis] - 1) * strides[axis];
                        index[axis] = 0;
                    }
                }
                Some(current)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Offsets {}

/// Cursor over every element of a tensor.
///
/// Usable either as a cursor (`not_done` / `value` / `advance`) or as a plain
/// [`Iterator`] of element values.
pub struct ScalarIter<'a, T: Element> {
    cells: Ref<'a, [Cell<T>]>,
    offsets: Offsets,
    current: Option<usize>,
}

impl<'a, T: Element> ScalarIter<'a, T> {
    pub fn new(tensor: &'a Tensor<T>) -> Self {
        let mut offsets = tensor.offsets();
        let current = offsets.next();
        Self {
            cells: tensor.storage().cells(),
            offsets,
            current,
        }
    }

    /// Whether the cursor still points at an element.
    pub fn not_done(&self) -> bool {
        self.current.is_some()
    }

    /// Move to the next element.
    pub fn advance(&mut self) {
        self.current = self.offsets.next();
    }

    /// Value under the cursor.
    pub fn value(&self) -> Option<T> {
        self.current
            .and_then(|position| self.cells.get(position))
            .map(Cell::get)
    }

    /// Overwrite the value under the cursor. Returns `false` once done.
    pub fn set_value(&self, value: T) -> bool {
        match self.current.and_then(|position| self.cells.get(position)) {
            Some(cell) => {
                cell.set(value);
                true
            }
            None => false,
        }
    }

    /// Storage position under the cursor.
    pub fn position(&self) -> Option<usize> {
        self.current
    }

    /// Whether the traversal uses the flat path.
    pub fn is_flat(&self) -> bool {
        self.offsets.is_flat()
    }
}

impl<T: Element> Iterator for ScalarIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let value = self.value()?;
        self.advance();
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.offsets.len() + usize::from(self.current.is_some());
        (n, Some(n))
    }
}

impl<T: Element> ExactSizeIterator for ScalarIter<'_, T> {}

/// Successive `select(axis, i)` views of a tensor.
pub struct DimIter<'a, T: Element> {
    tensor: &'a Tensor<T>,
    axis: usize,
    next: usize,
    extent: usize,
}

impl<'a, T: Element> DimIter<'a, T> {
    /// # Errors
    ///
    /// Returns an [`IndexError`](crate::error::IndexError) if `axis` is not an
    /// axis of `tensor`.
    pub fn new(tensor: &'a Tensor<T>, axis: usize) -> TensorResult<Self> {
        let extent = tensor.extent(axis)?;
        Ok(Self {
            tensor,
            axis,
            next: 0,
            extent,
        })
    }

    pub fn axis(&self) -> usize {
        self.axis
    }
}

impl<T: Element> Iterator for DimIter<'_, T> {
    type Item = Tensor<T>;

    fn next(&mut self) -> Option<Tensor<T>> {
        if self.next >= self.extent {
            return None;
        }
        let view = self.tensor.select(self.axis, self.next).ok();
        self.next += 1;
        view
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.extent - self.next;
        (n, Some(n))
    }
}

impl<T: Element> ExactSizeIterator for DimIter<'_, T> {}

/// Check that several specs have the same element count.
pub fn check_element_counts(operation: &'static str, specs: &[&ShapeSpec]) -> TensorResult<()> {
    let counts: Vec<usize> = specs.iter().map(|s| s.element_count()).collect();
    if counts.windows(2).any(|w| w[0] != w[1]) {
        return Err(TensorError::element_count_mismatch(operation, counts));
    }
    Ok(())
}

fn check_axis_extents(operation: &'static str, axis: usize, specs: &[&ShapeSpec]) -> TensorResult<()> {
    let extents = specs
        .iter()
        .map(|s| s.extent(axis))
        .collect::<TensorResult<Vec<usize>>>()?;
    if extents.windows(2).any(|w| w[0] != w[1]) {
        return Err(ShapeMismatchError::AxisExtent {
            operation,
            axis,
            extents,
        }
        .into());
    }
    Ok(())
}

/// Element pairs of two tensors with the same element count, each in its own
/// canonical order.
///
/// # Errors
///
/// Returns [`ShapeMismatchError::ElementCount`] before touching any element if
/// the counts differ.
///
/// # Examples
///
/// ```
/// use stridx_core::{iter::zip_scalars, Tensor};
///
/// let a = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let b = Tensor::from_vec(vec![10.0f32, 20.0, 30.0, 40.0], &[4]).unwrap();
/// let sums: Vec<f64> = zip_scalars(&a, &b)
///     .unwrap()
///     .map(|(x, y)| x + y as f64)
///     .collect();
/// assert_eq!(sums, vec![11.0, 22.0, 33.0, 44.0]);
/// ```
pub fn zip_scalars<'a, T: Element, U: Element>(
    a: &'a Tensor<T>,
    b: &'a Tensor<U>,
) -> TensorResult<impl Iterator<Item = (T, U)> + 'a> {
    check_element_counts("zip_scalars", &[a.spec(), b.spec()])?;
    Ok(a.iter().zip(b.iter()))
}

/// Element triples of three tensors with the same element count.
pub fn zip3_scalars<'a, T: Element, U: Element, V: Element>(
    a: &'a Tensor<T>,
    b: &'a Tensor<U>,
    c: &'a Tensor<V>,
) -> TensorResult<impl Iterator<Item = (T, U, V)> + 'a> {
    check_element_counts("zip3_scalars", &[a.spec(), b.spec(), c.spec()])?;
    Ok(a.iter().zip(b.iter()).zip(c.iter()).map(|((x, y), z)| (x, y, z)))
}

/// Pairs of `select(axis, i)` views of two tensors with the same extent on
/// `axis`.
pub fn zip_dims<'a, T: Element, U: Element>(
    a: &'a Tensor<T>,
    b: &'a Tensor<U>,
    axis: usize,
) -> TensorResult<impl Iterator<Item = (Tensor<T>, Tensor<U>)> + 'a> {
    check_axis_extents("zip_dims", axis, &[a.spec(), b.spec()])?;
    Ok(a.dim_iter(axis)?.zip(b.dim_iter(axis)?))
}

/// Triples of `select(axis, i)` views of three tensors with the same extent
/// on `axis`.
pub fn zip3_dims<'a, T: Element, U: Element, V: Element>(
    a: &'a Tensor<T>,
    b: &'a Tensor<U>,
    c: &'a Tensor<V>,
    axis: usize,
) -> TensorResult<impl Iterator<Item = (Tensor<T>, Tensor<U>, Tensor<V>)> + 'a> {
    check_axis_extents("zip3_dims", axis, &[a.spec(), b.spec(), c.spec()])?;
    Ok(a
        .dim_iter(axis)?
        .zip(b.dim_iter(axis)?)
        .zip(c.dim_iter(axis)?)
        .map(|((x, y), z)| (x, y, z)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(extents: &[usize]) -> Tensor<f64> {
        let n: usize = extents.iter().product();
        Tensor::from_vec((0..n).map(|x| x as f64).collect(), extents).unwrap()
    }

    #[test]
    fn test_contiguous_uses_flat_path() {
        let t = ramp(&[2, 3]);
        let offsets = t.offsets();
        assert!(offsets.is_flat());
        assert_eq!(offsets.collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_rank_one_strided_uses_flat_path() {
        let t = ramp(&[3, 4]);
        let col = t.select(1, 1).unwrap();
        let offsets = col.offsets();
        assert!(offsets.is_flat());
        assert_eq!(offsets.collect::<Vec<_>>(), vec![1, 5, 9]);
    }

    #[test]
    fn test_odometer_carries() {
        let t = ramp(&[2, 3]).transpose(0, 1).unwrap();
        let offsets = t.offsets();
        assert!(!offsets.is_flat());
        assert_eq!(offsets.collect::<Vec<_>>(), vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_odometer_three_axes_with_offset() {
        let t = ramp(&[2, 3, 4]);
        let view = t.narrow(1, 2, 1).unwrap().narrow(2, 2, 2).unwrap();
        assert_eq!(
            view.to_vec(),
            vec![6.0, 7.0, 10.0, 11.0, 18.0, 19.0, 22.0, 23.0]
        );
    }

    #[test]
    fn test_empty_and_scalar() {
        let empty = Tensor::<f32>::new(&[3, 0]).unwrap();
        assert_eq!(empty.offsets().count(), 0);
        assert_eq!(empty.iter().count(), 0);

        let scalar = Tensor::scalar(2.0f32);
        assert_eq!(scalar.iter().collect::<Vec<_>>(), vec![2.0]);
    }

    #[test]
    fn test_cursor_protocol() {
        let t = ramp(&[2, 2]).transpose(0, 1).unwrap();
        let mut it = t.iter();
        let mut seen = Vec::new();
        while it.not_done() {
            let v = it.value().unwrap();
            seen.push(v);
            assert!(it.set_value(v * 10.0));
            it.advance();
        }
        assert_eq!(seen, vec![0.0, 2.0, 1.0, 3.0]);
        assert!(it.value().is_none());
        assert!(!it.set_value(1.0));
        drop(it);
        assert_eq!(t.to_vec(), vec![0.0, 20.0, 10.0, 30.0]);
    }

    #[test]
    fn test_exact_size() {
        let t = ramp(&[3, 3]).transpose(0, 1).unwrap();
        let mut it = t.iter();
        assert_eq!(it.len(), 9);
        it.next();
        assert_eq!(it.len(), 8);
    }

    #[test]
    fn test_dim_iter() {
        let t = ramp(&[3, 2]);
        let rows: Vec<Vec<f64>> = t.dim_iter(0).unwrap().map(|r| r.to_vec()).collect();
        assert_eq!(rows, vec![vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0, 5.0]]);

        let cols = t.dim_iter(1).unwrap();
        assert_eq!(cols.len(), 2);
        assert!(cols.into_iter().all(|c| c.shares_storage(&t)));

        assert!(t.dim_iter(2).is_err());
    }

    #[test]
    fn test_zip_scalars_mismatch() {
        let a = ramp(&[2, 3]);
        let b = ramp(&[5]);
        let err = zip_scalars(&a, &b).err().unwrap();
        assert!(matches!(
            err,
            TensorError::ShapeMismatch(ShapeMismatchError::ElementCount { .. })
        ));
    }

    #[test]
    fn test_zip_scalars_different_strides() {
        let a = ramp(&[2, 3]);
        let b = ramp(&[3, 2]).transpose(0, 1).unwrap();
        let pairs: Vec<(f64, f64)> = zip_scalars(&a, &b).unwrap().collect();
        assert_eq!(pairs[1], (1.0, 2.0));
        assert_eq!(pairs[3], (3.0, 1.0));
    }

    #[test]
    fn test_zip3_scalars() {
        let a = ramp(&[4]);
        let b = ramp(&[2, 2]);
        let c = Tensor::full(&[4], 1.0f32).unwrap();
        let total: f64 = zip3_scalars(&a, &b, &c)
            .unwrap()
            .map(|(x, y, z)| x + y + z as f64)
            .sum();
        assert_eq!(total, 16.0);
    }

    #[test]
    fn test_zip_dims() {
        let a = ramp(&[3, 2]);
        let b = ramp(&[2, 3]).transpose(0, 1).unwrap();
        let pairs: Vec<(Vec<f64>, Vec<f64>)> = zip_dims(&a, &b, 0)
            .unwrap()
            .map(|(x, y)| (x.to_vec(), y.to_vec()))
            .collect();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[2], (vec![4.0, 5.0], vec![2.0, 5.0]));

        let wide = ramp(&[3, 3]);
        assert_eq!(zip_dims(&a, &wide, 0).unwrap().count(), 3);
        assert!(zip_dims(&a, &wide, 1).is_err());
        assert!(zip_dims(&a, &b, 5).is_err());
    }

    #[test]
    fn test_zip3_dims_mismatch() {
        let a = ramp(&[3, 2]);
        let b = ramp(&[3, 2]);
        let c = ramp(&[4, 2]);
        let err = zip3_dims(&a, &b, &c, 0).err().unwrap();
        assert!(matches!(
            err,
            TensorError::ShapeMismatch(ShapeMismatchError::AxisExtent { axis: 0, .. })
        ));
        assert_eq!(zip3_dims(&a, &b, &c, 1).unwrap().count(), 2);
    }
}
