//! Reductions over all elements of a tensor
//!
//! # Operations
//!
//! ## Sums
//! - **sum**, **sum_abs**, **sum_sqr**, **mean**
//!
//! ## Norms and distances
//! - **l2_norm**: `√Σ x²`
//! - **sqr_dist**: `Σ (a − b)²` over two tensors of equal element count
//!
//! ## Extremes
//! - **min**, **max**
//! - **argmin**, **argmax**: canonical flat position of the first extreme
//!   element; [`unravel`] converts it into a multi-index
//!
//! ## Normalisation and ordering
//! - **std_normalize**: remove the mean and divide by the standard deviation
//! - **sort_down**: sort a vector in decreasing order, permuting a companion
//!   vector alongside

use crate::dispatch::{walk1, walk2};
use crate::elementwise::update_with;
use crate::hints::KernelHints;
use stridx_core::error::{DimensionError, IndexError, ShapeMismatchError};
use scirs2_core::numeric::num_traits::float::TotalOrder;
use stridx_core::{Element, Tensor, TensorError, TensorResult};

/// Fold every element of `t` in canonical order.
pub fn fold_with<T, A, F>(hints: &KernelHints, operation: &'static str, t: &Tensor<T>, init: A, mut f: F) -> A
where
    T: Element,
    A: Copy,
    F: FnMut(A, T) -> A,
{
    let cells = t.storage().cells();
    let mut acc = init;
    walk1(hints, operation, t.spec(), |p| acc = f(acc, cells[p].get()));
    acc
}

fn fold<T: Element, A: Copy>(operation: &'static str, t: &Tensor<T>, init: A, f: impl FnMut(A, T) -> A) -> A {
    fold_with(&KernelHints::default(), operation, t, init, f)
}

fn require_elements<T: Element>(operation: &'static str, t: &Tensor<T>) -> TensorResult<()> {
    if t.element_count() == 0 {
        return Err(DimensionError::Invalid {
            operation,
            reason: format!("tensor with extents {:?} has no elements", t.extents()),
        }
        .into());
    }
    Ok(())
}

/// Sum of all elements (zero for an empty tensor)
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::reductions::sum;
///
/// let t = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// assert_eq!(sum(&t.transpose(0, 1).unwrap()), 10.0);
/// ```
pub fn sum<T: Element>(t: &Tensor<T>) -> T {
    fold("sum", t, T::zero(), |acc, x| acc + x)
}

/// Sum of absolute values
pub fn sum_abs<T: Element>(t: &Tensor<T>) -> T {
    fold("sum_abs", t, T::zero(), |acc, x| acc + x.abs())
}

/// Sum of squares
pub fn sum_sqr<T: Element>(t: &Tensor<T>) -> T {
    fold("sum_sqr", t, T::zero(), |acc, x| acc + x * x)
}

/// Euclidean norm `√Σ x²`
pub fn l2_norm<T: Element>(t: &Tensor<T>) -> T {
    sum_sqr(t).sqrt()
}

/// Arithmetic mean
///
/// # Errors
///
/// Returns [`DimensionError::Invalid`] for an empty tensor.
pub fn mean<T: Element>(t: &Tensor<T>) -> TensorResult<T> {
    require_elements("mean", t)?;
    Ok(sum(t) / T::from_usize(t.element_count()))
}

/// Smallest element
pub fn min<T: Element>(t: &Tensor<T>) -> TensorResult<T> {
    require_elements("min", t)?;
    Ok(fold("min", t, T::infinity(), |acc, x| acc.min(x)))
}

/// Largest element
pub fn max<T: Element>(t: &Tensor<T>) -> TensorResult<T> {
    require_elements("max", t)?;
    Ok(fold("max", t, T::neg_infinity(), |acc, x| acc.max(x)))
}

fn arg_extreme<T: Element>(
    operation: &'static str,
    t: &Tensor<T>,
    better: impl Fn(T, T) -> bool,
) -> TensorResult<usize> {
    require_elements(operation, t)?;
    let (best, _, _) = fold(operation, t, (0usize, None::<T>, 0usize), |(best, value, k), x| {
        match value {
            Some(v) if !better(x, v) => (best, Some(v), k + 1),
            _ => (k, Some(x), k + 1),
        }
    });
    Ok(best)
}

/// Canonical flat position of the first smallest element
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::reductions::{argmin, unravel};
///
/// let t = Tensor::from_vec(vec![3.0f32, 1.0, 2.0, 1.0], &[2, 2]).unwrap();
/// let k = argmin(&t).unwrap();
/// assert_eq!(k, 1);
/// assert_eq!(unravel(&t, k).unwrap(), vec![0, 1]);
/// ```
pub fn argmin<T: Element>(t: &Tensor<T>) -> TensorResult<usize> {
    arg_extreme("argmin", t, |x, best| x < best)
}

/// Canonical flat position of the first largest element
pub fn argmax<T: Element>(t: &Tensor<T>) -> TensorResult<usize> {
    arg_extreme("argmax", t, |x, best| x > best)
}

/// Multi-index of the element at canonical flat position `k`.
///
/// # Errors
///
/// Returns [`IndexError::PositionOutOfRange`] if `k >= element_count()`.
pub fn unravel<T: Element>(t: &Tensor<T>, k: usize) -> TensorResult<Vec<usize>> {
    let count = t.element_count();
    if k >= count {
        return Err(IndexError::PositionOutOfRange {
            axis: 0,
            index: k,
            extent: count,
        }
        .into());
    }
    let mut rest = k;
    let mut index = vec![0; t.rank()];
    for (slot, &extent) in index.iter_mut().zip(t.extents()).rev() {
        *slot = rest % extent;
        rest /= extent;
    }
    Ok(index)
}

/// Squared Euclidean distance `Σ (a − b)²`
///
/// # Errors
///
/// Returns a shape mismatch if the element counts differ.
pub fn sqr_dist<T: Element>(a: &Tensor<T>, b: &Tensor<T>) -> TensorResult<T> {
    let ca = a.storage().cells();
    let cb = b.storage().cells();
    let mut acc = T::zero();
    walk2(&KernelHints::default(), "sqr_dist", a.spec(), b.spec(), |pa, pb| {
        let d = ca[pa].get() - cb[pb].get();
        acc += d * d;
    })?;
    Ok(acc)
}

/// Write `(src − mean) / std` into `dst` and return the `(mean, std)` used.
///
/// `mean` is computed from `src` unless given; reusing the returned pair
/// normalises another tensor (e.g. a test set) the same way. `std` is the
/// population standard deviation around that mean.
///
/// # Errors
///
/// - [`DimensionError::Invalid`] for an empty `src` or a zero deviation
/// - A shape mismatch if the element counts differ
///
/// Nothing is written on error.
pub fn std_normalize<T: Element>(
    src: &Tensor<T>,
    dst: &Tensor<T>,
    mean: Option<T>,
) -> TensorResult<(T, T)> {
    require_elements("std_normalize", src)?;
    let n = T::from_usize(src.element_count());
    let mean = match mean {
        Some(m) => m,
        None => sum(src) / n,
    };
    let squares = fold("std_normalize", src, T::zero(), |acc, x| {
        let d = x - mean;
        acc + d * d
    });
    let std = (squares / n).sqrt();
    if !(std > T::zero() && std.is_finite()) {
        return Err(DimensionError::Invalid {
            operation: "std_normalize",
            reason: format!("standard deviation {std} around mean {mean}"),
        }
        .into());
    }
    update_with(&KernelHints::default(), "std_normalize", src, dst, |x, _| (x - mean) / std)?;
    Ok((mean, std))
}

/// Sort `m` in decreasing order and apply the same permutation to `p`.
///
/// Equal values keep their relative order. Both vectors may be strided views.
///
/// # Errors
///
/// - A rank error unless both have rank 1
/// - [`ShapeMismatchError::Extents`] if their lengths differ
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::reductions::sort_down;
///
/// let scores = Tensor::from_vec(vec![0.2f64, 0.9, 0.5], &[3]).unwrap();
/// let classes = Tensor::from_vec(vec![0.0f32, 1.0, 2.0], &[3]).unwrap();
/// sort_down(&scores, &classes).unwrap();
/// assert_eq!(scores.to_vec(), vec![0.9, 0.5, 0.2]);
/// assert_eq!(classes.to_vec(), vec![1.0, 2.0, 0.0]);
/// ```
pub fn sort_down<T: Element + TotalOrder, U: Element>(m: &Tensor<T>, p: &Tensor<U>) -> TensorResult<()> {
    for rank in [m.rank(), p.rank()] {
        if rank != 1 {
            return Err(TensorError::operand_rank("sort_down", 1, rank));
        }
    }
    if m.extents() != p.extents() {
        return Err(ShapeMismatchError::Extents {
            operation: "sort_down",
            lhs: m.extents().to_vec(),
            rhs: p.extents().to_vec(),
        }
        .into());
    }

    let keys = m.to_vec();
    let companions = p.to_vec();
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&i, &j| keys[j].total_cmp(&keys[i]));

    let cm = m.storage().cells();
    for (position, &k) in m.offsets().zip(&order) {
        cm[position].set(keys[k]);
    }
    let cp = p.storage().cells();
    for (position, &k) in p.offsets().zip(&order) {
        cp[position].set(companions[k]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m23() -> Tensor<f64> {
        Tensor::from_vec(vec![1.0, -2.0, 3.0, -4.0, 5.0, -6.0], &[2, 3]).unwrap()
    }

    #[test]
    fn test_sums() {
        let t = m23();
        assert_eq!(sum(&t), -3.0);
        assert_eq!(sum_abs(&t), 21.0);
        assert_eq!(sum_sqr(&t), 91.0);
        assert!((l2_norm(&t) - 91f64.sqrt()).abs() < 1e-12);
        assert_eq!(mean(&t).unwrap(), -0.5);
    }

    #[test]
    fn test_extremes() {
        let t = m23();
        assert_eq!(min(&t).unwrap(), -6.0);
        assert_eq!(max(&t).unwrap(), 5.0);
        assert_eq!(argmin(&t).unwrap(), 5);
        assert_eq!(argmax(&t).unwrap(), 4);

        let tt = t.transpose(0, 1).unwrap();
        // canonical order of the transpose: 1, -4, -2, 5, 3, -6
        assert_eq!(argmax(&tt).unwrap(), 3);
        assert_eq!(unravel(&tt, 3).unwrap(), vec![1, 1]);
        assert_eq!(tt.get(&[1, 1]).unwrap(), 5.0);
    }

    #[test]
    fn test_first_extreme_wins() {
        let t = Tensor::from_vec(vec![2.0f32, 7.0, 7.0, 1.0, 1.0], &[5]).unwrap();
        assert_eq!(argmax(&t).unwrap(), 1);
        assert_eq!(argmin(&t).unwrap(), 3);
    }

    #[test]
    fn test_empty_tensor() {
        let t = Tensor::<f64>::new(&[0, 4]).unwrap();
        assert_eq!(sum(&t), 0.0);
        assert!(matches!(mean(&t), Err(TensorError::Dimension(_))));
        assert!(min(&t).is_err());
        assert!(argmax(&t).is_err());
    }

    #[test]
    fn test_unravel_bounds() {
        let t = Tensor::<f64>::new(&[2, 3, 4]).unwrap();
        assert_eq!(unravel(&t, 23).unwrap(), vec![1, 2, 3]);
        assert_eq!(unravel(&t, 5).unwrap(), vec![0, 1, 1]);
        assert!(unravel(&t, 24).is_err());
        assert_eq!(unravel(&Tensor::scalar(1.0f64), 0).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_sqr_dist() {
        let a = m23();
        let b = Tensor::<f64>::new(&[6]).unwrap();
        assert_eq!(sqr_dist(&a, &b).unwrap(), 91.0);
        let shuffled = a.transpose(0, 1).unwrap().deep_copy().unwrap();
        assert!(sqr_dist(&a, &shuffled).unwrap() > 0.0);
        assert!(sqr_dist(&a, &Tensor::<f64>::new(&[5]).unwrap()).is_err());
    }

    #[test]
    fn test_std_normalize() {
        let src = Tensor::from_vec(vec![2.0f64, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], &[2, 4]).unwrap();
        let dst = Tensor::<f64>::new(&[8]).unwrap();
        let (mean, std) = std_normalize(&src, &dst, None).unwrap();
        assert_eq!((mean, std), (5.0, 2.0));
        assert_eq!(dst.get(&[0]).unwrap(), -1.5);
        assert!(mean_of(&dst).abs() < 1e-12);
        assert!((sum_sqr(&dst) / 8.0 - 1.0).abs() < 1e-12);

        // reuse a given mean; in place through a transposed view
        let view = src.transpose(0, 1).unwrap();
        let (m, s) = std_normalize(&view, &view, Some(3.0)).unwrap();
        assert_eq!(m, 3.0);
        assert!((s - 8f64.sqrt()).abs() < 1e-12);
        assert_eq!(src.get(&[0, 0]).unwrap(), -1.0 / s);
    }

    fn mean_of(t: &Tensor<f64>) -> f64 {
        mean(t).unwrap()
    }

    #[test]
    fn test_std_normalize_errors() {
        let constant = Tensor::full(&[4], 3.0f64).unwrap();
        let dst = Tensor::full(&[4], 7.0f64).unwrap();
        assert!(matches!(std_normalize(&constant, &dst, None), Err(TensorError::Dimension(_))));
        assert_eq!(dst.to_vec(), vec![7.0; 4]);
        assert!(std_normalize(&Tensor::<f64>::new(&[0]).unwrap(), &dst, None).is_err());
        assert!(std_normalize(&m23(), &dst, None).is_err());
    }

    #[test]
    fn test_sort_down() {
        let m = Tensor::from_vec(vec![3.0f64, 1.0, 4.0, 1.0, 5.0], &[5]).unwrap();
        let p = Tensor::from_vec(vec![0.0f32, 1.0, 2.0, 3.0, 4.0], &[5]).unwrap();
        sort_down(&m, &p).unwrap();
        assert_eq!(m.to_vec(), vec![5.0, 4.0, 3.0, 1.0, 1.0]);
        assert_eq!(p.to_vec(), vec![4.0, 2.0, 0.0, 1.0, 3.0]);
    }

    #[test]
    fn test_sort_down_strided_and_errors() {
        let table = m23();
        let column = table.select(1, 0).unwrap();
        let labels = Tensor::from_vec(vec![10.0f64, 20.0], &[2]).unwrap();
        sort_down(&column, &labels).unwrap();
        assert_eq!(table.to_vec(), vec![1.0, -2.0, 3.0, -4.0, 5.0, -6.0]);
        assert_eq!(labels.to_vec(), vec![10.0, 20.0]);

        let row = table.select(0, 1).unwrap();
        let ids = Tensor::from_vec(vec![0.0f64, 1.0, 2.0], &[3]).unwrap();
        sort_down(&row, &ids).unwrap();
        assert_eq!(table.to_vec(), vec![1.0, -2.0, 3.0, 5.0, -4.0, -6.0]);
        assert_eq!(ids.to_vec(), vec![1.0, 0.0, 2.0]);

        assert!(matches!(
            sort_down(&row, &labels),
            Err(TensorError::ShapeMismatch(ShapeMismatchError::Extents { .. }))
        ));
        assert!(matches!(sort_down(&table, &ids), Err(TensorError::Rank(_))));
    }
}
