//! Random fill and shuffling with an explicit generator
//!
//! - **fill_uniform**: uniform samples between two finite bounds
//! - **shuffle_axis**: permute the slices of one tensor
//! - **shuffle_together**: permute two tensors with the same permutation
//!
//! Every function takes the random generator as an argument; there is no
//! process-wide seed. Seed a [`StdRng`](scirs2_core::random::rngs::StdRng)
//! for reproducible runs.

use crate::dispatch::{walk1, walk2};
use crate::hints::KernelHints;
use scirs2_core::random::Rng;
use stridx_core::error::{DimensionError, ShapeMismatchError};
use stridx_core::{Element, Tensor, TensorResult};

/// Fill every element of `t` with a uniform sample between `lo` and `hi`.
///
/// Aliases of `t` observe the new values.
///
/// # Errors
///
/// Returns [`DimensionError::Invalid`] if `lo > hi` or either bound is not
/// finite.
///
/// # Examples
///
/// ```
/// use scirs2_core::random::{rngs::StdRng, SeedableRng};
/// use stridx_core::Tensor;
/// use stridx_kernels::random::fill_uniform;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let t = Tensor::<f32>::new(&[4, 4]).unwrap();
/// fill_uniform(&t, -0.5, 0.5, &mut rng).unwrap();
/// assert!(t.iter().all(|x| (-0.5..=0.5).contains(&x)));
/// ```
pub fn fill_uniform<T: Element, R: Rng>(t: &Tensor<T>, lo: T, hi: T, rng: &mut R) -> TensorResult<()> {
    if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
        return Err(DimensionError::Invalid {
            operation: "fill_uniform",
            reason: format!("invalid range [{lo}, {hi}]"),
        }
        .into());
    }
    let cells = t.storage().cells();
    walk1(&KernelHints::default(), "fill_uniform", t.spec(), |p| {
        let u = T::from_f64(rng.random::<f64>());
        // interpolating the bounds stays finite even when hi − lo overflows
        let x = lo * (T::one() - u) + hi * u;
        cells[p].set(x.max(lo).min(hi));
    });
    Ok(())
}

/// Shuffle the slices of `t` along `axis` in place (Fisher–Yates).
///
/// Slices are moved as a whole: after shuffling a `[N, F]` sample matrix
/// along axis 0, each row still holds one intact sample.
///
/// # Errors
///
/// Returns an index error if `axis >= rank`.
///
/// # Examples
///
/// ```
/// use scirs2_core::random::{rngs::StdRng, SeedableRng};
/// use stridx_core::Tensor;
/// use stridx_kernels::random::shuffle_axis;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let t = Tensor::from_vec((0..6).map(|x| x as f64).collect(), &[3, 2]).unwrap();
/// shuffle_axis(&t, 0, &mut rng).unwrap();
/// for row in t.dim_iter(0).unwrap() {
///     let v = row.to_vec();
///     assert_eq!(v[1], v[0] + 1.0);
/// }
/// ```
pub fn shuffle_axis<T: Element, R: Rng>(t: &Tensor<T>, axis: usize, rng: &mut R) -> TensorResult<()> {
    let n = t.extent(axis)?;
    log::trace!("shuffle_axis: {n} slices along axis {axis}");
    for (i, j) in fisher_yates(n, rng) {
        swap_slices(t, axis, i, j)?;
    }
    Ok(())
}

/// Shuffle `a` and `b` along `axis` with one shared permutation.
///
/// Keeps samples and their labels paired: slice `i` of `a` and slice `i` of
/// `b` end up at the same position.
///
/// # Errors
///
/// - An index error if `axis` is out of range for either tensor
/// - [`ShapeMismatchError::AxisExtent`] if the extents along `axis` differ;
///   nothing is moved
///
/// # Examples
///
/// ```
/// use scirs2_core::random::{rngs::StdRng, SeedableRng};
/// use stridx_core::Tensor;
/// use stridx_kernels::random::shuffle_together;
///
/// let mut rng = StdRng::seed_from_u64(3);
/// let samples = Tensor::from_vec((0..8).map(|x| x as f64).collect(), &[4, 2]).unwrap();
/// let labels = Tensor::from_vec(vec![0.0f32, 2.0, 4.0, 6.0], &[4]).unwrap();
/// shuffle_together(&samples, &labels, 0, &mut rng).unwrap();
/// for (i, row) in samples.dim_iter(0).unwrap().enumerate() {
///     assert_eq!(row.get(&[0]).unwrap() as f32, labels.get(&[i]).unwrap());
/// }
/// ```
pub fn shuffle_together<T: Element, U: Element, R: Rng>(
    a: &Tensor<T>,
    b: &Tensor<U>,
    axis: usize,
    rng: &mut R,
) -> TensorResult<()> {
    let n = a.extent(axis)?;
    let m = b.extent(axis)?;
    if n != m {
        return Err(ShapeMismatchError::AxisExtent {
            operation: "shuffle_together",
            axis,
            extents: vec![n, m],
        }
        .into());
    }
    log::trace!("shuffle_together: {n} slices along axis {axis}");
    for (i, j) in fisher_yates(n, rng) {
        swap_slices(a, axis, i, j)?;
        swap_slices(b, axis, i, j)?;
    }
    Ok(())
}

/// Swaps `(i, j)` of a Fisher–Yates shuffle of `n` items; `i == j` is skipped.
fn fisher_yates<R: Rng>(n: usize, rng: &mut R) -> Vec<(usize, usize)> {
    (1..n)
        .rev()
        .map(|i| (i, rng.random_range(0..=i)))
        .filter(|(i, j)| i != j)
        .collect()
}

fn swap_slices<T: Element>(t: &Tensor<T>, axis: usize, i: usize, j: usize) -> TensorResult<()> {
    let a = t.spec().select(axis, i)?;
    let b = t.spec().select(axis, j)?;
    let cells = t.storage().cells();
    walk2(&KernelHints::default(), "shuffle_axis", &a, &b, |pa, pb| {
        cells[pa].swap(&cells[pb])
    })?;
    Ok(())
}
