//! Elementwise kernels
//!
//! Every kernel here pairs its operands element by element in canonical order
//! and only requires equal element counts: a `[2, 3]` tensor combines with a
//! `[6]` tensor or with a transposed `[3, 2]` view.
//!
//! Output tensors are written through shared references, so an output may
//! alias an input exactly (`add(&a, &b, &a)` accumulates into `a`).
//!
//! # Operations
//!
//! - **Copies**: [`copy`], [`copy_cast`], [`copy_clamped`]
//! - **Binary**: [`add`], [`sub`], [`mul`], [`div`], [`max_elementwise`],
//!   [`lincomb`], [`sub_square`]
//! - **Scalar**: [`add_scalar`], [`add_scalar_saturating`], [`scale`],
//!   [`scale_acc`]
//! - **In place**: [`add_in_place`]
//! - **Unary**: [`map`] with a [`UnaryOp`]

use crate::dispatch::{walk2, walk3, Path};
use crate::hints::KernelHints;
use stridx_core::error::DimensionError;
use stridx_core::{Element, Tensor, TensorResult};

const STD_SIGMOID_GAIN: f64 = 1.715_934_28;
const STD_SIGMOID_SLOPE: f64 = 0.666_666_66;

/// Named unary operations for [`map`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp<T> {
    /// `-x`
    Negate,
    /// `1 / x`
    Invert,
    /// `|x|`
    Abs,
    /// `√x`
    Sqrt,
    /// `tanh(x)`
    Tanh,
    /// Derivative of `tanh`: `1 − tanh²(x)`
    DTanh,
    /// `1.71593428 · tanh(0.66666666 · x)`
    StdSigmoid,
    /// Derivative of [`UnaryOp::StdSigmoid`]
    DStdSigmoid,
    /// `value` where `x < threshold`, `x` elsewhere
    Threshold { threshold: T, value: T },
}

impl<T: Element> UnaryOp<T> {
    /// Apply the operation to one value.
    pub fn apply(self, x: T) -> T {
        match self {
            UnaryOp::Negate => -x,
            UnaryOp::Invert => x.recip(),
            UnaryOp::Abs => x.abs(),
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Tanh => x.tanh(),
            UnaryOp::DTanh => {
                let t = x.tanh();
                T::one() - t * t
            }
            UnaryOp::StdSigmoid => {
                let gain = T::from_f64(STD_SIGMOID_GAIN);
                let slope = T::from_f64(STD_SIGMOID_SLOPE);
                gain * (slope * x).tanh()
            }
            UnaryOp::DStdSigmoid => {
                let gain = T::from_f64(STD_SIGMOID_GAIN);
                let slope = T::from_f64(STD_SIGMOID_SLOPE);
                let t = (slope * x).tanh();
                gain * slope * (T::one() - t * t)
            }
            UnaryOp::Threshold { threshold, value } => {
                if x < threshold {
                    value
                } else {
                    x
                }
            }
        }
    }
}

/// Write `op(src, dst)` into every element of `dst`.
///
/// The building block of every one-input kernel; `src` and `dst` may have
/// different element types.
///
/// # Errors
///
/// Returns a shape mismatch if the element counts differ.
pub fn update_with<T, U, F>(
    hints: &KernelHints,
    operation: &'static str,
    src: &Tensor<T>,
    dst: &Tensor<U>,
    mut op: F,
) -> TensorResult<Path>
where
    T: Element,
    U: Element,
    F: FnMut(T, U) -> U,
{
    let cs = src.storage().cells();
    let cd = dst.storage().cells();
    walk2(hints, operation, src.spec(), dst.spec(), |ps, pd| {
        let cell = &cd[pd];
        cell.set(op(cs[ps].get(), cell.get()));
    })
}

/// Write `op(a, b)` into every element of `out`.
///
/// The building block of every two-input kernel.
///
/// # Errors
///
/// Returns a shape mismatch if the three element counts differ.
pub fn combine_with<T, F>(
    hints: &KernelHints,
    operation: &'static str,
    a: &Tensor<T>,
    b: &Tensor<T>,
    out: &Tensor<T>,
    mut op: F,
) -> TensorResult<Path>
where
    T: Element,
    F: FnMut(T, T) -> T,
{
    let ca = a.storage().cells();
    let cb = b.storage().cells();
    let co = out.storage().cells();
    walk3(hints, operation, a.spec(), b.spec(), out.spec(), |pa, pb, po| {
        co[po].set(op(ca[pa].get(), cb[pb].get()));
    })
}

fn combine<T: Element>(
    operation: &'static str,
    a: &Tensor<T>,
    b: &Tensor<T>,
    out: &Tensor<T>,
    op: impl FnMut(T, T) -> T,
) -> TensorResult<()> {
    combine_with(&KernelHints::default(), operation, a, b, out, op).map(|_| ())
}

fn update<T: Element, U: Element>(
    operation: &'static str,
    src: &Tensor<T>,
    dst: &Tensor<U>,
    op: impl FnMut(T, U) -> U,
) -> TensorResult<()> {
    update_with(&KernelHints::default(), operation, src, dst, op).map(|_| ())
}

/// `dst = src`
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::elementwise::copy;
///
/// let src = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let dst = Tensor::<f64>::new(&[2, 2]).unwrap();
/// copy(&src.transpose(0, 1).unwrap(), &dst).unwrap();
/// assert_eq!(dst.to_vec(), vec![1.0, 3.0, 2.0, 4.0]);
/// ```
pub fn copy<T: Element>(src: &Tensor<T>, dst: &Tensor<T>) -> TensorResult<()> {
    update("copy", src, dst, |x, _| x)
}

/// `dst = src` converted to another element type
pub fn copy_cast<T: Element, U: Element>(src: &Tensor<T>, dst: &Tensor<U>) -> TensorResult<()> {
    update("copy_cast", src, dst, |x, _| x.cast())
}

/// `dst = clamp(src, lo, hi)`
///
/// # Errors
///
/// Returns [`DimensionError::Invalid`] if `lo > hi`.
pub fn copy_clamped<T: Element>(src: &Tensor<T>, lo: T, hi: T, dst: &Tensor<T>) -> TensorResult<()> {
    if lo > hi {
        return Err(DimensionError::Invalid {
            operation: "copy_clamped",
            reason: format!("empty range [{lo}, {hi}]"),
        }
        .into());
    }
    update("copy_clamped", src, dst, |x, _| x.max(lo).min(hi))
}

/// `out = a + b`
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::elementwise::add;
///
/// let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0], &[3]).unwrap();
/// let b = Tensor::from_vec(vec![10.0f32, 20.0, 30.0], &[3]).unwrap();
/// add(&a, &b, &a).unwrap();
/// assert_eq!(a.to_vec(), vec![11.0, 22.0, 33.0]);
/// ```
pub fn add<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    combine("add", a, b, out, |x, y| x + y)
}

/// `out = a − b`
pub fn sub<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    combine("sub", a, b, out, |x, y| x - y)
}

/// `out = a · b` (Hadamard product)
pub fn mul<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    combine("mul", a, b, out, |x, y| x * y)
}

/// `out = a / b`
///
/// Division by zero follows IEEE arithmetic.
pub fn div<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    combine("div", a, b, out, |x, y| x / y)
}

/// `out = max(a, b)`
pub fn max_elementwise<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    combine("max_elementwise", a, b, out, |x, y| x.max(y))
}

/// `out = ka · a + kb · b`
pub fn lincomb<T: Element>(
    a: &Tensor<T>,
    ka: T,
    b: &Tensor<T>,
    kb: T,
    out: &Tensor<T>,
) -> TensorResult<()> {
    combine("lincomb", a, b, out, |x, y| ka * x + kb * y)
}

/// `out = (a − b)²`
pub fn sub_square<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    combine("sub_square", a, b, out, |x, y| {
        let d = x - y;
        d * d
    })
}

/// `acc += src`
pub fn add_in_place<T: Element>(src: &Tensor<T>, acc: &Tensor<T>) -> TensorResult<()> {
    update("add_in_place", src, acc, |x, sum| sum + x)
}

/// `dst = src + c`
pub fn add_scalar<T: Element>(src: &Tensor<T>, c: T, dst: &Tensor<T>) -> TensorResult<()> {
    update("add_scalar", src, dst, |x, _| x + c)
}

/// `dst = src + c`, saturating to the finite range of `T` instead of
/// overflowing to infinity.
pub fn add_scalar_saturating<T: Element>(src: &Tensor<T>, c: T, dst: &Tensor<T>) -> TensorResult<()> {
    let (lo, hi) = (T::min_value(), T::max_value());
    update("add_scalar_saturating", src, dst, |x, _| (x + c).max(lo).min(hi))
}

/// `dst = c · src`
pub fn scale<T: Element>(src: &Tensor<T>, c: T, dst: &Tensor<T>) -> TensorResult<()> {
    update("scale", src, dst, |x, _| c * x)
}

/// `dst += c · src`
pub fn scale_acc<T: Element>(src: &Tensor<T>, c: T, dst: &Tensor<T>) -> TensorResult<()> {
    update("scale_acc", src, dst, |x, acc| acc + c * x)
}

/// `dst = src^p`
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::elementwise::power;
///
/// let t = Tensor::from_vec(vec![4.0f64, 9.0, 16.0], &[3]).unwrap();
/// power(&t, 0.5, &t).unwrap();
/// assert_eq!(t.to_vec(), vec![2.0, 3.0, 4.0]);
/// ```
pub fn power<T: Element>(src: &Tensor<T>, p: T, dst: &Tensor<T>) -> TensorResult<()> {
    update("power", src, dst, |x, _| x.powf(p))
}

/// `dst = op(src)`
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::elementwise::{map, UnaryOp};
///
/// let t = Tensor::from_vec(vec![-2.0f64, 0.5, 3.0], &[3]).unwrap();
/// map(&t, UnaryOp::Threshold { threshold: 0.0, value: 0.0 }, &t).unwrap();
/// assert_eq!(t.to_vec(), vec![0.0, 0.5, 3.0]);
/// ```
pub fn map<T: Element>(src: &Tensor<T>, op: UnaryOp<T>, dst: &Tensor<T>) -> TensorResult<()> {
    update("map", src, dst, |x, _| op.apply(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stridx_core::error::ShapeMismatchError;
    use stridx_core::TensorError;

    fn vec1(data: &[f64]) -> Tensor<f64> {
        Tensor::from_vec(data.to_vec(), &[data.len()]).unwrap()
    }

    #[test]
    fn test_binary_ops() {
        let a = vec1(&[1.0, 2.0, 3.0, 4.0]);
        let b = vec1(&[4.0, 3.0, 2.0, 1.0]);
        let out = Tensor::<f64>::new(&[2, 2]).unwrap();

        add(&a, &b, &out).unwrap();
        assert_eq!(out.to_vec(), vec![5.0; 4]);
        sub(&a, &b, &out).unwrap();
        assert_eq!(out.to_vec(), vec![-3.0, -1.0, 1.0, 3.0]);
        mul(&a, &b, &out).unwrap();
        assert_eq!(out.to_vec(), vec![4.0, 6.0, 6.0, 4.0]);
        div(&a, &b, &out).unwrap();
        assert_eq!(out.to_vec(), vec![0.25, 2.0 / 3.0, 1.5, 4.0]);
        max_elementwise(&a, &b, &out).unwrap();
        assert_eq!(out.to_vec(), vec![4.0, 3.0, 3.0, 4.0]);
        lincomb(&a, 2.0, &b, -1.0, &out).unwrap();
        assert_eq!(out.to_vec(), vec![-2.0, 1.0, 4.0, 7.0]);
        sub_square(&a, &b, &out).unwrap();
        assert_eq!(out.to_vec(), vec![9.0, 1.0, 1.0, 9.0]);
    }

    #[test]
    fn test_mismatch_leaves_output_untouched() {
        let a = vec1(&[1.0, 2.0, 3.0]);
        let b = vec1(&[1.0, 2.0]);
        let out = vec1(&[7.0, 7.0, 7.0]);
        let err = add(&a, &b, &out).unwrap_err();
        assert!(matches!(
            err,
            TensorError::ShapeMismatch(ShapeMismatchError::ElementCount { operation: "add", .. })
        ));
        assert_eq!(out.to_vec(), vec![7.0; 3]);
    }

    #[test]
    fn test_strided_operands() {
        let m = Tensor::from_vec((0..6).map(f64::from).collect(), &[2, 3]).unwrap();
        let col = m.select(1, 1).unwrap();
        let row = m.select(0, 0).unwrap().narrow(0, 2, 0).unwrap();
        // col = [1, 4], row = [0, 1]
        add_in_place(&row, &col).unwrap();
        assert_eq!(m.to_vec(), vec![0.0, 1.0, 2.0, 3.0, 5.0, 5.0]);
    }

    #[test]
    fn test_copy_variants() {
        let src = vec1(&[-5.0, 0.25, 1e40]);
        let dst = Tensor::<f32>::new(&[3]).unwrap();
        copy_cast(&src, &dst).unwrap();
        let values = dst.to_vec();
        assert_eq!(values[..2], [-5.0, 0.25]);
        assert!(values[2].is_infinite());

        let clamped = Tensor::<f64>::new(&[3]).unwrap();
        copy_clamped(&src, -1.0, 1.0, &clamped).unwrap();
        assert_eq!(clamped.to_vec(), vec![-1.0, 0.25, 1.0]);
        assert!(copy_clamped(&src, 1.0, -1.0, &clamped).is_err());

        let copy_dst = Tensor::<f64>::new(&[3]).unwrap();
        copy(&src, &copy_dst).unwrap();
        assert_eq!(copy_dst.to_vec(), src.to_vec());
    }

    #[test]
    fn test_scalar_ops() {
        let t = vec1(&[1.0, -2.0]);
        let out = Tensor::<f64>::new(&[2]).unwrap();
        add_scalar(&t, 0.5, &out).unwrap();
        assert_eq!(out.to_vec(), vec![1.5, -1.5]);
        scale(&t, 3.0, &out).unwrap();
        assert_eq!(out.to_vec(), vec![3.0, -6.0]);
        scale_acc(&t, 1.0, &out).unwrap();
        assert_eq!(out.to_vec(), vec![4.0, -8.0]);
    }

    #[test]
    fn test_saturating_add() {
        let t = Tensor::from_vec(vec![f32::MAX, f32::MIN, 1.0], &[3]).unwrap();
        let out = Tensor::<f32>::new(&[3]).unwrap();
        add_scalar_saturating(&t, f32::MAX, &out).unwrap();
        assert_eq!(out.to_vec(), vec![f32::MAX, 0.0, f32::MAX]);

        add_scalar(&t, f32::MAX, &out).unwrap();
        assert!(out.to_vec()[0].is_infinite());
    }

    #[test]
    fn test_unary_ops() {
        let x = 0.5f64;
        assert_eq!(UnaryOp::Negate.apply(x), -0.5);
        assert_eq!(UnaryOp::Invert.apply(x), 2.0);
        assert_eq!(UnaryOp::Abs.apply(-x), 0.5);
        assert_eq!(UnaryOp::Sqrt.apply(0.25f64), 0.5);
        assert!((UnaryOp::Tanh.apply(x) - x.tanh()).abs() < 1e-15);
        assert!((UnaryOp::DTanh.apply(0.0f64) - 1.0).abs() < 1e-15);

        let s = UnaryOp::StdSigmoid.apply(1.0f64);
        assert!((s - 1.715_934_28 * (0.666_666_66f64).tanh()).abs() < 1e-12);
        assert!((UnaryOp::DStdSigmoid.apply(0.0f64) - 1.715_934_28 * 0.666_666_66).abs() < 1e-12);

        // Numerical derivative of the standard sigmoid
        let h = 1e-6f64;
        let numeric = (UnaryOp::StdSigmoid.apply(0.3 + h) - UnaryOp::StdSigmoid.apply(0.3 - h)) / (2.0 * h);
        assert!((numeric - UnaryOp::DStdSigmoid.apply(0.3f64)).abs() < 1e-6);
    }

    #[test]
    fn test_map_transposed_into_contiguous() {
        let m = Tensor::from_vec(vec![1.0f64, 4.0, 9.0, 16.0], &[2, 2]).unwrap();
        let out = Tensor::<f64>::new(&[2, 2]).unwrap();
        map(&m.transpose(0, 1).unwrap(), UnaryOp::Sqrt, &out).unwrap();
        assert_eq!(out.to_vec(), vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_power() {
        let src = vec1(&[1.0, 2.0, 3.0, -2.0]);
        let dst = Tensor::<f64>::new(&[4]).unwrap();
        power(&src, 3.0, &dst).unwrap();
        for (got, want) in dst.to_vec().iter().zip([1.0, 8.0, 27.0, -8.0]) {
            assert!((got - want).abs() < 1e-12);
        }

        // fractional power of a negative base follows powf
        power(&src, 0.5, &dst).unwrap();
        assert!(dst.get(&[3]).unwrap().is_nan());
        assert!(power(&src, 2.0, &Tensor::<f64>::new(&[3]).unwrap()).is_err());
    }
}
