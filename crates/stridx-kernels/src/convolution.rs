//! Valid 2-D convolution through sliding-window views
//!
//! The input is never copied. Two [`Tensor::unfold`] calls expose every
//! receptive field as the trailing `[KH, KW]` axes of a rank-4 view
//! `[OH, OW, KH, KW]`, which [`m4_dot_m2`] then contracts with the kernel:
//!
//! ```text
//! Output[i,j] = ΣΣ I[i·sr + m, j·sc + n] · K[m,n]
//! ```
//!
//! This is a cross-correlation (the kernel is not flipped), which is what
//! convolutional layers compute.

use crate::linalg::{m4_dot_m2, m4_dot_m2_acc};
use stridx_core::{Element, Tensor, TensorError, TensorResult};

/// Output extents of a valid convolution, `[(H−KH)/sr + 1, (W−KW)/sc + 1]`.
///
/// Returns `None` if a window does not fit or a step does not tile the input
/// exactly.
pub fn conv2d_output_extents(
    input: &[usize],
    kernel: &[usize],
    step_rows: usize,
    step_cols: usize,
) -> Option<[usize; 2]> {
    let axis = |n: usize, k: usize, s: usize| {
        (k >= 1 && s >= 1 && k <= n && (n - k) % s == 0).then(|| 1 + (n - k) / s)
    };
    match (input, kernel) {
        ([h, w], [kh, kw]) => Some([axis(*h, *kh, step_rows)?, axis(*w, *kw, step_cols)?]),
        _ => None,
    }
}

fn windows<T: Element>(
    operation: &'static str,
    input: &Tensor<T>,
    kernel: &Tensor<T>,
    step_rows: usize,
    step_cols: usize,
) -> TensorResult<Tensor<T>> {
    if input.rank() != 2 {
        return Err(TensorError::operand_rank(operation, 2, input.rank()));
    }
    if kernel.rank() != 2 {
        return Err(TensorError::operand_rank(operation, 2, kernel.rank()));
    }
    let (kh, kw) = (kernel.extent(0)?, kernel.extent(1)?);
    // [H, W] -> [OH, W, KH] -> [OH, OW, KH, KW]
    let view = input.unfold(0, kh, step_rows)?.unfold(1, kw, step_cols)?;
    log::trace!(
        "{operation}: windows {:?} strides {:?}",
        view.extents(),
        view.strides()
    );
    Ok(view)
}

/// Valid 2-D convolution of `input` `[H, W]` with `kernel` `[KH, KW]`.
///
/// # Arguments
///
/// * `input` - Rank-2 input, any strides
/// * `kernel` - Rank-2 kernel
/// * `step_rows`, `step_cols` - Window steps along each axis
/// * `out` - Rank-2 output of extents [`conv2d_output_extents`]
///
/// # Errors
///
/// - A rank error if an operand is not rank 2
/// - [`DimensionError::Unfold`](stridx_core::error::DimensionError::Unfold)
///   if a step is zero, the kernel is larger than the input, or a step does
///   not tile the input exactly
/// - A shape mismatch if `out` has the wrong extents
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::convolution::conv2d_valid;
///
/// let input = Tensor::from_vec((0..16).map(|x| x as f64).collect(), &[4, 4]).unwrap();
/// let kernel = Tensor::full(&[2, 2], 1.0f64).unwrap();
/// let out = Tensor::new(&[2, 2]).unwrap();
///
/// conv2d_valid(&input, &kernel, 2, 2, &out).unwrap();
/// assert_eq!(out.to_vec(), vec![10.0, 18.0, 42.0, 50.0]);
/// ```
pub fn conv2d_valid<T: Element>(
    input: &Tensor<T>,
    kernel: &Tensor<T>,
    step_rows: usize,
    step_cols: usize,
    out: &Tensor<T>,
) -> TensorResult<()> {
    let view = windows("conv2d_valid", input, kernel, step_rows, step_cols)?;
    m4_dot_m2(&view, kernel, out)
}

/// `out += conv2d_valid(input, kernel)`; accumulates over input channels.
pub fn conv2d_valid_acc<T: Element>(
    input: &Tensor<T>,
    kernel: &Tensor<T>,
    step_rows: usize,
    step_cols: usize,
    out: &Tensor<T>,
) -> TensorResult<()> {
    let view = windows("conv2d_valid_acc", input, kernel, step_rows, step_cols)?;
    m4_dot_m2_acc(&view, kernel, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(extents: &[usize]) -> Tensor<f64> {
        let n: usize = extents.iter().product();
        Tensor::from_vec((0..n).map(|x| x as f64).collect(), extents).unwrap()
    }

    #[test]
    fn test_window_sum_over_ramp() {
        let volume = ramp(&[1, 5, 5]);
        let plane = volume.select(0, 0).unwrap();
        let kernel = Tensor::full(&[3, 3], 1.0).unwrap();
        let out = Tensor::new(&[3, 3]).unwrap();

        conv2d_valid(&plane, &kernel, 1, 1, &out).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let center = (5 * (i + 1) + (j + 1)) as f64;
                assert_eq!(out.get(&[i, j]).unwrap(), 9.0 * center);
            }
        }
        // the input view is untouched
        assert_eq!(plane.get(&[4, 4]).unwrap(), 24.0);
    }

    #[test]
    fn test_strided_windows() {
        let input = ramp(&[5, 5]);
        let kernel = Tensor::full(&[3, 3], 1.0).unwrap();
        assert_eq!(conv2d_output_extents(input.extents(), kernel.extents(), 2, 2), Some([2, 2]));

        let out = Tensor::new(&[2, 2]).unwrap();
        conv2d_valid(&input, &kernel, 2, 2, &out).unwrap();
        assert_eq!(out.to_vec(), vec![54.0, 72.0, 144.0, 162.0]);
    }

    #[test]
    fn test_transposed_input() {
        let input = ramp(&[4, 5]);
        let kernel = Tensor::from_vec(vec![1.0, 0.0, 0.0, -1.0], &[2, 2]).unwrap();
        let direct = Tensor::new(&[4, 3]).unwrap();
        let dense = input.transpose(0, 1).unwrap().deep_copy().unwrap();
        conv2d_valid(&dense, &kernel, 1, 1, &direct).unwrap();

        let through_view = Tensor::new(&[4, 3]).unwrap();
        conv2d_valid(&input.transpose(0, 1).unwrap(), &kernel, 1, 1, &through_view).unwrap();
        assert_eq!(direct.to_vec(), through_view.to_vec());
        // x[i][j] - x[i+1][j+1] on the transpose of a 4x5 ramp is always -6
        assert!(direct.to_vec().iter().all(|&v| v == -6.0));
    }

    #[test]
    fn test_accumulate_channels() {
        let input = ramp(&[2, 3, 3]);
        let kernel = Tensor::full(&[3, 3], 1.0).unwrap();
        let out = Tensor::zeros(&[1, 1]).unwrap();
        for channel in input.dim_iter(0).unwrap() {
            conv2d_valid_acc(&channel, &kernel, 1, 1, &out).unwrap();
        }
        assert_eq!(out.get(&[0, 0]).unwrap(), (0..18).sum::<i32>() as f64);
    }

    #[test]
    fn test_inconsistent_step() {
        let input = ramp(&[5, 5]);
        let kernel = Tensor::full(&[2, 2], 1.0).unwrap();
        let out = Tensor::new(&[2, 2]).unwrap();
        assert_eq!(conv2d_output_extents(input.extents(), kernel.extents(), 2, 2), None);
        assert!(matches!(
            conv2d_valid(&input, &kernel, 2, 2, &out),
            Err(TensorError::Dimension(_))
        ));
    }

    #[test]
    fn test_shape_errors() {
        let kernel = Tensor::full(&[3, 3], 1.0).unwrap();
        let out = Tensor::new(&[3, 3]).unwrap();
        assert!(conv2d_valid(&ramp(&[25]), &kernel, 1, 1, &out).is_err());
        assert!(conv2d_valid(&ramp(&[2, 2]), &kernel, 1, 1, &out).is_err());
        let wrong = Tensor::new(&[2, 3]).unwrap();
        assert!(matches!(
            conv2d_valid(&ramp(&[5, 5]), &kernel, 1, 1, &wrong),
            Err(TensorError::ShapeMismatch(_))
        ));
    }
}
