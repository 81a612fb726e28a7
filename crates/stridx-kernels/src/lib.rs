//! # stridx-kernels
//!
//! Numeric kernels over [`stridx_core`] tensors.
//!
//! Every kernel reads its operands through their shape specs, so transposed,
//! narrowed and unfolded views are accepted as they are; nothing is copied
//! into a contiguous layout first.
//!
//! ## Modules
//!
//! - [`elementwise`]: copies, arithmetic and named unary maps
//! - [`reductions`]: sums, norms, extremes and their positions, plus
//!   normalisation and sorting
//! - [`linalg`]: dot, matrix-vector, outer products and rank-4 by rank-2
//!   contractions
//! - [`convolution`]: valid 2-D convolution through sliding-window views
//! - [`random`]: uniform fill and axis shuffling with an explicit generator
//!
//! ## Traversal
//!
//! Each call picks one [`Path`] for its operands (see [`dispatch`]): a flat
//! loop for contiguous operands, a strided loop for vectors, a recursive loop
//! for same-shape operands and an odometer otherwise. [`KernelHints`] can pin
//! the generic path, which is how the fast paths are cross-checked.
//!
//! ## Quick Start
//!
//! ```
//! use stridx_core::Tensor;
//! use stridx_kernels::{add, dot, sum};
//!
//! let a = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], &[4]).unwrap();
//! let b = Tensor::from_vec(vec![4.0f64, 3.0, 2.0, 1.0], &[4]).unwrap();
//! assert_eq!(dot(&a, &b).unwrap(), 20.0);
//!
//! let out = Tensor::new(&[4]).unwrap();
//! add(&a, &b, &out).unwrap();
//! assert_eq!(sum(&out), 20.0);
//! ```
//!
//! ## Convolution as a contraction
//!
//! ```
//! use stridx_core::Tensor;
//! use stridx_kernels::m4_dot_m2;
//!
//! let image = Tensor::from_vec((0..25).map(|x| x as f64).collect(), &[5, 5]).unwrap();
//! let kernel = Tensor::full(&[3, 3], 1.0).unwrap();
//! let windows = image.unfold(0, 3, 1).unwrap().unfold(1, 3, 1).unwrap();
//! assert_eq!(windows.extents(), &[3, 3, 3, 3]);
//!
//! let out = Tensor::new(&[3, 3]).unwrap();
//! m4_dot_m2(&windows, &kernel, &out).unwrap();
//! assert_eq!(out.get(&[0, 0]).unwrap(), 54.0);
//! ```

pub mod convolution;
pub mod dispatch;
pub mod elementwise;
pub mod hints;
pub mod linalg;
pub mod random;
pub mod reductions;


pub use convolution::{conv2d_output_extents, conv2d_valid, conv2d_valid_acc};
pub use dispatch::Path;
pub use elementwise::{
    add, add_in_place, add_scalar, add_scalar_saturating, combine_with, copy, copy_cast,
    copy_clamped, div, lincomb, map, max_elementwise, mul, power, scale, scale_acc, sub,
    sub_square, update_with, UnaryOp,
};
pub use hints::KernelHints;
pub use linalg::{
    dot, dot_acc, dot_with, m4_dot_m2, m4_dot_m2_acc, matvec, matvec_acc, matvec_path, outer,
    outer2, outer2_acc, outer_acc, MatvecPath,
};
pub use random::{fill_uniform, shuffle_axis, shuffle_together};
pub use reductions::{
    argmax, argmin, fold_with, l2_norm, max, mean, min, sort_down, sqr_dist, std_normalize, sum,
    sum_abs, sum_sqr, unravel,
};
