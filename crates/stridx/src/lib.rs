//! # stridx
//!
//! Strided tensors with zero-copy views and the kernels that run over them.
//!
//! This is the **meta crate** that re-exports the stridx components:
//!
//! - [`core`]: storage, shape specs, tensors, iteration and the persisted
//!   container
//! - [`kernels`]: elementwise, reduction, linear-algebra, convolution and
//!   random kernels
//!
//! ## Quick Start
//!
//! ```
//! use stridx::prelude::*;
//!
//! let image = Tensor::from_vec((0..25).map(|x| x as f64).collect(), &[5, 5])?;
//! let kernel = Tensor::full(&[3, 3], 1.0)?;
//! let out = Tensor::new(&[3, 3])?;
//!
//! conv2d_valid(&image, &kernel, 1, 1, &out)?;
//! assert_eq!(out.get(&[1, 1])?, 9.0 * 12.0);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub use stridx_core as core;
pub use stridx_kernels as kernels;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use stridx::prelude::*;
    //!
    //! let t = Tensor::<f32>::zeros(&[2, 3]).unwrap();
    //! assert_eq!(sum(&t), 0.0);
    //! ```

    // Core types
    pub use crate::core::{DType, Element, ShapeSpec, Storage, Tensor, TensorError, TensorResult};

    // Kernels
    pub use crate::kernels::{
        add, conv2d_valid, copy, dot, fill_uniform, m4_dot_m2, map, matvec, outer, shuffle_axis,
        shuffle_together, sum, KernelHints, UnaryOp,
    };
}
