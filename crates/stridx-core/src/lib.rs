//! # stridx-core
//!
//! Strided tensors over shared, reference-counted storage.
//!
//! This crate provides the building blocks of the stridx engine:
//!
//! - **Storage** ([`Storage`]): a growable element buffer shared by every tensor
//!   that reads it
//! - **Shape specs** ([`ShapeSpec`]): extents, strides and offset, with the view
//!   algebra (select, narrow, transpose, permute, unfold, resize)
//! - **Tensors** ([`Tensor`]): a storage handle read through a shape spec
//! - **Iteration** ([`iter`]): scalar and dimension iterators, with lock-step
//!   pairing of two or three tensors
//! - **Persistence** ([`io`]): the binary tensor container
//!
//! ## Core Principles
//!
//! ### Zero-copy views
//!
//! Every view operation builds a new [`ShapeSpec`] and shares the source's
//! storage. Writes through one view are immediately visible through all the
//! others.
//!
//! ### Validation before mutation
//!
//! Operations validate their arguments first and return a [`TensorError`]
//! without touching any state when they fail.
//!
//! ### Single-threaded
//!
//! Storage is `Rc`-shared; tensors are neither `Send` nor `Sync`.
//!
//! ## Quick Start
//!
//! ```
//! use stridx_core::Tensor;
//!
//! let t = Tensor::from_vec((0..12).map(|x| x as f64).collect(), &[3, 4]).unwrap();
//! assert_eq!(t.rank(), 2);
//!
//! // Column 1 as a strided rank-1 view
//! let col = t.select(1, 1).unwrap();
//! assert_eq!(col.to_vec(), vec![1.0, 5.0, 9.0]);
//! assert!(col.shares_storage(&t));
//!
//! // Writes through the view reach the source
//! col.fill(0.0);
//! assert_eq!(t.get(&[2, 1]).unwrap(), 0.0);
//! ```
//!
//! ## Sliding windows
//!
//! ```
//! use stridx_core::Tensor;
//!
//! let t = Tensor::from_vec((0..5).map(|x| x as f32).collect(), &[5]).unwrap();
//! let windows = t.unfold(0, 3, 1).unwrap();
//! assert_eq!(windows.extents(), &[3, 3]);
//! let rows: Vec<Vec<f32>> = windows.dim_iter(0).unwrap().map(|w| w.to_vec()).collect();
//! assert_eq!(rows[2], vec![2.0, 3.0, 4.0]);
//! ```

pub mod element;
pub mod error;
pub mod io;
pub mod iter;
pub mod shape;
pub mod storage;
pub mod tensor;


pub use element::{DType, Element};
pub use error::{TensorError, TensorResult};
pub use iter::{zip3_dims, zip3_scalars, zip_dims, zip_scalars, DimIter, Offsets, ScalarIter};
pub use shape::{Dims, ShapeSpec, MAX_RANK};
pub use storage::Storage;
pub use tensor::Tensor;
