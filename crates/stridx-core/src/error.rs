//! Error types for the strided tensor engine
//!
//! Every fallible operation in `stridx-core` and `stridx-kernels` returns a
//! [`TensorResult`]. Errors are raised before any state is mutated, so a failed
//! call leaves storage, shape specs and tensors exactly as they were.
//!
//! # Design
//!
//! - **`TensorError`**: top-level enum, one variant per failure class
//! - **Class-specific errors**: index, rank, shape mismatch, dimension,
//!   allocation and container errors, each carrying the offending values
//!
//! # Examples
//!
//! ```
//! use stridx_core::error::{IndexError, TensorError};
//!
//! fn check_axis(axis: usize, rank: usize) -> Result<(), TensorError> {
//!     if axis >= rank {
//!         return Err(IndexError::AxisOutOfRange { axis, rank }.into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_axis(1, 2).is_ok());
//! assert!(matches!(check_axis(2, 2), Err(TensorError::Index(_))));
//! ```

use thiserror::Error;

/// Top-level error type for all tensor operations
#[derive(Error, Debug)]
pub enum TensorError {
    /// Out-of-range axis or position
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Wrong number of dimensions
    #[error("Rank error: {0}")]
    Rank(#[from] RankError),

    /// Incompatible operand extents
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(#[from] ShapeMismatchError),

    /// Inconsistent unfold/narrow/construction parameters
    #[error("Dimension error: {0}")]
    Dimension(#[from] DimensionError),

    /// Storage growth failure
    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    /// Malformed or unsupported persisted tensor container
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// I/O failure while reading or writing a container
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Out-of-range axis or position
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("axis {axis} out of range for rank {rank}")]
    AxisOutOfRange { axis: usize, rank: usize },

    #[error("index {index} out of range for axis {axis} with extent {extent}")]
    PositionOutOfRange {
        axis: usize,
        index: usize,
        extent: usize,
    },

    #[error("narrow of size {size} at start {start} out of range for axis {axis} with extent {extent}")]
    NarrowOutOfRange {
        axis: usize,
        size: usize,
        start: usize,
        extent: usize,
    },

    #[error("{permutation:?} is not a permutation of 0..{rank}")]
    InvalidPermutation {
        permutation: Vec<usize>,
        rank: usize,
    },
}

/// Wrong number of dimensions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    #[error("{operation}: expected {expected} values, got {got}")]
    Mismatch {
        operation: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("rank {rank} exceeds the maximum of {max}")]
    TooLarge { rank: usize, max: usize },

    #[error("{operation}: expected rank {expected}, got rank {got}")]
    Operand {
        operation: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Incompatible operand extents
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeMismatchError {
    #[error("{operation}: element counts differ ({counts:?})")]
    ElementCount {
        operation: &'static str,
        counts: Vec<usize>,
    },

    #[error("{operation}: extents on axis {axis} differ ({extents:?})")]
    AxisExtent {
        operation: &'static str,
        axis: usize,
        extents: Vec<usize>,
    },

    #[error("{operation}: incompatible extents {lhs:?} and {rhs:?}")]
    Extents {
        operation: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },

    #[error("data length {len} does not match extents {extents:?} ({expected} elements)")]
    DataLength {
        len: usize,
        extents: Vec<usize>,
        expected: usize,
    },
}

/// Inconsistent view or construction parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DimensionError {
    #[error("unfold of axis {axis} (extent {extent}) with window {window} and step {step} is inconsistent")]
    Unfold {
        axis: usize,
        extent: usize,
        window: usize,
        step: usize,
    },

    #[error("extents {extents:?} and strides {strides:?} have different lengths")]
    StrideCount {
        extents: Vec<usize>,
        strides: Vec<usize>,
    },

    #[error("{operation}: {reason}")]
    Invalid {
        operation: &'static str,
        reason: String,
    },
}

/// Storage growth failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("cannot grow storage from {capacity} to {requested} elements")]
    OutOfMemory { capacity: usize, requested: usize },

    #[error("storage of {capacity} elements is borrowed by an active traversal")]
    Borrowed { capacity: usize },

    #[error("footprint overflows the address space")]
    Overflow,
}

/// Malformed or unsupported persisted tensor container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("unknown magic number {magic:#010x}")]
    UnknownMagic { magic: u32 },

    #[error("container rank {rank} exceeds the maximum of {max}")]
    RankTooLarge { rank: usize, max: usize },

    #[error("negative extent {extent} on axis {axis}")]
    NegativeExtent { axis: usize, extent: i32 },

    #[error("tensor must be row-major contiguous to be saved (strides {strides:?}, offset {offset})")]
    NotContiguous { strides: Vec<usize>, offset: usize },
}

/// Result type alias for tensor operations
pub type TensorResult<T> = Result<T, TensorError>;

impl TensorError {
    /// Shorthand for a rank mismatch on an index or extent list
    pub fn rank_mismatch(operation: &'static str, expected: usize, got: usize) -> Self {
        TensorError::Rank(RankError::Mismatch {
            operation,
            expected,
            got,
        })
    }

    /// Shorthand for an axis that does not exist
    pub fn axis_out_of_range(axis: usize, rank: usize) -> Self {
        TensorError::Index(IndexError::AxisOutOfRange { axis, rank })
    }

    /// Shorthand for differing element counts between kernel operands
    pub fn element_count_mismatch(operation: &'static str, counts: Vec<usize>) -> Self {
        TensorError::ShapeMismatch(ShapeMismatchError::ElementCount { operation, counts })
    }

    /// Shorthand for a kernel operand of the wrong rank
    pub fn operand_rank(operation: &'static str, expected: usize, got: usize) -> Self {
        TensorError::Rank(RankError::Operand {
            operation,
            expected,
            got,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_message() {
        let err = IndexError::PositionOutOfRange {
            axis: 1,
            index: 7,
            extent: 3,
        };
        assert_eq!(
            err.to_string(),
            "index 7 out of range for axis 1 with extent 3"
        );
    }

    #[test]
    fn test_unfold_error_message() {
        let err = DimensionError::Unfold {
            axis: 0,
            extent: 6,
            window: 3,
            step: 2,
        };
        assert_eq!(
            err.to_string(),
            "unfold of axis 0 (extent 6) with window 3 and step 2 is inconsistent"
        );
    }

    #[test]
    fn test_from_conversions() {
        let err: TensorError = RankError::TooLarge { rank: 9, max: 8 }.into();
        assert!(matches!(err, TensorError::Rank(_)));

        let err: TensorError = AllocationError::Overflow.into();
        assert_eq!(
            err.to_string(),
            "Allocation error: footprint overflows the address space"
        );
    }

    #[test]
    fn test_container_magic_is_hex() {
        let err = ContainerError::UnknownMagic { magic: 0x1234 };
        assert_eq!(err.to_string(), "unknown magic number 0x00001234");
    }
}
