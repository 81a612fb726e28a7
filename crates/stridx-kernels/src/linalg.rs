//! Linear-algebra kernels over strided operands
//!
//! Contractions never copy or transpose their inputs: a transposed matrix is
//! read through its strides. Results are accumulated in a scratch buffer
//! before being written, so an output may alias an input.
//!
//! # Operations
//!
//! - **dot** / **dot_acc**: `Σ a_k b_k` over two tensors of equal element count
//! - **matvec** / **matvec_acc**: `y_i = Σ_j M_ij x_j`
//! - **outer** / **outer_acc**: `R_ij = a_i b_j`
//! - **outer2** / **outer2_acc**: `R_ijkl = A_ij B_kl`
//! - **m4_dot_m2** / **m4_dot_m2_acc**: `R_ij = Σ_kl M_ijkl K_kl`

use crate::dispatch::{run2, walk2, Path};
use crate::hints::KernelHints;
use stridx_core::error::ShapeMismatchError;
use stridx_core::{Element, Tensor, TensorError, TensorResult};

/// Traversal used by [`matvec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatvecPath {
    /// One dot product per row; rows are read along their stride
    Rows,
    /// One scaled column added per vector element; used when the matrix
    /// columns are unit-stride (e.g. a transposed row-major matrix)
    Columns,
}

fn check_rank<T: Element>(operation: &'static str, t: &Tensor<T>, expected: usize) -> TensorResult<()> {
    if t.rank() != expected {
        return Err(TensorError::operand_rank(operation, expected, t.rank()));
    }
    Ok(())
}

fn check_extents(operation: &'static str, lhs: &[usize], rhs: &[usize]) -> TensorResult<()> {
    if lhs != rhs {
        return Err(ShapeMismatchError::Extents {
            operation,
            lhs: lhs.to_vec(),
            rhs: rhs.to_vec(),
        }
        .into());
    }
    Ok(())
}

/// Write `values` into `out` in canonical order, replacing or adding.
fn store<T: Element>(out: &Tensor<T>, values: Vec<T>, accumulate: bool) {
    let cells = out.storage().cells();
    for (position, value) in out.offsets().zip(values) {
        let cell = &cells[position];
        if accumulate {
            cell.set(cell.get() + value);
        } else {
            cell.set(value);
        }
    }
}

/// Dot product with explicit hints; returns the path taken.
pub fn dot_with<T: Element>(hints: &KernelHints, a: &Tensor<T>, b: &Tensor<T>) -> TensorResult<(T, Path)> {
    let ca = a.storage().cells();
    let cb = b.storage().cells();
    let mut acc = T::zero();
    let path = walk2(hints, "dot", a.spec(), b.spec(), |pa, pb| {
        acc += ca[pa].get() * cb[pb].get();
    })?;
    Ok((acc, path))
}

/// Dot product `Σ a_k b_k`, pairing elements in canonical order.
///
/// # Errors
///
/// Returns a shape mismatch if the element counts differ.
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::linalg::dot;
///
/// let a = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], &[4]).unwrap();
/// let b = Tensor::from_vec(vec![4.0f64, 3.0, 2.0, 1.0], &[4]).unwrap();
/// assert_eq!(dot(&a, &b).unwrap(), 20.0);
/// ```
pub fn dot<T: Element>(a: &Tensor<T>, b: &Tensor<T>) -> TensorResult<T> {
    dot_with(&KernelHints::default(), a, b).map(|(value, _)| value)
}

/// `out += a · b` where `out` holds a single element.
pub fn dot_acc<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    if out.element_count() != 1 {
        return Err(TensorError::element_count_mismatch(
            "dot_acc",
            vec![1, out.element_count()],
        ));
    }
    let value = dot(a, b)?;
    store(out, vec![value], true);
    Ok(())
}

/// Path [`matvec`] takes for matrix `m`.
pub fn matvec_path<T: Element>(m: &Tensor<T>) -> MatvecPath {
    match m.strides() {
        [row_stride, col_stride] if *row_stride == 1 && *col_stride != 1 => MatvecPath::Columns,
        _ => MatvecPath::Rows,
    }
}

fn matvec_into<T: Element>(
    operation: &'static str,
    m: &Tensor<T>,
    v: &Tensor<T>,
    out: &Tensor<T>,
    accumulate: bool,
) -> TensorResult<MatvecPath> {
    check_rank(operation, m, 2)?;
    check_rank(operation, v, 1)?;
    check_rank(operation, out, 1)?;
    let (rows, cols) = (m.extents()[0], m.extents()[1]);
    check_extents(operation, &[cols], v.extents())?;
    check_extents(operation, &[rows], out.extents())?;

    let path = matvec_path(m);
    log::trace!("{operation}: {path:?} path over {rows}x{cols}");

    let x = v.to_vec();
    let cells = m.storage().cells();
    let (row_stride, col_stride, base) = (m.strides()[0], m.strides()[1], m.offset());
    let mut y = vec![T::zero(); rows];
    match path {
        MatvecPath::Rows => {
            for (i, yi) in y.iter_mut().enumerate() {
                let row = base + i * row_stride;
                *yi = x
                    .iter()
                    .enumerate()
                    .fold(T::zero(), |acc, (j, &xj)| acc + cells[row + j * col_stride].get() * xj);
            }
        }
        MatvecPath::Columns => {
            for (j, &xj) in x.iter().enumerate() {
                let col = base + j * col_stride;
                for (i, yi) in y.iter_mut().enumerate() {
                    *yi += cells[col + i * row_stride].get() * xj;
                }
            }
        }
    }
    store(out, y, accumulate);
    Ok(path)
}

/// Matrix-vector product `out_i = Σ_j m_ij v_j`.
///
/// Reads `m` row by row when its rows are unit-stride and column by column
/// when its columns are, so a transposed matrix is never copied.
///
/// # Errors
///
/// - [`RankError::Operand`](stridx_core::error::RankError) unless `m` has
///   rank 2 and `v`, `out` rank 1
/// - [`ShapeMismatchError::Extents`] unless `v.extent(0) == m.extent(1)` and
///   `out.extent(0) == m.extent(0)`
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::linalg::matvec;
///
/// let m = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// let v = Tensor::from_vec(vec![1.0f64, 0.0, -1.0], &[3]).unwrap();
/// let out = Tensor::<f64>::new(&[2]).unwrap();
/// matvec(&m, &v, &out).unwrap();
/// assert_eq!(out.to_vec(), vec![-2.0, -2.0]);
/// ```
pub fn matvec<T: Element>(m: &Tensor<T>, v: &Tensor<T>, out: &Tensor<T>) -> TensorResult<MatvecPath> {
    matvec_into("matvec", m, v, out, false)
}

/// `out += m · v`
pub fn matvec_acc<T: Element>(m: &Tensor<T>, v: &Tensor<T>, out: &Tensor<T>) -> TensorResult<MatvecPath> {
    matvec_into("matvec_acc", m, v, out, true)
}

fn outer_into<T: Element>(
    operation: &'static str,
    a: &Tensor<T>,
    b: &Tensor<T>,
    out: &Tensor<T>,
    accumulate: bool,
) -> TensorResult<()> {
    check_rank(operation, a, 1)?;
    check_rank(operation, b, 1)?;
    check_rank(operation, out, 2)?;
    let expected = [a.extents()[0], b.extents()[0]];
    check_extents(operation, &expected, out.extents())?;

    let x = a.to_vec();
    let y = b.to_vec();
    let mut values = Vec::with_capacity(x.len() * y.len());
    for &xi in &x {
        values.extend(y.iter().map(|&yj| xi * yj));
    }
    store(out, values, accumulate);
    Ok(())
}

/// Outer product `out_ij = a_i b_j`.
///
/// # Examples
///
/// ```
/// use stridx_core::Tensor;
/// use stridx_kernels::linalg::outer;
///
/// let a = Tensor::from_vec(vec![1.0f32, 2.0], &[2]).unwrap();
/// let b = Tensor::from_vec(vec![3.0f32, 4.0, 5.0], &[3]).unwrap();
/// let out = Tensor::<f32>::new(&[2, 3]).unwrap();
/// outer(&a, &b, &out).unwrap();
/// assert_eq!(out.get(&[1, 2]).unwrap(), 10.0);
/// ```
pub fn outer<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    outer_into("outer", a, b, out, false)
}

/// `out += a ⊗ b`
pub fn outer_acc<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    outer_into("outer_acc", a, b, out, true)
}

fn outer2_into<T: Element>(
    operation: &'static str,
    a: &Tensor<T>,
    b: &Tensor<T>,
    out: &Tensor<T>,
    accumulate: bool,
) -> TensorResult<()> {
    check_rank(operation, a, 2)?;
    check_rank(operation, b, 2)?;
    check_rank(operation, out, 4)?;
    let expected = [a.extents()[0], a.extents()[1], b.extents()[0], b.extents()[1]];
    check_extents(operation, &expected, out.extents())?;

    let x = a.to_vec();
    let y = b.to_vec();
    let mut values = Vec::with_capacity(x.len() * y.len());
    for &xij in &x {
        values.extend(y.iter().map(|&ykl| xij * ykl));
    }
    store(out, values, accumulate);
    Ok(())
}

/// Outer product of two matrices, `out_ijkl = a_ij b_kl`.
///
/// The rank-4 counterpart of [`outer`]; the gradient of [`m4_dot_m2`] with
/// respect to its rank-4 operand.
///
/// # Errors
///
/// - A rank error unless `a`, `b` have rank 2 and `out` rank 4
/// - [`ShapeMismatchError::Extents`] unless `out` has extents
///   `[a₀, a₁, b₀, b₁]`
pub fn outer2<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    outer2_into("outer2", a, b, out, false)
}

/// `out += a ⊗ b` for two matrices
pub fn outer2_acc<T: Element>(a: &Tensor<T>, b: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    outer2_into("outer2_acc", a, b, out, true)
}

fn m4_dot_m2_into<T: Element>(
    operation: &'static str,
    m4: &Tensor<T>,
    m2: &Tensor<T>,
    out: &Tensor<T>,
    accumulate: bool,
) -> TensorResult<()> {
    check_rank(operation, m4, 4)?;
    check_rank(operation, m2, 2)?;
    check_rank(operation, out, 2)?;
    check_extents(operation, &m4.extents()[2..], m2.extents())?;
    check_extents(operation, &m4.extents()[..2], out.extents())?;

    let (rows, cols) = (m4.extents()[0], m4.extents()[1]);
    let mut values = Vec::with_capacity(rows * cols);
    if rows > 0 && cols > 0 {
        // every window shares the layout of window (0, 0), only the offset moves
        let first = m4.spec().select(0, 0)?.select(0, 0)?;
        let path = Path::choose(&KernelHints::default(), &[&first, m2.spec()]);
        log::trace!("{operation}: {path:?} path over {rows}x{cols} windows of {:?}", m2.extents());

        let c4 = m4.storage().cells();
        let c2 = m2.storage().cells();
        for i in 0..rows {
            let plane = m4.spec().select(0, i)?;
            for j in 0..cols {
                let window = plane.select(0, j)?;
                let mut acc = T::zero();
                run2(path, &window, m2.spec(), |pw, pk| {
                    acc += c4[pw].get() * c2[pk].get();
                });
                values.push(acc);
            }
        }
    }
    store(out, values, accumulate);
    Ok(())
}

/// Contract the two trailing axes of `m4` with `m2`:
/// `out_ij = Σ_kl m4_ijkl m2_kl`.
///
/// Together with two [`Tensor::unfold`] calls this is a 2-D valid
/// convolution; see [`conv2d_valid`](crate::convolution::conv2d_valid).
pub fn m4_dot_m2<T: Element>(m4: &Tensor<T>, m2: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    m4_dot_m2_into("m4_dot_m2", m4, m2, out, false)
}

/// `out += m4 · m2` over the two trailing axes of `m4`
pub fn m4_dot_m2_acc<T: Element>(m4: &Tensor<T>, m2: &Tensor<T>, out: &Tensor<T>) -> TensorResult<()> {
    m4_dot_m2_into("m4_dot_m2_acc", m4, m2, out, true)
}
