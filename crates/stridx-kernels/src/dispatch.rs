//! Traversal dispatch shared by every kernel.
//!
//! A kernel over one, two or three operands visits their storage positions in
//! lock-step, in canonical order. The traversal path is picked once per call:
//!
//! 1. [`Path::Flat`]: every operand is contiguous, positions are
//!    `offset + k`
//! 2. [`Path::Strided`]: every operand has rank 1, positions are
//!    `offset + k * stride`
//! 3. [`Path::Recursive`]: every operand has the same extents; loop over
//!    axis 0 and recurse on the remaining axes, ending in a strided loop
//! 4. [`Path::Generic`]: one [`Offsets`] odometer per operand
//!
//! All four visit the same position tuples in the same order; they differ only
//! in cost. [`KernelHints::force_generic`] pins the last one.

use crate::hints::KernelHints;
use stridx_core::iter::check_element_counts;
use stridx_core::{Offsets, ShapeSpec, TensorResult};

/// Traversal chosen for one kernel call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Path {
    /// Flat loop over contiguous operands
    Flat,
    /// Single strided loop over rank-1 operands
    Strided,
    /// Axis-0 decomposition of same-shape operands
    Recursive,
    /// Per-operand odometers
    Generic,
}

impl Path {
    /// Pick the traversal for `specs`.
    pub fn choose(hints: &KernelHints, specs: &[&ShapeSpec]) -> Path {
        if hints.force_generic {
            return Path::Generic;
        }
        if specs.iter().all(|s| s.is_contiguous()) {
            return Path::Flat;
        }
        if specs.iter().all(|s| s.rank() == 1) {
            return Path::Strided;
        }
        let Some(first) = specs.first() else {
            return Path::Flat;
        };
        let inner_ok = first
            .extents()
            .last()
            .is_some_and(|&e| e >= hints.min_inner_extent);
        if inner_ok && specs.iter().all(|s| s.same_shape(first)) {
            Path::Recursive
        } else {
            Path::Generic
        }
    }
}

fn recurse1<F: FnMut(usize)>(extents: &[usize], sa: &[usize], pa: usize, f: &mut F) {
    match extents {
        [] => f(pa),
        [n] => {
            for k in 0..*n {
                f(pa + k * sa[0]);
            }
        }
        [n, rest @ ..] => {
            for i in 0..*n {
                recurse1(rest, &sa[1..], pa + i * sa[0], f);
            }
        }
    }
}

fn recurse2<F: FnMut(usize, usize)>(
    extents: &[usize],
    sa: &[usize],
    sb: &[usize],
    pa: usize,
    pb: usize,
    f: &mut F,
) {
    match extents {
        [] => f(pa, pb),
        [n] => {
            for k in 0..*n {
                f(pa + k * sa[0], pb + k * sb[0]);
            }
        }
        [n, rest @ ..] => {
            for i in 0..*n {
                recurse2(rest, &sa[1..], &sb[1..], pa + i * sa[0], pb + i * sb[0], f);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn recurse3<F: FnMut(usize, usize, usize)>(
    extents: &[usize],
    sa: &[usize],
    sb: &[usize],
    sc: &[usize],
    pa: usize,
    pb: usize,
    pc: usize,
    f: &mut F,
) {
    match extents {
        [] => f(pa, pb, pc),
        [n] => {
            for k in 0..*n {
                f(pa + k * sa[0], pb + k * sb[0], pc + k * sc[0]);
            }
        }
        [n, rest @ ..] => {
            for i in 0..*n {
                recurse3(
                    rest,
                    &sa[1..],
                    &sb[1..],
                    &sc[1..],
                    pa + i * sa[0],
                    pb + i * sb[0],
                    pc + i * sc[0],
                    f,
                );
            }
        }
    }
}

/// Visit every storage position of `a` in canonical order.
pub fn walk1<F: FnMut(usize)>(
    hints: &KernelHints,
    operation: &'static str,
    a: &ShapeSpec,
    mut f: F,
) -> Path {
    let path = Path::choose(hints, &[a]);
    log::trace!("{operation}: {path:?} path over {:?}", a.extents());
    let n = a.element_count();
    match path {
        Path::Flat => (0..n).for_each(|k| f(a.offset() + k)),
        Path::Strided => {
            let s = a.strides()[0];
            (0..n).for_each(|k| f(a.offset() + k * s));
        }
        Path::Recursive => recurse1(a.extents(), a.strides(), a.offset(), &mut f),
        Path::Generic => Offsets::new(a).for_each(f),
    }
    path
}

/// Visit the storage positions of `a` and `b` in lock-step.
///
/// # Errors
///
/// Returns a shape mismatch if the element counts differ; nothing is visited.
pub fn walk2<F: FnMut(usize, usize)>(
    hints: &KernelHints,
    operation: &'static str,
    a: &ShapeSpec,
    b: &ShapeSpec,
    f: F,
) -> TensorResult<Path> {
    check_element_counts(operation, &[a, b])?;
    let path = Path::choose(hints, &[a, b]);
    log::trace!("{operation}: {path:?} path over {:?}", a.extents());
    run2(path, a, b, f);
    Ok(path)
}

/// Visit `a` and `b` in lock-step along an already chosen `path`.
///
/// For kernels that repeat one traversal over many operand pairs of the same
/// layout. The caller guarantees equal element counts, and for
/// [`Path::Recursive`] equal extents.
pub(crate) fn run2<F: FnMut(usize, usize)>(path: Path, a: &ShapeSpec, b: &ShapeSpec, mut f: F) {
    let n = a.element_count();
    match path {
        Path::Flat => (0..n).for_each(|k| f(a.offset() + k, b.offset() + k)),
        Path::Strided => {
            let (sa, sb) = (a.strides()[0], b.strides()[0]);
            (0..n).for_each(|k| f(a.offset() + k * sa, b.offset() + k * sb));
        }
        Path::Recursive => recurse2(
            a.extents(),
            a.strides(),
            b.strides(),
            a.offset(),
            b.offset(),
            &mut f,
        ),
        Path::Generic => Offsets::new(a)
            .zip(Offsets::new(b))
            .for_each(|(pa, pb)| f(pa, pb)),
    }
}

/// Visit the storage positions of `a`, `b` and `c` in lock-step.
pub fn walk3<F: FnMut(usize, usize, usize)>(
    hints: &KernelHints,
    operation: &'static str,
    a: &ShapeSpec,
    b: &ShapeSpec,
    c: &ShapeSpec,
    mut f: F,
) -> TensorResult<Path> {
    check_element_counts(operation, &[a, b, c])?;
    let path = Path::choose(hints, &[a, b, c]);
    log::trace!("{operation}: {path:?} path over {:?}", a.extents());
    let n = a.element_count();
    match path {
        Path::Flat => (0..n).for_each(|k| f(a.offset() + k, b.offset() + k, c.offset() + k)),
        Path::Strided => {
            let (sa, sb, sc) = (a.strides()[0], b.strides()[0], c.strides()[0]);
            (0..n).for_each(|k| f(a.offset() + k * sa, b.offset() + k * sb, c.offset() + k * sc));
        }
        Path::Recursive => recurse3(
            a.extents(),
            a.strides(),
            b.strides(),
            c.strides(),
            a.offset(),
            b.offset(),
            c.offset(),
            &mut f,
        ),
        Path::Generic => Offsets::new(a)
            .zip(Offsets::new(b))
            .zip(Offsets::new(c))
            .for_each(|((pa, pb), pc)| f(pa, pb, pc)),
    }
    Ok(path)
}
