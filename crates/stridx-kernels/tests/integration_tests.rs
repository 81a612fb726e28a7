//! Integration tests for stridx-kernels
//!
//! These tests drive the kernels through views built with stridx-core, the
//! way a layer implementation would.

use scirs2_core::random::{rngs::StdRng, SeedableRng};
use stridx_core::{Tensor, TensorError};
use stridx_kernels::*;

fn ramp(extents: &[usize]) -> Tensor<f64> {
    let n: usize = extents.iter().product();
    Tensor::from_vec((0..n).map(|x| x as f64).collect(), extents).unwrap()
}

#[test]
fn test_dot_scenario() {
    let a = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], &[4]).unwrap();
    let b = Tensor::from_vec(vec![4.0f64, 3.0, 2.0, 1.0], &[4]).unwrap();
    assert_eq!(dot(&a, &b).unwrap(), 20.0);

    // the same values read through a column of a transposed matrix
    let m = Tensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0], &[2, 4]).unwrap();
    let column = m.transpose(0, 1).unwrap().select(1, 0).unwrap();
    assert_eq!(dot(&column, &b).unwrap(), 20.0);
}

#[test]
fn test_unfold_window_sum_over_volume() {
    // 1x5x5 ramp, 3x3 windows over axes 1 and 2
    let volume = ramp(&[1, 5, 5]);
    let windows = volume.unfold(1, 3, 1).unwrap().unfold(2, 3, 1).unwrap();
    assert_eq!(windows.extents(), &[1, 3, 3, 3, 3]);
    assert!(windows.shares_storage(&volume));

    let kernel = Tensor::full(&[3, 3], 1.0).unwrap();
    let out = Tensor::new(&[3, 3]).unwrap();
    m4_dot_m2(&windows.select(0, 0).unwrap(), &kernel, &out).unwrap();
    assert_eq!(out.get(&[0, 0]).unwrap(), 54.0);
    assert_eq!(out.get(&[2, 2]).unwrap(), 9.0 * 18.0);

    let direct = Tensor::new(&[3, 3]).unwrap();
    conv2d_valid(&volume.select(0, 0).unwrap(), &kernel, 1, 1, &direct).unwrap();
    assert_eq!(out.to_vec(), direct.to_vec());
}

#[test]
fn test_matvec_on_transposed_matrix() {
    let stored = ramp(&[3, 2]);
    let m = stored.transpose(0, 1).unwrap();
    let v = Tensor::from_vec(vec![1.0, 1.0, 1.0], &[3]).unwrap();
    let out = Tensor::new(&[2]).unwrap();

    assert_eq!(matvec(&m, &v, &out).unwrap(), MatvecPath::Columns);
    // rows of the transpose are the columns of `stored`: [0, 2, 4] and [1, 3, 5]
    assert_eq!(out.to_vec(), vec![6.0, 9.0]);

    matvec_acc(&m, &v, &out).unwrap();
    assert_eq!(out.to_vec(), vec![12.0, 18.0]);
}

#[test]
fn test_kernels_write_through_views() {
    let base = Tensor::<f64>::zeros(&[3, 4]).unwrap();
    let middle = base.narrow(1, 2, 1).unwrap();
    let ones = Tensor::full(&[3, 2], 1.0).unwrap();

    add(&ones, &ones, &middle).unwrap();
    assert_eq!(sum(&base), 12.0);
    assert_eq!(base.get(&[1, 0]).unwrap(), 0.0);
    assert_eq!(base.get(&[1, 2]).unwrap(), 2.0);

    map(&middle, UnaryOp::Negate, &middle).unwrap();
    assert_eq!(min(&base).unwrap(), -2.0);
    assert_eq!(unravel(&base, argmin(&base).unwrap()).unwrap(), vec![0, 1]);
}

#[test]
fn test_shape_errors_leave_output_untouched() {
    let a = ramp(&[2, 3]);
    let b = ramp(&[7]);
    let out = Tensor::full(&[6], 9.0).unwrap();
    assert!(matches!(add(&a, &b, &out), Err(TensorError::ShapeMismatch(_))));
    assert_eq!(out.to_vec(), vec![9.0; 6]);
}

#[test]
fn test_forced_generic_path_matches() {
    let a = ramp(&[4, 5]).transpose(0, 1).unwrap();
    let b = ramp(&[5, 4]);
    let fast = Tensor::new(&[5, 4]).unwrap();
    let slow = Tensor::new(&[5, 4]).unwrap();

    let path = combine_with(&KernelHints::default(), "sum", &a, &b, &fast, |x, y| x + y).unwrap();
    assert_eq!(path, Path::Recursive);
    combine_with(&KernelHints::generic(), "sum", &a, &b, &slow, |x, y| x + y).unwrap();
    assert_eq!(fast.to_vec(), slow.to_vec());
}

#[test]
fn test_seeded_initialisation_and_shuffle() {
    let mut rng = StdRng::seed_from_u64(2024);
    let weights = Tensor::<f32>::new(&[6, 4]).unwrap();
    fill_uniform(&weights, -0.5, 0.5, &mut rng).unwrap();
    assert!(weights.iter().all(|w| (-0.5..=0.5).contains(&w)));

    let samples = ramp(&[10, 2]);
    shuffle_axis(&samples, 0, &mut rng).unwrap();
    assert_eq!(sum(&samples), (0..20).sum::<i32>() as f64);
    for row in samples.dim_iter(0).unwrap() {
        assert_eq!(row.get(&[1]).unwrap(), row.get(&[0]).unwrap() + 1.0);
    }
}
