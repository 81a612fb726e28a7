//! Convolution as a strided contraction.
//!
//! This example demonstrates:
//! - Seeded weight initialisation with an explicit generator
//! - Exposing receptive fields with two unfold views
//! - Contracting the windows with m4_dot_m2 and with conv2d_valid
//! - Shuffling samples along an axis
//!
//! Run with:
//! ```bash
//! cargo run --example unfold_conv
//! ```

use anyhow::Result;
use scirs2_core::random::{rngs::StdRng, SeedableRng};
use stridx::prelude::*;

fn main() -> Result<()> {
    println!("=== stridx: Unfold Convolution ===\n");

    let mut rng = StdRng::seed_from_u64(42);

    let image = Tensor::from_vec((0..49).map(|x| x as f64).collect(), &[7, 7])?;
    let kernel = Tensor::<f64>::new(&[3, 3])?;
    fill_uniform(&kernel, -1.0, 1.0, &mut rng)?;
    println!("kernel: {:?}", kernel.to_vec());

    let windows = image.unfold(0, 3, 2)?.unfold(1, 3, 2)?;
    println!("windows: {}", windows.spec());
    println!("shares storage with image: {}", windows.shares_storage(&image));

    let by_hand = Tensor::new(&[3, 3])?;
    m4_dot_m2(&windows, &kernel, &by_hand)?;

    let out = Tensor::new(&[3, 3])?;
    conv2d_valid(&image, &kernel, 2, 2, &out)?;

    println!("\nfeature map:");
    for row in out.dim_iter(0)? {
        let values: Vec<String> = row.iter().map(|v| format!("{v:8.3}")).collect();
        println!("  {}", values.join(" "));
    }
    println!("matches m4_dot_m2: {}", by_hand.to_vec() == out.to_vec());

    let samples = Tensor::from_vec((0..12).map(|x| x as f64).collect(), &[6, 2])?;
    shuffle_axis(&samples, 0, &mut rng)?;
    println!("\nshuffled samples:");
    for row in samples.dim_iter(0)? {
        println!("  {:?}", row.to_vec());
    }

    println!("\n=== Done ===");
    Ok(())
}
