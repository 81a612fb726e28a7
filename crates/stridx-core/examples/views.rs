//! Views and aliasing walkthrough.
//!
//! This example demonstrates:
//! - Zero-copy select, narrow and transpose views
//! - Writes through a view reaching the source
//! - Sliding windows with unfold
//! - Saving and reloading a tensor
//!
//! Run with:
//! ```bash
//! cargo run --example views
//! ```

use anyhow::Result;
use stridx_core::{io, Tensor};

fn main() -> Result<()> {
    println!("=== stridx-core: Views and Aliasing ===\n");

    let t = Tensor::from_vec((0..12).map(|x| x as f64).collect(), &[3, 4])?;
    println!("source: {}", t.spec());

    let row = t.select(0, 1)?;
    println!("row 1: {:?} ({})", row.to_vec(), row.spec());

    let col = t.select(1, 2)?;
    println!("column 2: {:?} ({})", col.to_vec(), col.spec());

    let block = t.narrow(0, 2, 1)?.narrow(1, 2, 1)?;
    println!("block: {:?} contiguous={}", block.to_vec(), block.is_contiguous());

    let tt = t.transpose(0, 1)?;
    println!("transpose: {:?}", tt.to_vec());

    block.fill(-1.0);
    println!("\nafter filling the block through the view:");
    for r in t.dim_iter(0)? {
        println!("  {:?}", r.to_vec());
    }

    let signal = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[6])?;
    let windows = signal.unfold(0, 3, 1)?;
    println!("\nwindows of 3 over {:?}:", signal.to_vec());
    for w in windows.dim_iter(0)? {
        println!("  {:?}", w.to_vec());
    }

    let mut bytes = Vec::new();
    io::save(&tt.deep_copy()?, &mut bytes)?;
    let back: Tensor<f32> = io::load(&mut bytes.as_slice())?;
    println!("\nreloaded {} bytes as f32: {:?}", bytes.len(), back.extents());

    println!("\n=== Done ===");
    Ok(())
}
