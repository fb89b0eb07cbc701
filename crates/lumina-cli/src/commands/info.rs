use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lumina_core::display::{compute_statistics, StatsRequest};
use lumina_core::io::load_frame;

#[derive(Args)]
pub struct InfoArgs {
    /// Input image file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let frame = load_frame(&args.file).with_context(|| format!("Failed to load {}", args.file.display()))?;
    let stats = compute_statistics(Some(&frame), Some(&frame), Some(&frame), &StatsRequest::all(), true);

    println!("File:        {}", args.file.display());
    match frame.shape() {
        [c, x, y] => println!("Dimensions:  {x}x{y}, {c} channels"),
        [x, y] => println!("Dimensions:  {x}x{y}"),
        shape => println!("Dimensions:  {shape:?}"),
    }
    println!("Pixel type:  {}", frame.dtype());
    println!("Data size:   {:.1} KB", (frame.len() * frame.dtype().size_bytes()) as f64 / 1024.0);
    println!("Min:         {:.3}", stats.min);
    println!("Max:         {:.4}", stats.max);
    println!("Mean:        {:.4}", stats.mean);
    println!("Variance:    {:.4}", stats.variance);

    Ok(())
}
