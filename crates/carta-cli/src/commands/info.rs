//! Image info command.

use crate::InfoArgs;
use anyhow::Result;
use carta_host::{Env, Image};
use std::fs;
use std::path::Path;

/// Runs the info command.
pub fn run(env: &Env, args: InfoArgs, verbose: u8) -> Result<()> {
    for (i, path) in args.input.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let file_size = fs::metadata(path)?.len();
        let image = super::load_image(env, path)?;
        print_text(path, &image, file_size, verbose);
    }
    Ok(())
}

fn print_text(path: &Path, image: &Image, file_size: u64, verbose: u8) {
    let format = path
        .to_str()
        .and_then(carta_io::type_from_filename)
        .unwrap_or("unknown");

    println!("{}", path.display());
    println!("  Resolution: {}x{}", image.width(), image.height());
    println!("  Format:     {}", format);
    println!("  File size:  {}", super::format_size(file_size));
    println!("  In memory:  {}", super::format_size(image.estimated_size() as u64));

    if verbose > 0 {
        let (opaque, transparent) = alpha_stats(image);
        println!("  Opaque:     {}", opaque);
        println!("  Transparent: {}", transparent);
    }
}

/// Counts fully opaque and fully transparent pixels.
fn alpha_stats(image: &Image) -> (usize, usize) {
    let buffer = image.buffer().read();
    buffer.data().iter().fold((0, 0), |(o, t), &w| match w >> 24 {
        0xFF => (o + 1, t),
        0 => (o, t + 1),
        _ => (o, t),
    })
}
