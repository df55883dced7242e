//! Grayscale-to-alpha command.

use crate::AlphaArgs;
use anyhow::{bail, Context, Result};
use carta_host::{Color, Env, Value};

pub fn run(env: &Env, args: AlphaArgs, verbose: u8) -> Result<()> {
    let image = super::load_image(env, &args.input)?;

    let mut call = Vec::new();
    if let Some(text) = &args.color {
        call.push(Value::Color(parse_rgb(text)?));
    }
    image.set_grayscale_to_alpha(&call)?;

    super::save_image(&image, &args.output, None)?;
    if verbose > 0 {
        println!("{} -> {}", args.input.display(), args.output.display());
    }
    Ok(())
}

/// Parses `r,g,b` with 0-255 channels.
fn parse_rgb(text: &str) -> Result<Color> {
    let parts = text
        .split(',')
        .map(|s| s.trim().parse::<u8>().with_context(|| format!("Invalid channel '{}' in color '{}'", s, text)))
        .collect::<Result<Vec<_>>>()?;
    let &[r, g, b] = parts.as_slice() else {
        bail!("Color must be r,g,b: {}", text);
    };
    Ok(Color::rgb(r, g, b))
}
