//! Convert command: decode, optionally premultiply, encode.

use crate::ConvertArgs;
use anyhow::{Context, Result};
use carta_host::{Env, Value};
use std::fs;
use tracing::{debug, info};

pub fn run(env: &Env, args: ConvertArgs, verbose: u8) -> Result<()> {
    let image = super::load_image(env, &args.input)?;

    if args.premultiply {
        super::run_job(env, |cb| image.premultiply(env, &[cb]))?;
    }

    let format = match &args.format {
        Some(f) => f.clone(),
        None => {
            let name = args.output.to_str().map(carta_io::guess_type).unwrap_or(carta_io::UNKNOWN_TYPE);
            if name == carta_io::UNKNOWN_TYPE {
                anyhow::bail!("Cannot guess output format for: {}", args.output.display());
            }
            name.to_string()
        }
    };
    debug!(format = %format, "encoding");

    let encoded = super::run_job(env, |cb| image.encode(env, &[Value::from(format.as_str()), cb]))
        .with_context(|| format!("Failed to encode as {}", format))?;
    let bytes = encoded.as_buffer().context("Encoder produced no bytes")?;
    fs::write(&args.output, bytes).with_context(|| format!("Failed to save: {}", args.output.display()))?;

    info!(output = %args.output.display(), bytes = bytes.len(), "converted");
    if verbose > 0 {
        println!(
            "{} -> {} ({}, {})",
            args.input.display(),
            args.output.display(),
            format,
            super::format_size(bytes.len() as u64)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carta_host::{Color, Image};

    #[test]
    fn png_to_jpeg() {
        let env = Env::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.jpg");

        let img = Image::with_size(&env, 8, 8).unwrap();
        img.buffer().write().fill(Color::rgb(200, 100, 50));
        super::super::save_image(&img, &input, None).unwrap();

        run(
            &env,
            ConvertArgs {
                input,
                output: output.clone(),
                format: Some("jpeg90".into()),
                premultiply: false,
            },
            0,
        )
        .unwrap();

        let bytes = fs::read(&output).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn unknown_extension_needs_format() {
        let env = Env::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let img = Image::with_size(&env, 1, 1).unwrap();
        super::super::save_image(&img, &input, None).unwrap();

        let args = ConvertArgs {
            input,
            output: dir.path().join("out.xyz"),
            format: None,
            premultiply: true,
        };
        assert!(run(&env, args, 0).is_err());
    }
}
