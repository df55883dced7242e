//! Composite command

use crate::CompositeArgs;
use anyhow::{bail, Context, Result};
use carta_host::{Env, Value};
use carta_ops::CompositeMode;
use tracing::debug;

pub fn run(env: &Env, args: CompositeArgs, verbose: u8) -> Result<()> {
    let Some(mode) = CompositeMode::from_name(&args.mode.to_lowercase()) else {
        let names: Vec<_> = CompositeMode::ALL.iter().map(|m| m.name()).collect();
        bail!("Unknown composite mode: {} (expected one of: {})", args.mode, names.join(", "));
    };

    let bg = super::load_image(env, &args.bg)?;
    let fg = super::load_image(env, &args.fg)?;

    if verbose > 0 {
        println!(
            "Compositing {} onto {} with mode '{}'",
            args.fg.display(),
            args.bg.display(),
            mode.name()
        );
    }

    let mut options = vec![
        ("comp_op", Value::from(mode.value() as f64)),
        ("opacity", Value::from(args.opacity)),
        ("dx", Value::from(args.dx)),
        ("dy", Value::from(args.dy)),
    ];
    if let Some(filters) = &args.filters {
        options.push(("image_filters", Value::from(filters.as_str())));
    }
    debug!(mode = mode.name(), dx = args.dx, dy = args.dy, "queueing composite");

    super::run_job(env, |cb| bg.composite(env, &[Value::Image(fg.clone()), Value::object(options), cb]))
        .context("Composite failed")?;

    super::save_image(&bg, &args.output, None)?;

    if verbose > 0 {
        println!("Done.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carta_host::{Color, Image};

    #[test]
    fn offset_src_over() {
        let env = Env::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let bg_path = dir.path().join("bg.png");
        let fg_path = dir.path().join("fg.png");
        let out_path = dir.path().join("out.png");

        let bg = Image::with_size(&env, 3, 1).unwrap();
        let fg = Image::with_size(&env, 1, 1).unwrap();
        fg.buffer().write().fill(Color::rgb(0, 255, 0));
        super::super::save_image(&bg, &bg_path, None).unwrap();
        super::super::save_image(&fg, &fg_path, None).unwrap();

        let args = CompositeArgs {
            bg: bg_path,
            fg: fg_path,
            output: out_path.clone(),
            mode: "SRC_OVER".into(),
            opacity: 1.0,
            dx: 1,
            dy: 0,
            filters: None,
        };
        run(&env, args, 0).unwrap();

        let out = super::super::load_image(&env, &out_path).unwrap();
        let green = Color::rgb(0, 255, 0).to_word();
        assert_eq!(out.buffer().read().data(), &[0, green, 0]);
    }

    #[test]
    fn unknown_mode() {
        let env = Env::new().unwrap();
        let args = CompositeArgs {
            bg: "a.png".into(),
            fg: "b.png".into(),
            output: "c.png".into(),
            mode: "sideways".into(),
            opacity: 1.0,
            dx: 0,
            dy: 0,
            filters: None,
        };
        let err = run(&env, args, 0).unwrap_err();
        assert!(err.to_string().contains("Unknown composite mode"));
    }
}
