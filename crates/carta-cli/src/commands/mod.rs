//! CLI command implementations

pub mod alpha;
pub mod composite;
pub mod convert;
pub mod info;

use anyhow::{anyhow, Context, Result};
use carta_host::{Env, HostResult, Image, Value};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Path as a host string value.
pub fn path_value(path: &Path) -> Result<Value> {
    path.to_str()
        .map(Value::from)
        .ok_or_else(|| anyhow!("Path is not valid UTF-8: {}", path.display()))
}

/// Queues an async operation with a collecting callback and runs the
/// environment until it completes.
///
/// `start` receives the callback value to append to its arguments. The
/// callback's error becomes the returned error; otherwise its second
/// argument (or undefined) is returned.
pub fn run_job(env: &Env, start: impl FnOnce(Value) -> HostResult<Value>) -> Result<Value> {
    let slot: Rc<RefCell<Option<Vec<Value>>>> = Rc::default();
    let sink = slot.clone();
    let callback = Value::function(move |args: &[Value]| {
        *sink.borrow_mut() = Some(args.to_vec());
    });

    start(callback)?;
    env.run();

    let args = slot.borrow_mut().take().context("Job finished without calling back")?;
    match args.first() {
        Some(Value::Error(err)) => Err(err.clone().into()),
        _ => Ok(args.get(1).cloned().unwrap_or_default()),
    }
}

/// Loads an image through the async loader.
pub fn load_image(env: &Env, path: &Path) -> Result<Image> {
    let filename = path_value(path)?;
    let value = run_job(env, |cb| Image::open(env, &[filename, cb]))
        .with_context(|| format!("Failed to load: {}", path.display()))?;
    value
        .as_image()
        .cloned()
        .context("Loader produced no image")
}

/// Saves an image, guessing the format from the extension unless given.
pub fn save_image(image: &Image, path: &Path, format: Option<&str>) -> Result<()> {
    let mut args = vec![path_value(path)?];
    args.extend(format.map(Value::from));
    image
        .save(&args)
        .with_context(|| format!("Failed to save: {}", path.display()))?;
    Ok(())
}

/// Format byte size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
