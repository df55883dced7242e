//! carta - command line driver for carta images
//!
//! Every command goes through the same host surface a scripting binding
//! would use: arguments are passed as host values, async forms run on the
//! worker pool and their callbacks are dispatched by the environment.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "carta")]
#[command(author, version, about = "RGBA image tool built on the carta host surface")]
#[command(long_about = "
Load, inspect, composite and encode RGBA images.

Examples:
  carta info a.png b.jpg                 # Show dimensions and sizes
  carta convert in.png out.jpg -f jpeg90
  carta convert in.png out.png -f png24
  carta composite bg.png fg.png -o out.png -m multiply --dx 10
  carta composite bg.png fg.png -o out.png --filters 'blur invert'
  carta alpha mask.png -o out.png --color 255,0,0
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Number of worker threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Display image information
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Decode an image and encode it in another format
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),

    /// Composite one image onto another
    #[command(visible_alias = "comp")]
    Composite(CompositeArgs),

    /// Move luminance into the alpha channel
    Alpha(AlphaArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Input image(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input image
    input: PathBuf,

    /// Output image
    output: PathBuf,

    /// Output format: png, png24, png8, jpeg, jpegNN (quality 1-100)
    #[arg(short, long)]
    format: Option<String>,

    /// Premultiply alpha before encoding
    #[arg(long)]
    premultiply: bool,
}

#[derive(Args)]
struct CompositeArgs {
    /// Destination (background) image
    bg: PathBuf,

    /// Source (foreground) image
    fg: PathBuf,

    /// Output image
    #[arg(short, long)]
    output: PathBuf,

    /// Composite mode name, e.g. src_over, multiply, screen
    #[arg(short, long, default_value = "src_over")]
    mode: String,

    /// Opacity (0.0-1.0)
    #[arg(long, default_value = "1.0")]
    opacity: f64,

    /// Horizontal offset of the source
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    dx: i32,

    /// Vertical offset of the source
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    dy: i32,

    /// Filters applied to the source first, e.g. "blur agg-stack-blur(2,2)"
    #[arg(long)]
    filters: Option<String>,
}

#[derive(Args)]
struct AlphaArgs {
    /// Input image
    input: PathBuf,

    /// Output image
    #[arg(short, long)]
    output: PathBuf,

    /// Replace RGB with this color: r,g,b
    #[arg(long)]
    color: Option<String>,
}

fn init_logging(verbose: u8) -> Result<()> {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.parse::<Directive>().context("Invalid log level")?)
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let env = carta_host::Env::builder()
        .worker_threads(cli.threads)
        .build()
        .context("Failed to configure worker pool")?;

    match cli.command {
        Commands::Info(args) => commands::info::run(&env, args, cli.verbose),
        Commands::Convert(args) => commands::convert::run(&env, args, cli.verbose),
        Commands::Composite(args) => commands::composite::run(&env, args, cli.verbose),
        Commands::Alpha(args) => commands::alpha::run(&env, args, cli.verbose),
    }
}
