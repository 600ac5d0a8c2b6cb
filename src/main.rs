use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use gifplay::{ppm_writer, CorruptionPolicy, DecoderOptions, DisposalMode, FileFetcher, Gif, LoadOutcome, LoopCount};

#[derive(Parser, Debug)]
#[command(name = "gifplay", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the screen size, frame timing and metadata of a GIF.
    Info(InfoArgs),
    /// Write every composited frame as a PPM.
    Dump(DumpArgs),
    /// Play a GIF in real time, logging each frame as it's shown.
    Play(PlayArgs),
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Path or file:// URL of the GIF.
    input: String,

    /// Report frames as they decode instead of once at the end.
    #[arg(long, default_value_t = false)]
    progressive: bool,

    /// Stop after the first image.
    #[arg(long, default_value_t = false)]
    first_frame_only: bool,

    /// Use GIF89a disposal instead of the simplified last-frame model.
    #[arg(long, default_value_t = false)]
    conformant: bool,

    /// Fail on truncated or malformed data instead of decoding what is there.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

impl DecodeArgs {
    fn options(&self) -> DecoderOptions {
        DecoderOptions::default()
            .wait_till_done(!self.progressive)
            .first_frame_only(self.first_frame_only)
            .disposal(if self.conformant {
                DisposalMode::Conformant
            } else {
                DisposalMode::Simplified
            })
            .corruption(if self.strict {
                CorruptionPolicy::Strict
            } else {
                CorruptionPolicy::Tolerant
            })
    }
}

#[derive(Args, Debug)]
struct InfoArgs {
    #[command(flatten)]
    decode: DecodeArgs,
}

#[derive(Args, Debug)]
struct DumpArgs {
    #[command(flatten)]
    decode: DecodeArgs,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct PlayArgs {
    #[command(flatten)]
    decode: DecodeArgs,

    /// Number of times to play through. Defaults to the GIF's own loop count.
    #[arg(long)]
    loops: Option<u32>,

    /// Playback speed; negative plays backwards.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    speed: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => cmd_info(args).await,
        Command::Dump(args) => cmd_dump(args).await,
        Command::Play(args) => cmd_play(args).await,
    }
}

async fn load(args: &DecodeArgs, speed: f64) -> Result<Gif> {
    let mut gif = Gif::with_options(args.options().speed(speed));
    gif.on_load(|frames| info!("{frames} frames ready"));

    let outcome = gif
        .load(&FileFetcher::new(), &args.input)
        .await
        .with_context(|| format!("load '{}'", args.input))?;
    if outcome == LoadOutcome::Cancelled {
        bail!("load of '{}' was cancelled", args.input);
    }
    Ok(gif)
}

async fn cmd_info(args: InfoArgs) -> Result<()> {
    let gif = load(&args.decode, 1.0).await?;

    println!("size: {}x{}", gif.width(), gif.height());
    if let Some(version) = gif.version() {
        println!("version: {version:?}");
    }
    println!("frames: {}", gif.frame_count());
    println!("length: {} ms", gif.length());
    match gif.loop_count() {
        Some(LoopCount::Infinite) => println!("loops: forever"),
        Some(LoopCount::Number(count)) => println!("loops: {count}"),
        None => println!("loops: once"),
    }
    if let Some(table) = gif.global_color_table() {
        println!("global colors: {}", table.len());
    }
    if !gif.comment().is_empty() {
        println!("comment: {}", gif.comment());
    }

    for (i, frame) in gif.frames().iter().enumerate() {
        println!(
            "frame {i}: {}x{} at ({}, {}), t={} ms, delay={} ms, disposal={:?}",
            frame.width, frame.height, frame.left, frame.top, frame.time, frame.delay, frame.disposal_method
        );
    }
    Ok(())
}

async fn cmd_dump(args: DumpArgs) -> Result<()> {
    let gif = load(&args.decode, 1.0).await?;

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;
    for (i, frame) in gif.frames().iter().enumerate() {
        ppm_writer::save_ppm(args.out.join(format!("frame_{i}.ppm")), &frame.image)?;
    }

    eprintln!("wrote {} frames to {}", gif.frame_count(), args.out.display());
    Ok(())
}

async fn cmd_play(args: PlayArgs) -> Result<()> {
    let mut gif = load(&args.decode, args.speed).await?;
    if gif.frame_count() == 0 {
        bail!("'{}' has no frames", args.decode.input);
    }

    // NETSCAPE counts repeats after the first play; no extension means a single play
    let loops = args.loops.unwrap_or(match gif.loop_count() {
        Some(LoopCount::Infinite) => u32::MAX,
        Some(LoopCount::Number(count)) => u32::from(count) + 1,
        None => 1,
    });
    let ticks = u64::from(loops).saturating_mul(gif.frame_count() as u64);

    gif.play();
    let mut shown = 0;
    while shown < ticks {
        let Some(index) = gif.next_tick().await else {
            break;
        };
        println!("frame {index}");
        shown += 1;
    }
    gif.stop();
    Ok(())
}
