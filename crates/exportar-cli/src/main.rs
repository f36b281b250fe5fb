//! Exportar CLI.
//!
//! Two subcommands: `export` runs one export end to end against a
//! running slide dev server; `serve` exposes the asynchronous video
//! export API. Page warnings (`data-waitfor` targets that never became
//! visible) do not abort an export but are printed and turn the exit
//! code non-zero.

use clap::{Args, Parser, Subcommand};
use console::style;
use exportar::deck::SlideDeck;
use exportar::options::{parse_dimensions, ExportOptions, OutputFormat, RouterMode, WaitUntil};
use exportar::pipeline::{run_export, video_job_runner};
use exportar::jobs::service::VideoJobService;
use exportar::result::{ExportError, ExportResult};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "exportar", version, about = "Export slide decks to PDF, PNG, PPTX, Markdown, or MP4")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export the deck to an artifact
    Export(ExportArgs),
    /// Serve the asynchronous video export API
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Output format: pdf, png, pptx, md, or mp4
    #[arg(long, default_value = "pdf")]
    format: String,

    /// Base URL of the running slide app
    #[arg(long, default_value = "http://localhost:3030")]
    base_url: String,

    /// Deck manifest (JSON) produced by the slide parser
    #[arg(long)]
    deck: PathBuf,

    /// Output file (or directory for png); defaults to
    /// `slides-export.<ext>`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Range expression, e.g. "1-3,5"
    #[arg(long)]
    range: Option<String>,

    /// Print canvas width in pixels
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Print canvas height in pixels
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Use the dark color scheme
    #[arg(long)]
    dark: bool,

    /// Router mode of the slide app: hash or history
    #[arg(long, default_value = "hash")]
    router_mode: String,

    /// Capture per-click reveal states (defaults by format)
    #[arg(long)]
    with_clicks: Option<bool>,

    /// Visit slides one by one instead of the stacked print route
    #[arg(long)]
    per_slide: bool,

    /// Device scale factor for capture
    #[arg(long, default_value_t = 2.0)]
    scale: f64,

    /// Transparent background for PNG capture
    #[arg(long)]
    omit_background: bool,

    /// Per-navigation timeout in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout: u64,

    /// Extra delay after each navigation in milliseconds
    #[arg(long, default_value_t = 0)]
    wait: u64,

    /// Navigation wait strategy: networkidle, load, domcontentloaded, none
    #[arg(long, default_value = "networkidle")]
    wait_until: String,

    /// Attach a table of contents to PDF output
    #[arg(long)]
    with_toc: bool,

    /// Browser executable override
    #[arg(long)]
    executable_path: Option<PathBuf>,

    /// Milliseconds to dwell on each video step
    #[arg(long, default_value_t = 2_000)]
    video_interval: u64,

    /// Video frame rate (1-60)
    #[arg(long, default_value_t = 30)]
    video_fps: u32,

    /// Video dimensions as WIDTHxHEIGHT
    #[arg(long, default_value = "1920x1080")]
    video_size: String,

    /// Capture-side motion dilation factor (> 0)
    #[arg(long, default_value_t = 1.0)]
    video_motion_scale: f64,
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = 7236)]
    port: u16,

    /// Directory that receives the produced videos
    #[arg(long, default_value = "exports")]
    output_dir: PathBuf,

    /// Base URL of the running slide app
    #[arg(long, default_value = "http://localhost:3030")]
    base_url: String,

    /// Deck manifest (JSON)
    #[arg(long)]
    deck: PathBuf,

    /// Router mode of the slide app: hash or history
    #[arg(long, default_value = "hash")]
    router_mode: String,

    /// Browser executable override
    #[arg(long)]
    executable_path: Option<PathBuf>,
}

impl ExportArgs {
    fn to_options(&self) -> ExportResult<ExportOptions> {
        let format = OutputFormat::from_str(&self.format)?;
        let (video_width, video_height) = parse_dimensions(&self.video_size)?;
        let mut options = ExportOptions::new(format)
            .with_base_url(self.base_url.clone())
            .with_output(self.output.clone().unwrap_or_else(|| default_output(format)))
            .with_dimensions(self.width, self.height);
        options.range = self.range.clone();
        options.dark = self.dark;
        options.router_mode = parse_router_mode(&self.router_mode)?;
        options.with_clicks = self.with_clicks;
        options.per_slide = self.per_slide;
        options.scale = self.scale;
        options.omit_background = self.omit_background;
        options.timeout_ms = self.timeout;
        options.wait_ms = self.wait;
        options.wait_until = parse_wait_until(&self.wait_until)?;
        options.with_toc = self.with_toc;
        options.executable_path = self.executable_path.clone();
        options.video.interval_ms = self.video_interval;
        options.video.fps = self.video_fps;
        options.video.width = video_width;
        options.video.height = video_height;
        options.video.motion_scale = self.video_motion_scale;
        options.validate()?;
        Ok(options)
    }
}

fn default_output(format: OutputFormat) -> PathBuf {
    match format {
        OutputFormat::Png => PathBuf::from("slides-export"),
        other => PathBuf::from(format!("slides-export.{}", other.extension())),
    }
}

fn parse_router_mode(raw: &str) -> ExportResult<RouterMode> {
    match raw.to_ascii_lowercase().as_str() {
        "hash" => Ok(RouterMode::Hash),
        "history" => Ok(RouterMode::History),
        other => Err(ExportError::invalid(format!(
            "unknown router mode '{other}' (expected hash or history)"
        ))),
    }
}

fn parse_wait_until(raw: &str) -> ExportResult<WaitUntil> {
    match raw.to_ascii_lowercase().as_str() {
        "networkidle" => Ok(WaitUntil::NetworkIdle),
        "load" => Ok(WaitUntil::Load),
        "domcontentloaded" => Ok(WaitUntil::DomContentLoaded),
        "none" => Ok(WaitUntil::None),
        other => Err(ExportError::invalid(format!(
            "unknown wait strategy '{other}' (expected networkidle, load, domcontentloaded, or none)"
        ))),
    }
}

async fn run_export_command(args: &ExportArgs) -> ExportResult<ExitCode> {
    let options = args.to_options()?;
    let deck = SlideDeck::load(&args.deck)?;
    let outcome = run_export(&deck, &options, false).await?;

    for warning in &outcome.warnings {
        eprintln!("{} {warning}", style("⚠").yellow().bold());
    }
    if outcome.warnings.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Capture proceeded, but the page never fully settled.
        Ok(ExitCode::FAILURE)
    }
}

async fn run_serve_command(args: &ServeArgs) -> ExportResult<ExitCode> {
    let deck = SlideDeck::load(&args.deck)?;
    let runner = video_job_runner(
        args.base_url.clone(),
        parse_router_mode(&args.router_mode)?,
        deck,
        args.executable_path.clone(),
    );
    let service = Arc::new(VideoJobService::new(runner, &args.output_dir));
    let app = service.router();

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!(
        "{} serving video exports on http://{addr}/export/video (artifacts in {})",
        style("▶").green().bold(),
        args.output_dir.display()
    );
    axum::serve(listener, app)
        .await
        .map_err(ExportError::from)?;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Export(ref args) => run_export_command(args).await,
        Command::Serve(ref args) => run_serve_command(args).await,
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", style("✗").red().bold());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_args_resolve_to_options() {
        let cli = Cli::parse_from([
            "exportar",
            "export",
            "--deck",
            "deck.json",
            "--format",
            "png",
            "--range",
            "1-3",
            "--per-slide",
            "--dark",
        ]);
        let Command::Export(args) = cli.command else {
            panic!("expected export subcommand");
        };
        let options = args.to_options().unwrap();
        assert_eq!(options.format, OutputFormat::Png);
        assert_eq!(options.range.as_deref(), Some("1-3"));
        assert!(options.per_slide);
        assert!(options.dark);
        assert_eq!(options.output, PathBuf::from("slides-export"));
    }

    #[test]
    fn test_mp4_defaults() {
        let cli = Cli::parse_from([
            "exportar",
            "export",
            "--deck",
            "deck.json",
            "--format",
            "mp4",
            "--video-size",
            "1280x720",
        ]);
        let Command::Export(args) = cli.command else {
            panic!("expected export subcommand");
        };
        let options = args.to_options().unwrap();
        assert_eq!(options.format, OutputFormat::Mp4);
        assert_eq!(options.video.fps, 30);
        assert_eq!((options.video.width, options.video.height), (1280, 720));
        assert!(options.clicks_enabled());
        assert_eq!(options.output, PathBuf::from("slides-export.mp4"));
    }

    #[test]
    fn test_bad_router_mode_is_rejected() {
        let cli = Cli::parse_from([
            "exportar",
            "export",
            "--deck",
            "deck.json",
            "--router-mode",
            "memory",
        ]);
        let Command::Export(args) = cli.command else {
            panic!("expected export subcommand");
        };
        assert!(args.to_options().is_err());
    }
}
