//! Export options.
//!
//! One options struct covers every output format; format-specific knobs
//! that do not apply are simply ignored by the other renderers. Defaults
//! match the print pipeline: a 1920x1080 canvas at device scale 2, a
//! 30 second navigation timeout, and click states enabled for the
//! formats that replay them (PPTX and MP4).

use crate::result::{ExportError, ExportResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default print canvas width in pixels
pub const DEFAULT_WIDTH: u32 = 1920;

/// Default print canvas height in pixels
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Default per-navigation timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default dwell per video step in milliseconds
pub const DEFAULT_VIDEO_INTERVAL_MS: u64 = 2_000;

/// Default video frame rate
pub const DEFAULT_VIDEO_FPS: u32 = 30;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Multi-page vector document
    Pdf,
    /// One raster image per slide (or click state)
    Png,
    /// Image-per-slide PowerPoint deck
    Pptx,
    /// Markdown bundle with image references and speaker notes
    Md,
    /// Recorded video of the animated playback
    Mp4,
}

impl OutputFormat {
    /// Whether click states are captured by default for this format
    #[must_use]
    pub const fn clicks_by_default(self) -> bool {
        matches!(self, Self::Pptx | Self::Mp4)
    }

    /// File extension for single-file artifacts
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Pptx => "pptx",
            Self::Md => "md",
            Self::Mp4 => "mp4",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "png" => Ok(Self::Png),
            "pptx" => Ok(Self::Pptx),
            "md" | "markdown" => Ok(Self::Md),
            "mp4" | "video" => Ok(Self::Mp4),
            other => Err(ExportError::invalid(format!(
                "unknown export format '{other}' (expected pdf, png, pptx, md, or mp4)"
            ))),
        }
    }
}

/// Router mode of the slide app under export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterMode {
    /// `<base>/?query#slideNo`
    #[default]
    Hash,
    /// `<base>/slideNo?query`
    History,
}

/// Navigation wait strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// Wait for the network to go idle
    #[default]
    NetworkIdle,
    /// Wait for the `load` event
    Load,
    /// Wait for `DOMContentLoaded`
    DomContentLoaded,
    /// Do not wait beyond the navigation itself
    None,
}

/// MP4-specific options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoOptions {
    /// Milliseconds to dwell on each step
    pub interval_ms: u64,
    /// Frames per second (1-60)
    pub fps: u32,
    /// Output video width in pixels
    pub width: u32,
    /// Output video height in pixels
    pub height: u32,
    /// Capture-side motion dilation factor (> 0); values above 1 slow
    /// in-page animations during capture and speed the encoded timeline
    /// back up by the same factor
    pub motion_scale: f64,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_VIDEO_INTERVAL_MS,
            fps: DEFAULT_VIDEO_FPS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            motion_scale: 1.0,
        }
    }
}

impl VideoOptions {
    /// Encoder timeline speedup: `max(1, motion_scale)`
    #[must_use]
    pub fn speedup(&self) -> f64 {
        self.motion_scale.max(1.0)
    }

    /// Validate fps, interval, and motion scale
    pub fn validate(&self) -> ExportResult<()> {
        if !(1..=60).contains(&self.fps) {
            return Err(ExportError::invalid(format!(
                "videoFps must be an integer between 1 and 60, got {}",
                self.fps
            )));
        }
        if self.motion_scale <= 0.0 || !self.motion_scale.is_finite() {
            return Err(ExportError::invalid(format!(
                "videoMotionScale must be > 0, got {}",
                self.motion_scale
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ExportError::invalid("video dimensions must be non-zero"));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            // yuv420p output needs even dimensions.
            return Err(ExportError::invalid(format!(
                "video dimensions must be even, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Options for a single export run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Output format
    pub format: OutputFormat,
    /// Base URL of the running slide app (e.g. `http://localhost:3030`)
    pub base_url: String,
    /// Range expression (`"1-3,5"`); `None` means the whole deck
    pub range: Option<String>,
    /// Output path (file, or directory for PNG)
    pub output: PathBuf,
    /// Print canvas width in pixels
    pub width: u32,
    /// Print canvas height in pixels
    pub height: u32,
    /// Dark color scheme
    pub dark: bool,
    /// Router mode of the slide app
    pub router_mode: RouterMode,
    /// Capture per-click reveal states; `None` = format default
    pub with_clicks: Option<bool>,
    /// Visit slides one by one instead of the stacked print route
    pub per_slide: bool,
    /// Device scale factor for print/raster capture
    pub scale: f64,
    /// Transparent background for PNG capture
    pub omit_background: bool,
    /// Per-navigation timeout in milliseconds
    pub timeout_ms: u64,
    /// Extra delay after each navigation in milliseconds
    pub wait_ms: u64,
    /// Navigation wait strategy
    pub wait_until: WaitUntil,
    /// Attach a table of contents to PDF output
    pub with_toc: bool,
    /// Browser executable override
    pub executable_path: Option<PathBuf>,
    /// MP4 options
    pub video: VideoOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pdf,
            base_url: String::from("http://localhost:3030"),
            range: None,
            output: PathBuf::from("slides-export.pdf"),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            dark: false,
            router_mode: RouterMode::default(),
            with_clicks: None,
            per_slide: false,
            scale: 2.0,
            omit_background: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            wait_ms: 0,
            wait_until: WaitUntil::default(),
            with_toc: false,
            executable_path: None,
            video: VideoOptions::default(),
        }
    }
}

impl ExportOptions {
    /// Create options for a format with defaults
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the output path
    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = path.into();
        self
    }

    /// Set the range expression
    #[must_use]
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Set the print canvas dimensions
    #[must_use]
    pub const fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Override click-state capture
    #[must_use]
    pub const fn with_clicks(mut self, enabled: bool) -> Self {
        self.with_clicks = Some(enabled);
        self
    }

    /// Resolved click-state capture (format default when unset)
    #[must_use]
    pub fn clicks_enabled(&self) -> bool {
        self.with_clicks
            .unwrap_or_else(|| self.format.clicks_by_default())
    }

    /// Validate the options for the selected format
    pub fn validate(&self) -> ExportResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ExportError::invalid("width and height must be non-zero"));
        }
        if self.scale <= 0.0 {
            return Err(ExportError::invalid("scale must be > 0"));
        }
        if self.format == OutputFormat::Mp4 {
            if self.with_clicks == Some(false) {
                return Err(ExportError::invalid(
                    "mp4 export replays click states; withClicks=false is not supported",
                ));
            }
            self.video.validate()?;
        }
        Ok(())
    }
}

/// Parse a `"WxH"` dimension string (e.g. `"1920x1080"`)
pub fn parse_dimensions(input: &str) -> ExportResult<(u32, u32)> {
    let bad = || {
        ExportError::invalid(format!(
            "invalid dimensions '{input}' (expected WIDTHxHEIGHT, e.g. 1920x1080)"
        ))
    };
    let (w, h) = input
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(bad)?;
    let width: u32 = w.trim().parse().map_err(|_| bad())?;
    let height: u32 = h.trim().parse().map_err(|_| bad())?;
    if width == 0 || height == 0 {
        return Err(bad());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    mod format_tests {
        use super::*;

        #[test]
        fn test_parse_formats() {
            assert_eq!(OutputFormat::from_str("pdf").unwrap(), OutputFormat::Pdf);
            assert_eq!(OutputFormat::from_str("PNG").unwrap(), OutputFormat::Png);
            assert_eq!(OutputFormat::from_str("mp4").unwrap(), OutputFormat::Mp4);
            assert!(OutputFormat::from_str("docx").is_err());
        }

        #[test]
        fn test_clicks_defaults_by_format() {
            assert!(!OutputFormat::Pdf.clicks_by_default());
            assert!(!OutputFormat::Png.clicks_by_default());
            assert!(OutputFormat::Pptx.clicks_by_default());
            assert!(OutputFormat::Mp4.clicks_by_default());
        }
    }

    mod dimension_tests {
        use super::*;

        #[test]
        fn test_parse_dimensions() {
            assert_eq!(parse_dimensions("1920x1080").unwrap(), (1920, 1080));
            assert_eq!(parse_dimensions("1280X720").unwrap(), (1280, 720));
            assert_eq!(parse_dimensions(" 640 x 480 ").unwrap(), (640, 480));
        }

        #[test]
        fn test_parse_dimensions_rejects_garbage() {
            assert!(parse_dimensions("1920").is_err());
            assert!(parse_dimensions("x1080").is_err());
            assert!(parse_dimensions("0x1080").is_err());
            assert!(parse_dimensions("1920x-1").is_err());
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_defaults_are_valid() {
            assert!(ExportOptions::default().validate().is_ok());
        }

        #[test]
        fn test_mp4_rejects_clicks_disabled() {
            let opts = ExportOptions::new(OutputFormat::Mp4).with_clicks(false);
            let err = opts.validate().unwrap_err();
            assert!(err.to_string().contains("withClicks"));
        }

        #[test]
        fn test_fps_bounds() {
            let mut opts = ExportOptions::new(OutputFormat::Mp4);
            opts.video.fps = 0;
            assert!(opts.validate().is_err());
            opts.video.fps = 61;
            assert!(opts.validate().is_err());
            opts.video.fps = 60;
            assert!(opts.validate().is_ok());
        }

        #[test]
        fn test_odd_video_dimensions_rejected() {
            let mut opts = ExportOptions::new(OutputFormat::Mp4);
            opts.video.width = 1921;
            let err = opts.validate().unwrap_err();
            assert!(err.to_string().contains("even"));
        }

        #[test]
        fn test_motion_scale_must_be_positive() {
            let mut opts = ExportOptions::new(OutputFormat::Mp4);
            opts.video.motion_scale = 0.0;
            assert!(opts.validate().is_err());
            opts.video.motion_scale = -2.0;
            assert!(opts.validate().is_err());
            opts.video.motion_scale = 0.5;
            assert!(opts.validate().is_ok());
        }

        #[test]
        fn test_speedup_floors_at_one() {
            let mut video = VideoOptions::default();
            video.motion_scale = 0.5;
            assert!((video.speedup() - 1.0).abs() < f64::EPSILON);
            video.motion_scale = 3.0;
            assert!((video.speedup() - 3.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_resolved_clicks() {
            let opts = ExportOptions::new(OutputFormat::Pptx);
            assert!(opts.clicks_enabled());
            let opts = ExportOptions::new(OutputFormat::Png);
            assert!(!opts.clicks_enabled());
            let opts = ExportOptions::new(OutputFormat::Png).with_clicks(true);
            assert!(opts.clicks_enabled());
        }
    }
}
