//! End-to-end pipeline.
//!
//! Wires a real browser to the renderers: launch Chromium sized for the
//! job, open a page, dispatch on the output format, and shut the
//! browser down whether or not the export succeeded. Also provides the
//! job-runner wiring that the HTTP service spawns per video export.

use crate::browser::SlideBrowser;
use crate::deck::SlideDeck;
use crate::jobs::service::JobRunner;
use crate::options::{ExportOptions, OutputFormat, RouterMode};
use crate::render::{self, ExportOutcome};
use crate::result::ExportResult;
use std::path::PathBuf;
use std::sync::Arc;

/// Launch viewport for the selected format: MP4 records at the video
/// dimensions with device scale 1, print/raster capture uses the print
/// canvas at the configured scale.
#[must_use]
pub fn launch_viewport(options: &ExportOptions) -> (u32, u32, f64) {
    if options.format == OutputFormat::Mp4 {
        (options.video.width, options.video.height, 1.0)
    } else {
        (options.width, options.height, options.scale)
    }
}

/// Run one export end to end.
///
/// The browser is closed on every path; a close failure never masks the
/// export error.
pub async fn run_export(
    deck: &SlideDeck,
    options: &ExportOptions,
    quiet: bool,
) -> ExportResult<ExportOutcome> {
    options.validate()?;
    let (width, height, scale) = launch_viewport(options);
    let browser = SlideBrowser::launch(options, width, height, scale).await?;

    let result = match browser.new_page(options).await {
        Ok(page) => render::export(&page, deck, options, quiet).await,
        Err(e) => Err(e),
    };

    let closed = browser.close().await;
    match result {
        Ok(outcome) => {
            closed?;
            Ok(outcome)
        }
        Err(e) => Err(e),
    }
}

/// Build the job runner the HTTP service spawns for each video export
#[must_use]
pub fn video_job_runner(
    base_url: String,
    router_mode: RouterMode,
    deck: SlideDeck,
    executable_path: Option<PathBuf>,
) -> JobRunner {
    Arc::new(move |request, file| {
        let base_url = base_url.clone();
        let deck = deck.clone();
        let executable_path = executable_path.clone();
        Box::pin(async move {
            let video = request.to_video_options()?;
            let mut options = ExportOptions::new(OutputFormat::Mp4)
                .with_base_url(base_url)
                .with_output(file);
            options.range = request.range.clone();
            options.dark = request.dark.unwrap_or(false);
            options.router_mode = router_mode;
            options.executable_path = executable_path;
            options.video = video;
            run_export(&deck, &options, true).await.map(|_| ())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mp4_launches_at_video_size_scale_one() {
        let mut options = ExportOptions::new(OutputFormat::Mp4);
        options.video.width = 1280;
        options.video.height = 720;
        assert_eq!(launch_viewport(&options), (1280, 720, 1.0));
    }

    #[test]
    fn test_print_launches_at_canvas_size_and_scale() {
        let options = ExportOptions::new(OutputFormat::Pdf).with_dimensions(1600, 900);
        assert_eq!(launch_viewport(&options), (1600, 900, 2.0));
    }
}
