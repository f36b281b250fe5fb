//! Format renderers.
//!
//! Format selection is a tagged choice over `{pdf, png, pptx, md, mp4}`;
//! each variant dispatches to one rendering strategy over the shared
//! page driver. The non-video strategies iterate slide states (optionally
//! multiplied by click reveals) and write artifacts to disk; the MP4
//! strategy hands off to the recorder.

pub mod markdown;
pub mod pdf;
pub mod png;
pub mod pptx;
pub mod toc;

use crate::browser::{slide_selector, slide_url, PageQuery};
use crate::deck::SlideDeck;
use crate::options::{ExportOptions, OutputFormat};
use crate::page::{PageDriver, ScreenshotOptions};
use crate::progress::ExportProgress;
use crate::range::parse_range;
use crate::record::encoder::FfmpegEncoder;
use crate::record::{self, VideoRecorder};
use crate::result::{ExportError, ExportResult};
use crate::stabilize;
use std::path::PathBuf;
use std::time::Duration;

/// A produced artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Single output file
    File(PathBuf),
    /// Directory of files (PNG export)
    Directory(PathBuf),
}

impl Artifact {
    /// The artifact's path
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::File(p) | Self::Directory(p) => p,
        }
    }
}

/// Outcome of an export run
#[derive(Debug)]
pub struct ExportOutcome {
    /// What was written where
    pub artifact: Artifact,
    /// Non-fatal page warnings (`data-waitfor` targets that never showed)
    pub warnings: Vec<String>,
}

/// Deck-level metadata shared by the PDF Info dictionary and the PPTX
/// core properties, read from the first slide
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckMeta {
    /// Document title (first slide's title)
    pub title: Option<String>,
    /// Author from the headmatter
    pub author: Option<String>,
    /// Subject (`info` key)
    pub subject: Option<String>,
    /// Keywords, normalized to a list
    pub keywords: Vec<String>,
}

impl DeckMeta {
    /// Extract metadata from the deck's first slide
    #[must_use]
    pub fn from_deck(deck: &SlideDeck) -> Self {
        let title = deck.slides.first().and_then(|s| s.title.clone());
        let head = deck.headmatter();
        Self {
            title,
            author: head.and_then(|h| h.author.clone()),
            subject: head.and_then(|h| h.info.clone()),
            keywords: head
                .and_then(|h| h.keywords.as_ref())
                .map(|k| k.to_list())
                .unwrap_or_default(),
        }
    }
}

/// One visit of the capture iteration: a slide, at an optional click state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureState {
    /// Slide number
    pub no: u32,
    /// Click state; `None` means clicks are not being replayed
    pub clicks: Option<u32>,
}

impl CaptureState {
    /// File stem `NN` or `NN-<clicks>` (slide number zero-padded to 2)
    #[must_use]
    pub fn file_stem(&self) -> String {
        match self.clicks {
            Some(clicks) if clicks > 0 => format!("{:02}-{clicks}", self.no),
            _ => format!("{:02}", self.no),
        }
    }
}

/// Expand a slide range into the capture iteration, multiplying by
/// click states when enabled.
#[must_use]
pub fn capture_plan(deck: &SlideDeck, slide_range: &[u32], with_clicks: bool) -> Vec<CaptureState> {
    let mut plan = Vec::new();
    for &no in slide_range {
        if with_clicks {
            for clicks in 0..=deck.clicks(no) {
                plan.push(CaptureState {
                    no,
                    clicks: Some(clicks),
                });
            }
        } else {
            plan.push(CaptureState { no, clicks: None });
        }
    }
    plan
}

/// Run the export for the selected format.
///
/// Mp4 requires the `slide_range` to be contiguous and ffmpeg to be
/// installed; both are rejected before any capture starts.
pub async fn export<P: PageDriver + ?Sized>(
    page: &P,
    deck: &SlideDeck,
    options: &ExportOptions,
    quiet: bool,
) -> ExportResult<ExportOutcome> {
    options.validate()?;
    let slide_range = parse_range(options.range.as_deref(), deck.len())?;

    match options.format {
        OutputFormat::Pdf => {
            let progress = progress_for(options, deck, &slide_range, quiet);
            pdf::render(page, deck, options, &slide_range, &progress).await
        }
        OutputFormat::Png => {
            let progress = progress_for(options, deck, &slide_range, quiet);
            png::render(page, deck, options, &slide_range, &progress).await
        }
        OutputFormat::Pptx => {
            let progress = progress_for(options, deck, &slide_range, quiet);
            pptx::render(page, deck, options, &slide_range, &progress).await
        }
        OutputFormat::Md => {
            let progress = progress_for(options, deck, &slide_range, quiet);
            markdown::render(page, deck, options, &slide_range, &progress).await
        }
        OutputFormat::Mp4 => {
            record::check_preconditions(options, &slide_range)?;
            let progress = if quiet {
                ExportProgress::hidden()
            } else {
                ExportProgress::indeterminate("recording mp4")
            };
            let mut sink = FfmpegEncoder::spawn(
                options.video.fps,
                options.video.speedup(),
                &options.output,
            )
            .await?;
            let start = slide_range[0];
            let end = *slide_range.last().unwrap_or(&start);
            let stats = VideoRecorder::record(page, &mut sink, options, start, end).await;
            match stats {
                Ok(stats) => {
                    progress.finish(format!(
                        "wrote {} ({} frames)",
                        options.output.display(),
                        stats.frames
                    ));
                    Ok(ExportOutcome {
                        artifact: Artifact::File(options.output.clone()),
                        warnings: stats.warnings,
                    })
                }
                Err(e) => {
                    progress.fail(e.to_string());
                    Err(e)
                }
            }
        }
    }
}

fn progress_for(
    options: &ExportOptions,
    deck: &SlideDeck,
    slide_range: &[u32],
    quiet: bool,
) -> ExportProgress {
    if quiet {
        return ExportProgress::hidden();
    }
    let pages = capture_plan(deck, slide_range, options.clicks_enabled()).len() as u64;
    ExportProgress::bounded(pages, format!("exporting {}", options.format.extension()))
}

/// Navigate to one capture state on a print route and wait for it to
/// settle. Returns stabilizer warnings.
pub(crate) async fn goto_state<P: PageDriver + ?Sized>(
    page: &P,
    options: &ExportOptions,
    state: CaptureState,
) -> ExportResult<Vec<String>> {
    let mut query = PageQuery::new().print();
    if let Some(clicks) = state.clicks {
        query = query.clicks(clicks);
    }
    let url = slide_url(&options.base_url, options.router_mode, state.no, &query);
    page.navigate(&url).await?;
    page.set_color_scheme(options.dark).await?;
    let timeout = Duration::from_millis(options.timeout_ms);
    stabilize::wait_for_element(page, &slide_selector(state.no), timeout).await?;
    let warnings = stabilize::wait_for_loaded(page, timeout).await?;
    if options.wait_ms > 0 {
        tokio::time::sleep(Duration::from_millis(options.wait_ms)).await;
    }
    Ok(warnings)
}

/// Capture one state as a full-viewport PNG
pub(crate) async fn capture_state_png<P: PageDriver + ?Sized>(
    page: &P,
    options: &ExportOptions,
    state: CaptureState,
    warnings: &mut Vec<String>,
) -> ExportResult<Vec<u8>> {
    warnings.extend(goto_state(page, options, state).await?);
    page.screenshot(ScreenshotOptions {
        clip: None,
        omit_background: options.omit_background,
    })
    .await
}

/// Ensure the parent directory of a file exists
pub(crate) fn ensure_parent_dir(path: &std::path::Path) -> ExportResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Force-recreate a directory (PNG export owns its output directory)
pub(crate) fn recreate_dir(path: &std::path::Path) -> ExportResult<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(ExportError::Render {
                message: format!("output path {} exists and is not a directory", path.display()),
            });
        }
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{Frontmatter, Slide};

    fn deck_with_clicks(clicks: &[u32]) -> SlideDeck {
        SlideDeck {
            slides: clicks
                .iter()
                .enumerate()
                .map(|(i, &c)| Slide {
                    no: i as u32 + 1,
                    title: None,
                    title_level: 1,
                    note: None,
                    clicks: c,
                    frontmatter: Frontmatter::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_plan_without_clicks() {
        let deck = deck_with_clicks(&[2, 0, 1]);
        let plan = capture_plan(&deck, &[1, 3], false);
        assert_eq!(
            plan,
            vec![
                CaptureState { no: 1, clicks: None },
                CaptureState { no: 3, clicks: None },
            ]
        );
    }

    #[test]
    fn test_plan_with_clicks_multiplies_states() {
        let deck = deck_with_clicks(&[2, 0]);
        let plan = capture_plan(&deck, &[1, 2], true);
        let keys: Vec<(u32, Option<u32>)> = plan.iter().map(|s| (s.no, s.clicks)).collect();
        assert_eq!(
            keys,
            vec![(1, Some(0)), (1, Some(1)), (1, Some(2)), (2, Some(0))]
        );
    }

    #[test]
    fn test_file_stems_are_zero_padded() {
        assert_eq!(CaptureState { no: 3, clicks: None }.file_stem(), "03");
        assert_eq!(
            CaptureState {
                no: 3,
                clicks: Some(0)
            }
            .file_stem(),
            "03"
        );
        assert_eq!(
            CaptureState {
                no: 12,
                clicks: Some(2)
            }
            .file_stem(),
            "12-2"
        );
    }

    #[test]
    fn test_recreate_dir_clears_stale_content() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("out");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("stale.png"), b"old").unwrap();
        recreate_dir(&dir).unwrap();
        assert!(dir.exists());
        assert!(!dir.join("stale.png").exists());
    }

    #[test]
    fn test_recreate_dir_rejects_files() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        assert!(recreate_dir(&file).is_err());
    }
}
