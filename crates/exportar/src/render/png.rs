//! PNG renderer.
//!
//! Two modes. One-piece navigates to the stacked print route once,
//! enumerates the `.print-slide-container` wrappers, and screenshots
//! each by its bounding box; per-slide visits every `(slide, clicks?)`
//! state on its own navigation. Either way the output directory is
//! recreated from scratch, so re-running against the same directory is
//! idempotent.

use super::{capture_plan, capture_state_png, recreate_dir, Artifact, ExportOutcome};
use crate::browser::{print_url, PageQuery};
use crate::deck::SlideDeck;
use crate::options::ExportOptions;
use crate::page::{ClipRect, PageDriver, ScreenshotOptions};
use crate::progress::ExportProgress;
use crate::result::ExportResult;
use crate::stabilize;
use serde::Deserialize;
use std::time::Duration;

/// Bounding boxes of the print containers, in document order
const JS_PRINT_CONTAINERS: &str = r"
Array.from(document.querySelectorAll('.print-slide-container')).map((el) => {
  const rect = el.getBoundingClientRect();
  return {
    id: el.id,
    left: rect.left,
    top: rect.top,
    right: rect.right,
    bottom: rect.bottom,
  };
})
";

#[derive(Debug, Deserialize)]
struct ContainerBox {
    id: String,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

/// One-piece filename: `<slideNo>.png`, or `<id>.png` when click states
/// are captured (container ids have the shape `"<no>-<clicks>"`).
#[must_use]
pub(crate) fn one_piece_name(id: &str, with_clicks: bool) -> String {
    if with_clicks {
        format!("{id}.png")
    } else {
        format!("{}.png", id.split('-').next().unwrap_or(id))
    }
}

/// Render PNGs into the output directory
pub async fn render<P: PageDriver + ?Sized>(
    page: &P,
    deck: &SlideDeck,
    options: &ExportOptions,
    slide_range: &[u32],
    progress: &ExportProgress,
) -> ExportResult<ExportOutcome> {
    recreate_dir(&options.output)?;
    let with_clicks = options.clicks_enabled();
    let mut warnings = Vec::new();

    if options.per_slide {
        page.set_viewport(options.width, options.height, options.scale)
            .await?;
        for state in capture_plan(deck, slide_range, with_clicks) {
            let png = capture_state_png(page, options, state, &mut warnings).await?;
            let path = options.output.join(format!("{}.png", state.file_stem()));
            std::fs::write(path, png)?;
            progress.inc();
        }
    } else {
        render_one_piece(page, deck, options, slide_range, progress, &mut warnings).await?;
    }

    progress.finish(format!("wrote {}", options.output.display()));
    Ok(ExportOutcome {
        artifact: Artifact::Directory(options.output.clone()),
        warnings,
    })
}

async fn render_one_piece<P: PageDriver + ?Sized>(
    page: &P,
    deck: &SlideDeck,
    options: &ExportOptions,
    slide_range: &[u32],
    progress: &ExportProgress,
    warnings: &mut Vec<String>,
) -> ExportResult<()> {
    let with_clicks = options.clicks_enabled();
    let pages = capture_plan(deck, slide_range, with_clicks).len() as u32;
    page.set_viewport(options.width, options.height * pages.max(1), options.scale)
        .await?;

    let mut query = if with_clicks {
        PageQuery::new().print_clicks()
    } else {
        PageQuery::new().print()
    };
    if let Some(ref expr) = options.range {
        query = query.range(expr);
    }
    let url = print_url(&options.base_url, options.router_mode, &query);
    page.navigate(&url).await?;
    page.set_color_scheme(options.dark).await?;

    let timeout = Duration::from_millis(options.timeout_ms);
    stabilize::wait_for_element(page, ".print-slide-container", timeout).await?;
    warnings.extend(stabilize::wait_for_loaded(page, timeout).await?);
    if options.wait_ms > 0 {
        tokio::time::sleep(Duration::from_millis(options.wait_ms)).await;
    }

    let value = page.evaluate(JS_PRINT_CONTAINERS).await?;
    let containers: Vec<ContainerBox> = serde_json::from_value(value)?;
    for container in containers {
        let clip = ClipRect::rounded_inward(
            container.left,
            container.top,
            container.right,
            container.bottom,
        );
        let png = page
            .screenshot(ScreenshotOptions {
                clip,
                omit_background: options.omit_background,
            })
            .await?;
        let name = one_piece_name(&container.id, with_clicks);
        std::fs::write(options.output.join(name), png)?;
        progress.inc();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{Frontmatter, Slide};
    use crate::options::OutputFormat;
    use crate::page::MockPage;
    use serde_json::json;

    fn deck(n: u32) -> SlideDeck {
        SlideDeck {
            slides: (1..=n)
                .map(|no| Slide {
                    no,
                    title: None,
                    title_level: 1,
                    note: None,
                    clicks: 0,
                    frontmatter: Frontmatter::default(),
                })
                .collect(),
        }
    }

    fn stabilized_page() -> MockPage {
        MockPage::new()
            .with_screenshot(vec![0x89, 0x50, 0x4e, 0x47])
            .with_eval_rule("slidev-slide-loading", vec![json!(true)])
            .with_eval_rule("data-waitfor", vec![json!([])])
            .with_eval_rule("iframe", vec![json!(true)])
            .with_eval_rule("mermaid-rendering-container", vec![json!(true)])
            .with_eval_rule("monaco-aria-container", vec![json!(null)])
            .with_eval_rule("querySelector('[data-slidev-no=", vec![json!(true)])
            .with_eval_rule("querySelector('.print-slide-container", vec![json!(true)])
    }

    #[test]
    fn test_one_piece_names() {
        assert_eq!(one_piece_name("3-0", false), "3.png");
        assert_eq!(one_piece_name("3-0", true), "3-0.png");
        assert_eq!(one_piece_name("12-4", true), "12-4.png");
    }

    #[tokio::test]
    async fn test_per_slide_writes_padded_files_for_selected_range() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out");
        let page = stabilized_page();
        let mut options = ExportOptions::new(OutputFormat::Png)
            .with_output(&out)
            .with_range("1,3");
        options.per_slide = true;

        let outcome = render(
            &page,
            &deck(4),
            &options,
            &[1, 3],
            &ExportProgress::hidden(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.artifact, Artifact::Directory(out.clone()));
        let mut names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["01.png", "03.png"]);
    }

    #[tokio::test]
    async fn test_one_piece_writes_plain_numbered_files() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("shots");
        let containers = json!([
            { "id": "1-0", "left": 0.0, "top": 0.0, "right": 1920.0, "bottom": 1080.0 },
            { "id": "2-0", "left": 0.0, "top": 1080.0, "right": 1920.0, "bottom": 2160.0 },
        ]);
        let page = stabilized_page().with_eval_rule("print-slide-container')).map", vec![containers]);
        let options = ExportOptions::new(OutputFormat::Png).with_output(&out);

        render(&page, &deck(2), &options, &[1, 2], &ExportProgress::hidden())
            .await
            .unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["1.png", "2.png"]);
        // Viewport grew to fit both stacked pages
        assert_eq!(page.calls("viewport:1920x2160@2"), 1);
    }

    #[tokio::test]
    async fn test_rerun_replaces_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("9.png"), b"stale").unwrap();

        let containers = json!([
            { "id": "1-0", "left": 0.0, "top": 0.0, "right": 1920.0, "bottom": 1080.0 },
        ]);
        let page = stabilized_page().with_eval_rule("print-slide-container')).map", vec![containers]);
        let options = ExportOptions::new(OutputFormat::Png).with_output(&out);

        render(&page, &deck(1), &options, &[1], &ExportProgress::hidden())
            .await
            .unwrap();

        assert!(!out.join("9.png").exists());
        assert!(out.join("1.png").exists());
    }
}
