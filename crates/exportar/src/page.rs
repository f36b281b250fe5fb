//! Abstract page driver.
//!
//! Every component that talks to the rendered deck goes through
//! [`PageDriver`], so the capture logic can be exercised against a
//! scripted [`MockPage`] in unit tests and against the real CDP page in
//! production. Between any two calls the page may have changed; callers
//! re-read page state (step info, clip rectangles) instead of caching it.

use crate::result::{ExportError, ExportResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A capture clip rectangle in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl ClipRect {
    /// Build a clip from a bounding box, rounded inward so no sub-pixel
    /// seam from the surrounding page leaks into the capture.
    ///
    /// Returns `None` when the inward rounding leaves no area.
    #[must_use]
    pub fn rounded_inward(left: f64, top: f64, right: f64, bottom: f64) -> Option<Self> {
        let x = left.ceil();
        let y = top.ceil();
        let width = right.floor() - x;
        let height = bottom.floor() - y;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }
}

/// Screenshot capture options
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenshotOptions {
    /// Restrict the capture to a clip rectangle
    pub clip: Option<ClipRect>,
    /// Capture with a transparent background
    pub omit_background: bool,
}

/// Options for browser-side PDF printing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPrintOptions {
    /// Page width in pixels (converted to inches at 96 dpi)
    pub width: u32,
    /// Page height in pixels
    pub height: u32,
}

impl PdfPrintOptions {
    /// Paper width in inches
    #[must_use]
    pub fn paper_width_in(&self) -> f64 {
        f64::from(self.width) / 96.0
    }

    /// Paper height in inches
    #[must_use]
    pub fn paper_height_in(&self) -> f64 {
        f64::from(self.height) / 96.0
    }
}

/// Abstract driver for one browser page
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL and wait for the navigation to finish
    async fn navigate(&self, url: &str) -> ExportResult<()>;

    /// Evaluate a JavaScript expression; promises are awaited
    async fn evaluate(&self, script: &str) -> ExportResult<serde_json::Value>;

    /// Take a PNG screenshot
    async fn screenshot(&self, opts: ScreenshotOptions) -> ExportResult<Vec<u8>>;

    /// Render the current page to a PDF
    async fn print_to_pdf(&self, opts: &PdfPrintOptions) -> ExportResult<Vec<u8>>;

    /// Emulate the preferred color scheme
    async fn set_color_scheme(&self, dark: bool) -> ExportResult<()>;

    /// Override the viewport dimensions and device scale factor
    async fn set_viewport(&self, width: u32, height: u32, scale: f64) -> ExportResult<()>;
}

/// One scripted evaluation rule for [`MockPage`]
#[derive(Debug)]
struct EvalRule {
    /// Substring of the script this rule responds to
    marker: String,
    /// Responses, popped front to back; the final one repeats
    responses: VecDeque<serde_json::Value>,
}

/// Scripted page driver for unit tests.
///
/// Evaluation is keyed by script substring: the first rule whose marker
/// occurs in the script answers, consuming its next queued response (the
/// last response repeats once the queue drains). Unmatched scripts
/// answer `null`.
#[derive(Debug, Default)]
pub struct MockPage {
    screenshot_png: Vec<u8>,
    rules: Mutex<Vec<EvalRule>>,
    history: Mutex<Vec<String>>,
}

impl MockPage {
    /// Create a mock page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the PNG bytes every screenshot returns
    #[must_use]
    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot_png = png;
        self
    }

    /// Script responses for evaluations containing `marker`
    #[must_use]
    pub fn with_eval_rule(
        self,
        marker: impl Into<String>,
        responses: Vec<serde_json::Value>,
    ) -> Self {
        self.rules.lock().expect("mock poisoned").push(EvalRule {
            marker: marker.into(),
            responses: responses.into(),
        });
        self
    }

    /// Recorded calls, in order
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.lock().expect("mock poisoned").clone()
    }

    /// Number of recorded calls whose entry starts with `prefix`
    #[must_use]
    pub fn calls(&self, prefix: &str) -> usize {
        self.history()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, entry: String) {
        self.history.lock().expect("mock poisoned").push(entry);
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn navigate(&self, url: &str) -> ExportResult<()> {
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> ExportResult<serde_json::Value> {
        let mut rules = self.rules.lock().expect("mock poisoned");
        for rule in rules.iter_mut() {
            if script.contains(&rule.marker) {
                self.record(format!("evaluate:{}", rule.marker));
                let value = if rule.responses.len() > 1 {
                    rule.responses.pop_front().unwrap_or_default()
                } else {
                    rule.responses.front().cloned().unwrap_or_default()
                };
                return Ok(value);
            }
        }
        self.record("evaluate:<unmatched>".to_string());
        Ok(serde_json::Value::Null)
    }

    async fn screenshot(&self, opts: ScreenshotOptions) -> ExportResult<Vec<u8>> {
        self.record(format!(
            "screenshot:clip={}",
            opts.clip.map_or_else(|| "none".to_string(), |c| {
                format!("{},{},{}x{}", c.x, c.y, c.width, c.height)
            })
        ));
        if self.screenshot_png.is_empty() {
            return Err(ExportError::Screenshot {
                message: "mock has no screenshot data".to_string(),
            });
        }
        Ok(self.screenshot_png.clone())
    }

    async fn print_to_pdf(&self, opts: &PdfPrintOptions) -> ExportResult<Vec<u8>> {
        self.record(format!("pdf:{}x{}", opts.width, opts.height));
        Err(ExportError::Pdf {
            message: "mock page cannot print to pdf".to_string(),
        })
    }

    async fn set_color_scheme(&self, dark: bool) -> ExportResult<()> {
        self.record(format!("color-scheme:{}", if dark { "dark" } else { "light" }));
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32, scale: f64) -> ExportResult<()> {
        self.record(format!("viewport:{width}x{height}@{scale}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clip_rounds_inward() {
        let clip = ClipRect::rounded_inward(10.2, 20.7, 110.9, 220.3).unwrap();
        assert!((clip.x - 11.0).abs() < f64::EPSILON);
        assert!((clip.y - 21.0).abs() < f64::EPSILON);
        assert!((clip.width - 99.0).abs() < f64::EPSILON);
        assert!((clip.height - 199.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clip_integral_box_is_unchanged() {
        let clip = ClipRect::rounded_inward(0.0, 0.0, 1920.0, 1080.0).unwrap();
        assert_eq!(
            clip,
            ClipRect {
                x: 0.0,
                y: 0.0,
                width: 1920.0,
                height: 1080.0
            }
        );
    }

    #[test]
    fn test_degenerate_clip_is_none() {
        assert!(ClipRect::rounded_inward(10.9, 0.0, 11.2, 5.0).is_none());
    }

    #[test]
    fn test_pdf_paper_size_at_96_dpi() {
        let opts = PdfPrintOptions {
            width: 1920,
            height: 1080,
        };
        assert!((opts.paper_width_in() - 20.0).abs() < f64::EPSILON);
        assert!((opts.paper_height_in() - 11.25).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_mock_eval_rules_pop_then_repeat() {
        let page = MockPage::new().with_eval_rule("probe", vec![json!(1), json!(2)]);
        assert_eq!(page.evaluate("probe()").await.unwrap(), json!(1));
        assert_eq!(page.evaluate("probe()").await.unwrap(), json!(2));
        // Last response repeats
        assert_eq!(page.evaluate("probe()").await.unwrap(), json!(2));
        // Unmatched scripts answer null
        assert_eq!(
            page.evaluate("somethingElse()").await.unwrap(),
            serde_json::Value::Null
        );
    }

    #[tokio::test]
    async fn test_mock_records_history() {
        let page = MockPage::new().with_screenshot(vec![1, 2, 3]);
        page.navigate("http://localhost/1").await.unwrap();
        page.screenshot(ScreenshotOptions::default()).await.unwrap();
        assert_eq!(page.calls("navigate:"), 1);
        assert_eq!(page.calls("screenshot:"), 1);
    }
}
