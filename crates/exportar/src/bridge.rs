//! Step bridge.
//!
//! The playback state lives inside the page. A well-behaved deck exposes
//! `window.__slidev_export__` with `getStepInfo()` / `nextStep()`;
//! older decks expose `window.__slidev__.nav` whose fields may be plain
//! values or reactive cells of the shape `{ value }`. Both shapes are
//! normalized in the injected script, so the Rust side always sees one
//! [`StepInfo`]. A missing bridge is fatal for MP4 recording — there is
//! no other way to advance playback.

use crate::page::PageDriver;
use crate::result::{ExportError, ExportResult};
use serde::{Deserialize, Serialize};

/// In-page playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInfo {
    /// Current slide number (1-based)
    pub no: u32,
    /// Current click index on the slide
    pub clicks: u32,
    /// Total clicks on the slide (`clicks_total + 1` steps)
    #[serde(default)]
    pub clicks_total: u32,
    /// Another step exists anywhere in the deck
    #[serde(default)]
    pub has_next: bool,
}

impl StepInfo {
    /// The step key `(no, clicks)` uniquely identifying a reveal state
    #[must_use]
    pub const fn key(&self) -> (u32, u32) {
        (self.no, self.clicks)
    }

    /// Whether this step is at or past `(end_no, clicks_total)`
    #[must_use]
    pub const fn at_or_past_end(&self, end_no: u32) -> bool {
        self.no > end_no || (self.no == end_no && self.clicks >= self.clicks_total)
    }
}

/// Normalizing reader over both bridge shapes
const JS_GET_STEP_INFO: &str = r"
(() => {
  const bridge = window.__slidev_export__;
  if (bridge && typeof bridge.getStepInfo === 'function') {
    const info = bridge.getStepInfo();
    return {
      no: info.no,
      clicks: info.clicks,
      clicksTotal: info.clicksTotal,
      hasNext: !!info.hasNext,
    };
  }
  const nav = window.__slidev__ && window.__slidev__.nav;
  if (!nav) return null;
  const cell = (v) => (v && typeof v === 'object' && 'value' in v) ? v.value : v;
  return {
    no: cell(nav.currentSlideNo),
    clicks: cell(nav.clicks),
    clicksTotal: cell(nav.clicksTotal),
    hasNext: !!cell(nav.hasNext),
  };
})()
";

/// Advance one step; resolves to whether a bridge was found
const JS_NEXT_STEP: &str = r"
(async () => {
  const bridge = window.__slidev_export__;
  if (bridge && typeof bridge.nextStep === 'function') {
    await bridge.nextStep();
    return true;
  }
  const nav = window.__slidev__ && window.__slidev__.nav;
  if (nav && typeof nav.next === 'function') {
    await nav.next();
    return true;
  }
  return false;
})()
";

/// Jump straight to a step, when the bridge supports it
const JS_GO_STEP: &str = r"
(async () => {
  const bridge = window.__slidev_export__;
  if (bridge && typeof bridge.goStep === 'function') {
    await bridge.goStep(%NO%, %CLICKS%);
    return true;
  }
  return false;
})()
";

/// Read the current step, or `None` when no bridge is installed
pub async fn try_step_info<P: PageDriver + ?Sized>(page: &P) -> ExportResult<Option<StepInfo>> {
    let value = page.evaluate(JS_GET_STEP_INFO).await?;
    if value.is_null() {
        return Ok(None);
    }
    let info: StepInfo = serde_json::from_value(value).map_err(|e| ExportError::Evaluation {
        message: format!("malformed step info from page: {e}"),
    })?;
    Ok(Some(info))
}

/// Read the current step; a missing bridge is an error
pub async fn step_info<P: PageDriver + ?Sized>(page: &P) -> ExportResult<StepInfo> {
    try_step_info(page).await?.ok_or(ExportError::NoStepBridge)
}

/// Advance the playback by one step.
///
/// Returns `true` when a bridge advanced; `false` means no bridge was
/// found (fatal for MP4 — callers decide).
pub async fn next_step<P: PageDriver + ?Sized>(page: &P) -> ExportResult<bool> {
    let value = page.evaluate(JS_NEXT_STEP).await?;
    Ok(value.as_bool().unwrap_or(false))
}

/// Jump to a specific step when the bridge exposes `goStep`
pub async fn go_step<P: PageDriver + ?Sized>(
    page: &P,
    no: u32,
    clicks: u32,
) -> ExportResult<bool> {
    let script = JS_GO_STEP
        .replace("%NO%", &no.to_string())
        .replace("%CLICKS%", &clicks.to_string());
    let value = page.evaluate(&script).await?;
    Ok(value.as_bool().unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MockPage;
    use serde_json::json;

    #[test]
    fn test_step_key() {
        let info = StepInfo {
            no: 3,
            clicks: 2,
            clicks_total: 4,
            has_next: true,
        };
        assert_eq!(info.key(), (3, 2));
    }

    #[test]
    fn test_end_detection() {
        let mid = StepInfo {
            no: 2,
            clicks: 1,
            clicks_total: 3,
            has_next: true,
        };
        assert!(!mid.at_or_past_end(2));
        let last = StepInfo {
            no: 2,
            clicks: 3,
            clicks_total: 3,
            has_next: true,
        };
        assert!(last.at_or_past_end(2));
        let past = StepInfo {
            no: 3,
            clicks: 0,
            clicks_total: 0,
            has_next: false,
        };
        assert!(past.at_or_past_end(2));
    }

    #[test]
    fn test_step_info_deserializes_camel_case() {
        let info: StepInfo =
            serde_json::from_value(json!({ "no": 1, "clicks": 0, "clicksTotal": 2, "hasNext": true }))
                .unwrap();
        assert_eq!(info.clicks_total, 2);
        assert!(info.has_next);
    }

    #[test]
    fn test_step_info_tolerates_missing_optionals() {
        let info: StepInfo = serde_json::from_value(json!({ "no": 4, "clicks": 1 })).unwrap();
        assert_eq!(info.clicks_total, 0);
        assert!(!info.has_next);
    }

    #[tokio::test]
    async fn test_missing_bridge_is_none_then_error() {
        let page = MockPage::new().with_eval_rule("__slidev_export__", vec![json!(null)]);
        assert!(try_step_info(&page).await.unwrap().is_none());
        assert!(matches!(
            step_info(&page).await.unwrap_err(),
            ExportError::NoStepBridge
        ));
    }

    #[tokio::test]
    async fn test_step_info_roundtrip() {
        let page = MockPage::new().with_eval_rule(
            "__slidev_export__",
            vec![json!({ "no": 2, "clicks": 1, "clicksTotal": 1, "hasNext": false })],
        );
        let info = step_info(&page).await.unwrap();
        assert_eq!(info.key(), (2, 1));
        assert!(!info.has_next);
    }

    #[tokio::test]
    async fn test_next_step_reports_bridge_absence() {
        let page = MockPage::new().with_eval_rule("nextStep", vec![json!(false)]);
        assert!(!next_step(&page).await.unwrap());
    }

    #[tokio::test]
    async fn test_go_step_substitutes_target() {
        let page = MockPage::new().with_eval_rule("goStep", vec![json!(true)]);
        assert!(go_step(&page, 5, 2).await.unwrap());
    }
}
