//! Visual quiescence.
//!
//! Before a slide is captured it must be settled: placeholders detached,
//! declared `data-waitfor` targets visible, sub-frames loaded, deferred
//! renderers (Mermaid) finished, and accessibility containers hidden so
//! they cannot flash into a frame. The MP4 recorder additionally waits
//! for CSS transitions to run out before dwelling on a step.

use crate::page::PageDriver;
use crate::result::{ExportError, ExportResult};
use std::time::{Duration, Instant};

/// Polling interval for settledness checks (50ms)
pub const POLL_INTERVAL_MS: u64 = 50;

/// Floor of the transition budget
pub const TRANSITION_BUDGET_MIN_MS: u64 = 120;

/// Ceiling of the transition budget
pub const TRANSITION_BUDGET_MAX_MS: u64 = 3_000;

/// Padding added on top of the declared transition duration
pub const TRANSITION_BUDGET_PAD_MS: u64 = 300;

/// No loading placeholder remains attached
const JS_PLACEHOLDERS_GONE: &str =
    r"document.querySelectorAll('.slidev-slide-loading').length === 0";

/// Selectors declared through `data-waitfor` whose target is not yet visible
const JS_WAITFOR_PENDING: &str = r#"
(() => {
  const pending = [];
  for (const el of document.querySelectorAll('[data-waitfor]')) {
    const selector = el.getAttribute('data-waitfor');
    if (!selector) continue;
    const target = el.querySelector(selector);
    if (!target || target.offsetParent === null) pending.push(selector);
  }
  return pending;
})()
"#;

/// Every sub-frame reached its default load state
const JS_FRAMES_LOADED: &str = r"
Array.from(document.querySelectorAll('iframe')).every((frame) => {
  try {
    const doc = frame.contentDocument;
    return doc === null || doc.readyState === 'complete';
  } catch {
    return true;
  }
})
";

/// Mermaid container drained; hide it once empty
const JS_MERMAID_SETTLED: &str = r"
(() => {
  const container = document.getElementById('mermaid-rendering-container');
  if (!container) return true;
  if (container.childElementCount > 0) return false;
  container.style.display = 'none';
  return true;
})()
";

/// Hide code-editor accessibility containers so they never flash
const JS_HIDE_EDITOR_ARIA: &str = r"
document.querySelectorAll('.monaco-aria-container').forEach((el) => {
  el.style.display = 'none';
})
";

/// Read the declared slide transition duration
const JS_TRANSITION_DURATION: &str = r"
getComputedStyle(document.documentElement)
  .getPropertyValue('--slidev-transition-duration')
";

/// No transition is actively entering or leaving under the slideshow root
const JS_NO_ACTIVE_TRANSITION: &str = r#"
(() => {
  const root = document.querySelector('#slideshow') || document;
  return root.querySelector('[class*="-enter-active"], [class*="-leave-active"]') === null;
})()
"#;

/// Yield two animation frames
const JS_TWO_FRAMES: &str = r"
new Promise((resolve) =>
  requestAnimationFrame(() => requestAnimationFrame(() => resolve(true))))
";

/// Parse a CSS duration: `"300ms"`, `"0.3s"`, or a unitless number of
/// milliseconds. Returns `None` for anything else.
#[must_use]
pub fn parse_css_duration_ms(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (digits, factor) = if let Some(stripped) = raw.strip_suffix("ms") {
        (stripped, 1.0)
    } else if let Some(stripped) = raw.strip_suffix('s') {
        (stripped, 1000.0)
    } else {
        (raw, 1.0)
    };
    let value: f64 = digits.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value * factor)
}

/// Budget spent waiting out one transition:
/// `clamp(duration + 300ms, 120ms, 3000ms)`.
#[must_use]
pub fn transition_budget(duration_ms: f64) -> Duration {
    let padded = duration_ms.max(0.0) as u64 + TRANSITION_BUDGET_PAD_MS;
    Duration::from_millis(padded.clamp(TRANSITION_BUDGET_MIN_MS, TRANSITION_BUDGET_MAX_MS))
}

/// Poll `script` until it evaluates truthy or `timeout` elapses.
///
/// Returns whether the condition was met; evaluation errors propagate.
pub async fn poll_until<P: PageDriver + ?Sized>(
    page: &P,
    script: &str,
    timeout: Duration,
) -> ExportResult<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let value = page.evaluate(script).await?;
        if is_truthy(&value) {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

/// Wait for an element to appear in the DOM
pub async fn wait_for_element<P: PageDriver + ?Sized>(
    page: &P,
    selector: &str,
    timeout: Duration,
) -> ExportResult<()> {
    let script = format!("document.querySelector('{selector}') !== null");
    if poll_until(page, &script, timeout).await? {
        Ok(())
    } else {
        Err(ExportError::Timeout {
            ms: timeout.as_millis() as u64,
        })
    }
}

/// Enforce quiescence before a capture.
///
/// Returns the list of `data-waitfor` selectors that never became
/// visible: those are warnings, not failures — capture proceeds, and the
/// caller decides how loudly to complain.
pub async fn wait_for_loaded<P: PageDriver + ?Sized>(
    page: &P,
    timeout: Duration,
) -> ExportResult<Vec<String>> {
    let mut warnings = Vec::new();

    poll_until(page, JS_PLACEHOLDERS_GONE, timeout).await?;

    // data-waitfor targets: a timeout here is reported, not fatal.
    let deadline = Instant::now() + timeout;
    loop {
        let value = page.evaluate(JS_WAITFOR_PENDING).await?;
        let pending: Vec<String> = serde_json::from_value(value).unwrap_or_default();
        if pending.is_empty() {
            break;
        }
        if Instant::now() >= deadline {
            for selector in pending {
                warnings.push(format!(
                    "data-waitfor target '{selector}' did not become visible"
                ));
            }
            break;
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }

    poll_until(page, JS_FRAMES_LOADED, timeout).await?;
    poll_until(page, JS_MERMAID_SETTLED, timeout).await?;
    page.evaluate(JS_HIDE_EDITOR_ARIA).await?;

    Ok(warnings)
}

/// Read the page's transition budget (MP4 variant helper)
pub async fn read_transition_budget<P: PageDriver + ?Sized>(page: &P) -> ExportResult<Duration> {
    let value = page.evaluate(JS_TRANSITION_DURATION).await?;
    let duration_ms = value
        .as_str()
        .and_then(parse_css_duration_ms)
        .unwrap_or(0.0);
    Ok(transition_budget(duration_ms))
}

/// MP4 settledness: sleep out the declared transition budget, then poll
/// until no enter/leave transition is active, then yield two animation
/// frames so the compositor catches up.
pub async fn wait_step_settled<P: PageDriver + ?Sized>(
    page: &P,
    timeout: Duration,
) -> ExportResult<()> {
    let budget = read_transition_budget(page).await?;
    tokio::time::sleep(budget).await;
    poll_until(page, JS_NO_ACTIVE_TRANSITION, timeout).await?;
    page.evaluate(JS_TWO_FRAMES).await?;
    Ok(())
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Null => false,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
