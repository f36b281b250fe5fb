//! MP4 recording.
//!
//! The recorder drives the deck through its steps in embedded play mode
//! while streaming clipped screenshots into the encoder at a fixed frame
//! rate. The browser renders at its own pace, so the loop reconciles two
//! clocks: after every screenshot the recorder duplicates the last frame
//! until the written count catches up with wall time, then sleeps until
//! the next frame slot. The encoded video's elapsed time therefore
//! matches wall-clock capture time even when screenshots jitter.
//!
//! With `motion_scale > 1` the page's animations are slowed during
//! capture and the encoder timeline is sped back up by the same factor
//! (`setpts`), trading capture time for smoother motion at the target
//! frame rate.
//!
//! The in-page dilation timer is cleaned up through a window-level
//! restore hook; if the page navigates before cleanup runs, the timer is
//! discarded with the page.

pub mod encoder;

use crate::bridge::{self, StepInfo};
use crate::browser::{slide_selector, slide_url, PageQuery};
use crate::options::ExportOptions;
use crate::page::{ClipRect, PageDriver, ScreenshotOptions};
use crate::range;
use crate::result::{ExportError, ExportResult};
use crate::stabilize;
use encoder::FrameSink;
use std::time::{Duration, Instant};

/// Transition-advance timeout floor
const ADVANCE_TIMEOUT_MIN_MS: u64 = 2_000;

/// Transition-advance timeout ceiling
const ADVANCE_TIMEOUT_MAX_MS: u64 = 10_000;

/// Interval of the in-page animation re-normalization timer
const MOTION_RENORMALIZE_MS: u64 = 250;

/// Dilate in-page motion by `%SCALE%`: multiply the declared transition
/// duration and divide every animation's playback rate, re-normalizing
/// every 250ms because animations may start lazily.
const JS_MOTION_DILATE: &str = r"
(() => {
  const scale = %SCALE%;
  const doc = document.documentElement;
  const raw = getComputedStyle(doc)
    .getPropertyValue('--slidev-transition-duration').trim();
  const ms = raw.endsWith('ms') ? parseFloat(raw)
    : raw.endsWith('s') ? parseFloat(raw) * 1000
    : parseFloat(raw);
  if (Number.isFinite(ms)) {
    doc.style.setProperty('--slidev-transition-duration', `${ms * scale}ms`);
  }
  const tuned = new WeakSet();
  const renormalize = () => {
    for (const anim of document.getAnimations()) {
      if (tuned.has(anim)) continue;
      tuned.add(anim);
      anim.playbackRate = anim.playbackRate / scale;
    }
  };
  renormalize();
  const timer = setInterval(renormalize, %RENORM%);
  window.__exportar_restore_motion__ = () => clearInterval(timer);
  return true;
})()
";

/// Tear the dilation timer down
const JS_MOTION_RESTORE: &str = r"
(() => {
  if (typeof window.__exportar_restore_motion__ === 'function') {
    window.__exportar_restore_motion__();
    delete window.__exportar_restore_motion__;
  }
  return true;
})()
";

/// Bounding box of the slide content, for capture clipping
const JS_CLIP_RECT: &str = r"
(() => {
  const el = document.querySelector('#slide-content');
  if (!el) return null;
  const rect = el.getBoundingClientRect();
  return { left: rect.left, top: rect.top, right: rect.right, bottom: rect.bottom };
})()
";

/// Outcome of one recording session
#[derive(Debug, Clone, Default)]
pub struct RecordingStats {
    /// Frames handed to the encoder (duplicates included)
    pub frames: u64,
    /// Wall-clock capture duration
    pub wall_clock: Duration,
    /// Distinct step keys observed, in order
    pub steps: Vec<(u32, u32)>,
    /// Stabilizer warnings collected along the way
    pub warnings: Vec<String>,
}

/// Frames wall time expects at `elapsed_ms`: `max(1, ⌊elapsed·fps/1000⌋)`
#[must_use]
pub fn expected_frames(elapsed_ms: u64, fps: u32) -> u64 {
    (elapsed_ms * u64::from(fps) / 1000).max(1)
}

/// Sleep needed before capturing frame `written + 1`
#[must_use]
pub fn pace_delay(written: u64, fps: u32, elapsed: Duration) -> Duration {
    let frame_interval_ms = 1000.0 / f64::from(fps);
    let target_ms = (written as f64 + 1.0) * frame_interval_ms;
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    if target_ms > elapsed_ms {
        Duration::from_secs_f64((target_ms - elapsed_ms) / 1000.0)
    } else {
        Duration::ZERO
    }
}

/// Step-advance timeout: `min(10s, max(2s, navigation timeout))`
#[must_use]
pub fn advance_timeout(navigation_timeout_ms: u64) -> Duration {
    Duration::from_millis(
        navigation_timeout_ms.clamp(ADVANCE_TIMEOUT_MIN_MS, ADVANCE_TIMEOUT_MAX_MS),
    )
}

/// Validate MP4 preconditions that do not need a browser.
///
/// Rejects bad options and non-contiguous ranges before any process is
/// spawned.
pub fn check_preconditions(options: &ExportOptions, slide_range: &[u32]) -> ExportResult<()> {
    options.validate()?;
    range::require_contiguous(slide_range)?;
    Ok(())
}

/// MP4 capture session over one page and one frame sink
pub struct VideoRecorder<'a, P: PageDriver + ?Sized> {
    page: &'a P,
    options: &'a ExportOptions,
    clip: Option<ClipRect>,
    started_at: Instant,
    written: u64,
    steps: Vec<(u32, u32)>,
    warnings: Vec<String>,
}

impl<'a, P: PageDriver + ?Sized> VideoRecorder<'a, P> {
    /// Record the slides `start_no..=end_no` into `sink`.
    ///
    /// On success the sink is finished (stdin closed, encoder awaited);
    /// on failure it is aborted and the capture error is returned —
    /// never an encoder exit error masking the original cause.
    pub async fn record<S: FrameSink>(
        page: &'a P,
        sink: &mut S,
        options: &'a ExportOptions,
        start_no: u32,
        end_no: u32,
    ) -> ExportResult<RecordingStats> {
        let mut recorder = Self {
            page,
            options,
            clip: None,
            started_at: Instant::now(),
            written: 0,
            steps: Vec::new(),
            warnings: Vec::new(),
        };
        match recorder.run(sink, start_no, end_no).await {
            Ok(()) => {
                sink.finish().await?;
                Ok(RecordingStats {
                    frames: recorder.written,
                    wall_clock: recorder.started_at.elapsed(),
                    steps: recorder.steps,
                    warnings: recorder.warnings,
                })
            }
            Err(cause) => {
                sink.abort().await;
                Err(cause)
            }
        }
    }

    async fn run<S: FrameSink>(
        &mut self,
        sink: &mut S,
        start_no: u32,
        end_no: u32,
    ) -> ExportResult<()> {
        let video = &self.options.video;
        let speedup = video.speedup();
        let timeout = Duration::from_millis(self.options.timeout_ms);

        // Open the deck in embedded play mode on the first slide.
        let url = slide_url(
            &self.options.base_url,
            self.options.router_mode,
            start_no,
            &PageQuery::new().embedded(),
        );
        self.page.navigate(&url).await?;
        self.page
            .set_color_scheme(self.options.dark)
            .await?;
        stabilize::wait_for_element(self.page, &slide_selector(start_no), timeout).await?;
        let warnings = stabilize::wait_for_loaded(self.page, timeout).await?;
        self.warnings.extend(warnings);

        // The bridge must exist in play mode, or nothing can advance.
        let info = bridge::step_info(self.page).await?;
        self.note_step(info.key());
        crate::debug_log!("recording from step {}.{}", info.no, info.clicks);

        if video.motion_scale > 1.0 {
            let script = JS_MOTION_DILATE
                .replace("%SCALE%", &video.motion_scale.to_string())
                .replace("%RENORM%", &MOTION_RENORMALIZE_MS.to_string());
            self.page.evaluate(&script).await?;
        }

        self.clip = self.read_clip_rect().await?;
        let dwell = Duration::from_millis((video.interval_ms as f64 * speedup) as u64);
        let advance_deadline_budget = advance_timeout(self.options.timeout_ms);

        self.started_at = Instant::now();
        self.capture_frame(sink).await?;

        loop {
            stabilize::wait_step_settled(self.page, advance_deadline_budget).await?;
            self.capture_for(sink, dwell).await?;

            let info = bridge::step_info(self.page).await?;
            self.note_step(info.key());
            if !info.has_next || info.at_or_past_end(end_no) {
                break;
            }

            let saved = info.key();
            if !bridge::next_step(self.page).await? {
                return Err(ExportError::NoStepBridge);
            }
            let changed = self
                .capture_until_changed(sink, saved, advance_deadline_budget)
                .await?;
            self.note_step(changed.key());

            // Tail of the transition animation.
            let tail = stabilize::read_transition_budget(self.page).await?;
            self.capture_for(sink, tail).await?;
        }

        self.capture_frame(sink).await?;
        let _ = self.page.evaluate(JS_MOTION_RESTORE).await;
        crate::debug_log!(
            "recorded {} frames over {} steps",
            self.written,
            self.steps.len()
        );
        Ok(())
    }

    /// Capture one frame, top the count up to wall-clock expectation,
    /// then pace to the next frame slot.
    async fn capture_frame<S: FrameSink>(&mut self, sink: &mut S) -> ExportResult<()> {
        let png = self
            .page
            .screenshot(ScreenshotOptions {
                clip: self.clip,
                omit_background: false,
            })
            .await?;
        sink.write_frame(&png).await?;
        self.written += 1;

        let fps = self.options.video.fps;
        let elapsed_ms = self.started_at.elapsed().as_millis() as u64;
        let expected = expected_frames(elapsed_ms, fps);
        // Duplicate the frame just captured until the count catches up
        // with wall time; the encoded duration then tracks real time.
        while self.written < expected {
            sink.write_frame(&png).await?;
            self.written += 1;
        }

        let delay = pace_delay(self.written, fps, self.started_at.elapsed());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    /// Capture frames continuously for `duration`
    async fn capture_for<S: FrameSink>(
        &mut self,
        sink: &mut S,
        duration: Duration,
    ) -> ExportResult<()> {
        let end = Instant::now() + duration;
        while Instant::now() < end {
            self.capture_frame(sink).await?;
        }
        Ok(())
    }

    /// Keep capturing until the step key moves away from `saved`, or
    /// fail with the stuck key after the bounded advance timeout.
    async fn capture_until_changed<S: FrameSink>(
        &mut self,
        sink: &mut S,
        saved: (u32, u32),
        timeout: Duration,
    ) -> ExportResult<StepInfo> {
        let deadline = Instant::now() + timeout;
        loop {
            self.capture_frame(sink).await?;
            let info = bridge::step_info(self.page).await?;
            if info.key() != saved {
                return Ok(info);
            }
            if Instant::now() >= deadline {
                return Err(ExportError::StepAdvance {
                    no: saved.0,
                    clicks: saved.1,
                });
            }
        }
    }

    async fn read_clip_rect(&self) -> ExportResult<Option<ClipRect>> {
        let value = self.page.evaluate(JS_CLIP_RECT).await?;
        if value.is_null() {
            return Ok(None);
        }
        let sides: serde_json::Map<String, serde_json::Value> = match value {
            serde_json::Value::Object(map) => map,
            _ => return Ok(None),
        };
        let side = |name: &str| sides.get(name).and_then(serde_json::Value::as_f64);
        match (side("left"), side("top"), side("right"), side("bottom")) {
            (Some(left), Some(top), Some(right), Some(bottom)) => {
                Ok(ClipRect::rounded_inward(left, top, right, bottom))
            }
            _ => Ok(None),
        }
    }

    fn note_step(&mut self, key: (u32, u32)) {
        if self.steps.last() != Some(&key) {
            self.steps.push(key);
        }
    }
}
