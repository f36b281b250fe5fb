//! Exportar — slide deck export pipeline.
//!
//! Exports a presentation served by a slide dev server into durable
//! artifacts: a multi-page PDF, per-slide PNGs, an image-per-slide PPTX,
//! a Markdown bundle with speaker notes, and a recorded MP4 of the
//! animated playback (per-click reveals and slide transitions included).
//!
//! The capture pipeline drives a headless Chromium over CDP through a
//! deterministic sequence of slide/click states, waits for each state to
//! become visually quiescent, and — for video — streams clipped
//! screenshots into an external `ffmpeg` at a fixed frame rate while
//! keeping the page timeline in sync with the recorder clock. An
//! asynchronous job service exposes video export over HTTP with a
//! poll/download surface and 10-minute retention.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  render::export (format dispatch)                                │
//! │    pdf / png / pptx / md ──► PageDriver ──► artifacts on disk    │
//! │    mp4 ──► VideoRecorder ──► FrameSink (ffmpeg stdin) ──► .mp4   │
//! │                                                                  │
//! │  browser::SlideBrowser (chromiumoxide, `browser` feature)        │
//! │  stabilize (quiescence)  bridge (in-page step contract)          │
//! │  jobs::service (axum)    progress (indicatif/console)            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Without the `browser` feature only the scripted [`page::MockPage`]
//! driver is available, which is what the unit tests run against.

pub mod bridge;
pub mod browser;
pub mod deck;
pub mod jobs;
pub mod options;
pub mod page;
#[cfg(feature = "browser")]
pub mod pipeline;
pub mod progress;
pub mod range;
pub mod record;
pub mod render;
pub mod result;
pub mod stabilize;

pub use deck::{Slide, SlideDeck};
pub use options::{ExportOptions, OutputFormat, RouterMode, VideoOptions, WaitUntil};
pub use page::{MockPage, PageDriver};
pub use render::{Artifact, ExportOutcome};
pub use result::{ExportError, ExportResult};
