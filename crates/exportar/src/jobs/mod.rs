//! Export jobs.
//!
//! A video export runs in the background while clients poll. The
//! registry is an in-process map with a single-writer discipline: a
//! job's status is mutated only by its own task (completion) or by the
//! lazy TTL sweep. Job ids are unique for the process lifetime, output
//! files are reserved at creation by embedding the id in the filename,
//! and status only ever moves `running → done|error`.

pub mod service;

use chrono::{DateTime, Duration as TtlDuration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

/// Retention of finished jobs (10 minutes)
pub const JOB_TTL_SECS: i64 = 600;

/// Lifecycle state of an export job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// The pipeline is still capturing or encoding
    Running,
    /// Artifact produced and downloadable
    Done,
    /// The pipeline failed
    Error,
}

/// One export job record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoJob {
    /// Job id, unique for the process lifetime
    pub id: Uuid,
    /// Lifecycle state
    pub status: JobStatus,
    /// Reserved output path (absolute once the service resolves it)
    pub file: PathBuf,
    /// Failure message when `status == Error`
    pub error: Option<String>,
    /// When the job started
    pub started_at: DateTime<Utc>,
    /// When the job finished (done or error)
    pub completed_at: Option<DateTime<Utc>>,
}

impl VideoJob {
    /// Fresh running job
    #[must_use]
    pub fn new(id: Uuid, file: PathBuf, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Running,
            file,
            error: None,
            started_at,
            completed_at: None,
        }
    }

    /// Elapsed milliseconds: pinned after completion, live while running
    #[must_use]
    pub fn duration_ms(&self, now: DateTime<Utc>) -> i64 {
        let end = self.completed_at.unwrap_or(now);
        (end - self.started_at).num_milliseconds().max(0)
    }

    /// Whether retention has run out (`completed_at + TTL < now`);
    /// running jobs never expire
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.status, self.completed_at) {
            (JobStatus::Running, _) | (_, None) => false,
            (_, Some(completed)) => completed + TtlDuration::seconds(JOB_TTL_SECS) < now,
        }
    }

    /// Basename of the output file
    #[must_use]
    pub fn filename(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// In-process job registry
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, VideoJob>>,
}

impl JobRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh running job
    pub fn register(&self, id: Uuid, file: PathBuf) -> VideoJob {
        let job = VideoJob::new(id, file, Utc::now());
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.insert(id, job.clone());
        }
        job
    }

    /// Look a job up
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<VideoJob> {
        self.jobs
            .lock()
            .ok()
            .and_then(|jobs| jobs.get(&id).cloned())
    }

    /// Mark a running job done. Transitions are monotone: anything but
    /// `running → done` is ignored.
    pub fn complete(&self, id: Uuid) {
        self.transition(id, JobStatus::Done, None);
    }

    /// Mark a running job failed
    pub fn fail(&self, id: Uuid, error: impl Into<String>) {
        self.transition(id, JobStatus::Error, Some(error.into()));
    }

    fn transition(&self, id: Uuid, status: JobStatus, error: Option<String>) {
        if let Ok(mut jobs) = self.jobs.lock() {
            if let Some(job) = jobs.get_mut(&id) {
                if job.status != JobStatus::Running {
                    return;
                }
                job.status = status;
                job.error = error;
                job.completed_at = Some(Utc::now());
            }
        }
    }

    /// All jobs, newest first
    #[must_use]
    pub fn list(&self) -> Vec<VideoJob> {
        let mut jobs: Vec<VideoJob> = self
            .jobs
            .lock()
            .map(|jobs| jobs.values().cloned().collect())
            .unwrap_or_default();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs
    }

    /// Drop expired jobs, judged against `now`
    pub fn sweep_at(&self, now: DateTime<Utc>) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.retain(|_, job| !job.is_expired(now));
        }
    }

    /// Drop expired jobs (lazy, called on every request)
    pub fn sweep(&self) {
        self.sweep_at(Utc::now());
    }
}

/// Sanitize one filename component: everything outside `[\w.-]` becomes
/// a single `-`, runs collapse, and the result carries no leading or
/// trailing dash.
#[must_use]
pub fn sanitize_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Output filename for a video job:
/// `<base>-<range>-<fps>fps-<WxH>-<YYYYMMDD-hhmmss>-<jobId[:8]>.mp4`
#[must_use]
pub fn video_filename(
    base: &str,
    range: Option<&str>,
    fps: u32,
    width: u32,
    height: u32,
    now: DateTime<Utc>,
    id: Uuid,
) -> String {
    let short_id: String = id.simple().to_string().chars().take(8).collect();
    let components = [
        sanitize_component(base),
        sanitize_component(range.unwrap_or("all")),
        format!("{fps}fps"),
        format!("{width}x{height}"),
        now.format("%Y%m%d-%H%M%S").to_string(),
        short_id,
    ];
    let joined: Vec<String> = components.into_iter().filter(|c| !c.is_empty()).collect();
    format!("{}.mp4", joined.join("-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 14, 30, 5).unwrap()
    }

    mod sanitize {
        use super::*;

        #[test]
        fn test_replaces_and_collapses() {
            assert_eq!(sanitize_component("my deck (v2)"), "my-deck-v2");
            assert_eq!(sanitize_component("1-3,5"), "1-3-5");
            assert_eq!(sanitize_component("a///b"), "a-b");
        }

        #[test]
        fn test_trims_edges() {
            assert_eq!(sanitize_component("  hello  "), "hello");
            assert_eq!(sanitize_component("--x--"), "x");
            assert_eq!(sanitize_component("###"), "");
        }

        #[test]
        fn test_keeps_word_chars_dots() {
            assert_eq!(sanitize_component("v1.2_final"), "v1.2_final");
        }

        proptest! {
            #[test]
            fn prop_sanitized_is_clean(input in ".{0,64}") {
                let out = sanitize_component(&input);
                prop_assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || "._-".contains(c)));
                prop_assert!(!out.starts_with('-'));
                prop_assert!(!out.ends_with('-'));
                prop_assert!(!out.contains("--"));
            }
        }
    }

    mod filename {
        use super::*;

        #[test]
        fn test_shape() {
            let id = Uuid::parse_str("a1a2a3a4-b1b2-c1c2-d1d2-e1e2e3e4e5e6").unwrap();
            let name = video_filename("My Deck", Some("1-3"), 30, 1920, 1080, fixed_now(), id);
            assert_eq!(name, "My-Deck-1-3-30fps-1920x1080-20240517-143005-a1a2a3a4.mp4");
        }

        #[test]
        fn test_empty_base_does_not_double_dash() {
            let id = Uuid::new_v4();
            let name = video_filename("###", None, 30, 1280, 720, fixed_now(), id);
            assert!(!name.contains("--"));
            assert!(name.contains("all"));
        }
    }

    mod lifecycle {
        use super::*;

        #[test]
        fn test_register_and_get() {
            let registry = JobRegistry::new();
            let id = Uuid::new_v4();
            let job = registry.register(id, PathBuf::from("/tmp/out.mp4"));
            assert_eq!(job.status, JobStatus::Running);
            assert_eq!(registry.get(id).unwrap().id, id);
            assert!(registry.get(Uuid::new_v4()).is_none());
        }

        #[test]
        fn test_transitions_are_monotone() {
            let registry = JobRegistry::new();
            let id = Uuid::new_v4();
            registry.register(id, PathBuf::from("/tmp/out.mp4"));
            registry.complete(id);
            assert_eq!(registry.get(id).unwrap().status, JobStatus::Done);

            // done → error must not happen
            registry.fail(id, "late failure");
            let job = registry.get(id).unwrap();
            assert_eq!(job.status, JobStatus::Done);
            assert!(job.error.is_none());
        }

        #[test]
        fn test_duration_pins_after_completion() {
            let registry = JobRegistry::new();
            let id = Uuid::new_v4();
            registry.register(id, PathBuf::from("/tmp/out.mp4"));
            registry.complete(id);
            let job = registry.get(id).unwrap();
            let later = Utc::now() + TtlDuration::seconds(100);
            assert_eq!(job.duration_ms(later), job.duration_ms(Utc::now()));
        }

        #[test]
        fn test_list_is_newest_first() {
            let registry = JobRegistry::new();
            let first = Uuid::new_v4();
            let second = Uuid::new_v4();
            registry.register(first, PathBuf::from("/tmp/1.mp4"));
            std::thread::sleep(std::time::Duration::from_millis(5));
            registry.register(second, PathBuf::from("/tmp/2.mp4"));
            let listed = registry.list();
            assert_eq!(listed[0].id, second);
            assert_eq!(listed[1].id, first);
        }
    }

    mod retention {
        use super::*;

        #[test]
        fn test_running_jobs_never_expire() {
            let registry = JobRegistry::new();
            let id = Uuid::new_v4();
            registry.register(id, PathBuf::from("/tmp/out.mp4"));
            registry.sweep_at(Utc::now() + TtlDuration::seconds(JOB_TTL_SECS * 10));
            assert!(registry.get(id).is_some());
        }

        #[test]
        fn test_finished_jobs_expire_past_ttl() {
            let registry = JobRegistry::new();
            let id = Uuid::new_v4();
            registry.register(id, PathBuf::from("/tmp/out.mp4"));
            registry.complete(id);

            // Just inside the TTL they survive
            registry.sweep_at(Utc::now() + TtlDuration::seconds(JOB_TTL_SECS - 5));
            assert!(registry.get(id).is_some());

            // Past the TTL they are swept
            registry.sweep_at(Utc::now() + TtlDuration::seconds(JOB_TTL_SECS + 5));
            assert!(registry.get(id).is_none());
        }

        #[test]
        fn test_error_jobs_expire_too() {
            let registry = JobRegistry::new();
            let id = Uuid::new_v4();
            registry.register(id, PathBuf::from("/tmp/out.mp4"));
            registry.fail(id, "boom");
            registry.sweep_at(Utc::now() + TtlDuration::seconds(JOB_TTL_SECS + 5));
            assert!(registry.get(id).is_none());
        }
    }
}
